#![warn(missing_docs)]

//! Framelock: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports the types
//! needed to run a deterministic lockstep simulation over UDP:
//!
//! - Session and events (`LockstepSession`, `SessionEvent`)
//! - Frame data model (`FrameInput`, `FrameAck`)
//! - Core configuration (`Config`)
//!
//! Example
//! ```ignore
//! use std::collections::BTreeMap;
//! use framelock::{Config, FrameInput, LockstepSession};
//!
//! let peers = BTreeMap::from([(2, "10.0.0.2:4500".parse().unwrap())]);
//! let session = LockstepSession::bind("0.0.0.0:4500", 1, peers, Config::default()).unwrap();
//!
//! let mut frame = 0;
//! loop {
//!     session.enqueue_local_input(FrameInput::new(frame, sample_input())).unwrap();
//!     session.await_frame().unwrap();
//!     for (peer, input) in session.collect_frame().unwrap() {
//!         apply_input(peer, &input);
//!     }
//!     frame += 1;
//! }
//! ```

// Core config, identifiers, and the transport seam
pub use framelock_core::{
    config::{CompressionAlgorithm, Config},
    error::{ErrorKind, Result},
    transport::DatagramSocket,
    FrameNumber, PeerId,
};
// Protocol: frame data model and wire messages
pub use framelock_protocol::{FrameAck, FrameInput, Message};
// Session: workers and the simulation-facing API
pub use framelock_session::{LockstepSession, SessionEvent, SessionSocket};
// Sync: the synchronization core, for hosts embedding their own transport
pub use framelock_sync::{CyclicBarrier, ReceivingQueue, TransmissionQueue};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        CompressionAlgorithm, Config, ErrorKind, FrameAck, FrameInput, FrameNumber,
        LockstepSession, PeerId, SessionEvent,
    };
}
