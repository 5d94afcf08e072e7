#![warn(missing_docs)]

//! framelock-sync: the lockstep synchronization core.
//!
//! Three tightly coupled pieces:
//! - [`CyclicBarrier`]: reusable countdown rendezvous gating the tick
//! - [`ReceivingQueue`]: per-peer reorder buffer with selective ACKs
//! - [`TransmissionQueue`]: per-peer unacknowledged-frame retention

/// Reusable countdown rendezvous.
pub mod barrier;
/// Per-peer reorder buffer producing in-order frames.
pub mod receiving;
/// Per-peer retention of unacknowledged outgoing frames.
pub mod transmission;

pub use barrier::CyclicBarrier;
pub use receiving::ReceivingQueue;
pub use transmission::TransmissionQueue;
