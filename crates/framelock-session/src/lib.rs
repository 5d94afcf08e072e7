#![warn(missing_docs)]

//! framelock-session: socket plumbing and session orchestration.
//!
//! A [`LockstepSession`] owns one receiving and one transmission queue per
//! remote peer, the shared frame barrier, and two worker threads: the
//! receiver worker drains the socket and routes messages into the queues;
//! the sender worker retransmits due frames, flushes acknowledgments, and
//! keeps idle links alive. The host's simulation thread drives the tick
//! through [`LockstepSession::await_frame`] and
//! [`LockstepSession::collect_frame`].

/// Session-level acknowledgment buffer with per-peer coalescing.
pub mod ack_buffer;
/// User-facing session events.
pub mod events;
/// Per-address liveness registry shared by the workers.
pub mod liveness;
/// Receiver worker: socket drain and message dispatch.
pub mod receiver;
/// Sender worker: retransmission, ACK flushing, keep-alives.
pub mod sender;
/// Lockstep session construction and the simulation-facing API.
pub mod session;
/// UDP socket setup.
pub mod socket;
/// Time source abstraction for the sender worker.
pub mod time;

pub use ack_buffer::AckBuffer;
pub use events::SessionEvent;
pub use session::LockstepSession;
pub use socket::SessionSocket;
