#![warn(missing_docs)]

//! framelock-protocol: frame data model and wire messages.

/// Frame acknowledgment (cumulative + selective).
pub mod ack;
/// Datagram sealing: binary codec, compression, checksums.
pub mod codec;
/// Per-frame input record.
pub mod input;
/// Tagged wire messages exchanged between peers.
pub mod message;

pub use ack::FrameAck;
pub use input::FrameInput;
pub use message::Message;
