//! User-facing session events.
//!
//! The workers report link-health observations through a channel; acting on
//! them (dropping a peer, aborting the match) is host policy, not library
//! policy.

use framelock_core::PeerId;

/// Events emitted by the session workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// No datagram (input, ACK, or keep-alive) has arrived from the peer
    /// within the configured idle timeout.
    PeerIdle(PeerId),
    /// The peer came back after having been reported idle.
    PeerRecovered(PeerId),
    /// Sending to the peer failed with port-unreachable.
    PeerUnreachable(PeerId),
    /// The session's workers have shut down.
    Stopped,
}
