use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender};

use framelock_core::PeerId;
use framelock_protocol::ack::FrameAck;

/// Session-level buffer between the receiver worker (producing ACKs) and the
/// sender worker (emitting them).
///
/// Draining coalesces back-to-back ACKs for the same peer, keeping the one
/// with the highest cumulative point; on equal cumulative points the most
/// recently produced ACK wins, so its selective list is the freshest. The
/// contract is only that the most recently produced ACK per peer eventually
/// reaches the remote transmission queue.
#[derive(Clone, Debug)]
pub struct AckBuffer {
    sender: Sender<FrameAck>,
    receiver: Receiver<FrameAck>,
}

impl AckBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Posts an acknowledgment for later emission.
    pub fn post(&self, ack: FrameAck) {
        // The paired receiver lives as long as self.
        let _ = self.sender.send(ack);
    }

    /// Drains every posted acknowledgment, coalesced per peer and sorted by
    /// peer id.
    pub fn drain_coalesced(&self) -> Vec<FrameAck> {
        let mut latest: HashMap<PeerId, FrameAck> = HashMap::new();
        for ack in self.receiver.try_iter() {
            match latest.get(&ack.sender_id()) {
                Some(kept) if kept.cumulative_ack() > ack.cumulative_ack() => {}
                _ => {
                    latest.insert(ack.sender_id(), ack);
                }
            }
        }
        let mut drained: Vec<FrameAck> = latest.into_values().collect();
        drained.sort_by_key(FrameAck::sender_id);
        drained
    }
}

impl Default for AckBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesces_to_highest_cumulative() {
        let buffer = AckBuffer::new();
        buffer.post(FrameAck::new(1, 4, vec![7]));
        buffer.post(FrameAck::new(1, 2, vec![4, 7]));
        buffer.post(FrameAck::new(2, 0, vec![]));

        let drained = buffer.drain_coalesced();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].sender_id(), 1);
        assert_eq!(drained[0].cumulative_ack(), 4);
        assert_eq!(drained[0].selective_acks(), &[7]);
        assert_eq!(drained[1].sender_id(), 2);
    }

    #[test]
    fn test_equal_cumulative_keeps_latest_selective_list() {
        let buffer = AckBuffer::new();
        buffer.post(FrameAck::new(1, 3, vec![6]));
        buffer.post(FrameAck::new(1, 3, vec![6, 8]));

        let drained = buffer.drain_coalesced();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].selective_acks(), &[6, 8]);
    }

    #[test]
    fn test_drain_empties_the_buffer() {
        let buffer = AckBuffer::new();
        buffer.post(FrameAck::new(1, 0, vec![]));
        assert_eq!(buffer.drain_coalesced().len(), 1);
        assert!(buffer.drain_coalesced().is_empty());
    }
}
