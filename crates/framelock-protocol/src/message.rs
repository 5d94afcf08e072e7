//! Wire messages exchanged between session participants.
//!
//! Every datagram body decodes to exactly one `Message`. The discriminant is
//! explicit on the wire so dispatch in the receiver worker is a total match,
//! never an inspection of runtime types.

use framelock_core::PeerId;

use crate::{ack::FrameAck, input::FrameInput};

/// A message carried by one sealed datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// One frame input from one peer.
    Input {
        /// Peer that produced the input.
        sender_id: PeerId,
        /// The input record.
        frame: FrameInput,
    },
    /// A batch of frame inputs from one peer. Order within the batch is not
    /// significant; the receiving queue reorders.
    InputBatch {
        /// Peer that produced the inputs.
        sender_id: PeerId,
        /// The input records.
        frames: Vec<FrameInput>,
    },
    /// Acknowledgment of frames received from the peer named inside.
    Ack(FrameAck),
    /// Empty liveness probe; resets the remote idle timer only.
    KeepAlive,
}

impl Message {
    /// Returns the wire discriminant for this message kind.
    pub fn message_type(&self) -> u8 {
        match self {
            Message::Input { .. } => 1,
            Message::InputBatch { .. } => 2,
            Message::Ack(_) => 3,
            Message::KeepAlive => 4,
        }
    }

    /// Returns the peer id a frame-carrying message originates from.
    pub fn sender_id(&self) -> Option<PeerId> {
        match self {
            Message::Input { sender_id, .. } | Message::InputBatch { sender_id, .. } => {
                Some(*sender_id)
            }
            Message::Ack(ack) => Some(ack.sender_id()),
            Message::KeepAlive => None,
        }
    }
}
