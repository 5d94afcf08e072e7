use framelock_core::{FrameNumber, PeerId};

/// Acknowledgment of frames received from one peer.
///
/// `cumulative_ack` is the last frame delivered in order (`initial_frame - 1`
/// if none yet); `selective_acks` enumerates frames held out of order above
/// the cumulative point, exposing the gaps to the transmitting side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameAck {
    sender_id: PeerId,
    cumulative_ack: FrameNumber,
    selective_acks: Vec<FrameNumber>,
}

impl FrameAck {
    /// Creates an acknowledgment for the peer identified by `sender_id`.
    ///
    /// `selective_acks` must be sorted ascending with every value strictly
    /// greater than `cumulative_ack`. A receiving queue never produces
    /// `cumulative_ack + 1` (it collapses into the cumulative point), but
    /// that value remains legal on the wire.
    pub fn new(
        sender_id: PeerId,
        cumulative_ack: FrameNumber,
        selective_acks: Vec<FrameNumber>,
    ) -> Self {
        debug_assert!(selective_acks.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(selective_acks.iter().all(|&f| f > cumulative_ack));
        Self { sender_id, cumulative_ack, selective_acks }
    }

    /// Returns the id of the peer whose frames are being acknowledged.
    pub fn sender_id(&self) -> PeerId {
        self.sender_id
    }

    /// Returns the last frame delivered in order.
    pub fn cumulative_ack(&self) -> FrameNumber {
        self.cumulative_ack
    }

    /// Returns the frames held out of order, sorted ascending.
    pub fn selective_acks(&self) -> &[FrameNumber] {
        &self.selective_acks
    }

    /// Returns true if this acknowledgment covers the given frame.
    pub fn acknowledges(&self, frame: FrameNumber) -> bool {
        frame <= self.cumulative_ack || self.selective_acks.binary_search(&frame).is_ok()
    }
}
