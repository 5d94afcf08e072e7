use framelock_core::{shared::SharedBytes, FrameNumber};

/// One participant's input for one simulation frame.
///
/// The payload is opaque to the library; the simulation decides what an
/// input contains. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameInput {
    frame_number: FrameNumber,
    payload: SharedBytes,
}

impl FrameInput {
    /// Creates an input record for the given frame.
    pub fn new(frame_number: FrameNumber, payload: impl Into<SharedBytes>) -> Self {
        Self { frame_number, payload: payload.into() }
    }

    /// Returns the frame this input belongs to.
    pub fn frame_number(&self) -> FrameNumber {
        self.frame_number
    }

    /// Returns the opaque input payload.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }

    /// Returns a cheap clone of the shared payload buffer.
    pub fn payload_shared(&self) -> SharedBytes {
        self.payload.clone()
    }
}
