//! Message decoding.
//!
//! Binary decoding of wire messages received from the network. Every failure
//! maps to a `Malformed` error; the receiver worker logs and drops the
//! datagram rather than terminating.

use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

use framelock_core::error::{DecodingErrorKind, ErrorKind, Result};

use crate::{ack::FrameAck, input::FrameInput, message::Message};

/// Deserializes wire messages from datagram bytes.
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decodes a single message from an unsealed datagram body.
    pub fn decode_message(bytes: &[u8]) -> Result<Message> {
        let mut cursor = Cursor::new(bytes);
        let message_type = cursor.read_u8().map_err(truncated)?;

        let message = match message_type {
            1 => {
                let sender_id = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let frame = Self::decode_frame(&mut cursor)?;
                Message::Input { sender_id, frame }
            }
            2 => {
                let sender_id = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let count = cursor.read_u16::<BigEndian>().map_err(truncated)? as usize;
                let mut frames = Vec::with_capacity(count);
                for _ in 0..count {
                    frames.push(Self::decode_frame(&mut cursor)?);
                }
                Message::InputBatch { sender_id, frames }
            }
            3 => {
                let sender_id = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let cumulative_ack = cursor.read_i64::<BigEndian>().map_err(truncated)?;
                let count = cursor.read_u16::<BigEndian>().map_err(truncated)? as usize;
                let mut selective_acks = Vec::with_capacity(count);
                for _ in 0..count {
                    selective_acks.push(cursor.read_i64::<BigEndian>().map_err(truncated)?);
                }
                if !selective_acks.windows(2).all(|w| w[0] < w[1])
                    || selective_acks.first().is_some_and(|&f| f <= cumulative_ack)
                {
                    return Err(ErrorKind::Malformed(DecodingErrorKind::SelectiveAcks));
                }
                Message::Ack(FrameAck::new(sender_id, cumulative_ack, selective_acks))
            }
            4 => Message::KeepAlive,
            _ => return Err(ErrorKind::Malformed(DecodingErrorKind::MessageKind)),
        };

        Ok(message)
    }

    fn decode_frame(cursor: &mut Cursor<&[u8]>) -> Result<FrameInput> {
        let frame_number = cursor.read_i64::<BigEndian>().map_err(truncated)?;
        let payload_len = cursor.read_u16::<BigEndian>().map_err(truncated)? as usize;
        let mut payload = vec![0u8; payload_len];
        cursor.read_exact(&mut payload).map_err(truncated)?;
        Ok(FrameInput::new(frame_number, payload))
    }
}

fn truncated(_: io::Error) -> ErrorKind {
    ErrorKind::Malformed(DecodingErrorKind::Truncated)
}
