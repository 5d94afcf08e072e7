//! Message encoding.
//!
//! Binary serialization of wire messages, big-endian throughout. Payloads
//! are length-prefixed with a u16; a single input payload can therefore not
//! exceed 64 KiB, far above any datagram ceiling in practice.

use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::{input::FrameInput, message::Message};

/// Serializes wire messages into bytes for sealing.
pub struct MessageEncoder;

impl MessageEncoder {
    /// Encodes a message into the provided buffer (appends bytes).
    pub fn encode_message_into(buffer: &mut Vec<u8>, message: &Message) -> io::Result<()> {
        buffer.write_u8(message.message_type())?;

        match message {
            Message::Input { sender_id, frame } => {
                buffer.write_u16::<BigEndian>(*sender_id)?;
                Self::encode_frame_into(buffer, frame)?;
            }
            Message::InputBatch { sender_id, frames } => {
                buffer.write_u16::<BigEndian>(*sender_id)?;
                buffer.write_u16::<BigEndian>(frames.len() as u16)?;
                for frame in frames {
                    Self::encode_frame_into(buffer, frame)?;
                }
            }
            Message::Ack(ack) => {
                buffer.write_u16::<BigEndian>(ack.sender_id())?;
                buffer.write_i64::<BigEndian>(ack.cumulative_ack())?;
                buffer.write_u16::<BigEndian>(ack.selective_acks().len() as u16)?;
                for frame in ack.selective_acks() {
                    buffer.write_i64::<BigEndian>(*frame)?;
                }
            }
            Message::KeepAlive => {}
        }

        Ok(())
    }

    /// Encodes a message into a fresh byte vector.
    pub fn encode_message(message: &Message) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(Self::message_wire_size(message));
        Self::encode_message_into(&mut buffer, message)?;
        Ok(buffer)
    }

    /// Returns the exact encoded size of a message, for batch sizing.
    pub fn message_wire_size(message: &Message) -> usize {
        1 + match message {
            Message::Input { frame, .. } => 2 + Self::frame_wire_size(frame),
            Message::InputBatch { frames, .. } => {
                2 + 2 + frames.iter().map(Self::frame_wire_size).sum::<usize>()
            }
            Message::Ack(ack) => 2 + 8 + 2 + 8 * ack.selective_acks().len(),
            Message::KeepAlive => 0,
        }
    }

    /// Returns the encoded size of one frame record within a message.
    pub fn frame_wire_size(frame: &FrameInput) -> usize {
        8 + 2 + frame.payload().len()
    }

    fn encode_frame_into(buffer: &mut Vec<u8>, frame: &FrameInput) -> io::Result<()> {
        buffer.write_i64::<BigEndian>(frame.frame_number())?;
        buffer.write_u16::<BigEndian>(frame.payload().len() as u16)?;
        buffer.write_all(frame.payload())?;
        Ok(())
    }
}
