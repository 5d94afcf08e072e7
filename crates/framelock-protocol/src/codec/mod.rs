//! Datagram sealing and opening.
//!
//! A message travels the wire as `compress(encode(message))` with an optional
//! CRC32 trailer. Sealing enforces the configured datagram size ceiling;
//! opening validates and reverses each layer.
//!
//! # Module Organization
//!
//! - [`encoder`] - Message encoding to the binary wire format
//! - [`decoder`] - Message decoding from the binary wire format
//! - [`checksum`] - CRC32 trailer utilities
//! - [`compression`] - Datagram compression/decompression (Zlib, LZ4)

pub mod checksum;
pub mod compression;
pub mod decoder;
pub mod encoder;

#[cfg(test)]
mod tests;

pub use decoder::MessageDecoder;
pub use encoder::MessageEncoder;

use framelock_core::{
    config::Config,
    error::{ErrorKind, Result},
};

use crate::message::Message;

/// Worst-case bytes the sealing layers add on top of an encoded message:
/// one compression marker plus, when checksums are enabled, a CRC32 trailer.
pub const fn sealing_overhead(use_checksums: bool) -> usize {
    1 + if use_checksums { 4 } else { 0 }
}

/// Encodes, compresses, and (optionally) checksums a message into a datagram.
///
/// Fails with `OversizedDatagram` when the sealed bytes exceed
/// `config.max_datagram_size`; callers batching frames split to fit.
pub fn seal(message: &Message, config: &Config) -> Result<Vec<u8>> {
    let encoded = MessageEncoder::encode_message(message)?;
    let mut sealed =
        compression::compress(&encoded, config.compression, config.compression_threshold)?;
    if config.use_checksums {
        checksum::append_checksum(&mut sealed);
    }
    if sealed.len() > config.max_datagram_size {
        return Err(ErrorKind::OversizedDatagram {
            size: sealed.len(),
            limit: config.max_datagram_size,
        });
    }
    Ok(sealed)
}

/// Reverses [`seal`]: validates the trailer, decompresses, decodes.
pub fn open(datagram: &[u8], config: &Config) -> Result<Message> {
    let body = if config.use_checksums {
        checksum::validate_and_strip_checksum(datagram)?
    } else {
        datagram
    };
    let encoded = compression::decompress(body)?;
    MessageDecoder::decode_message(&encoded)
}
