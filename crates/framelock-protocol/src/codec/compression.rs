//! Datagram compression and decompression.
//!
//! Sealed datagrams carry a 1-byte algorithm marker so both sides agree on
//! the expansion without negotiation: `[marker][body]` with 0 = uncompressed,
//! 1 = Zlib, 2 = LZ4 (LZ4 bodies carry a 4-byte original-size prefix).

use std::io::{self, Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use framelock_core::{
    config::CompressionAlgorithm,
    error::{DecodingErrorKind, ErrorKind, Result},
};

/// Compresses an encoded message for the wire.
///
/// Datagrams below `threshold` bytes are passed through uncompressed, as is
/// any datagram the algorithm fails to shrink.
pub fn compress(
    data: &[u8],
    algorithm: CompressionAlgorithm,
    threshold: usize,
) -> io::Result<Vec<u8>> {
    if data.len() < threshold {
        return Ok(passthrough(data));
    }

    match algorithm {
        CompressionAlgorithm::None => Ok(passthrough(data)),
        CompressionAlgorithm::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            let compressed = encoder.finish()?;

            if compressed.len() < data.len() {
                let mut output = Vec::with_capacity(compressed.len() + 1);
                output.push(1);
                output.extend_from_slice(&compressed);
                Ok(output)
            } else {
                Ok(passthrough(data))
            }
        }
        CompressionAlgorithm::Lz4 => {
            let compressed = lz4::block::compress(data, None, false)?;

            if compressed.len() + 4 < data.len() {
                let mut output = Vec::with_capacity(compressed.len() + 5);
                output.push(2);
                output.extend_from_slice(&(data.len() as u32).to_be_bytes());
                output.extend_from_slice(&compressed);
                Ok(output)
            } else {
                Ok(passthrough(data))
            }
        }
    }
}

/// Expands a datagram body based on its algorithm marker.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (marker, body) = data
        .split_first()
        .ok_or(ErrorKind::Malformed(DecodingErrorKind::Compression))?;

    match *marker {
        0 => Ok(body.to_vec()),
        1 => {
            let mut decoder = ZlibDecoder::new(body);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|_| ErrorKind::Malformed(DecodingErrorKind::Compression))?;
            Ok(decompressed)
        }
        2 => {
            if body.len() < 4 {
                return Err(ErrorKind::Malformed(DecodingErrorKind::Compression));
            }
            let original_size =
                u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as i32;
            lz4::block::decompress(&body[4..], Some(original_size))
                .map_err(|_| ErrorKind::Malformed(DecodingErrorKind::Compression))
        }
        _ => Err(ErrorKind::Malformed(DecodingErrorKind::Compression)),
    }
}

fn passthrough(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() + 1);
    output.push(0);
    output.extend_from_slice(data);
    output
}
