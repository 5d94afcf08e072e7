use framelock_core::{
    config::{CompressionAlgorithm, Config},
    error::{DecodingErrorKind, ErrorKind},
};

use super::{compression, open, seal, MessageDecoder, MessageEncoder};
use crate::{ack::FrameAck, input::FrameInput, message::Message};

fn plain_config() -> Config {
    Config { compression: CompressionAlgorithm::None, use_checksums: false, ..Config::default() }
}

#[test]
fn test_input_roundtrip() {
    let message = Message::Input { sender_id: 2, frame: FrameInput::new(17, vec![9, 9, 9]) };
    let bytes = MessageEncoder::encode_message(&message).unwrap();
    assert_eq!(bytes.len(), MessageEncoder::message_wire_size(&message));
    assert_eq!(MessageDecoder::decode_message(&bytes).unwrap(), message);
}

#[test]
fn test_batch_roundtrip() {
    let message = Message::InputBatch {
        sender_id: 0,
        frames: vec![
            FrameInput::new(4, vec![1]),
            FrameInput::new(5, vec![]),
            FrameInput::new(9, vec![2, 3]),
        ],
    };
    let bytes = MessageEncoder::encode_message(&message).unwrap();
    assert_eq!(bytes.len(), MessageEncoder::message_wire_size(&message));
    assert_eq!(MessageDecoder::decode_message(&bytes).unwrap(), message);
}

#[test]
fn test_ack_roundtrip_including_initial_sentinel() {
    let message = Message::Ack(FrameAck::new(3, -1, vec![2, 5]));
    let bytes = MessageEncoder::encode_message(&message).unwrap();
    assert_eq!(MessageDecoder::decode_message(&bytes).unwrap(), message);
}

#[test]
fn test_keepalive_is_one_byte() {
    let bytes = MessageEncoder::encode_message(&Message::KeepAlive).unwrap();
    assert_eq!(bytes, vec![4]);
    assert_eq!(MessageDecoder::decode_message(&bytes).unwrap(), Message::KeepAlive);
}

#[test]
fn test_unknown_discriminant_rejected() {
    match MessageDecoder::decode_message(&[99]) {
        Err(ErrorKind::Malformed(DecodingErrorKind::MessageKind)) => {}
        other => panic!("expected MessageKind error, got {:?}", other),
    }
}

#[test]
fn test_truncated_message_rejected() {
    let message = Message::Input { sender_id: 1, frame: FrameInput::new(3, vec![7; 16]) };
    let bytes = MessageEncoder::encode_message(&message).unwrap();
    match MessageDecoder::decode_message(&bytes[..bytes.len() - 4]) {
        Err(ErrorKind::Malformed(DecodingErrorKind::Truncated)) => {}
        other => panic!("expected Truncated error, got {:?}", other),
    }
}

#[test]
fn test_unsorted_selective_acks_rejected() {
    let mut bytes =
        MessageEncoder::encode_message(&Message::Ack(FrameAck::new(0, 1, vec![3, 5]))).unwrap();
    // Swap the two selective entries in place.
    let tail = bytes.len() - 16;
    let (a, b) = bytes.split_at_mut(tail + 8);
    a[tail..].swap_with_slice(b);
    match MessageDecoder::decode_message(&bytes) {
        Err(ErrorKind::Malformed(DecodingErrorKind::SelectiveAcks)) => {}
        other => panic!("expected SelectiveAcks error, got {:?}", other),
    }
}

#[test]
fn test_seal_open_roundtrip_per_algorithm() {
    for algorithm in [
        CompressionAlgorithm::None,
        CompressionAlgorithm::Zlib,
        CompressionAlgorithm::Lz4,
    ] {
        let config = Config {
            compression: algorithm,
            compression_threshold: 8,
            use_checksums: true,
            ..Config::default()
        };
        let message = Message::InputBatch {
            sender_id: 7,
            frames: vec![FrameInput::new(0, vec![0xAB; 40]), FrameInput::new(1, vec![0xAB; 40])],
        };
        let datagram = seal(&message, &config).unwrap();
        assert!(datagram.len() <= config.max_datagram_size);
        assert_eq!(open(&datagram, &config).unwrap(), message);
    }
}

#[test]
fn test_seal_rejects_oversized_datagram() {
    let config = plain_config();
    // Incompressible payload larger than the 300 byte ceiling.
    let payload: Vec<u8> = (0..400u16).map(|i| (i * 31 % 251) as u8).collect();
    let message = Message::Input { sender_id: 0, frame: FrameInput::new(0, payload) };
    match seal(&message, &config) {
        Err(ErrorKind::OversizedDatagram { limit, .. }) => {
            assert_eq!(limit, config.max_datagram_size)
        }
        other => panic!("expected OversizedDatagram, got {:?}", other),
    }
}

#[test]
fn test_open_rejects_corrupted_checksum() {
    let config = Config { use_checksums: true, ..plain_config() };
    let mut datagram = seal(&Message::KeepAlive, &config).unwrap();
    let last = datagram.len() - 1;
    datagram[last] ^= 0xFF;
    assert!(matches!(
        open(&datagram, &config),
        Err(ErrorKind::Malformed(DecodingErrorKind::Checksum))
    ));
}

#[test]
fn test_compression_only_when_smaller() {
    // Highly repetitive data must come back marked compressed.
    let repetitive = vec![0u8; 200];
    let sealed = compression::compress(&repetitive, CompressionAlgorithm::Zlib, 8).unwrap();
    assert_eq!(sealed[0], 1);
    assert!(sealed.len() < repetitive.len());
    assert_eq!(compression::decompress(&sealed).unwrap(), repetitive);

    // Below the threshold the marker stays uncompressed.
    let tiny = vec![1, 2, 3];
    let sealed = compression::compress(&tiny, CompressionAlgorithm::Zlib, 8).unwrap();
    assert_eq!(sealed[0], 0);
    assert_eq!(compression::decompress(&sealed).unwrap(), tiny);
}
