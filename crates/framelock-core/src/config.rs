use std::{default::Default, time::Duration};

use crate::{
    constants::{DEFAULT_BUFFER_SIZE_HINT, DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_TICK_RATE_HZ},
    FrameNumber,
};

/// Compression algorithm applied to sealed datagrams.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// No compression
    None,
    /// Zlib compression (balanced speed/ratio)
    Zlib,
    /// LZ4 compression (fast, lower ratio)
    Lz4,
}

#[derive(Clone, Debug)]
/// Configuration options to tune session behavior.
///
/// `initial_frame`, `compression`, and `use_checksums` must be identical on
/// every participant of a session; the remaining knobs are local tuning.
pub struct Config {
    /// Number of the first simulated frame. Must match across all peers.
    pub initial_frame: FrameNumber,
    /// Simulation tick rate in frames per second. Drives the pacing of the
    /// sender worker's transmission passes.
    pub tick_rate_hz: u16,
    /// Advisory sizing hint for per-peer reorder buffers. Not a hard
    /// ceiling; see `ReceivingQueue` for the memory implications.
    pub buffer_size_hint: usize,
    /// Time an unacknowledged frame waits before it is resent.
    pub retransmission_timeout: Duration,
    /// Max time the receiver worker blocks on the socket before rechecking
    /// the session stop flag.
    pub socket_read_timeout: Duration,
    /// Idle time after which a keep-alive datagram is sent to a peer.
    pub keepalive_interval: Duration,
    /// Time without any datagram from a peer before it is reported idle.
    pub idle_peer_timeout: Duration,
    /// Max size of a sealed datagram in bytes. Sealing a larger datagram is
    /// an error; the sender worker splits frame batches to fit.
    pub max_datagram_size: usize,
    /// Compression algorithm for sealed datagrams. Must match across peers.
    pub compression: CompressionAlgorithm,
    /// Minimum encoded size to attempt compression on. Smaller datagrams
    /// are sealed uncompressed.
    pub compression_threshold: usize,
    /// Append a CRC32 trailer to every sealed datagram and validate it on
    /// receipt. Must match across peers.
    pub use_checksums: bool,
    /// Socket receive buffer size in bytes (None = system default).
    /// Corresponds to SO_RCVBUF.
    pub socket_recv_buffer_size: Option<usize>,
    /// Socket send buffer size in bytes (None = system default).
    /// Corresponds to SO_SNDBUF.
    pub socket_send_buffer_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_frame: 0,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            buffer_size_hint: DEFAULT_BUFFER_SIZE_HINT,
            retransmission_timeout: Duration::from_millis(200),
            socket_read_timeout: Duration::from_millis(50),
            keepalive_interval: Duration::from_millis(500),
            idle_peer_timeout: Duration::from_secs(5),
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            compression: CompressionAlgorithm::Zlib,
            compression_threshold: 64,
            use_checksums: false,
            socket_recv_buffer_size: None,
            socket_send_buffer_size: None,
        }
    }
}
