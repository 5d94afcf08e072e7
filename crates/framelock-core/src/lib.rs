#![warn(missing_docs)]

//! framelock-core: foundational types shared across the workspace.
//!
//! This crate provides the minimal set of core utilities used by all layers:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - Shared byte buffers
//! - Datagram transport abstraction
//!
//! Lockstep-specific logic lives in the specialized crates:
//! - `framelock-protocol`: frame/ACK data model and wire codec
//! - `framelock-sync`: receiving/transmission queues and the frame barrier
//! - `framelock-session`: socket workers and session orchestration

/// Frame counter type.
///
/// Signed so that the "no frame delivered yet" cumulative acknowledgment,
/// `initial_frame - 1`, needs no sentinel when sessions start at frame 0.
pub type FrameNumber = i64;

/// Stable identifier of a session participant.
pub type PeerId = u16;

/// Protocol constants shared across layers.
pub mod constants {
    /// Incremental monolithic protocol number.
    pub const PROTOCOL_VERSION: u16 = 1;
    /// Default ceiling for a sealed (compressed, checksummed) datagram.
    pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 300;
    /// Default advisory sizing hint for the per-peer reorder buffer.
    pub const DEFAULT_BUFFER_SIZE_HINT: usize = 64;
    /// Default simulation tick rate in frames per second.
    pub const DEFAULT_TICK_RATE_HZ: u16 = 60;
}

/// Configuration options for a lockstep session.
pub mod config;
/// Error types and results.
pub mod error;
/// Shared, reference-counted byte payloads.
pub mod shared;
/// Transport abstraction for pluggable datagram I/O.
pub mod transport;
