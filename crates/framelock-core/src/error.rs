//! Error taxonomy for the workspace.
//!
//! Transient per-datagram failures (`Malformed`, most `Io`) are logged and
//! absorbed by the workers; `Invariant` is fatal to the session.

use std::io;

use thiserror::Error;

use crate::PeerId;

/// Convenience alias over [`ErrorKind`].
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Errors that can occur in the lockstep core.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Wrapper around a std io error.
    #[error("an io error occurred: {0}")]
    Io(#[from] io::Error),
    /// A datagram could not be decoded.
    #[error("malformed datagram: {0}")]
    Malformed(DecodingErrorKind),
    /// A sealed datagram exceeded the configured size limit.
    #[error("sealed datagram of {size} bytes exceeds the limit of {limit}")]
    OversizedDatagram {
        /// Size the sealed datagram came out at.
        size: usize,
        /// Configured `max_datagram_size`.
        limit: usize,
    },
    /// A message named a peer outside the session's fixed peer set.
    #[error("unknown peer id {0}")]
    UnknownPeer(PeerId),
    /// A blocking wait was cancelled by session shutdown.
    #[error("wait interrupted by cancellation")]
    Interrupted,
    /// Internal state violated an invariant. Fatal; the session must stop.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Describes why decoding an incoming datagram failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodingErrorKind {
    /// The message discriminant did not name a known message kind.
    #[error("unknown message discriminant")]
    MessageKind,
    /// The datagram ended before the message was complete.
    #[error("truncated message")]
    Truncated,
    /// An acknowledgment's selective list was unsorted or overlapped the
    /// cumulative point.
    #[error("invalid selective acknowledgment list")]
    SelectiveAcks,
    /// The datagram's checksum trailer did not match its contents.
    #[error("checksum mismatch")]
    Checksum,
    /// The compression header or body could not be expanded.
    #[error("compression")]
    Compression,
}
