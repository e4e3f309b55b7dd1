//! Error types for the stream client

use rill_engine::EngineError;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by client handles
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The engine reported a failure, either synchronously or as a
    /// delivered operation outcome.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The engine refused the operation at submission time; it was never
    /// enqueued and no delivery will follow.
    #[error("Submission rejected: {0}")]
    Rejected(EngineError),

    /// The owning handle was closed while the operation was in flight.
    #[error("Operation canceled by handle close")]
    Canceled,

    #[error("Reader is closed")]
    ReaderClosed,

    #[error("Slice is closed")]
    SliceClosed,

    #[error("Writer is closed")]
    WriterClosed,

    /// The engine dropped an append acknowledgement without resolving it.
    #[error("Append acknowledgement channel closed")]
    AckChannelClosed,
}
