//! Engine-side boundary for the rill stream client
//!
//! This crate defines the vocabulary shared between the client core and the
//! I/O engine that fetches stream data: resource handles, operation tokens,
//! request descriptors and delivery results, plus the two traits the client
//! programs against. It also provides [`MockEngine`], an in-memory engine
//! with a background dispatch task, used by tests and local development.

use thiserror::Error;

pub mod engine;
pub mod frame;
pub mod mock;
pub mod types;

pub use engine::{DeliverySink, StreamEngine};
pub use mock::MockEngine;
pub use types::{
    OperationToken, ReaderId, SliceDelivery, SliceId, SliceRequest, StreamId, WriterId,
};

/// Engine boundary errors
///
/// The variant is the error code; the payload is the human-readable message,
/// copied into client-owned memory before it crosses the boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Unknown reader handle: {0}")]
    UnknownReader(ReaderId),

    #[error("Unknown writer handle: {0}")]
    UnknownWriter(WriterId),

    #[error("Unknown slice handle: {0}")]
    UnknownSlice(SliceId),

    #[error("Segment unavailable: {0}")]
    SegmentUnavailable(String),

    #[error("Malformed event frame at offset {0}")]
    MalformedFrame(usize),

    #[error("Engine dispatch is not running")]
    DispatchStopped,
}

pub type Result<T> = std::result::Result<T, EngineError>;
