//! Boundary types shared by the client core and the engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a stream within a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId {
    /// Administrative grouping the stream belongs to
    pub namespace: String,

    /// Stream name, unique within its namespace
    pub stream: String,
}

impl StreamId {
    pub fn new(namespace: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            stream: stream.into(),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.stream)
    }
}

/// Correlates an issued asynchronous request with its eventual delivery.
///
/// Allocated by the client's registry; process-unique for the lifetime of
/// the registry that handed it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationToken(pub u64);

impl fmt::Display for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine-side reader session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderId(pub u64);

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine-side writer session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriterId(pub u64);

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine-side handle to one fetched slice of stream data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceId(pub u64);

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request descriptor for the next readable slice of a stream
#[derive(Debug, Clone, Copy)]
pub struct SliceRequest {
    /// Reader session the slice is fetched for
    pub reader: ReaderId,
}

/// Outcome of an asynchronous slice operation, as delivered by the engine
pub type SliceDelivery = std::result::Result<SliceId, crate::EngineError>;
