//! Traits the client core programs against
//!
//! The engine runs in its own execution context: background dispatch threads
//! in production, a tokio task in the mock. Submission entry points only
//! enqueue work; eventual outcomes come back through the [`DeliverySink`]
//! the engine was started with.

use crate::types::{OperationToken, ReaderId, SliceDelivery, SliceId, SliceRequest, StreamId, WriterId};
use crate::Result;
use tokio::sync::oneshot;

/// Routes asynchronous operation outcomes back to whoever issued them.
///
/// Implemented by the client's correlation registry and handed to the engine
/// at startup. The engine calls this from its own dispatch context, possibly
/// with a token the client has already abandoned, so implementations must
/// never panic.
pub trait DeliverySink: Send + Sync {
    /// Deliver the outcome of the operation tagged with `token`.
    fn deliver(&self, token: OperationToken, delivery: SliceDelivery);
}

/// The I/O engine a stream client drives.
///
/// Handle-returning calls transfer ownership of an engine-side resource to
/// the caller; every handle must be released exactly once through the
/// matching `release_*` call. Releasing is safe in any state of the
/// resource, including after a failed operation on it.
pub trait StreamEngine: Send + Sync + 'static {
    /// Create a namespace. `Ok(false)` means it already existed.
    fn create_namespace(&self, namespace: &str) -> Result<bool>;

    /// Create a stream with a fixed number of segments. `Ok(false)` means
    /// it already existed.
    fn create_stream(&self, stream: &StreamId, initial_segments: u32) -> Result<bool>;

    /// Open a reader session on a stream.
    fn open_reader(&self, stream: &StreamId) -> Result<ReaderId>;

    /// Submit a request for the next readable slice, tagged with `token`.
    ///
    /// Fire-and-forget: the call only enqueues work and returns immediately.
    /// A synchronous `Err` means the request was never accepted and no
    /// delivery will ever happen for `token`.
    fn submit_slice_request(&self, request: SliceRequest, token: OperationToken) -> Result<()>;

    /// Decode the next framed event out of an open slice.
    ///
    /// `Ok(None)` marks the end of the slice and is returned again on every
    /// later call. The payload is copied out of engine-owned memory before
    /// it is returned.
    fn next_framed_event(&self, slice: SliceId) -> Result<Option<Vec<u8>>>;

    /// Release an open slice resource.
    fn release_slice(&self, slice: SliceId);

    /// Release a reader session.
    fn release_reader(&self, reader: ReaderId);

    /// Open a writer session on a stream.
    fn open_writer(&self, stream: &StreamId) -> Result<WriterId>;

    /// Append one event, optionally routed by key.
    ///
    /// The append is enqueued immediately; the returned receiver resolves
    /// once the event is durable (or has failed). Events with the same
    /// routing key land in the same segment.
    fn append_event(
        &self,
        writer: WriterId,
        event: Vec<u8>,
        routing_key: Option<String>,
    ) -> Result<oneshot::Receiver<Result<()>>>;

    /// Release a writer session.
    fn release_writer(&self, writer: WriterId);
}
