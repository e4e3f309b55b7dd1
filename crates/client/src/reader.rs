//! User-facing reader handle

use crate::error::{ClientError, Result};
use crate::gateway::OperationGateway;
use crate::registry::OperationRegistry;
use crate::slice::SegmentSlice;
use parking_lot::Mutex;
use rill_engine::{ReaderId, SliceRequest, StreamEngine, StreamId};
use std::sync::Arc;
use tokio_stream::Stream;

/// Owns one engine-side reader session and fetches successive slices.
///
/// Overlapping [`next_slice`] calls through a shared reference are allowed
/// and get independent tokens; their completion order is the engine's
/// delivery order, not call order. Callers that need slices in order
/// serialize their calls.
///
/// [`next_slice`]: StreamReader::next_slice
pub struct StreamReader<E: StreamEngine> {
    stream: StreamId,
    engine: Arc<E>,
    gateway: OperationGateway<E>,
    handle: Mutex<Option<ReaderId>>,
}

impl<E: StreamEngine> StreamReader<E> {
    pub(crate) fn new(
        stream: StreamId,
        engine: Arc<E>,
        registry: Arc<OperationRegistry>,
    ) -> Result<Self> {
        let handle = engine.open_reader(&stream)?;
        let gateway = OperationGateway::new(engine.clone(), registry);
        Ok(Self {
            stream,
            engine,
            gateway,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// The stream this reader consumes.
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// The engine-side reader handle, until the reader is closed.
    pub fn handle(&self) -> Option<ReaderId> {
        *self.handle.lock()
    }

    /// Fetch the next readable slice of the stream.
    ///
    /// Suspends the calling task until the engine delivers the slice or a
    /// failure.
    pub async fn next_slice(&self) -> Result<SegmentSlice<E>> {
        let reader = match *self.handle.lock() {
            Some(reader) => reader,
            None => return Err(ClientError::ReaderClosed),
        };
        let slice = self.gateway.submit(SliceRequest { reader }).await?;
        Ok(SegmentSlice::new(self.engine.clone(), slice))
    }

    /// Continuous event tail over successive slices.
    ///
    /// Fetches a new slice whenever the current one is exhausted and yields
    /// every event payload. A failed fetch or decode yields the error and
    /// ends the stream.
    pub fn event_stream(&self) -> impl Stream<Item = Result<Vec<u8>>> + '_ {
        async_stream::stream! {
            loop {
                let mut slice = match self.next_slice().await {
                    Ok(slice) => slice,
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                };
                loop {
                    match slice.next_event() {
                        Ok(Some(event)) => yield Ok(event),
                        Ok(None) => break,
                        Err(error) => {
                            yield Err(error);
                            return;
                        }
                    }
                }
                slice.close();
            }
        }
    }

    /// Release the engine-side reader session.
    ///
    /// Outstanding [`next_slice`] calls are canceled first: their waiters
    /// resolve with [`ClientError::Canceled`] and any late deliveries are
    /// dropped by the registry instead of leaking an entry. Safe to call
    /// repeatedly.
    ///
    /// [`next_slice`]: StreamReader::next_slice
    pub fn close(&self) {
        let canceled = self.gateway.cancel_outstanding();
        if canceled > 0 {
            tracing::debug!(
                stream = %self.stream,
                canceled,
                "canceled in-flight slice requests at close"
            );
        }
        if let Some(reader) = self.handle.lock().take() {
            self.engine.release_reader(reader);
        }
    }
}

impl<E: StreamEngine> Drop for StreamReader<E> {
    fn drop(&mut self) {
        self.close();
    }
}
