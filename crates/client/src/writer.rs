//! Event writer with a bounded in-flight acknowledgement window

use crate::error::{ClientError, Result};
use rill_engine::{StreamEngine, StreamId, WriterId};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Writes events to one stream.
///
/// Appends are pipelined: each write enqueues immediately and parks its
/// durability acknowledgement in a bounded window. When the window is full
/// the oldest acknowledgement is awaited before the next append is issued,
/// so at most the window size of appends is ever unacknowledged.
pub struct StreamWriter<E: StreamEngine> {
    stream: StreamId,
    engine: Arc<E>,
    handle: Option<WriterId>,
    inflight: AckWindow,
}

impl<E: StreamEngine> StreamWriter<E> {
    pub(crate) fn new(stream: StreamId, engine: Arc<E>, max_inflight: usize) -> Result<Self> {
        let handle = engine.open_writer(&stream)?;
        Ok(Self {
            stream,
            engine,
            handle: Some(handle),
            inflight: AckWindow::new(max_inflight),
        })
    }

    /// The stream this writer appends to.
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// The engine-side writer handle, until the writer is closed.
    pub fn handle(&self) -> Option<WriterId> {
        self.handle
    }

    /// Append one event, optionally routed by key.
    ///
    /// Returns the number of bytes accepted. The event may not be durable
    /// yet when this returns; [`flush`] waits for all outstanding
    /// acknowledgements.
    ///
    /// [`flush`]: StreamWriter::flush
    pub async fn write_event(
        &mut self,
        event: Vec<u8>,
        routing_key: Option<String>,
    ) -> Result<usize> {
        let Some(writer) = self.handle else {
            return Err(ClientError::WriterClosed);
        };
        let len = event.len();
        let ack = self
            .engine
            .append_event(writer, event, routing_key)
            .map_err(ClientError::Rejected)?;
        self.inflight.park(ack).await?;
        Ok(len)
    }

    /// Wait until every previously written event is acknowledged.
    pub async fn flush(&mut self) -> Result<()> {
        self.inflight.drain().await
    }

    /// Release the engine-side writer resource. Unacknowledged appends are
    /// not awaited; call [`flush`] first if they matter. Safe to call
    /// repeatedly.
    ///
    /// [`flush`]: StreamWriter::flush
    pub fn close(&mut self) {
        if let Some(writer) = self.handle.take() {
            self.engine.release_writer(writer);
        }
    }
}

impl<E: StreamEngine> Drop for StreamWriter<E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Bounded window of outstanding append acknowledgements
struct AckWindow {
    capacity: usize,
    pending: VecDeque<oneshot::Receiver<rill_engine::Result<()>>>,
}

impl AckWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pending: VecDeque::new(),
        }
    }

    /// Park one acknowledgement, first waiting out the oldest if the window
    /// is full.
    async fn park(&mut self, ack: oneshot::Receiver<rill_engine::Result<()>>) -> Result<()> {
        while self.pending.len() >= self.capacity {
            if let Some(oldest) = self.pending.pop_front() {
                resolve(oldest).await?;
            }
        }
        self.pending.push_back(ack);
        Ok(())
    }

    /// Await every parked acknowledgement, failing fast on the first error.
    async fn drain(&mut self) -> Result<()> {
        while let Some(ack) = self.pending.pop_front() {
            resolve(ack).await?;
        }
        Ok(())
    }
}

async fn resolve(ack: oneshot::Receiver<rill_engine::Result<()>>) -> Result<()> {
    match ack.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(ClientError::Engine(error)),
        Err(_) => Err(ClientError::AckChannelClosed),
    }
}
