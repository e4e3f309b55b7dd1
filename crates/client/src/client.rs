//! Entry point wiring configuration, engine and registry together

use crate::config::ClientConfig;
use crate::error::Result;
use crate::reader::StreamReader;
use crate::registry::OperationRegistry;
use crate::writer::StreamWriter;
use rill_engine::{StreamEngine, StreamId};
use std::sync::Arc;

/// Factory for readers and writers on one engine connection.
///
/// Owns the shared [`OperationRegistry`] and hands a reference to every
/// handle it creates. Construct the engine first, start it with the
/// registry as its delivery sink, then build the client over both.
pub struct StreamClient<E: StreamEngine> {
    config: ClientConfig,
    engine: Arc<E>,
    registry: Arc<OperationRegistry>,
}

impl<E: StreamEngine> StreamClient<E> {
    pub fn new(config: ClientConfig, engine: Arc<E>, registry: Arc<OperationRegistry>) -> Self {
        Self {
            config,
            engine,
            registry,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared in-flight operation table.
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Create a namespace. Returns `false` if it already existed.
    pub fn create_namespace(&self, namespace: &str) -> Result<bool> {
        Ok(self.engine.create_namespace(namespace)?)
    }

    /// Create a stream with a fixed number of segments. Returns `false` if
    /// it already existed.
    pub fn create_stream(&self, stream: &StreamId, initial_segments: u32) -> Result<bool> {
        Ok(self.engine.create_stream(stream, initial_segments)?)
    }

    /// Open a reader session on `stream`.
    pub fn create_reader(&self, stream: StreamId) -> Result<StreamReader<E>> {
        StreamReader::new(stream, self.engine.clone(), self.registry.clone())
    }

    /// Open a writer session on `stream`.
    pub fn create_writer(&self, stream: StreamId) -> Result<StreamWriter<E>> {
        StreamWriter::new(
            stream,
            self.engine.clone(),
            self.config.max_inflight_appends,
        )
    }
}
