//! In-memory engine used by tests and local development
//!
//! Behaves like the production engine from the client's perspective:
//! submissions are enqueued and completed from a background dispatch task,
//! so deliveries reach the client from a context that is not the caller's.
//! Slice requests against a fully-read stream are parked and completed when
//! new events arrive, matching the tail-read behavior of the real service.

use crate::engine::{DeliverySink, StreamEngine};
use crate::frame;
use crate::types::{OperationToken, ReaderId, SliceId, SliceRequest, StreamId, WriterId};
use crate::{EngineError, Result};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Work items handed to the dispatch task
enum DispatchJob {
    Slice {
        request: SliceRequest,
        token: OperationToken,
    },
    Append {
        writer: WriterId,
        event: Vec<u8>,
        routing_key: Option<String>,
        ack: oneshot::Sender<Result<()>>,
    },
}

struct StreamState {
    /// Events per segment, in append order
    segments: Vec<Vec<Vec<u8>>>,
}

struct ReaderState {
    stream: StreamId,
    /// Read cursor per segment
    cursors: Vec<usize>,
}

struct WriterState {
    stream: StreamId,
    /// Segment for the next keyless append
    next_segment: usize,
}

struct SliceState {
    /// Framed copy of the events this slice covers
    buf: Vec<u8>,
    cursor: usize,
}

#[derive(Default)]
struct EngineState {
    namespaces: HashSet<String>,
    streams: HashMap<StreamId, StreamState>,
    readers: HashMap<ReaderId, ReaderState>,
    writers: HashMap<WriterId, WriterState>,
    slices: HashMap<SliceId, SliceState>,
    next_handle: u64,
    injected_slice_failures: VecDeque<EngineError>,
    reader_releases: HashMap<u64, u32>,
    writer_releases: HashMap<u64, u32>,
    slice_releases: HashMap<u64, u32>,
}

struct Dispatch {
    jobs: mpsc::UnboundedSender<DispatchJob>,
    task: JoinHandle<()>,
}

/// In-memory mock of the production engine
pub struct MockEngine {
    state: Arc<Mutex<EngineState>>,
    dispatch: Mutex<Option<Dispatch>>,
}

impl MockEngine {
    /// Create an engine with no namespaces or streams.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            dispatch: Mutex::new(None),
        }
    }

    /// Start the background dispatch task, delivering through `sink`.
    pub fn start(&self, sink: Arc<dyn DeliverySink>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(dispatch_loop(self.state.clone(), rx, sink));
        *self.dispatch.lock() = Some(Dispatch { jobs: tx, task });
    }

    /// Stop the dispatch task. Enqueued submissions are dropped.
    pub fn stop(&self) {
        if let Some(dispatch) = self.dispatch.lock().take() {
            dispatch.task.abort();
        }
    }

    /// Queue a failure to be delivered for the next slice request.
    pub fn inject_slice_failure(&self, error: EngineError) {
        self.state.lock().injected_slice_failures.push_back(error);
    }

    /// How many times a reader resource has been released.
    pub fn reader_release_count(&self, reader: ReaderId) -> u32 {
        self.state
            .lock()
            .reader_releases
            .get(&reader.0)
            .copied()
            .unwrap_or(0)
    }

    /// How many times a writer resource has been released.
    pub fn writer_release_count(&self, writer: WriterId) -> u32 {
        self.state
            .lock()
            .writer_releases
            .get(&writer.0)
            .copied()
            .unwrap_or(0)
    }

    /// How many times a slice resource has been released.
    pub fn slice_release_count(&self, slice: SliceId) -> u32 {
        self.state
            .lock()
            .slice_releases
            .get(&slice.0)
            .copied()
            .unwrap_or(0)
    }

    fn enqueue(&self, job: DispatchJob) -> Result<()> {
        let dispatch = self.dispatch.lock();
        let Some(dispatch) = dispatch.as_ref() else {
            return Err(EngineError::DispatchStopped);
        };
        dispatch
            .jobs
            .send(job)
            .map_err(|_| EngineError::DispatchStopped)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        // Abort the dispatch task if still running
        if let Some(dispatch) = self.dispatch.lock().take() {
            dispatch.task.abort();
        }
    }
}

impl StreamEngine for MockEngine {
    fn create_namespace(&self, namespace: &str) -> Result<bool> {
        let mut state = self.state.lock();
        Ok(state.namespaces.insert(namespace.to_string()))
    }

    fn create_stream(&self, stream: &StreamId, initial_segments: u32) -> Result<bool> {
        let mut state = self.state.lock();
        if !state.namespaces.contains(&stream.namespace) {
            return Err(EngineError::NamespaceNotFound(stream.namespace.clone()));
        }
        if state.streams.contains_key(stream) {
            return Ok(false);
        }
        let segments = vec![Vec::new(); initial_segments.max(1) as usize];
        state.streams.insert(stream.clone(), StreamState { segments });
        Ok(true)
    }

    fn open_reader(&self, stream: &StreamId) -> Result<ReaderId> {
        let mut state = self.state.lock();
        let segment_count = state
            .streams
            .get(stream)
            .ok_or_else(|| EngineError::StreamNotFound(stream.to_string()))?
            .segments
            .len();
        state.next_handle += 1;
        let reader = ReaderId(state.next_handle);
        state.readers.insert(
            reader,
            ReaderState {
                stream: stream.clone(),
                cursors: vec![0; segment_count],
            },
        );
        Ok(reader)
    }

    fn submit_slice_request(&self, request: SliceRequest, token: OperationToken) -> Result<()> {
        // Synchronous rejection path: a request against a released reader
        // never reaches dispatch, so no delivery will occur for the token.
        if !self.state.lock().readers.contains_key(&request.reader) {
            return Err(EngineError::UnknownReader(request.reader));
        }
        self.enqueue(DispatchJob::Slice { request, token })
    }

    fn next_framed_event(&self, slice: SliceId) -> Result<Option<Vec<u8>>> {
        let mut state = self.state.lock();
        let slice_state = state
            .slices
            .get_mut(&slice)
            .ok_or(EngineError::UnknownSlice(slice))?;
        match frame::read_frame(&slice_state.buf, slice_state.cursor)? {
            Some((event, next)) => {
                slice_state.cursor = next;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    fn release_slice(&self, slice: SliceId) {
        let mut state = self.state.lock();
        state.slices.remove(&slice);
        *state.slice_releases.entry(slice.0).or_insert(0) += 1;
    }

    fn release_reader(&self, reader: ReaderId) {
        let mut state = self.state.lock();
        state.readers.remove(&reader);
        *state.reader_releases.entry(reader.0).or_insert(0) += 1;
    }

    fn open_writer(&self, stream: &StreamId) -> Result<WriterId> {
        let mut state = self.state.lock();
        if !state.streams.contains_key(stream) {
            return Err(EngineError::StreamNotFound(stream.to_string()));
        }
        state.next_handle += 1;
        let writer = WriterId(state.next_handle);
        state.writers.insert(
            writer,
            WriterState {
                stream: stream.clone(),
                next_segment: 0,
            },
        );
        Ok(writer)
    }

    fn append_event(
        &self,
        writer: WriterId,
        event: Vec<u8>,
        routing_key: Option<String>,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        if !self.state.lock().writers.contains_key(&writer) {
            return Err(EngineError::UnknownWriter(writer));
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(DispatchJob::Append {
            writer,
            event,
            routing_key,
            ack: ack_tx,
        })?;
        Ok(ack_rx)
    }

    fn release_writer(&self, writer: WriterId) {
        let mut state = self.state.lock();
        state.writers.remove(&writer);
        *state.writer_releases.entry(writer.0).or_insert(0) += 1;
    }
}

enum SliceOutcome {
    Ready(SliceId),
    Parked(StreamId),
    Failed(EngineError),
}

async fn dispatch_loop(
    state: Arc<Mutex<EngineState>>,
    mut jobs: mpsc::UnboundedReceiver<DispatchJob>,
    sink: Arc<dyn DeliverySink>,
) {
    // Requests waiting for new data, keyed by stream
    let mut parked: HashMap<StreamId, Vec<(SliceRequest, OperationToken)>> = HashMap::new();

    while let Some(job) = jobs.recv().await {
        match job {
            DispatchJob::Slice { request, token } => {
                complete_slice_request(&state, &sink, &mut parked, request, token);
            }
            DispatchJob::Append {
                writer,
                event,
                routing_key,
                ack,
            } => match apply_append(&state, writer, event, routing_key.as_deref()) {
                Ok(stream_id) => {
                    let _ = ack.send(Ok(()));
                    // New data may complete requests parked on this stream.
                    if let Some(waiting) = parked.remove(&stream_id) {
                        for (request, token) in waiting {
                            complete_slice_request(&state, &sink, &mut parked, request, token);
                        }
                    }
                }
                Err(error) => {
                    let _ = ack.send(Err(error));
                }
            },
        }
    }
}

fn complete_slice_request(
    state: &Mutex<EngineState>,
    sink: &Arc<dyn DeliverySink>,
    parked: &mut HashMap<StreamId, Vec<(SliceRequest, OperationToken)>>,
    request: SliceRequest,
    token: OperationToken,
) {
    match build_slice(state, &request) {
        SliceOutcome::Ready(slice) => sink.deliver(token, Ok(slice)),
        SliceOutcome::Parked(stream) => {
            tracing::debug!(%token, %stream, "no unread events, parking slice request");
            parked.entry(stream).or_default().push((request, token));
        }
        SliceOutcome::Failed(error) => sink.deliver(token, Err(error)),
    }
}

/// Assemble a slice from the reader's unread events, advancing its cursors.
fn build_slice(state: &Mutex<EngineState>, request: &SliceRequest) -> SliceOutcome {
    let mut state = state.lock();

    if let Some(error) = state.injected_slice_failures.pop_front() {
        return SliceOutcome::Failed(error);
    }

    let Some(reader) = state.readers.get(&request.reader) else {
        return SliceOutcome::Failed(EngineError::UnknownReader(request.reader));
    };
    let stream_id = reader.stream.clone();
    let mut new_cursors = reader.cursors.clone();

    let Some(stream) = state.streams.get(&stream_id) else {
        return SliceOutcome::Failed(EngineError::StreamNotFound(stream_id.to_string()));
    };

    // Copy unread events across segments into one framed buffer.
    let mut buf = Vec::new();
    for (segment, cursor) in stream.segments.iter().zip(new_cursors.iter_mut()) {
        for event in &segment[*cursor..] {
            frame::write_frame(&mut buf, event);
        }
        *cursor = segment.len();
    }
    if buf.is_empty() {
        return SliceOutcome::Parked(stream_id);
    }

    if let Some(reader) = state.readers.get_mut(&request.reader) {
        reader.cursors = new_cursors;
    }
    state.next_handle += 1;
    let slice = SliceId(state.next_handle);
    state.slices.insert(slice, SliceState { buf, cursor: 0 });
    SliceOutcome::Ready(slice)
}

fn apply_append(
    state: &Mutex<EngineState>,
    writer: WriterId,
    event: Vec<u8>,
    routing_key: Option<&str>,
) -> Result<StreamId> {
    let mut state = state.lock();

    let writer_state = state
        .writers
        .get(&writer)
        .ok_or(EngineError::UnknownWriter(writer))?;
    let stream_id = writer_state.stream.clone();
    let round_robin = writer_state.next_segment;

    let segment_count = state
        .streams
        .get(&stream_id)
        .ok_or_else(|| EngineError::StreamNotFound(stream_id.to_string()))?
        .segments
        .len();

    let segment = match routing_key {
        // Same key always lands in the same segment.
        Some(key) => {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            (hasher.finish() % segment_count as u64) as usize
        }
        None => round_robin % segment_count,
    };

    if routing_key.is_none() {
        if let Some(writer_state) = state.writers.get_mut(&writer) {
            writer_state.next_segment = round_robin.wrapping_add(1);
        }
    }
    if let Some(stream) = state.streams.get_mut(&stream_id) {
        stream.segments[segment].push(event);
    }
    Ok(stream_id)
}
