//! Pull-based iteration over one delivered segment slice

use crate::error::{ClientError, Result};
use rill_engine::{SliceId, StreamEngine};
use std::sync::Arc;

/// A contiguous, already-fetched window of events from one or more segments.
///
/// Events come out in order through [`next_event`]; once the slice is
/// exhausted every further call keeps returning `Ok(None)`. The engine-side
/// slice resource is released exactly once, on [`close`] or drop.
///
/// [`next_event`]: SegmentSlice::next_event
/// [`close`]: SegmentSlice::close
pub struct SegmentSlice<E: StreamEngine> {
    engine: Arc<E>,
    handle: Option<SliceId>,
    exhausted: bool,
}

impl<E: StreamEngine> SegmentSlice<E> {
    pub(crate) fn new(engine: Arc<E>, handle: SliceId) -> Self {
        Self {
            engine,
            handle: Some(handle),
            exhausted: false,
        }
    }

    /// The engine-side slice handle, until the slice is closed.
    pub fn handle(&self) -> Option<SliceId> {
        self.handle
    }

    /// Pull the next event payload out of the slice.
    ///
    /// The payload is an independent copy and stays valid after the slice
    /// is closed. `Ok(None)` signals the end of the slice. Calling this on
    /// a closed slice is a defined failure, not undefined behavior.
    pub fn next_event(&mut self) -> Result<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(handle) = self.handle else {
            return Err(ClientError::SliceClosed);
        };
        match self.engine.next_framed_event(handle)? {
            Some(event) => Ok(Some(event)),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Release the engine-side slice resource. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.release_slice(handle);
        }
    }
}

impl<E: StreamEngine> Drop for SegmentSlice<E> {
    fn drop(&mut self) {
        self.close();
    }
}
