//! Turns fire-and-forget engine submissions into awaitable calls

use crate::error::{ClientError, Result};
use crate::registry::OperationRegistry;
use parking_lot::Mutex;
use rill_engine::{OperationToken, SliceId, SliceRequest, StreamEngine};
use std::collections::HashSet;
use std::sync::Arc;

/// Issues engine operations and awaits their deliveries.
///
/// One gateway serves one logical handle. It remembers which tokens it has
/// in flight so the owning handle can cancel them all at close time.
pub struct OperationGateway<E: StreamEngine> {
    engine: Arc<E>,
    registry: Arc<OperationRegistry>,
    outstanding: Mutex<HashSet<OperationToken>>,
}

impl<E: StreamEngine> OperationGateway<E> {
    pub fn new(engine: Arc<E>, registry: Arc<OperationRegistry>) -> Self {
        Self {
            engine,
            registry,
            outstanding: Mutex::new(HashSet::new()),
        }
    }

    /// Submit `request` and suspend until its result is delivered.
    ///
    /// Only the calling task suspends; the engine keeps dispatching other
    /// operations in the meantime. No deadline is applied; a future
    /// extension point is a deadline parameter that removes the registry
    /// entry on expiry and returns a cancellation result.
    pub async fn submit(&self, request: SliceRequest) -> Result<SliceId> {
        let (token, delivery) = self.registry.register();
        self.outstanding.lock().insert(token);

        // A rejected submission never reaches the dispatch path, so nothing
        // will ever feed this token's channel. Remove the entry before
        // surfacing the rejection.
        if let Err(error) = self.engine.submit_slice_request(request, token) {
            self.outstanding.lock().remove(&token);
            self.registry.abandon(token);
            return Err(ClientError::Rejected(error));
        }

        let outcome = delivery.await;
        self.outstanding.lock().remove(&token);
        match outcome {
            Ok(Ok(slice)) => Ok(slice),
            Ok(Err(error)) => Err(ClientError::Engine(error)),
            // The sender was dropped without a send: the entry was abandoned
            // while we were suspended, i.e. the handle closed underneath us.
            Err(_) => Err(ClientError::Canceled),
        }
    }

    /// Abandon every operation this gateway still has in flight.
    ///
    /// Their waiters resolve with [`ClientError::Canceled`]; late engine
    /// deliveries for the abandoned tokens are dropped by the registry.
    pub fn cancel_outstanding(&self) -> usize {
        let tokens: Vec<OperationToken> = self.outstanding.lock().drain().collect();
        for token in &tokens {
            self.registry.abandon(*token);
        }
        tokens.len()
    }
}
