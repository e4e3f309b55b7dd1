//! Correlation registry bridging engine deliveries to waiting callers
//!
//! Every asynchronous operation is tagged with a fresh [`OperationToken`]
//! before it reaches the engine. The registry keeps one single-use delivery
//! channel per in-flight token; the engine's dispatch path resolves it
//! through the [`DeliverySink`] impl. One instance is shared by every
//! gateway and by the engine, passed around explicitly as an `Arc` rather
//! than reached through ambient global state.

use parking_lot::Mutex;
use rill_engine::{DeliverySink, OperationToken, SliceDelivery};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Table of in-flight operations awaiting delivery
pub struct OperationRegistry {
    /// Source of process-unique tokens; never reset while the registry lives
    next_token: AtomicU64,

    /// Delivery channel senders, keyed by in-flight token
    pending: Mutex<HashMap<OperationToken, oneshot::Sender<SliceDelivery>>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a fresh token and its single-use delivery channel.
    ///
    /// The receiver resolves exactly once: with the delivered result, or
    /// with a receive error if the entry is abandoned first.
    pub fn register(&self) -> (OperationToken, oneshot::Receiver<SliceDelivery>) {
        let token = OperationToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        let previous = self.pending.lock().insert(token, tx);
        debug_assert!(previous.is_none(), "token {token} registered twice");
        (token, rx)
    }

    /// Remove an in-flight entry without delivering anything.
    ///
    /// The waiter observes the dropped sender as cancellation. Used when a
    /// submission is rejected before the engine accepted it, and when a
    /// closing handle cancels its outstanding operations.
    pub fn abandon(&self, token: OperationToken) {
        if self.pending.lock().remove(&token).is_some() {
            tracing::debug!(%token, "abandoned in-flight operation");
        }
    }

    /// Number of operations currently awaiting delivery.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliverySink for OperationRegistry {
    /// Route one delivery to the waiter registered for `token`.
    ///
    /// Unknown tokens are dropped with a warning: they mean a double
    /// delivery or a delivery after abandonment, and neither may take down
    /// the engine's dispatch context.
    fn deliver(&self, token: OperationToken, delivery: SliceDelivery) {
        let Some(tx) = self.pending.lock().remove(&token) else {
            tracing::warn!(%token, "delivery for unknown token dropped");
            return;
        };
        if tx.send(delivery).is_err() {
            tracing::debug!(%token, "waiter gone before delivery arrived");
        }
    }
}
