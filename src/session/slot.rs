//! Single-slot response handoff between the reader task and the evaluator.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::{AppError, Result};

/// Terminal value delivered into an armed slot.
#[derive(Debug, PartialEq, Eq)]
pub enum SlotValue {
    /// A complete decoded response message.
    Response(String),
    /// The stream closed before a response arrived.
    Closed,
}

/// Write-once, consume-once cell carrying one response from the reader loop
/// to the blocked evaluator.
///
/// The protocol is strictly request/response: at most one receiver is
/// outstanding at any time. [`ResponseSlot::arm`] enforces that by refusing
/// to install a second sender while one is pending.
#[derive(Debug, Clone, Default)]
pub struct ResponseSlot {
    inner: Arc<Mutex<Option<oneshot::Sender<SlotValue>>>>,
}

impl ResponseSlot {
    /// Create an empty, unarmed slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh sender and return the matching receiver.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if a previous evaluation is still
    /// outstanding — requests must be serialized by the caller.
    pub fn arm(&self) -> Result<oneshot::Receiver<SlotValue>> {
        let mut guard = self.lock();
        if let Some(pending) = guard.as_ref() {
            if !pending.is_closed() {
                return Err(AppError::Protocol(
                    "an evaluation is already outstanding on this connection".into(),
                ));
            }
            // The previous caller dropped its receiver without consuming
            // the slot (its future was cancelled); the stale sender can go.
        }
        let (tx, rx) = oneshot::channel();
        *guard = Some(tx);
        Ok(rx)
    }

    /// Deliver `value` into the armed slot, consuming it.
    ///
    /// Returns `false` when no receiver is waiting (nothing armed, or the
    /// evaluator already gave up), in which case `value` is dropped.
    #[must_use = "a false return means the value was dropped"]
    pub fn fulfill(&self, value: SlotValue) -> bool {
        let sender = self.lock().take();
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Drop an armed sender without delivering a value.
    ///
    /// Used when the request could not be written, so the never-sent script
    /// must not leave a stale slot behind for the next call.
    pub fn disarm(&self) {
        self.lock().take();
    }

    /// Whether a receiver is currently waiting on this slot.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<SlotValue>>> {
        // A poisoned lock only means a peer panicked between load and store;
        // the Option inside is still coherent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
