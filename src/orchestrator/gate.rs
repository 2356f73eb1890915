//! Concurrency gate - admission control for the execution pipeline.
//!
//! At most `max_concurrency` calls hold a [`GatePermit`] at once. Callers that
//! arrive while the gate is full wait in a FIFO queue of oneshot senders. When
//! a permit is dropped its slot is handed directly to the oldest live waiter,
//! so the active count never dips and no late arrival can overtake the queue.
//!
//! All bookkeeping happens under one mutex that is never held across an await
//! or while a permit is being delivered.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Point-in-time view of the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    pub max_concurrency: usize,
    pub active: usize,
    pub pending: usize,
}

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    pending: VecDeque<oneshot::Sender<GatePermit>>,
}

#[derive(Debug)]
struct GateShared {
    max_concurrency: usize,
    state: Mutex<GateState>,
}

impl GateShared {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        // Bookkeeping stays consistent even if a holder panicked: every
        // critical section is a handful of integer/queue operations.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(self: &Arc<Self>) {
        loop {
            let waiter = {
                let mut state = self.lock();
                match state.pending.pop_front() {
                    Some(waiter) => waiter,
                    None => {
                        state.active = state.active.saturating_sub(1);
                        tracing::trace!("Gate slot freed (active={})", state.active);
                        return;
                    }
                }
            };

            // The slot moves to the waiter; `active` is unchanged.
            match waiter.send(GatePermit::armed(Arc::clone(self))) {
                Ok(()) => {
                    tracing::trace!("Gate slot handed to queued call");
                    return;
                }
                Err(mut permit) => {
                    // Waiter gave up while queued; try the next one.
                    permit.shared = None;
                }
            }
        }
    }
}

/// Bounded, FIFO-fair admission gate. Cloning shares the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    shared: Arc<GateShared>,
}

impl ConcurrencyGate {
    /// `max_concurrency` is clamped to at least 1.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            shared: Arc::new(GateShared {
                max_concurrency: max_concurrency.max(1),
                state: Mutex::new(GateState::default()),
            }),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.shared.max_concurrency
    }

    /// Wait for a slot. Dropping the returned permit frees it.
    ///
    /// If this future is dropped while queued, the entry is skipped at
    /// promotion time and the slot goes to the next waiter.
    pub async fn acquire(&self) -> GatePermit {
        loop {
            let waiter = {
                let mut state = self.shared.lock();
                if state.active < self.shared.max_concurrency && state.pending.is_empty() {
                    state.active += 1;
                    return GatePermit::armed(Arc::clone(&self.shared));
                }
                let (tx, rx) = oneshot::channel();
                state.pending.push_back(tx);
                tracing::debug!(
                    "Gate full (active={}, pending={}), call queued",
                    state.active,
                    state.pending.len()
                );
                rx
            };

            match waiter.await {
                Ok(permit) => return permit,
                // Senders are only dropped after a send; re-queue defensively.
                Err(_) => tracing::warn!("Gate waiter lost its sender, re-queueing"),
            }
        }
    }

    /// Take a slot only if one is free and nobody is queued.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let mut state = self.shared.lock();
        if state.active < self.shared.max_concurrency && state.pending.is_empty() {
            state.active += 1;
            Some(GatePermit::armed(Arc::clone(&self.shared)))
        } else {
            None
        }
    }

    /// Run `fut` while holding a slot.
    pub async fn run<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        let _permit = self.acquire().await;
        fut.await
    }

    pub fn stats(&self) -> GateStats {
        let state = self.shared.lock();
        GateStats {
            max_concurrency: self.shared.max_concurrency,
            active: state.active,
            pending: state.pending.iter().filter(|tx| !tx.is_closed()).count(),
        }
    }
}

/// Proof of holding one gate slot.
pub struct GatePermit {
    shared: Option<Arc<GateShared>>,
}

impl GatePermit {
    fn armed(shared: Arc<GateShared>) -> Self {
        Self {
            shared: Some(shared),
        }
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

impl fmt::Debug for GatePermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatePermit")
            .field("armed", &self.shared.is_some())
            .finish()
    }
}
