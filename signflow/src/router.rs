// THEORY:
// The `ResultRouter` is the stable path from the dispatcher's worker back to the
// caller. The worker holds a clone of the router for its whole lifetime; the caller
// may swap the callback at any time and the next delivery observes the new one,
// without re-creating the worker or re-registering anything.
//
// Each dispatch carries a ticket `(session, seq)`. The session guard drops results
// that belong to an earlier activation, so a request still in flight when the
// pipeline was deactivated can finish without reaching the caller. Within a session
// results are not correlated with requests by default: they are delivered in the
// order they arrive, which need not be the order their batches were sent.
// `DeliveryOrder::LatestSent` narrows that by discarding any result older than the
// newest one already delivered.
//
// A delivery is one step under the delivery lock: the session check, the order
// check and the callback call. Opening and closing a session take the same lock, so
// once `end_session` returns no callback of the closed session is running or will
// run. The lock is reentrant, so a callback may itself close the session.

use crate::config::DeliveryOrder;
use crate::dispatcher::DispatchTicket;
use crate::prediction::PredictionResult;
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Caller-facing result handler.
pub type ResultCallback = Arc<dyn Fn(PredictionResult) + Send + Sync>;

#[derive(Clone)]
pub struct ResultRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    callback: RwLock<Option<ResultCallback>>,
    session: AtomicU64,
    order: DeliveryOrder,
    /// Serializes deliveries against each other and against session changes.
    /// Holds the highest `seq` delivered in the current session.
    delivery: ReentrantMutex<Cell<Option<u64>>>,
}

impl ResultRouter {
    pub fn new(order: DeliveryOrder) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                callback: RwLock::new(None),
                session: AtomicU64::new(0),
                order,
                delivery: ReentrantMutex::new(Cell::new(None)),
            }),
        }
    }

    /// Installs or replaces the callback. Takes effect on the next delivery.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(PredictionResult) + Send + Sync + 'static,
    {
        *self.inner.callback.write() = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self) {
        *self.inner.callback.write() = None;
    }

    /// Opens a new session and returns its id. Results from older sessions are
    /// dropped from now on.
    pub fn begin_session(&self) -> u64 {
        let last_delivered = self.inner.delivery.lock();
        last_delivered.set(None);
        self.inner.session.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Closes the current session. Waits for a delivery already in progress; no
    /// result of the closed session reaches the callback afterwards.
    pub fn end_session(&self) {
        let _delivery = self.inner.delivery.lock();
        self.inner.session.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current_session(&self) -> u64 {
        self.inner.session.load(Ordering::SeqCst)
    }

    /// Routes one result. Returns whether the callback was invoked.
    pub fn deliver(&self, ticket: DispatchTicket, result: PredictionResult) -> bool {
        let last_delivered = self.inner.delivery.lock();

        let current = self.current_session();
        if ticket.session != current {
            debug!(
                session = ticket.session,
                current,
                seq = ticket.seq,
                "dropping result from closed session"
            );
            return false;
        }

        if self.inner.order == DeliveryOrder::LatestSent {
            if matches!(last_delivered.get(), Some(delivered) if ticket.seq < delivered) {
                debug!(seq = ticket.seq, "dropping result superseded by a later batch");
                return false;
            }
            last_delivered.set(Some(ticket.seq));
        }

        // Cloned out so a callback may replace itself.
        let callback = self.inner.callback.read().clone();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => false,
        }
    }
}
