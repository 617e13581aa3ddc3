//! Per-call cancellation and deadlines.
//!
//! A [`CallContext`] travels with each [`send_msg`](crate::ClientConnection::send_msg)
//! call. It fires when [`CallContext::cancel`] is invoked from any clone or
//! when its deadline passes. Firing mid-call tears the connection down so the
//! blocked write or read returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Cancellation signal and optional deadline for a call.
///
/// Clones share state: cancelling one clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug, Default)]
struct ContextInner {
    cancelled: Mutex<bool>,
    signal: Condvar,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context with no deadline that fires only when cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that fires after `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or_else(Self::new, Self::with_deadline)
    }

    /// Context that fires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                ..ContextInner::default()
            }),
        }
    }

    /// Instant at which the context fires on its own, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Fires the context, waking every watcher attached to it.
    pub fn cancel(&self) {
        *self.lock_cancelled() = true;
        self.inner.signal.notify_all();
    }

    /// Returns `true` once the context has been cancelled or its deadline
    /// has passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        *self.lock_cancelled() || self.deadline_passed()
    }

    /// Blocks until the context fires or `finished` is set.
    ///
    /// Returns `true` when the context fired first. Completion is checked
    /// before cancellation so that a finished operation is never torn down.
    pub(crate) fn wait_until_done(&self, finished: &AtomicBool) -> bool {
        let mut cancelled = self.lock_cancelled();
        loop {
            if finished.load(Ordering::SeqCst) {
                return false;
            }
            if *cancelled {
                return true;
            }
            cancelled = match self.inner.deadline {
                None => self
                    .inner
                    .signal
                    .wait(cancelled)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return true;
                    }
                    self.inner
                        .signal
                        .wait_timeout(cancelled, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Wakes watchers so they re-check their completion flag.
    ///
    /// The lock is taken before notifying so that a watcher between its
    /// flag check and its wait cannot miss the wakeup.
    pub(crate) fn wake(&self) {
        drop(self.lock_cancelled());
        self.inner.signal.notify_all();
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn lock_cancelled(&self) -> MutexGuard<'_, bool> {
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
