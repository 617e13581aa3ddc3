//! Races a blocking I/O call against its [`CallContext`].

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::context::CallContext;
use crate::CLIENT_TARGET;

const WATCHER_THREAD_NAME: &str = "drpc-cancel-watch";

/// Background watcher armed for the duration of one write or read.
///
/// If the context fires before [`CancelWatch::finish`] is called, the watcher
/// runs its teardown action, which is expected to close the channel and so
/// unblock the I/O call. The race between teardown and a naturally
/// completing I/O call is unordered; callers must consult the value returned
/// by `finish` rather than the I/O result alone.
pub(crate) struct CancelWatch {
    context: CallContext,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<bool>>,
}

impl CancelWatch {
    /// Spawns a watcher that calls `teardown` if `context` fires first.
    pub(crate) fn arm<F>(context: &CallContext, teardown: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let finished = Arc::new(AtomicBool::new(false));
        let handle = {
            let context = context.clone();
            let finished = Arc::clone(&finished);
            thread::Builder::new()
                .name(WATCHER_THREAD_NAME.to_owned())
                .spawn(move || {
                    let fired = context.wait_until_done(&finished);
                    if fired {
                        teardown();
                    }
                    fired
                })?
        };
        Ok(Self {
            context: context.clone(),
            finished,
            handle: Some(handle),
        })
    }

    /// Signals completion, waits for the watcher to exit, and reports whether
    /// the context fired first.
    pub(crate) fn finish(mut self) -> bool {
        self.stop()
    }

    fn stop(&mut self) -> bool {
        self.finished.store(true, Ordering::SeqCst);
        self.context.wake();
        let Some(handle) = self.handle.take() else {
            return false;
        };
        handle.join().unwrap_or_else(|_| {
            warn!(target: CLIENT_TARGET, "cancellation watcher panicked");
            true
        })
    }
}

impl Drop for CancelWatch {
    fn drop(&mut self) {
        self.stop();
    }
}
