//! Cooperative cancellation for blocking sleeps.
//!
//! The flush loop and the retrying sender never block anywhere except in
//! [`CancellationToken::wait_for`]. Cancelling a token wakes every waiter
//! immediately and makes all later waits return at once, so a cancelled
//! token is a permanent "stop sleeping" signal.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

/// Shared, cloneable cancellation flag with an interruptible sleep.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the token cancelled and wake all waiters.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for `timeout` unless cancelled first.
    ///
    /// Returns `true` when the sleep ended because of cancellation, `false`
    /// when the full timeout elapsed.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait_forever();
        };
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self
                .inner
                .condvar
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                return *cancelled;
            }
        }
        true
    }

    fn wait_forever(&self) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            self.inner.condvar.wait(&mut cancelled);
        }
        true
    }
}
