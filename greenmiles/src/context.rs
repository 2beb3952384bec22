//! Shared cancellation for the frame loop and the refresher.

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// A cancellation flag that sleepers can wait on.
///
/// Clones share the flag. Once cancelled, a context stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct Context {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere can't leave a bool half-written.
    fn flag(&self) -> MutexGuard<'_, bool> {
        self.state.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cancel(&self) {
        *self.flag() = true;
        self.state.1.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Sleep for `duration`, waking early on cancellation.
    /// Returns true if the context has been cancelled.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (_, cv) = &*self.state;
        let (cancelled, _) = cv
            .wait_timeout_while(self.flag(), duration, |c| !*c)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }

    /// Sleep until `deadline`; see [wait_timeout](Self::wait_timeout).
    pub fn wait_until(&self, deadline: Instant) -> bool {
        self.wait_timeout(deadline.saturating_duration_since(Instant::now()))
    }
}
