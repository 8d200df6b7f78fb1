//! Single-shot coalescing debouncer
//!
//! The first `call()` in a quiet period schedules one emission `window` later.
//! Every further `call()` before that emission fires joins it. The pending flag
//! is cleared *before* the action runs, so a call made during or after the
//! action always gets an emission of its own: a burst never produces zero
//! emissions and is never delayed past one window.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::DeferredScheduler;

type Action = Box<dyn Fn() + Send + Sync>;

struct DebouncerInner {
    window: Duration,
    scheduler: Arc<dyn DeferredScheduler>,
    action: Action,
    pending: AtomicBool,
    calls: AtomicU64,
    emissions: AtomicU64,
}

impl DebouncerInner {
    fn fire(&self) {
        self.pending.store(false, Ordering::Release);
        self.emissions.fetch_add(1, Ordering::Relaxed);
        (self.action)();
    }
}

/// Coalesces bursts of calls into one deferred action.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<DebouncerInner>,
}

impl Debouncer {
    /// Create a debouncer that runs `action` on `scheduler` after `window`
    pub fn new<F>(window: Duration, scheduler: Arc<dyn DeferredScheduler>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(DebouncerInner {
                window,
                scheduler,
                action: Box::new(action),
                pending: AtomicBool::new(false),
                calls: AtomicU64::new(0),
                emissions: AtomicU64::new(0),
            }),
        }
    }

    /// Request an emission, joining the pending one if there is one
    pub fn call(&self) {
        self.inner.calls.fetch_add(1, Ordering::Relaxed);
        if self.inner.pending.swap(true, Ordering::AcqRel) {
            tracing::trace!("Debounced call coalesced into pending emission");
            return;
        }

        let inner = Arc::clone(&self.inner);
        self.inner
            .scheduler
            .schedule(self.inner.window, Box::new(move || inner.fire()));
    }

    /// Whether an emission is scheduled but has not fired yet
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Total number of `call()` invocations
    pub fn calls(&self) -> u64 {
        self.inner.calls.load(Ordering::Relaxed)
    }

    /// Total number of emissions that have fired
    pub fn emissions(&self) -> u64 {
        self.inner.emissions.load(Ordering::Relaxed)
    }

    /// Configured window
    pub fn window(&self) -> Duration {
        self.inner.window
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.inner.window)
            .field("pending", &self.is_pending())
            .field("calls", &self.calls())
            .field("emissions", &self.emissions())
            .finish()
    }
}
