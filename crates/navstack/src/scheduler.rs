//! # Deferred Scheduling
//!
//! The debouncer is the only asynchronous piece of the navigation stack. It
//! needs exactly one capability from the host: run a task later, on the same
//! cooperative scheduler that drives rendering.
//!
//! Two hosts are provided:
//!
//! - [`TokioScheduler`]: spawns each task on a Tokio runtime after sleeping for
//!   the requested delay.
//! - [`FrameScheduler`]: a host-driven queue with a virtual clock. A render
//!   loop calls [`FrameScheduler::advance`] once per frame; tests use it to
//!   step through debounce windows deterministically.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::{NavigationError, Result};

/// A unit of deferred work
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run a task after a delay on the host's cooperative scheduler.
pub trait DeferredScheduler: Send + Sync {
    /// Run `task` once, no earlier than `delay` from now.
    fn schedule(&self, delay: Duration, task: DeferredTask);
}

/// Scheduler backed by a Tokio runtime handle
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Wrap an explicit runtime handle
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Capture the runtime the caller is currently running on
    pub fn current() -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| NavigationError::scheduler_unavailable(e.to_string()))
    }
}

impl DeferredScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: DeferredTask) {
        self.handle.spawn(async move {
            if delay.is_zero() {
                // Next turn of the scheduler, never inline
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            task();
        });
    }
}

#[derive(Default)]
struct FrameQueue {
    /// Virtual time since the scheduler was created
    now: Duration,
    /// Tie-breaker so equal deadlines run in scheduling order
    next_seq: u64,
    tasks: BTreeMap<(Duration, u64), DeferredTask>,
}

/// Host-driven scheduler with a virtual clock.
///
/// Nothing runs until the host calls [`advance`](Self::advance) or
/// [`run_until_idle`](Self::run_until_idle). Tasks are executed without the
/// queue lock held, so a task may schedule further tasks.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    queue: Arc<Mutex<FrameQueue>>,
}

impl FrameScheduler {
    /// Create an empty scheduler at virtual time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.queue.lock().now
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.lock().tasks.len()
    }

    /// Move the clock forward by `by` and run every task that became due.
    ///
    /// Tasks scheduled while running that are already due also run before this
    /// returns. Returns the number of tasks executed.
    pub fn advance(&self, by: Duration) -> usize {
        let target = {
            let queue = self.queue.lock();
            queue.now + by
        };

        let mut executed = 0;
        while let Some(task) = self.pop_due(target) {
            task();
            executed += 1;
        }

        self.queue.lock().now = target;
        executed
    }

    /// Run everything, jumping the clock to each deadline in turn.
    pub fn run_until_idle(&self) -> usize {
        let mut executed = 0;
        loop {
            let next = {
                let mut queue = self.queue.lock();
                let Some((&(due, seq), _)) = queue.tasks.iter().next() else {
                    break;
                };
                if due > queue.now {
                    queue.now = due;
                }
                queue.tasks.remove(&(due, seq))
            };
            if let Some(task) = next {
                task();
                executed += 1;
            }
        }
        executed
    }

    fn pop_due(&self, target: Duration) -> Option<DeferredTask> {
        let mut queue = self.queue.lock();
        let (&(due, seq), _) = queue.tasks.iter().next()?;
        if due > target {
            return None;
        }
        if due > queue.now {
            queue.now = due;
        }
        queue.tasks.remove(&(due, seq))
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("FrameScheduler")
            .field("now", &queue.now)
            .field("pending", &queue.tasks.len())
            .finish()
    }
}

impl DeferredScheduler for FrameScheduler {
    fn schedule(&self, delay: Duration, task: DeferredTask) {
        let mut queue = self.queue.lock();
        let due = queue.now + delay;
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.tasks.insert((due, seq), task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(counter: &Arc<AtomicUsize>) -> DeferredTask {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_frame_scheduler_runs_only_due_tasks() {
        let scheduler = FrameScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(Duration::from_millis(10), counter_task(&counter));
        scheduler.schedule(Duration::from_millis(30), counter_task(&counter));
        assert_eq!(scheduler.pending(), 2);

        assert_eq!(scheduler.advance(Duration::from_millis(5)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(5)), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(10));

        assert_eq!(scheduler.run_until_idle(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.now(), Duration::from_millis(30));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_frame_scheduler_preserves_order() {
        let scheduler = FrameScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (delay, label) in [(5, "b"), (0, "a"), (5, "c")] {
            let log = Arc::clone(&log);
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || log.lock().push(label)),
            );
        }

        scheduler.advance(Duration::from_millis(5));
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_frame_scheduler_task_can_reschedule() {
        let scheduler = FrameScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = scheduler.clone();
        let inner_counter = Arc::clone(&counter);
        scheduler.schedule(
            Duration::ZERO,
            Box::new(move || {
                inner_counter.fetch_add(1, Ordering::SeqCst);
                inner_scheduler.schedule(Duration::ZERO, counter_task(&inner_counter));
            }),
        );

        assert_eq!(scheduler.advance(Duration::ZERO), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_frame_scheduler_debug_reports_clock_and_queue() {
        let scheduler = FrameScheduler::new();
        scheduler.schedule(Duration::from_millis(16), Box::new(|| {}));
        scheduler.advance(Duration::from_millis(4));

        let rendered = format!("{scheduler:?}");
        assert!(rendered.contains("now: 4ms"));
        assert!(rendered.contains("pending: 1"));
    }

    #[test]
    fn test_tokio_scheduler_requires_runtime() {
        let err = TokioScheduler::current().unwrap_err();
        assert!(matches!(err, NavigationError::SchedulerUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_defers_task() {
        let scheduler = TokioScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(Duration::from_millis(5), counter_task(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
