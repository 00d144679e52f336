//! Cooperative single-thread scheduler.
//!
//! A tokio current-thread runtime drives a [`LocalSet`], so tasks may hold
//! `Rc` state and Lua values. The shell loop owns the clock: each call to
//! [`Scheduler::turn`] lets ready tasks run for at most the given budget and
//! then returns control to the terminal loop.
//!
//! ```text
//! shell loop ─► turn(10ms) ─► rt.block_on(local.run_until(budget))
//!                                 ├── call_later timers
//!                                 ├── spawned tasks (Task<T>)
//!                                 └── device monitors
//!            ◄─ reap finished tasks, panics become faults
//! ```
//!
//! Shutdown cancels every pending task, awaits them, runs the teardown hooks
//! and shuts the runtime down, each exactly once.

// Rust guideline compliant 2026-02

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinSet, LocalSet};

/// How long shutdown waits for the runtime's blocking pool.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a [`Task`] produced no value.
#[derive(Debug)]
pub enum TaskError {
    /// The task was aborted before it finished.
    Cancelled,
    /// The task returned an error.
    Failed(anyhow::Error),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "task cancelled"),
            Self::Failed(e) => write!(f, "task failed: {e:#}"),
        }
    }
}

impl std::error::Error for TaskError {}

/// Handle to a spawned task. Await it with [`Task::join`].
///
/// Dropping the handle detaches the task; if it later fails, its error is
/// logged instead.
#[derive(Debug)]
pub struct Task<T> {
    result: oneshot::Receiver<Result<T>>,
    abort: AbortHandle,
}

impl<T> Task<T> {
    /// Abort the task. Awaiting it afterwards yields [`TaskError::Cancelled`].
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Whether the task has finished (successfully or not).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    /// Wait for the task's result.
    pub async fn join(self) -> Result<T, TaskError> {
        match self.result.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TaskError::Failed(e)),
            Err(_) => Err(TaskError::Cancelled),
        }
    }
}

/// Handle to a `call_later` callback.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    abort: AbortHandle,
    // Set when the callback starts or the timer is cancelled.
    done: Rc<Cell<bool>>,
}

impl TimerHandle {
    /// Cancel the callback. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.done.set(true);
        self.abort.abort();
        true
    }

    /// Whether the callback has neither fired nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.done.get() && !self.abort.is_finished()
    }
}

/// Outcome of [`Scheduler::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that were still pending and got cancelled.
    pub cancelled: usize,
    /// Pending tasks that failed (other than by cancellation) while being
    /// awaited. Each one is also recorded as a fault.
    pub failed: usize,
    /// Teardown hooks that ran.
    pub teardown_hooks_run: usize,
}

/// Cooperative scheduler over a current-thread runtime and a local task set.
pub struct Scheduler {
    rt: RefCell<Option<Runtime>>,
    local: LocalSet,
    tasks: RefCell<JoinSet<()>>,
    teardown: RefCell<Vec<Box<dyn FnOnce()>>>,
    faults: RefCell<Vec<anyhow::Error>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .field("faults", &self.faults.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Build the runtime.
    pub fn new() -> Result<Rc<Self>> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build scheduler runtime")?;
        Ok(Rc::new(Self {
            rt: RefCell::new(Some(rt)),
            local: LocalSet::new(),
            tasks: RefCell::new(JoinSet::new()),
            teardown: RefCell::new(Vec::new()),
            faults: RefCell::new(Vec::new()),
        }))
    }

    /// Number of tasks (timers included) not yet reaped.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Whether [`Scheduler::shutdown`] already ran.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.rt.borrow().is_none()
    }

    fn spawn_raw(&self, fut: impl Future<Output = ()> + 'static) -> AbortHandle {
        self.tasks.borrow_mut().spawn_local_on(fut, &self.local)
    }

    /// Run `f` after `delay`, on a later turn.
    pub fn call_later(&self, delay: Duration, f: impl FnOnce() + 'static) -> TimerHandle {
        let done = Rc::new(Cell::new(false));
        let done_in = Rc::clone(&done);
        let abort = self.spawn_raw(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            done_in.set(true);
            f();
        });
        TimerHandle { abort, done }
    }

    /// Spawn a future. Its error surfaces to whoever awaits the [`Task`].
    pub fn spawn<T: 'static>(&self, fut: impl Future<Output = Result<T>> + 'static) -> Task<T> {
        let (tx, rx) = oneshot::channel();
        let abort = self.spawn_raw(async move {
            let result = fut.await;
            if let Err(Err(e)) = tx.send(result) {
                log::error!("Detached task failed: {e:#}");
            }
        });
        Task { result: rx, abort }
    }

    /// Register a hook to run once during shutdown, after tasks are gone.
    pub fn on_teardown(&self, hook: impl FnOnce() + 'static) {
        self.teardown.borrow_mut().push(Box::new(hook));
    }

    /// Record a top-level fault. The shell stops at the end of the turn.
    pub fn report_fault(&self, error: anyhow::Error) {
        log::error!("Fault: {error:#}");
        self.faults.borrow_mut().push(error);
    }

    /// Take the faults recorded since the last call.
    pub fn take_faults(&self) -> Vec<anyhow::Error> {
        std::mem::take(&mut *self.faults.borrow_mut())
    }

    /// Let ready tasks run for at most `budget`.
    pub fn turn(&self, budget: Duration) -> Result<()> {
        let rt = self.rt.borrow();
        let rt = rt.as_ref().ok_or_else(|| anyhow!("Scheduler is shut down"))?;
        rt.block_on(self.local.run_until(async move {
            // Yield once so the local set gets a tick even with a zero budget.
            tokio::task::yield_now().await;
            if !budget.is_zero() {
                tokio::time::sleep(budget).await;
            }
        }));
        self.reap();
        Ok(())
    }

    fn reap(&self) {
        loop {
            let next = self.tasks.borrow_mut().try_join_next();
            let Some(result) = next else {
                break;
            };
            if let Err(e) = result {
                if e.is_panic() {
                    self.report_fault(anyhow!("Task panicked: {e}"));
                }
            }
        }
    }

    /// Cancel and await every pending task, run teardown hooks, then shut the
    /// runtime down. Returns `None` if shutdown already ran.
    pub fn shutdown(&self) -> Option<ShutdownReport> {
        let rt = self.rt.borrow_mut().take()?;

        let mut tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        let pending = tasks.len();
        if pending > 0 {
            log::info!("Cancelling {pending} pending task(s)");
        }
        tasks.abort_all();

        let (cancelled, errors) = rt.block_on(self.local.run_until(async move {
            let mut cancelled = 0;
            let mut errors = Vec::new();
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(()) => {}
                    Err(e) if e.is_cancelled() => cancelled += 1,
                    Err(e) => errors.push(anyhow!("Task failed during shutdown: {e}")),
                }
            }
            (cancelled, errors)
        }));
        let failed = errors.len();
        for e in errors {
            self.report_fault(e);
        }

        let hooks = std::mem::take(&mut *self.teardown.borrow_mut());
        let teardown_hooks_run = hooks.len();
        for hook in hooks {
            hook();
        }

        rt.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

        Some(ShutdownReport {
            cancelled,
            failed,
            teardown_hooks_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_later_fires_on_turn() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let hits = Rc::new(Cell::new(0));
        let hits_in = Rc::clone(&hits);
        let handle = sched.call_later(Duration::ZERO, move || hits_in.set(hits_in.get() + 1));

        assert!(handle.is_pending());
        assert_eq!(hits.get(), 0);
        sched.turn(Duration::ZERO).expect("Should turn");
        assert_eq!(hits.get(), 1);
        assert!(!handle.is_pending());
        assert!(!handle.cancel());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let hit = Rc::new(Cell::new(false));
        let hit_in = Rc::clone(&hit);
        let handle = sched.call_later(Duration::ZERO, move || hit_in.set(true));

        assert!(handle.cancel());
        sched.turn(Duration::from_millis(5)).expect("Should turn");
        assert!(!hit.get());
    }

    #[test]
    fn test_delayed_timer_waits() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let hit = Rc::new(Cell::new(false));
        let hit_in = Rc::clone(&hit);
        sched.call_later(Duration::from_secs(3600), move || hit_in.set(true));

        sched.turn(Duration::from_millis(5)).expect("Should turn");
        assert!(!hit.get());
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn test_task_error_reaches_awaiter() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let failing: Task<()> = sched.spawn(async { Err(anyhow!("boom")) });
        let outcome = Rc::new(RefCell::new(None));
        let outcome_in = Rc::clone(&outcome);
        let _waiter = sched.spawn(async move {
            *outcome_in.borrow_mut() = Some(failing.join().await);
            Ok(())
        });

        sched.turn(Duration::ZERO).expect("Should turn");
        sched.turn(Duration::ZERO).expect("Should turn");
        let outcome = outcome.borrow_mut().take().expect("Should have joined");
        assert!(matches!(outcome, Err(TaskError::Failed(e)) if e.to_string() == "boom"));
    }

    #[test]
    fn test_shutdown_cancels_pending_once() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let hooks = Rc::new(Cell::new(0));
        for _ in 0..2 {
            let _task: Task<()> = sched.spawn(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            });
        }
        let hooks_in = Rc::clone(&hooks);
        sched.on_teardown(move || hooks_in.set(hooks_in.get() + 1));
        sched.turn(Duration::ZERO).expect("Should turn");

        let report = sched.shutdown().expect("Should shut down");
        assert_eq!(report.cancelled, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.teardown_hooks_run, 1);
        assert_eq!(hooks.get(), 1);
        assert!(sched.is_closed());

        assert!(sched.shutdown().is_none());
        assert_eq!(hooks.get(), 1);
        assert!(sched.turn(Duration::ZERO).is_err());
    }

    #[test]
    fn test_panicking_task_becomes_fault() {
        let sched = Scheduler::new().expect("Should build scheduler");
        sched.call_later(Duration::ZERO, || panic!("plugin bug"));
        sched.turn(Duration::ZERO).expect("Should turn");
        sched.turn(Duration::ZERO).expect("Should turn");
        assert_eq!(sched.take_faults().len(), 1);
        assert!(sched.take_faults().is_empty());
    }

    #[test]
    fn test_shutdown_failure_is_reported_as_fault() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let _task: Task<()> = sched.spawn(async {
            let _cleanup = scopeguard::guard((), |()| panic!("cleanup bug"));
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        sched.turn(Duration::ZERO).expect("Should turn");

        let report = sched.shutdown().expect("Should shut down");
        assert_eq!(report.cancelled, 0);
        assert_eq!(report.failed, 1);
        let faults = sched.take_faults();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].to_string().contains("Task failed during shutdown"));
    }
}
