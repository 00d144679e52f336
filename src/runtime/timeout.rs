//! Reschedulable timeout scope.
//!
//! Like `tokio::time::timeout`, except the deadline can be moved while the
//! guarded future runs. Device learning pushes the deadline forward on every
//! scancode so the window only closes after a stretch of inactivity.

// Rust guideline compliant 2026-02

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;

/// The guarded future did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deadline elapsed")
    }
}

impl std::error::Error for TimedOut {}

/// Shared, movable deadline. Clones move together.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Rc<Cell<Instant>>,
}

impl Deadline {
    /// Deadline `after` from now.
    #[must_use]
    pub fn after(after: Duration) -> Self {
        Self {
            at: Rc::new(Cell::new(Instant::now() + after)),
        }
    }

    /// Move the deadline to `after` from now.
    pub fn reschedule(&self, after: Duration) {
        self.at.set(Instant::now() + after);
    }

    /// The current deadline.
    #[must_use]
    pub fn when(&self) -> Instant {
        self.at.get()
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at.get()
    }
}

/// Run `fut` until it completes or `deadline` passes, whichever is first.
///
/// The deadline is re-read every time the timer fires, so moving it later
/// extends the scope and moving it earlier takes effect at the next check.
pub async fn within<F: Future>(deadline: &Deadline, fut: F) -> Result<F::Output, TimedOut> {
    tokio::pin!(fut);
    loop {
        let at = deadline.when();
        tokio::select! {
            out = &mut fut => return Ok(out),
            () = tokio::time::sleep_until(at) => {
                if deadline.expired() {
                    return Err(TimedOut);
                }
            }
        }
    }
}
