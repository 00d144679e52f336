//! IR code learning.
//!
//! [`Learner`] is the state machine; [`learn_code`] drives it from a
//! [`ScancodeSource`] inside a reschedulable timeout scope.
//!
//! ```text
//! Idle ─arm─► Armed ─first code (ignored)─► Debouncing ─3 identical─► Confirmed
//!               │                               │
//!               └──────────── no code for the inactivity window ──► TimedOut
//! ```

// Rust guideline compliant 2026-02

use std::time::Duration;

use anyhow::Result;

use super::{Scancode, ScancodeSource};
use crate::constants::{LEARN_CONFIRM, LEARN_DEBOUNCE_NS, LEARN_KEEP};
use crate::keymap::ScanKey;
use crate::runtime::{within, Deadline};

/// Where a [`Learner`] is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnState {
    /// Not armed.
    Idle,
    /// Armed, no scancode seen yet.
    Armed,
    /// Collecting codes.
    Debouncing,
    /// The same code arrived enough times in a row.
    Confirmed(ScanKey),
    /// The inactivity window elapsed first.
    TimedOut,
}

/// What feeding one scancode did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnStep {
    /// Dropped: first code, bounce, or the learner is not collecting.
    Ignored,
    /// Recorded. Holds the most recent codes, oldest first.
    Accepted(Vec<ScanKey>),
    /// Recorded and confirmed.
    Confirmed(ScanKey),
}

/// Learning state machine.
///
/// The first scancode after arming is ignored (it is usually a repeat of
/// whatever was pressed before). Later codes count only when more than
/// 250 ms apart, using the kernel timestamps.
#[derive(Debug, Clone)]
pub struct Learner {
    state: LearnState,
    inactivity: Duration,
    last_timestamp: u64,
    codes: Vec<ScanKey>,
}

impl Learner {
    /// Learner whose window closes after `inactivity` without a code.
    #[must_use]
    pub fn new(inactivity: Duration) -> Self {
        Self {
            state: LearnState::Idle,
            inactivity,
            last_timestamp: 0,
            codes: Vec::new(),
        }
    }

    /// Start collecting. Returns the initial window, one and a half times
    /// the inactivity window to leave time to pick up the remote.
    pub fn arm(&mut self) -> Duration {
        self.state = LearnState::Armed;
        self.last_timestamp = 0;
        self.codes.clear();
        self.inactivity * 3 / 2
    }

    /// Feed one scancode.
    pub fn feed(&mut self, code: &Scancode) -> LearnStep {
        match self.state {
            LearnState::Armed => {
                self.last_timestamp = code.timestamp_ns;
                self.state = LearnState::Debouncing;
                LearnStep::Ignored
            }
            LearnState::Debouncing => {
                if code.timestamp_ns.saturating_sub(self.last_timestamp) <= LEARN_DEBOUNCE_NS {
                    return LearnStep::Ignored;
                }
                self.last_timestamp = code.timestamp_ns;
                self.codes.push(code.scan_key());
                if self.codes.len() > LEARN_KEEP {
                    self.codes.remove(0);
                }
                match self.confirmed() {
                    Some(key) => {
                        self.state = LearnState::Confirmed(key.clone());
                        LearnStep::Confirmed(key)
                    }
                    None => LearnStep::Accepted(self.codes.clone()),
                }
            }
            LearnState::Idle | LearnState::Confirmed(_) | LearnState::TimedOut => {
                LearnStep::Ignored
            }
        }
    }

    fn confirmed(&self) -> Option<ScanKey> {
        let last = self.codes.last()?;
        if self.codes.len() < LEARN_CONFIRM {
            return None;
        }
        self.codes
            .iter()
            .rev()
            .take(LEARN_CONFIRM)
            .all(|c| c == last)
            .then(|| last.clone())
    }

    /// The window elapsed. No effect once confirmed.
    pub fn time_out(&mut self) {
        if !matches!(self.state, LearnState::Confirmed(_)) {
            self.state = LearnState::TimedOut;
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &LearnState {
        &self.state
    }

    /// Most recent accepted codes, oldest first.
    #[must_use]
    pub fn codes(&self) -> &[ScanKey] {
        &self.codes
    }
}

/// Learn one code from `source`.
///
/// `on_progress` sees the accepted codes after each one. Returns the
/// confirmed code, or `None` when the window elapses or the source closes.
/// The source is closed on every exit path, cancellation of the calling
/// task included.
pub async fn learn_code(
    source: Box<dyn ScancodeSource>,
    inactivity: Duration,
    on_progress: impl Fn(&[ScanKey]),
) -> Result<Option<ScanKey>> {
    let mut source = scopeguard::guard(source, |mut source| source.close());
    let mut learner = Learner::new(inactivity);
    let deadline = Deadline::after(learner.arm());

    let outcome = within(&deadline, async {
        while let Some(code) = source.next_scancode().await? {
            deadline.reschedule(inactivity);
            match learner.feed(&code) {
                LearnStep::Ignored => {}
                LearnStep::Accepted(codes) => on_progress(&codes),
                LearnStep::Confirmed(key) => {
                    on_progress(learner.codes());
                    return Ok(Some(key));
                }
            }
        }
        Ok::<_, anyhow::Error>(None)
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_elapsed) => {
            learner.time_out();
            log::debug!("Learning timed out after {} code(s)", learner.codes().len());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use async_trait::async_trait;

    use super::*;

    const MS: u64 = 1_000_000;

    fn nec(timestamp_ms: u64, scancode: u64) -> Scancode {
        Scancode {
            timestamp_ns: timestamp_ms * MS,
            flags: 0,
            protocol: 9,
            keycode: 0,
            scancode,
        }
    }

    struct ScriptedSource {
        codes: VecDeque<Scancode>,
        closed: Rc<Cell<bool>>,
    }

    #[async_trait(?Send)]
    impl ScancodeSource for ScriptedSource {
        async fn next_scancode(&mut self) -> Result<Option<Scancode>> {
            match self.codes.pop_front() {
                Some(code) => Ok(Some(code)),
                None => std::future::pending().await,
            }
        }

        fn close(&mut self) {
            self.closed.set(true);
        }
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Should build runtime")
            .block_on(fut)
    }

    #[test]
    fn test_first_code_ignored_and_debounced() {
        let mut learner = Learner::new(Duration::from_secs(5));
        assert_eq!(learner.state(), &LearnState::Idle);
        assert_eq!(learner.feed(&nec(0, 1)), LearnStep::Ignored);

        assert_eq!(learner.arm(), Duration::from_millis(7500));
        assert_eq!(learner.feed(&nec(1_000, 1)), LearnStep::Ignored);
        assert_eq!(learner.state(), &LearnState::Debouncing);

        // Within 250 ms of the last accepted timestamp.
        assert_eq!(learner.feed(&nec(1_250, 1)), LearnStep::Ignored);
        assert_eq!(
            learner.feed(&nec(1_300, 1)),
            LearnStep::Accepted(vec![ScanKey::new("nec", 1)])
        );
    }

    #[test]
    fn test_three_identical_confirm() {
        let mut learner = Learner::new(Duration::from_secs(5));
        learner.arm();
        learner.feed(&nec(0, 7));
        assert!(matches!(learner.feed(&nec(300, 7)), LearnStep::Accepted(_)));
        assert!(matches!(learner.feed(&nec(600, 8)), LearnStep::Accepted(_)));
        assert!(matches!(learner.feed(&nec(900, 7)), LearnStep::Accepted(_)));
        assert!(matches!(learner.feed(&nec(1_200, 7)), LearnStep::Accepted(_)));
        assert_eq!(
            learner.feed(&nec(1_500, 7)),
            LearnStep::Confirmed(ScanKey::new("nec", 7))
        );
        assert_eq!(
            learner.state(),
            &LearnState::Confirmed(ScanKey::new("nec", 7))
        );
        assert_eq!(learner.codes().len(), 5);

        learner.time_out();
        assert!(matches!(learner.state(), LearnState::Confirmed(_)));
        assert_eq!(learner.feed(&nec(2_000, 7)), LearnStep::Ignored);
    }

    #[test]
    fn test_keeps_last_five() {
        let mut learner = Learner::new(Duration::from_secs(5));
        learner.arm();
        learner.feed(&nec(0, 0));
        for i in 1..=7 {
            learner.feed(&nec(i * 300, i));
        }
        let kept: Vec<u64> = learner.codes().iter().map(|c| c.scancode).collect();
        assert_eq!(kept, vec![3, 4, 5, 6, 7]);

        learner.time_out();
        assert_eq!(learner.state(), &LearnState::TimedOut);
    }

    #[test]
    fn test_learn_code_confirms_and_closes() {
        let closed = Rc::new(Cell::new(false));
        let source = ScriptedSource {
            codes: [nec(0, 5), nec(300, 5), nec(600, 5), nec(900, 5)].into(),
            closed: Rc::clone(&closed),
        };
        let progress = RefCell::new(Vec::new());
        let learned = block_on(learn_code(
            Box::new(source),
            Duration::from_secs(5),
            |codes| progress.borrow_mut().push(codes.len()),
        ))
        .expect("Should learn");

        assert_eq!(learned, Some(ScanKey::new("nec", 5)));
        assert_eq!(*progress.borrow(), vec![1, 2, 3]);
        assert!(closed.get());
    }

    #[test]
    fn test_learn_code_times_out_and_closes() {
        let closed = Rc::new(Cell::new(false));
        let source = ScriptedSource {
            codes: [nec(0, 5), nec(300, 5)].into(),
            closed: Rc::clone(&closed),
        };
        let learned = block_on(learn_code(
            Box::new(source),
            Duration::from_millis(40),
            |_| {},
        ))
        .expect("Timeout is not an error");

        assert_eq!(learned, None);
        assert!(closed.get());
    }
}
