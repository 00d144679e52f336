//! The shell: plugin registry, the terminal loop and the shutdown protocol.
//!
//! # Loop
//!
//! ```text
//! ┌─► poll input (10 ms) ─► Events `raw` + focused window
//! │   scheduler turn (timers, tasks, device monitors)
//! │   deferred work: on_main, UI reset
//! │   stop? (loop_stop, fault, interrupt) ──► shutdown
//! └── paint if the screen is dirty
//! ```
//!
//! # Shutdown
//!
//! `on_ui_destroy` (all), `on_unload` (all), then the scheduler cancels and
//! awaits every pending task, runs its teardown hooks and stops its runtime.
//! Hook errors are logged and never skip the scheduler steps.

// Rust guideline compliant 2026-02

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};

use crate::config::Config;
use crate::constants::{INPUT_POLL_TIMEOUT, SCHEDULER_TURN_BUDGET};
use crate::device::{spawn_monitors, DeviceEnumerator, DeviceKey};
use crate::plugin::builtin::builtins;
use crate::plugin::{load_plugins, BuiltinFactory, Core, Events, Plugin, PluginRecord};
use crate::process::ProcessRunner;
use crate::runtime::{Scheduler, ShutdownReport, Task};
use crate::tui::Host;
use crate::wm::WindowManager;

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A plugin called `loop_stop`.
    Requested,
    /// Top-level faults were reported; holds how many.
    Fault(usize),
    /// A signal or Ctrl-C.
    Interrupted,
}

/// Outcome of [`Shell::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Why the loop ended.
    pub reason: StopReason,
    /// What the scheduler shutdown did. `None` if it had already run.
    pub shutdown: Option<ShutdownReport>,
}

/// The kiosk shell.
pub struct Shell {
    core: Rc<Core>,
    events: Events,
    plugins: Vec<PluginRecord>,
    failures: Vec<String>,
    monitors: Vec<Task<()>>,
    main_due: Rc<Cell<bool>>,
    started: bool,
    shut_down: bool,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("plugins", &self.plugin_names())
            .field("failures", &self.failures)
            .field("monitors", &self.monitors.len())
            .field("started", &self.started)
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

impl Shell {
    /// Build the shell with the built-in plugins plus the user units of
    /// `config.plugin_dirs`.
    ///
    /// # Errors
    ///
    /// Fails if the scheduler cannot start, or a unit fails to load under
    /// [`LoadPolicy::FailFast`](crate::config::LoadPolicy::FailFast).
    pub fn new(config: Config, runner: Rc<dyn ProcessRunner>) -> Result<Self> {
        Self::with_builtins(config, runner, &builtins())
    }

    /// [`new`](Self::new) with an explicit built-in list.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_builtins(
        config: Config,
        runner: Rc<dyn ProcessRunner>,
        builtins: &[(&str, BuiltinFactory)],
    ) -> Result<Self> {
        let scheduler = Scheduler::new()?;
        let dirs = config.plugin_dirs.clone();
        let policy = config.load_policy;
        let core = Core::new(WindowManager::new(), scheduler, runner, config);
        let events = Events::new();

        let report = load_plugins(&core, &events, builtins, &dirs, policy)?;
        let failures = report.failures.iter().map(|(name, _)| name.clone()).collect();

        Ok(Self {
            core,
            events,
            plugins: report.plugins,
            failures,
            monitors: Vec::new(),
            main_due: Rc::new(Cell::new(false)),
            started: false,
            shut_down: false,
        })
    }

    /// Shared shell state.
    #[must_use]
    pub fn core(&self) -> &Rc<Core> {
        &self.core
    }

    /// The Events surface.
    #[must_use]
    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Loaded plugin names, in load order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name.clone()).collect()
    }

    /// Units that failed to load.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Forward the keys of every source `enumerator` opens to the Events
    /// `key` list. Returns how many sources are monitored.
    ///
    /// # Errors
    ///
    /// Returns an error if the enumerator fails.
    pub fn attach_devices(&mut self, enumerator: &dyn DeviceEnumerator) -> Result<usize> {
        let sources = enumerator
            .input_sources()
            .context("Failed to enumerate input devices")?;
        let events = self.events.clone();
        let on_key: Rc<dyn Fn(&DeviceKey)> = Rc::new(move |key| {
            events.fire_key(key);
        });
        let tasks = spawn_monitors(self.core.scheduler(), sources, &on_key);
        let count = tasks.len();
        self.monitors.extend(tasks);
        Ok(count)
    }

    /// Run a lifecycle hook on every plugin, collecting errors.
    fn phase(
        &mut self,
        hook: &str,
        mut f: impl FnMut(&mut dyn Plugin) -> Result<()>,
    ) -> Vec<anyhow::Error> {
        let mut errors = Vec::new();
        for record in &mut self.plugins {
            if let Err(e) = f(record.plugin.as_mut()) {
                errors.push(e.context(format!("Plugin '{}' {hook} failed", record.name)));
            }
        }
        errors
    }

    fn log_errors(errors: Vec<anyhow::Error>) {
        for e in errors {
            log::error!("{e:#}");
        }
    }

    fn report_faults(&self, errors: Vec<anyhow::Error>) {
        for e in errors {
            self.core.scheduler().report_fault(e);
        }
    }

    /// Startup: `on_load` and `on_ui_create` for every plugin, then
    /// `on_main` is scheduled for the first turn. Errors are logged per
    /// plugin. Runs once.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        Self::log_errors(self.phase("on_load", |p| p.on_load()));
        log::info!(
            "Loaded {} plugin(s): {:?}",
            self.plugins.len(),
            self.plugin_names()
        );
        Self::log_errors(self.phase("on_ui_create", |p| p.on_ui_create()));
        self.core.set_started(true);

        let due = Rc::clone(&self.main_due);
        self.core
            .scheduler()
            .call_later(Duration::ZERO, move || due.set(true));
    }

    fn reset_ui(&mut self) {
        log::info!("Resetting UI");
        let errors = self.phase("on_ui_destroy", |p| p.on_ui_destroy());
        self.report_faults(errors);
        self.core.rebuild_ui();
        let errors = self.phase("on_ui_create", |p| p.on_ui_create());
        self.report_faults(errors);
    }

    /// Route one terminal event. Returns `true` for Ctrl-C.
    fn dispatch(&self, event: &Event) -> bool {
        self.events.fire_raw(event);
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    return true;
                }
                self.core.wm().handle_key(key);
            }
            Event::Resize(..) => self.core.screen().invalidate(),
            _ => {}
        }
        false
    }

    fn run_loop<H: Host>(&mut self, host: &mut H, interrupt: &AtomicBool) -> Result<StopReason> {
        let scheduler = Rc::clone(self.core.scheduler());
        loop {
            if interrupt.load(Ordering::SeqCst) {
                log::info!("Interrupted");
                return Ok(StopReason::Interrupted);
            }

            if let Some(event) = host.poll_event(INPUT_POLL_TIMEOUT)? {
                if self.dispatch(&event) {
                    log::info!("Interrupted from the keyboard");
                    return Ok(StopReason::Interrupted);
                }
            }

            scheduler.turn(SCHEDULER_TURN_BUDGET)?;

            if self.main_due.replace(false) {
                let errors = self.phase("on_main", |p| p.on_main());
                self.report_faults(errors);
            }
            if self.core.take_reset_request() {
                self.reset_ui();
            }

            let faults = scheduler.take_faults();
            if !faults.is_empty() {
                log::error!("Stopping after {} fault(s)", faults.len());
                return Ok(StopReason::Fault(faults.len()));
            }
            if self.core.stop_requested() {
                return Ok(StopReason::Requested);
            }

            if let Some(tree) = self.core.screen().take_paint() {
                host.paint(&tree)?;
            }
        }
    }

    /// Start (if needed), run the loop until it stops, then shut down.
    ///
    /// # Errors
    ///
    /// Returns host or scheduler errors. Shutdown runs either way.
    pub fn run<H: Host>(&mut self, host: &mut H, interrupt: &AtomicBool) -> Result<RunSummary> {
        self.start();
        log::info!("Shell loop starting");
        let reason = self.run_loop(host, interrupt);
        let shutdown = self.shutdown();
        Ok(RunSummary {
            reason: reason?,
            shutdown,
        })
    }

    /// The shutdown protocol. Returns `None` if it already ran.
    pub fn shutdown(&mut self) -> Option<ShutdownReport> {
        if self.shut_down {
            return None;
        }
        self.shut_down = true;

        log::info!("Unloading plugins");
        Self::log_errors(self.phase("on_ui_destroy", |p| p.on_ui_destroy()));
        Self::log_errors(self.phase("on_unload", |p| p.on_unload()));

        log::info!("Stopping");
        self.core.set_started(false);
        self.monitors.clear();
        let report = self.core.scheduler().shutdown();
        log::info!("End");
        report
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shutdown();
        }
    }
}
