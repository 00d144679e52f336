//! End-to-end shell scenarios driven through a scripted host.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::Event;
use kiosk_shell::plugin::BuiltinFactory;
use kiosk_shell::process::ProcessRunner;
use kiosk_shell::runtime::Task;
use kiosk_shell::tui::{Host, RenderNode};
use kiosk_shell::{Config, Control, LoadPolicy, Plugin, Shell, StopReason};

/// Host with no input that raises `interrupt` after `polls_left` polls.
struct ScriptedHost {
    polls_left: usize,
    interrupt: Arc<AtomicBool>,
    paints: usize,
}

impl ScriptedHost {
    fn new(polls: usize) -> Self {
        Self {
            polls_left: polls,
            interrupt: Arc::new(AtomicBool::new(false)),
            paints: 0,
        }
    }
}

impl Host for ScriptedHost {
    fn poll_event(&mut self, _timeout: Duration) -> Result<Option<Event>> {
        if self.polls_left == 0 {
            self.interrupt.store(true, Ordering::SeqCst);
        } else {
            self.polls_left -= 1;
        }
        Ok(None)
    }

    fn paint(&mut self, _tree: &RenderNode) -> Result<()> {
        self.paints += 1;
        Ok(())
    }
}

struct NoProcesses;

impl ProcessRunner for NoProcesses {
    fn run(&self, args: &[String], _sudo: bool) -> Result<()> {
        anyhow::bail!("Unexpected command {args:?}")
    }
}

fn config(data_dir: &Path, policy: LoadPolicy) -> Config {
    let plugins = data_dir.join("plugins");
    fs::create_dir_all(&plugins).expect("Should create plugin dir");
    let mut config = Config::with_data_dir(data_dir.to_path_buf());
    config.plugin_dirs = vec![plugins];
    config.load_policy = policy;
    config
}

fn write_unit(data_dir: &Path, name: &str, source: &str) {
    fs::write(data_dir.join("plugins").join(format!("{name}.lua")), source)
        .expect("Should write unit");
}

struct Quiet;

impl Plugin for Quiet {}

fn quiet(_: Control) -> Box<dyn Plugin> {
    Box::new(Quiet)
}

#[test]
fn test_redraw_burst_paints_once() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = config(dir.path(), LoadPolicy::Isolate);
    write_unit(
        dir.path(),
        "burst",
        r#"
        plugin.register {
            on_main = function(self)
                for _ = 1, 5 do ctl.redraw() end
                ctl.stop()
            end,
        }
        "#,
    );

    let mut shell =
        Shell::with_builtins(config, Rc::new(NoProcesses), &[]).expect("Should build shell");
    let mut host = ScriptedHost::new(100);
    let interrupt = Arc::clone(&host.interrupt);
    let summary = shell.run(&mut host, &interrupt).expect("Should run");

    assert_eq!(summary.reason, StopReason::Requested);
    assert_eq!(shell.core().screen().paint_requests(), 1);
    assert!(host.paints >= 1);
}

#[test]
fn test_isolate_skips_broken_unit() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = config(dir.path(), LoadPolicy::Isolate);
    write_unit(dir.path(), "good", "plugin.register{}");
    write_unit(dir.path(), "silent", "local nothing = true");

    let shell = Shell::with_builtins(
        config,
        Rc::new(NoProcesses),
        &[("quiet", quiet as BuiltinFactory)],
    )
    .expect("Should build shell");

    assert_eq!(shell.plugin_names(), vec!["internal:quiet", "good"]);
    assert_eq!(shell.failures(), ["silent".to_string()]);
}

#[test]
fn test_isolate_keeps_loading_after_failure() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = config(dir.path(), LoadPolicy::Isolate);
    write_unit(dir.path(), "a", "plugin.register{}");
    write_unit(dir.path(), "b", "local nothing = true");
    write_unit(dir.path(), "c", "plugin.register{}");

    let shell = Shell::with_builtins(config, Rc::new(NoProcesses), &[])
        .expect("A failing unit should not abort the batch");

    assert_eq!(shell.plugin_names(), vec!["a", "c"]);
    assert_eq!(shell.failures(), ["b".to_string()]);
}

#[test]
fn test_fail_fast_aborts_startup() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = config(dir.path(), LoadPolicy::FailFast);
    write_unit(dir.path(), "silent", "local nothing = true");

    let err = Shell::with_builtins(config, Rc::new(NoProcesses), &[])
        .expect_err("Unregistered unit should abort the batch");
    let message = format!("{err:#}");
    assert!(message.contains("silent"));
    assert!(message.contains("never called plugin.register"));
}

/// Spawns two tasks that never finish and registers one teardown hook.
struct Lingering {
    ctl: Control,
    tasks: Vec<Task<()>>,
}

thread_local! {
    static TORN_DOWN: Rc<Cell<bool>> = Rc::new(Cell::new(false));
}

impl Plugin for Lingering {
    fn on_load(&mut self) -> Result<()> {
        for _ in 0..2 {
            self.tasks.push(self.ctl.spawn(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }));
        }
        Ok(())
    }

    fn on_main(&mut self) -> Result<()> {
        self.ctl.loop_stop();
        Ok(())
    }
}

fn lingering(ctl: Control) -> Box<dyn Plugin> {
    Box::new(Lingering {
        ctl,
        tasks: Vec::new(),
    })
}

#[test]
fn test_shutdown_cancels_pending_tasks() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = config(dir.path(), LoadPolicy::Isolate);
    let mut shell = Shell::with_builtins(
        config,
        Rc::new(NoProcesses),
        &[("lingering", lingering as BuiltinFactory)],
    )
    .expect("Should build shell");
    let flag = TORN_DOWN.with(Rc::clone);
    shell
        .core()
        .scheduler()
        .on_teardown(move || flag.set(true));

    let mut host = ScriptedHost::new(100);
    let interrupt = Arc::clone(&host.interrupt);
    let summary = shell.run(&mut host, &interrupt).expect("Should run");

    assert_eq!(summary.reason, StopReason::Requested);
    let report = summary.shutdown.expect("First shutdown should report");
    assert_eq!(report.cancelled, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.teardown_hooks_run, 1);
    assert!(TORN_DOWN.with(|f| f.get()));
    assert!(shell.shutdown().is_none());
}

#[test]
fn test_interrupt_unloads_plugins() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = config(dir.path(), LoadPolicy::Isolate);
    let marker = dir.path().join("unloaded");
    write_unit(
        dir.path(),
        "marker",
        &format!(
            r#"
            plugin.register {{
                on_unload = function(self)
                    local f = io.open({path:?}, "w")
                    f:write("bye")
                    f:close()
                end,
            }}
            "#,
            path = marker.display().to_string()
        ),
    );

    let mut shell =
        Shell::with_builtins(config, Rc::new(NoProcesses), &[]).expect("Should build shell");
    let mut host = ScriptedHost::new(3);
    let interrupt = Arc::clone(&host.interrupt);
    let summary = shell.run(&mut host, &interrupt).expect("Should run");

    assert_eq!(summary.reason, StopReason::Interrupted);
    assert_eq!(
        fs::read_to_string(&marker).expect("on_unload should have run"),
        "bye"
    );
}
