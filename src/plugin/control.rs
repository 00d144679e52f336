//! The Control surface handed to every plugin.
//!
//! A [`Control`] is a per-plugin handle onto the shell core: compositor,
//! menu, scheduler, process runner and configuration. Every plugin gets its
//! own instance, tagged with the plugin name for logging.
//!
//! # Deferred operations
//!
//! `loop_stop`, `ui_reset` and `redraw` never act synchronously. They are
//! scheduled at delay zero and take effect on the next scheduler turn:
//!
//! ```text
//! redraw() ×N ──► one zero-delay timer ──► Screen::request_paint() ×1
//! loop_stop() ──► zero-delay timer ──► stop flag ──► shell shutdown
//! ui_reset()  ──► zero-delay timer ──► reset flag ──► on_ui_destroy / rebuild / on_ui_create
//! ```

// Rust guideline compliant 2026-02

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::constants::ROOT_MENU_KEY;
use crate::process::ProcessRunner;
use crate::runtime::{Scheduler, Task, TimerHandle};
use crate::tui::{Menu, MenuButton, MenuFrame, MessageBox, Screen};
use crate::wm::{
    Content, StyleChoice, WindowFlags, WindowId, WindowManager, WindowPatch, WindowSpec,
};

/// The UI skeleton rebuilt on every UI reset: the menu, the frame around it
/// and the main window showing the frame.
#[derive(Debug, Clone)]
pub struct UiSkeleton {
    /// The compositor.
    pub wm: WindowManager,
    /// The breadcrumb menu.
    pub menu: Menu,
    /// Header/body/footer frame around the menu.
    pub frame: Rc<MenuFrame>,
    /// Window showing the frame, as first opened.
    pub main_window: WindowId,
}

impl UiSkeleton {
    fn build(wm: &WindowManager) -> Self {
        let menu = Menu::new(ROOT_MENU_KEY);
        let weak = wm.downgrade();
        menu.notifier().set(move || {
            if let Some(wm) = weak.upgrade() {
                wm.update();
            }
        });
        let frame = Rc::new(MenuFrame::new(menu.clone()));
        let main_window = wm.make_window(
            wm.root(),
            WindowSpec::new(Content::View(Rc::clone(&frame) as _))
                .flags(WindowFlags::BASIC)
                .style(StyleChoice::None),
            true,
        );
        Self {
            wm: wm.clone(),
            menu,
            frame,
            main_window,
        }
    }
}

/// State shared by every [`Control`] of one shell.
pub struct Core {
    wm: WindowManager,
    skeleton: RefCell<UiSkeleton>,
    scheduler: Rc<Scheduler>,
    screen: Rc<Screen>,
    runner: Rc<dyn ProcessRunner>,
    config: Config,
    started: Cell<bool>,
    redraw: RefCell<Option<TimerHandle>>,
    stop_requested: Cell<bool>,
    reset_requested: Cell<bool>,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("wm", &self.wm)
            .field("started", &self.started.get())
            .field("stop_requested", &self.stop_requested.get())
            .field("reset_requested", &self.reset_requested.get())
            .finish_non_exhaustive()
    }
}

impl Core {
    /// Build the core: the screen becomes the compositor's sink and the UI
    /// skeleton is created.
    pub fn new(
        wm: WindowManager,
        scheduler: Rc<Scheduler>,
        runner: Rc<dyn ProcessRunner>,
        config: Config,
    ) -> Rc<Self> {
        let screen = Rc::new(Screen::new());
        wm.set_sink(Rc::clone(&screen) as _);
        let skeleton = UiSkeleton::build(&wm);
        Rc::new(Self {
            wm,
            skeleton: RefCell::new(skeleton),
            scheduler,
            screen,
            runner,
            config,
            started: Cell::new(false),
            redraw: RefCell::new(None),
            stop_requested: Cell::new(false),
            reset_requested: Cell::new(false),
        })
    }

    /// The compositor.
    #[must_use]
    pub fn wm(&self) -> &WindowManager {
        &self.wm
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    /// The render sink the terminal host paints from.
    #[must_use]
    pub fn screen(&self) -> &Rc<Screen> {
        &self.screen
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mark the loop as running. Before this, redraws are no-ops.
    pub fn set_started(&self, started: bool) {
        self.started.set(started);
    }

    /// Whether the loop is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// Whether a stop was requested (and reached its turn).
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.get()
    }

    /// Take a pending UI reset request.
    pub fn take_reset_request(&self) -> bool {
        self.reset_requested.replace(false)
    }

    /// Destroy every top-level window and build a fresh skeleton.
    ///
    /// Windows cannot veto this: a reset always starts from a bare root.
    pub fn rebuild_ui(&self) {
        for child in self.wm.children(self.wm.root()) {
            self.wm.force_close(child);
        }
        let skeleton = UiSkeleton::build(&self.wm);
        *self.skeleton.borrow_mut() = skeleton;
    }

    /// The current skeleton.
    #[must_use]
    pub fn skeleton(&self) -> UiSkeleton {
        self.skeleton.borrow().clone()
    }
}

fn close_all(wm: &WindowManager) {
    for child in wm.children(wm.root()) {
        wm.close(child);
    }
}

/// Per-plugin capability onto the shell.
///
/// Cheap to clone. Process and device failures are reported as `false`
/// plus a log line, never as errors.
#[derive(Clone)]
pub struct Control {
    core: Rc<Core>,
    plugin: Rc<str>,
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

impl Control {
    /// Control for the plugin named `plugin`.
    #[must_use]
    pub fn new(core: &Rc<Core>, plugin: &str) -> Self {
        Self {
            core: Rc::clone(core),
            plugin: Rc::from(plugin),
        }
    }

    /// Name of the owning plugin.
    #[must_use]
    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.core.config
    }

    // =========================================================================
    // System
    // =========================================================================

    /// Run a command. `sudo` is honored only when the configuration allows
    /// it. Returns whether the command succeeded.
    pub fn sys_exec(&self, args: &[String], sudo: bool) -> bool {
        let sudo = sudo && self.core.config.use_sudo;
        match self.core.runner.run(args, sudo) {
            Ok(()) => true,
            Err(e) => {
                log::error!("[{}] Subprocess exception: {e:#}", self.plugin);
                false
            }
        }
    }

    /// Reboot the machine.
    pub fn sys_reboot(&self) -> bool {
        self.sys_exec(&["reboot".to_string()], true)
    }

    /// Power the machine off.
    pub fn sys_poweroff(&self) -> bool {
        self.sys_exec(&["poweroff".to_string()], true)
    }

    /// Switch the foreground virtual terminal.
    pub fn sys_chvt(&self, vt: u16) -> bool {
        self.sys_exec(&["chvt".to_string(), vt.to_string()], false)
    }

    // =========================================================================
    // Loop
    // =========================================================================

    /// Run `f` after `delay`.
    pub fn call_later(&self, delay: Duration, f: impl FnOnce() + 'static) -> TimerHandle {
        self.core.scheduler.call_later(delay, f)
    }

    /// Spawn a task on the loop.
    pub fn spawn<T: 'static>(&self, fut: impl Future<Output = Result<T>> + 'static) -> Task<T> {
        self.core.scheduler.spawn(fut)
    }

    /// Record a top-level fault; the shell stops after the current turn.
    pub fn report_fault(&self, error: anyhow::Error) {
        self.core
            .scheduler
            .report_fault(error.context(format!("Plugin '{}'", self.plugin)));
    }

    /// Stop the loop and shut down, on the next turn.
    pub fn loop_stop(&self) {
        log::info!("[{}] Stop requested", self.plugin);
        let core = Rc::downgrade(&self.core);
        self.core.scheduler.call_later(Duration::ZERO, move || {
            if let Some(core) = core.upgrade() {
                core.stop_requested.set(true);
            }
        });
    }

    // =========================================================================
    // UI
    // =========================================================================

    /// Schedule one repaint. Requests made while one is pending coalesce;
    /// before the loop starts this does nothing.
    pub fn redraw(&self) {
        let core = &self.core;
        if !core.started.get() {
            return;
        }
        if core.redraw.borrow().as_ref().is_some_and(TimerHandle::is_pending) {
            return;
        }
        let weak: Weak<Core> = Rc::downgrade(core);
        let handle = core.scheduler.call_later(Duration::ZERO, move || {
            if let Some(core) = weak.upgrade() {
                core.redraw.borrow_mut().take();
                core.screen.request_paint();
            }
        });
        *core.redraw.borrow_mut() = Some(handle);
    }

    /// Rebuild the UI on the next turn: `on_ui_destroy` for every plugin,
    /// a fresh skeleton, then `on_ui_create` for every plugin.
    pub fn ui_reset(&self) {
        let core = Rc::downgrade(&self.core);
        self.core.scheduler.call_later(Duration::ZERO, move || {
            if let Some(core) = core.upgrade() {
                core.reset_requested.set(true);
            }
        });
    }

    /// The UI skeleton, for styling plugins.
    #[must_use]
    pub fn internals(&self) -> UiSkeleton {
        self.core.skeleton()
    }

    /// Open a made window as a top-level window.
    pub fn window_open(&self, id: WindowId, active: bool) {
        self.redraw();
        self.core.wm.open(self.core.wm.root(), id, active);
    }

    /// Make and open a top-level window.
    pub fn window_make(&self, spec: WindowSpec, active: bool) -> WindowId {
        self.redraw();
        self.core.wm.make_window(self.core.wm.root(), spec, active)
    }

    /// Close a window.
    pub fn window_close(&self, id: WindowId) -> bool {
        self.redraw();
        self.core.wm.close(id)
    }

    /// Close the newest top-level window.
    pub fn window_close_top(&self) -> bool {
        let wm = &self.core.wm;
        match wm.children(wm.root()).first() {
            Some(&top) => self.window_close(top),
            None => false,
        }
    }

    /// Close every top-level window.
    pub fn window_close_all(&self) {
        self.redraw();
        close_all(&self.core.wm);
    }

    /// Modify a window.
    pub fn window_modify(&self, id: WindowId, patch: WindowPatch) {
        self.redraw();
        self.core.wm.modify(id, patch);
    }

    /// Register or update a menu, appending to and replacing any existing
    /// entry.
    pub fn menu_setup(&self, key: &str, title: Option<&str>, buttons: Vec<MenuButton>) {
        self.menu_setup_with(key, title, buttons, true, true);
    }

    /// [`menu_setup`](Self::menu_setup) with explicit merge flags.
    pub fn menu_setup_with(
        &self,
        key: &str,
        title: Option<&str>,
        buttons: Vec<MenuButton>,
        append: bool,
        replace: bool,
    ) {
        self.redraw();
        self.core
            .skeleton
            .borrow()
            .menu
            .clone()
            .setup(key, title.map(str::to_string), buttons, append, replace);
    }

    /// Add buttons to the root menu, before the existing ones.
    pub fn menu_setup_root(&self, buttons: Vec<MenuButton>) {
        self.menu_setup_root_with(None, buttons, false, false);
    }

    /// [`menu_setup_root`](Self::menu_setup_root) with explicit merge flags.
    pub fn menu_setup_root_with(
        &self,
        title: Option<&str>,
        buttons: Vec<MenuButton>,
        append: bool,
        replace: bool,
    ) {
        self.redraw();
        let menu = self.core.skeleton.borrow().menu.clone();
        menu.setup_root(title.map(str::to_string), buttons, append, replace);
    }

    /// Drop a menu.
    pub fn menu_remove(&self, key: &str) {
        self.redraw();
        let menu = self.core.skeleton.borrow().menu.clone();
        menu.remove(key);
    }

    /// Open a message box.
    pub fn message_box(&self, message: MessageBox) -> WindowId {
        self.redraw();
        message.open(&self.core.wm)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::bail;

    use super::*;
    use crate::tui::View;
    use crate::wm::{WindowEvent, WindowHandler};

    #[derive(Default)]
    struct Recorder {
        commands: RefCell<Vec<Vec<String>>>,
    }

    impl ProcessRunner for Recorder {
        fn run(&self, args: &[String], sudo: bool) -> Result<()> {
            let full = crate::process::command_line(args, sudo);
            self.commands.borrow_mut().push(full);
            if args.first().map(String::as_str) == Some("false") {
                bail!("exit status 1");
            }
            Ok(())
        }
    }

    fn core_with(runner: Rc<Recorder>, config: Config) -> Rc<Core> {
        let sched = Scheduler::new().expect("Should build scheduler");
        Core::new(WindowManager::new(), sched, runner, config)
    }

    fn config() -> Config {
        Config::with_data_dir(std::env::temp_dir().join("kiosk-control-tests"))
    }

    #[test]
    fn test_skeleton_opens_main_window() {
        let core = core_with(Rc::default(), config());
        let ui = core.skeleton();
        assert!(core.wm().is_open(ui.main_window));
        assert_eq!(core.wm().active(), ui.main_window);
        assert!(core.screen().current().is_some());
    }

    #[test]
    fn test_sys_exec_reports_booleans() {
        let runner = Rc::new(Recorder::default());
        let core = core_with(Rc::clone(&runner), config());
        let ctl = Control::new(&core, "internal:test");

        assert!(ctl.sys_reboot());
        assert!(ctl.sys_chvt(1));
        assert!(!ctl.sys_exec(&["false".to_string()], false));
        assert_eq!(
            *runner.commands.borrow(),
            vec![
                vec!["sudo", "-n", "reboot"],
                vec!["chvt", "1"],
                vec!["false"],
            ]
        );
    }

    #[test]
    fn test_sudo_disabled_by_config() {
        let runner = Rc::new(Recorder::default());
        let mut config = config();
        config.use_sudo = false;
        let core = core_with(Rc::clone(&runner), config);
        Control::new(&core, "p").sys_poweroff();
        assert_eq!(*runner.commands.borrow(), vec![vec!["poweroff"]]);
    }

    #[test]
    fn test_redraw_coalesces_and_waits_for_start() {
        let core = core_with(Rc::default(), config());
        let ctl = Control::new(&core, "p");

        ctl.redraw();
        assert_eq!(core.scheduler().pending(), 0);

        core.set_started(true);
        for _ in 0..5 {
            ctl.redraw();
        }
        assert_eq!(core.scheduler().pending(), 1);
        core.scheduler().turn(Duration::ZERO).expect("Should turn");
        assert_eq!(core.screen().paint_requests(), 1);

        ctl.redraw();
        core.scheduler().turn(Duration::ZERO).expect("Should turn");
        assert_eq!(core.screen().paint_requests(), 2);
    }

    #[test]
    fn test_stop_and_reset_are_deferred() {
        let core = core_with(Rc::default(), config());
        let ctl = Control::new(&core, "p");

        ctl.loop_stop();
        ctl.ui_reset();
        assert!(!core.stop_requested());
        assert!(!core.take_reset_request());

        core.scheduler().turn(Duration::ZERO).expect("Should turn");
        assert!(core.stop_requested());
        assert!(core.take_reset_request());
        assert!(!core.take_reset_request());
    }

    #[test]
    fn test_menu_setup_shows_in_frame() {
        let core = core_with(Rc::default(), config());
        let ctl = Control::new(&core, "p");
        ctl.menu_setup_root(vec![MenuButton::submenu("System", "menu.system")]);
        ctl.menu_setup("menu.system", Some("System"), vec![MenuButton::callback("Reset", || {})]);

        let ui = ctl.internals();
        assert_eq!(ui.menu.labels(ROOT_MENU_KEY), vec!["System"]);
        assert_eq!(ui.menu.title("menu.system").as_deref(), Some("System"));
        assert!(format!("{:?}", ui.frame.render()).contains("System"));
    }

    #[test]
    fn test_rebuild_ui_replaces_skeleton() {
        let core = core_with(Rc::default(), config());
        let ctl = Control::new(&core, "p");
        ctl.menu_setup_root(vec![MenuButton::submenu("System", "menu.system")]);
        let extra = ctl.window_make(WindowSpec::new(crate::tui::RenderNode::text("x")), true);
        let before = core.skeleton().main_window;

        core.rebuild_ui();
        let after = core.skeleton();
        assert_ne!(after.main_window, before);
        assert!(!core.wm().is_open(before));
        assert!(!core.wm().is_open(extra));
        assert!(after.menu.labels(ROOT_MENU_KEY).is_empty());
    }

    struct Veto;

    impl WindowHandler for Veto {
        fn on_close(&self, _wm: &WindowManager, ev: &mut WindowEvent) {
            ev.cancel();
        }
    }

    #[test]
    fn test_rebuild_ui_ignores_close_veto() {
        let core = core_with(Rc::default(), config());
        let ctl = Control::new(&core, "p");
        let stuck = ctl.window_make(
            WindowSpec::new(crate::tui::RenderNode::text("unsaved")).handler(Rc::new(Veto)),
            true,
        );
        assert!(!ctl.window_close(stuck));

        core.rebuild_ui();
        let wm = core.wm();
        assert!(!wm.is_open(stuck));
        assert_eq!(wm.children(wm.root()), vec![core.skeleton().main_window]);
    }

    #[test]
    fn test_close_top_closes_newest() {
        let core = core_with(Rc::default(), config());
        let ctl = Control::new(&core, "p");
        let a = ctl.window_make(WindowSpec::new(crate::tui::RenderNode::text("a")), true);
        let b = ctl.window_make(WindowSpec::new(crate::tui::RenderNode::text("b")), true);

        assert!(ctl.window_close_top());
        assert!(!core.wm().is_open(b));
        assert!(core.wm().is_open(a));

        ctl.window_close_all();
        assert!(core.wm().children(core.wm().root()).is_empty());
        assert!(!ctl.window_close_top());
    }

    #[test]
    fn test_open_made_window_and_modify() {
        let core = core_with(Rc::default(), config());
        let ctl = Control::new(&core, "p");
        let wm = core.wm();
        let id = wm.make(WindowSpec::new(crate::tui::RenderNode::text("later")));
        assert!(!wm.is_open(id));

        ctl.window_open(id, true);
        assert!(wm.is_open(id));
        assert_eq!(wm.parent(id), Some(wm.root()));
        assert_eq!(wm.active(), id);

        ctl.window_modify(
            id,
            WindowPatch {
                title: Some(Some("Renamed".into())),
                ..WindowPatch::default()
            },
        );
        assert_eq!(wm.title(id).as_deref(), Some("Renamed"));
    }
}
