//! `internal:system_menu`: the System submenu.
//!
//! Shows the system console for a few seconds, stops the shell, reboots or
//! powers the machine off.

// Rust guideline compliant 2026-02

use anyhow::Result;

use crate::constants::{CONSOLE_VT, SYSTEM_LOG_DURATION, SYSTEM_MENU_KEY};
use crate::plugin::{Control, Plugin};
use crate::tui::MenuButton;

/// System submenu plugin.
#[derive(Debug)]
pub struct SystemMenu {
    ctl: Control,
}

/// [`BuiltinFactory`](crate::plugin::BuiltinFactory) for this plugin.
pub fn factory(ctl: Control) -> Box<dyn Plugin> {
    Box::new(SystemMenu { ctl })
}

/// Switch to the console, wait, switch back. Runs as a task so the loop
/// keeps going meanwhile.
fn show_log(ctl: &Control) {
    let c = ctl.clone();
    let kiosk_vt = ctl.config().kiosk_vt;
    // detached: errors are already logged by sys_chvt
    let _task = ctl.spawn(async move {
        if !c.sys_chvt(CONSOLE_VT) {
            return Ok(());
        }
        tokio::time::sleep(SYSTEM_LOG_DURATION).await;
        c.sys_chvt(kiosk_vt);
        Ok(())
    });
}

impl Plugin for SystemMenu {
    fn on_ui_create(&mut self) -> Result<()> {
        self.ctl
            .menu_setup_root(vec![MenuButton::submenu("System", SYSTEM_MENU_KEY)]);

        let (show, stop, reboot, poweroff) = (
            self.ctl.clone(),
            self.ctl.clone(),
            self.ctl.clone(),
            self.ctl.clone(),
        );
        self.ctl.menu_setup(
            SYSTEM_MENU_KEY,
            Some("System"),
            vec![
                MenuButton::callback("Show system log (5 sec.)", move || show_log(&show)),
                MenuButton::callback("Reset", move || stop.loop_stop()),
                MenuButton::callback("Reboot", move || {
                    reboot.sys_reboot();
                }),
                MenuButton::callback("Power off", move || {
                    poweroff.sys_poweroff();
                }),
            ],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use crate::constants::ROOT_MENU_KEY;
    use crate::plugin::Core;
    use crate::process::ProcessRunner;
    use crate::runtime::Scheduler;
    use crate::wm::WindowManager;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Vec<String>>>);

    impl ProcessRunner for Recorder {
        fn run(&self, args: &[String], sudo: bool) -> Result<()> {
            self.0.borrow_mut().push(crate::process::command_line(args, sudo));
            Ok(())
        }
    }

    fn setup() -> (Rc<Core>, Rc<Recorder>, Box<dyn Plugin>) {
        let sched = Scheduler::new().expect("Should build scheduler");
        let runner = Rc::new(Recorder::default());
        let config = Config::with_data_dir(std::env::temp_dir().join("kiosk-sysmenu-tests"));
        let core = Core::new(WindowManager::new(), sched, runner.clone(), config);
        let mut plugin = factory(Control::new(&core, "internal:system_menu"));
        plugin.on_ui_create().expect("Should create UI");
        (core, runner, plugin)
    }

    #[test]
    fn test_menu_entries() {
        let (core, _, _plugin) = setup();
        let menu = core.skeleton().menu;
        assert_eq!(menu.labels(ROOT_MENU_KEY), vec!["System"]);
        assert_eq!(
            menu.labels(SYSTEM_MENU_KEY),
            vec!["Show system log (5 sec.)", "Reset", "Reboot", "Power off"]
        );
    }

    #[test]
    fn test_reboot_and_reset() {
        let (core, runner, _plugin) = setup();
        let menu = core.skeleton().menu;
        menu.push(SYSTEM_MENU_KEY);

        menu.activate(2);
        assert_eq!(*runner.0.borrow(), vec![vec!["sudo", "-n", "reboot"]]);

        menu.activate(1);
        core.scheduler().turn(Duration::ZERO).expect("Should turn");
        assert!(core.stop_requested());
    }

    #[test]
    fn test_show_log_switches_console() {
        let (core, runner, _plugin) = setup();
        let menu = core.skeleton().menu;
        menu.push(SYSTEM_MENU_KEY);
        menu.activate(0);
        core.scheduler().turn(Duration::ZERO).expect("Should turn");

        assert_eq!(*runner.0.borrow(), vec![vec!["chvt", "1"]]);
        let report = core.scheduler().shutdown().expect("First shutdown");
        assert_eq!(report.cancelled, 1);
    }
}
