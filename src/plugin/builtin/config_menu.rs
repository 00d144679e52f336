//! `internal:config_menu`: the Configuration submenu.
//!
//! Holds the RC/IR keymap editor, bound to the configured keymap file and
//! the kiosk's IR receiver.

// Rust guideline compliant 2026-02

use std::path::Path;
use std::rc::Rc;

use anyhow::Result;

use super::keymap_editor;
use crate::config::Config;
use crate::constants::{CONFIG_MENU_KEY, SYSFS_RC_CLASS};
use crate::device::sysfs::{find_rc_devices, pick_ir_device, LircOpener};
use crate::device::{RcDevice, ScancodeOpener};
use crate::keymap::TomlKeymapStore;
use crate::plugin::{Control, Plugin};
use crate::tui::MenuButton;

/// Finds the IR receiver to learn codes from.
type ReceiverLookup = Rc<dyn Fn(&Config) -> Option<Rc<dyn ScancodeOpener>>>;

/// Configuration submenu plugin.
pub struct ConfigMenu {
    ctl: Control,
    receiver: ReceiverLookup,
}

impl std::fmt::Debug for ConfigMenu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMenu")
            .field("ctl", &self.ctl)
            .finish_non_exhaustive()
    }
}

/// [`BuiltinFactory`](crate::plugin::BuiltinFactory) for this plugin.
pub fn factory(ctl: Control) -> Box<dyn Plugin> {
    Box::new(ConfigMenu {
        ctl,
        receiver: Rc::new(find_receiver),
    })
}

/// The configured rc device, else the discovered one. `None` when there is
/// none or it has no lirc interface.
fn find_receiver(config: &Config) -> Option<Rc<dyn ScancodeOpener>> {
    let device = match &config.ir_device {
        Some(path) => RcDevice::open(path)
            .map_err(|e| log::warn!("Configured RC/IR device unusable: {e:#}"))
            .ok()?,
        None => {
            let devices = find_rc_devices(Path::new(SYSFS_RC_CLASS))
                .map_err(|e| log::warn!("RC/IR device discovery failed: {e:#}"))
                .ok()?;
            pick_ir_device(devices)?
        }
    };
    let opener = LircOpener::new(device)?;
    Some(Rc::new(opener))
}

fn open_editor(ctl: &Control, receiver: &ReceiverLookup) {
    let config = ctl.config();
    // saves stay untrimmed, see TomlKeymapStore::new
    let store = Rc::new(TomlKeymapStore::new(config.keymap_file.clone(), false));
    let opener = receiver(config);
    if opener.is_none() {
        log::warn!("No RC/IR receiver found, keymap editor is read-only");
    }
    keymap_editor::open_or_report(ctl, store, opener);
}

impl Plugin for ConfigMenu {
    fn on_ui_create(&mut self) -> Result<()> {
        self.ctl.menu_setup_root(vec![MenuButton::submenu(
            "Configuration",
            CONFIG_MENU_KEY,
        )]);

        let ctl = self.ctl.clone();
        let receiver = Rc::clone(&self.receiver);
        self.ctl.menu_setup(
            CONFIG_MENU_KEY,
            Some("Configuration"),
            vec![MenuButton::callback("Configure RC/IR", move || {
                open_editor(&ctl, &receiver);
            })],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::keymap_editor::{KeymapEditor, DEFAULT_KEYS, TITLE};
    use super::*;
    use crate::constants::ROOT_MENU_KEY;
    use crate::device::{Scancode, ScancodeSource};
    use crate::keymap::{KeymapStore, ScanKey};
    use crate::plugin::Core;
    use crate::process::ProcessRunner;
    use crate::runtime::Scheduler;
    use crate::wm::WindowManager;

    const MS: u64 = 1_000_000;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Vec<String>>>);

    impl ProcessRunner for Recorder {
        fn run(&self, args: &[String], sudo: bool) -> Result<()> {
            self.0.borrow_mut().push(crate::process::command_line(args, sudo));
            Ok(())
        }
    }

    /// Replays the same scancode four times, 300 ms apart, then blocks.
    struct FakeReceiver {
        scancode: u64,
    }

    struct Replay(VecDeque<Scancode>);

    #[async_trait(?Send)]
    impl ScancodeSource for Replay {
        async fn next_scancode(&mut self) -> Result<Option<Scancode>> {
            match self.0.pop_front() {
                Some(code) => Ok(Some(code)),
                None => std::future::pending().await,
            }
        }

        fn close(&mut self) {
            self.0.clear();
        }
    }

    impl ScancodeOpener for FakeReceiver {
        fn describe(&self) -> String {
            "fake lirc".to_string()
        }

        fn open(&self) -> Result<Box<dyn ScancodeSource>> {
            let codes = (0..4)
                .map(|i| Scancode {
                    timestamp_ns: i * 300 * MS,
                    flags: 0,
                    protocol: 9,
                    keycode: 0,
                    scancode: self.scancode,
                })
                .collect();
            Ok(Box::new(Replay(codes)))
        }
    }

    struct Fixture {
        core: Rc<Core>,
        runner: Rc<Recorder>,
        _dir: tempfile::TempDir,
        _plugin: Box<dyn Plugin>,
    }

    fn setup(with_receiver: bool) -> Fixture {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let sched = Scheduler::new().expect("Should build scheduler");
        let runner = Rc::new(Recorder::default());
        let config = Config::with_data_dir(dir.path().to_path_buf());
        let core = Core::new(WindowManager::new(), sched, runner.clone(), config);
        core.set_started(true);

        let receiver: ReceiverLookup = if with_receiver {
            Rc::new(|_: &Config| {
                let opener: Rc<dyn ScancodeOpener> = Rc::new(FakeReceiver { scancode: 0x46 });
                Some(opener)
            })
        } else {
            Rc::new(|_: &Config| None)
        };
        let mut plugin: Box<dyn Plugin> = Box::new(ConfigMenu {
            ctl: Control::new(&core, "internal:config_menu"),
            receiver,
        });
        plugin.on_ui_create().expect("Should create UI");
        Fixture {
            core,
            runner,
            _dir: dir,
            _plugin: plugin,
        }
    }

    fn press(core: &Core, code: KeyCode) {
        core.wm().handle_key(&KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn turns(core: &Core, n: usize) {
        for _ in 0..n {
            core.scheduler()
                .turn(Duration::from_millis(5))
                .expect("Should turn");
        }
    }

    fn open(f: &Fixture) -> Rc<KeymapEditor> {
        let ctl = Control::new(&f.core, "internal:config_menu");
        let store = Rc::new(TomlKeymapStore::new(
            f.core.config().keymap_file.clone(),
            false,
        ));
        let opener: Rc<dyn ScancodeOpener> = Rc::new(FakeReceiver { scancode: 0x46 });
        KeymapEditor::open(&ctl, store, Some(opener)).expect("Should open editor")
    }

    fn screen_text(core: &Core) -> String {
        format!("{:?}", core.screen().current())
    }

    #[test]
    fn test_menu_entries_open_editor() {
        let f = setup(false);
        let menu = f.core.skeleton().menu;
        assert_eq!(menu.labels(ROOT_MENU_KEY), vec!["Configuration"]);
        assert_eq!(menu.labels(CONFIG_MENU_KEY), vec!["Configure RC/IR"]);

        menu.push(CONFIG_MENU_KEY);
        menu.activate(0);

        let wm = f.core.wm();
        let top = wm.top();
        assert_eq!(wm.title(top).as_deref(), Some(TITLE));
        assert!(wm.is_overlay(top));
        let text = screen_text(&f.core);
        assert!(text.contains("RC/IR device not available, cannot add new keys!"));
        assert!(!text.contains("Search for a key to add"));
        for key in DEFAULT_KEYS {
            assert!(text.contains(key), "{key} should be listed");
        }
        assert!(text.contains("(not set)"));
    }

    #[test]
    fn test_learn_then_save_offers_reboot() {
        let f = setup(true);
        let editor = open(&f);
        let id = editor.window().expect("Should be open");
        assert!(screen_text(&f.core).contains("RC/IR device (lirc): fake lirc"));

        // Save, Clear All, Search, then KEY_UP
        for _ in 0..3 {
            press(&f.core, KeyCode::Down);
        }
        press(&f.core, KeyCode::Enter);
        assert!(screen_text(&f.core).contains("Receiving, press a key for KEY_UP"));

        turns(&f.core, 3);
        let codes = editor.keymap().by_key();
        assert_eq!(codes.get("KEY_UP"), Some(&vec![ScanKey::new("nec", 0x46)]));
        assert!(editor.changed());
        assert!(screen_text(&f.core).contains("Added code nec:0x46 to KEY_UP."));

        press(&f.core, KeyCode::Home);
        press(&f.core, KeyCode::Enter);
        let saved = TomlKeymapStore::new(f.core.config().keymap_file.clone(), false)
            .load()
            .expect("Should load saved keymap");
        assert_eq!(saved.by_key(), codes);

        let wm = f.core.wm();
        let question = wm.top();
        assert_ne!(question, id);
        assert_eq!(wm.parent(question), Some(id));
        assert!(screen_text(&f.core).contains("a reboot is required"));

        // "No" closes the question and then the editor, without rebooting
        press(&f.core, KeyCode::Right);
        press(&f.core, KeyCode::Enter);
        assert!(!wm.is_open(question));
        assert!(!wm.is_open(id));
        assert!(f.runner.0.borrow().is_empty());
    }

    #[test]
    fn test_unsaved_close_asks_first() {
        let f = setup(true);
        let editor = open(&f);
        let id = editor.window().expect("Should be open");
        let wm = f.core.wm();

        // Clear All marks the keymap changed
        press(&f.core, KeyCode::Right);
        press(&f.core, KeyCode::Enter);
        assert!(editor.changed());

        press(&f.core, KeyCode::Esc);
        assert!(wm.is_open(id), "Close should be canceled");
        let question = wm.top();
        assert_eq!(wm.parent(question), Some(id));
        assert!(screen_text(&f.core).contains("Not saved, close anyway?"));

        press(&f.core, KeyCode::Right);
        press(&f.core, KeyCode::Enter);
        assert!(!wm.is_open(id));
    }

    #[test]
    fn test_ui_reset_drops_unsaved_editor() {
        let f = setup(true);
        let editor = open(&f);
        let id = editor.window().expect("Should be open");
        press(&f.core, KeyCode::Right);
        press(&f.core, KeyCode::Enter);
        assert!(editor.changed());

        f.core.rebuild_ui();
        let wm = f.core.wm();
        assert!(!wm.is_open(id));
        assert_eq!(wm.children(wm.root()), vec![f.core.skeleton().main_window]);
        assert!(!screen_text(&f.core).contains("Not saved"));
    }

    #[test]
    fn test_unchanged_closes_directly() {
        let f = setup(true);
        let editor = open(&f);
        let id = editor.window().expect("Should be open");

        press(&f.core, KeyCode::Esc);
        assert!(!f.core.wm().is_open(id));

        let editor = open(&f);
        let id = editor.window().expect("Should be open");
        press(&f.core, KeyCode::Enter);
        assert!(!f.core.wm().is_open(id), "Save without changes just closes");
    }

    #[test]
    fn test_search_and_delete() {
        let f = setup(true);
        let mut keymap = crate::keymap::Keymap::default();
        keymap.set_scancode(&ScanKey::new("rc-5", 0x10), "KEY_MUTE");
        TomlKeymapStore::new(f.core.config().keymap_file.clone(), false)
            .save(&keymap)
            .expect("Should seed keymap");

        let editor = open(&f);
        assert_eq!(editor.rows().len(), DEFAULT_KEYS.len() + 1);
        assert_eq!(editor.rows().last().map(String::as_str), Some("KEY_MUTE"));

        press(&f.core, KeyCode::Down);
        press(&f.core, KeyCode::Down);
        for c in "volume".chars() {
            press(&f.core, KeyCode::Char(c));
        }
        let text = screen_text(&f.core);
        assert!(text.contains("(select a key to add)"));
        assert!(text.contains("KEY_VOLUMEUP"));

        press(&f.core, KeyCode::End);
        press(&f.core, KeyCode::Delete);
        assert!(editor.keymap().by_key().get("KEY_MUTE").is_none());
        assert!(editor.changed());
        assert_eq!(editor.rows().len(), DEFAULT_KEYS.len() + 1);
    }

    #[test]
    fn test_learning_cancelled_on_close() {
        let f = setup(true);
        let editor = open(&f);
        let id = editor.window().expect("Should be open");

        for _ in 0..3 {
            press(&f.core, KeyCode::Down);
        }
        press(&f.core, KeyCode::Enter);
        press(&f.core, KeyCode::Esc);
        assert!(f.core.wm().is_open(id), "Esc stops learning first");
        assert!(!screen_text(&f.core).contains("Receiving"));

        press(&f.core, KeyCode::Esc);
        assert!(!f.core.wm().is_open(id));
    }
}
