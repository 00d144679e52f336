//! Input source monitors.
//!
//! One local task per source forwards decoded keys to a callback (the
//! Events `key` list in the shell). A source that fails or runs dry ends
//! its own monitor only.

// Rust guideline compliant 2026-02

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;

use super::{DeviceEnumerator, DeviceKey, EvdevSource, InputSource};
use crate::runtime::{Scheduler, Task};

/// [`DeviceEnumerator`] over a fixed list of evdev device paths.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDevices {
    paths: Vec<PathBuf>,
}

impl ConfiguredDevices {
    /// Enumerator for `paths`.
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl DeviceEnumerator for ConfiguredDevices {
    /// Opens every path that can be opened; the others are logged and
    /// skipped.
    fn input_sources(&self) -> Result<Vec<Box<dyn InputSource>>> {
        let mut sources: Vec<Box<dyn InputSource>> = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            match EvdevSource::open(path) {
                Ok(source) => sources.push(Box::new(source)),
                Err(e) => log::warn!("Input device unavailable: {e:#}"),
            }
        }
        Ok(sources)
    }
}

/// Spawn one monitor task per source.
pub fn spawn_monitors(
    scheduler: &Scheduler,
    sources: Vec<Box<dyn InputSource>>,
    on_key: &Rc<dyn Fn(&DeviceKey)>,
) -> Vec<Task<()>> {
    sources
        .into_iter()
        .map(|mut source| {
            let on_key = Rc::clone(on_key);
            scheduler.spawn(async move {
                let name = source.name().to_string();
                log::info!("Monitoring input device {name}");
                let _ended = scopeguard::guard(name, |name| {
                    log::info!("Input device monitor ended: {name}");
                });
                loop {
                    match source.next_key().await {
                        Ok(Some(key)) => on_key(&key),
                        Ok(None) => break,
                        Err(e) => {
                            log::error!("{e:#}");
                            break;
                        }
                    }
                }
                Ok(())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::*;

    struct ScriptedKeys {
        keys: VecDeque<Result<Option<DeviceKey>>>,
    }

    #[async_trait(?Send)]
    impl InputSource for ScriptedKeys {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn next_key(&mut self) -> Result<Option<DeviceKey>> {
            self.keys.pop_front().unwrap_or(Ok(None))
        }
    }

    fn key(code: u16, name: &str) -> DeviceKey {
        DeviceKey {
            code,
            name: name.to_string(),
            pressed: true,
        }
    }

    #[test]
    fn test_monitor_forwards_until_error() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        let on_key: Rc<dyn Fn(&DeviceKey)> =
            Rc::new(move |k: &DeviceKey| seen_in.borrow_mut().push(k.name.clone()));

        let sources: Vec<Box<dyn InputSource>> = vec![
            Box::new(ScriptedKeys {
                keys: [
                    Ok(Some(key(103, "KEY_UP"))),
                    Err(anyhow!("device gone")),
                    Ok(Some(key(108, "KEY_DOWN"))),
                ]
                .into(),
            }),
            Box::new(ScriptedKeys {
                keys: [Ok(Some(key(28, "KEY_ENTER")))].into(),
            }),
        ];
        let tasks = spawn_monitors(&sched, sources, &on_key);
        assert_eq!(tasks.len(), 2);

        sched.turn(Duration::from_millis(5)).expect("Should turn");
        assert!(tasks.iter().all(Task::is_finished));
        let mut seen = seen.borrow().clone();
        seen.sort();
        assert_eq!(seen, vec!["KEY_ENTER", "KEY_UP"]);
    }

    #[test]
    fn test_configured_devices_skip_missing() {
        let devices = ConfiguredDevices::new(vec![PathBuf::from("/nonexistent/event9")]);
        let sources = devices.input_sources().expect("Missing devices are skipped");
        assert!(sources.is_empty());
    }
}
