//! Remote-control device discovery under `/sys/class/rc`.
//!
//! ```text
//! /sys/class/rc/rc0/
//! ├── uevent            DRV_NAME=gpio_ir_recv, NAME=rc-empty, ...
//! ├── protocols         "rc-5 [nec] sony ..."   ([x] = enabled)
//! ├── lirc0/uevent      MAJOR, MINOR, DEVNAME=lirc0
//! └── input5/event3/uevent   DEVNAME=input/event3
//! ```

// Rust guideline compliant 2026-02

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::evdev::EvdevSource;
use super::lirc::LircSource;
use super::{Scancode, ScancodeOpener, ScancodeSource};

/// Driver of the GPIO IR receiver the kiosk image configures.
const PREFERRED_DRIVER: &str = "gpio_ir_recv";

/// Keymap name of that receiver.
const PREFERRED_KEYMAP: &str = "rc-empty";

/// A sysfs class device and its `uevent` variables.
#[derive(Debug, Clone)]
pub struct ClassDevice {
    path: PathBuf,
    uevent: BTreeMap<String, String>,
}

impl ClassDevice {
    /// Read the device at `path`. Fails without a `uevent` file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = path.join("uevent");
        let text = fs::read_to_string(&file)
            .with_context(|| format!("Invalid device '{}', no uevent file", path.display()))?;
        let uevent = text
            .lines()
            .filter_map(|line| line.trim().split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            uevent,
        })
    }

    /// sysfs path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A `uevent` variable.
    #[must_use]
    pub fn uevent_var(&self, name: &str) -> Option<&str> {
        self.uevent.get(name).map(String::as_str)
    }

    /// `MAJOR:MINOR`, when both are known.
    #[must_use]
    pub fn dev_number(&self) -> Option<String> {
        match (self.uevent_var("MAJOR"), self.uevent_var("MINOR")) {
            (Some(major), Some(minor)) => Some(format!("{major}:{minor}")),
            _ => None,
        }
    }

    /// Device node under `/dev`, when the device has one.
    #[must_use]
    pub fn dev_path(&self) -> Option<PathBuf> {
        self.uevent_var("DEVNAME")
            .map(|name| Path::new("/dev").join(name))
    }
}

/// Subdirectories of `dir` named `<prefix><digits>`, sorted by number.
fn scan_children(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut found: Vec<(u32, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(number) = name
            .to_str()
            .and_then(|name| name.strip_prefix(prefix))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
        else {
            continue;
        };
        if entry.path().is_dir() {
            found.push((number, entry.path()));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

fn first_child(dir: &Path, prefix: &str) -> Option<ClassDevice> {
    scan_children(dir, prefix)
        .ok()?
        .first()
        .and_then(|path| ClassDevice::open(path).ok())
}

/// A remote-control device with its lirc and event children.
#[derive(Debug, Clone)]
pub struct RcDevice {
    device: ClassDevice,
    lirc: Option<ClassDevice>,
    event: Option<ClassDevice>,
}

impl RcDevice {
    /// Read the device at `path` (`/sys/class/rc/rcN`).
    pub fn open(path: &Path) -> Result<Self> {
        let device = ClassDevice::open(path)?;
        let lirc = first_child(path, "lirc");
        let event = scan_children(path, "input")
            .ok()
            .and_then(|inputs| inputs.first().and_then(|input| first_child(input, "event")));
        Ok(Self {
            device,
            lirc,
            event,
        })
    }

    /// sysfs path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.device.path()
    }

    /// A `uevent` variable of the rc device.
    #[must_use]
    pub fn uevent_var(&self, name: &str) -> Option<&str> {
        self.device.uevent_var(name)
    }

    /// First lirc child.
    #[must_use]
    pub fn lirc(&self) -> Option<&ClassDevice> {
        self.lirc.as_ref()
    }

    /// First event device of the first input child.
    #[must_use]
    pub fn event(&self) -> Option<&ClassDevice> {
        self.event.as_ref()
    }

    /// Kernel protocols with their enabled state.
    pub fn protocols(&self) -> Result<Vec<(String, bool)>> {
        let file = self.path().join("protocols");
        let text = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        Ok(parse_protocols(text.lines().next().unwrap_or_default()))
    }

    /// Enable or disable protocols.
    pub fn set_protocols(&self, protocols: &[(String, bool)]) -> Result<()> {
        let file = self.path().join("protocols");
        let text = if protocols.is_empty() {
            "none\n".to_string()
        } else {
            protocols
                .iter()
                .map(|(proto, on)| format!("{}{proto}\n", if *on { '+' } else { '-' }))
                .collect()
        };
        fs::write(&file, text).with_context(|| format!("Failed to write {}", file.display()))
    }

    /// Enable every protocol until the returned guard drops, which restores
    /// the original set.
    ///
    /// A failure to enable is recorded in the guard rather than returned:
    /// learning still works for the protocols already enabled.
    pub fn enable_all_protocols(&self) -> Result<ProtocolsGuard> {
        let original = self.protocols()?;
        let mut guard = ProtocolsGuard {
            device: self.clone(),
            original: None,
            failed: false,
        };
        if original.iter().all(|(_, on)| *on) {
            return Ok(guard);
        }

        let all: Vec<(String, bool)> = original.iter().map(|(p, _)| (p.clone(), true)).collect();
        match self.set_protocols(&all) {
            Ok(()) => guard.original = Some(original),
            Err(e) => {
                log::warn!("Failed to enable all RC protocols on {}: {e:#}", self.path().display());
                guard.failed = true;
            }
        }
        Ok(guard)
    }
}

/// Parse the first line of a `protocols` file.
fn parse_protocols(line: &str) -> Vec<(String, bool)> {
    line.split_whitespace()
        .map(|proto| match proto.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
            Some(enabled) => (enabled.to_string(), true),
            None => (proto.to_string(), false),
        })
        .collect()
}

/// Restores an rc device's protocols on drop.
#[derive(Debug)]
pub struct ProtocolsGuard {
    device: RcDevice,
    original: Option<Vec<(String, bool)>>,
    failed: bool,
}

impl ProtocolsGuard {
    /// Whether enabling every protocol failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl Drop for ProtocolsGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            if let Err(e) = self.device.set_protocols(&original) {
                log::warn!("Failed to restore RC protocols: {e:#}");
            }
        }
    }
}

/// Every rc device under `class_dir`. A missing class directory means no
/// devices.
pub fn find_rc_devices(class_dir: &Path) -> Result<Vec<RcDevice>> {
    if !class_dir.exists() {
        return Ok(Vec::new());
    }
    let mut devices = Vec::new();
    for path in scan_children(class_dir, "rc")? {
        match RcDevice::open(&path) {
            Ok(device) => devices.push(device),
            Err(e) => log::warn!("Skipping RC device: {e:#}"),
        }
    }
    Ok(devices)
}

/// The device to learn from: the kiosk's GPIO receiver if present, else the
/// first device with a lirc child.
#[must_use]
pub fn pick_ir_device(devices: Vec<RcDevice>) -> Option<RcDevice> {
    let with_lirc = devices.into_iter().filter(|d| d.lirc().is_some());
    let mut first = None;
    for device in with_lirc {
        if device.uevent_var("DRV_NAME") == Some(PREFERRED_DRIVER)
            && device.uevent_var("NAME") == Some(PREFERRED_KEYMAP)
        {
            return Some(device);
        }
        first.get_or_insert(device);
    }
    first
}

/// [`ScancodeOpener`] for an rc device's lirc child.
///
/// While open, every protocol is enabled and the device's event node is
/// grabbed so learned keys do not also reach the kiosk.
#[derive(Debug, Clone)]
pub struct LircOpener {
    device: RcDevice,
}

impl LircOpener {
    /// Opener for `device`. `None` if it has no lirc child.
    #[must_use]
    pub fn new(device: RcDevice) -> Option<Self> {
        device.lirc().is_some().then_some(Self { device })
    }
}

impl ScancodeOpener for LircOpener {
    fn describe(&self) -> String {
        let Some(lirc) = self.device.lirc() else {
            return self.device.path().display().to_string();
        };
        format!(
            "{} [{}] [{}]",
            lirc.path().display(),
            lirc.dev_number().unwrap_or_default(),
            lirc.dev_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )
    }

    fn open(&self) -> Result<Box<dyn ScancodeSource>> {
        let lirc_node = self
            .device
            .lirc()
            .and_then(ClassDevice::dev_path)
            .with_context(|| format!("No lirc node for {}", self.device.path().display()))?;

        let protocols = self.device.enable_all_protocols()?;
        let mut lirc = LircSource::open(&lirc_node)?;
        lirc.set_protocols_limited(protocols.failed());

        let grab = self
            .device
            .event()
            .and_then(ClassDevice::dev_path)
            .and_then(|node| match EvdevSource::open(&node) {
                Ok(mut source) => match source.grab(true) {
                    Ok(()) => Some(source),
                    Err(e) => {
                        log::warn!("{e:#}");
                        None
                    }
                },
                Err(e) => {
                    log::warn!("{e:#}");
                    None
                }
            });

        Ok(Box::new(LearningSource {
            lirc,
            grab,
            protocols: Some(protocols),
        }))
    }
}

/// A lirc source holding the event grab and the protocol set for as long
/// as it is open.
struct LearningSource {
    lirc: LircSource,
    grab: Option<EvdevSource>,
    protocols: Option<ProtocolsGuard>,
}

#[async_trait(?Send)]
impl ScancodeSource for LearningSource {
    async fn next_scancode(&mut self) -> Result<Option<Scancode>> {
        self.lirc.next_scancode().await
    }

    fn close(&mut self) {
        self.lirc.close();
        self.grab = None;
        self.protocols = None;
    }

    fn protocols_limited(&self) -> bool {
        self.lirc.protocols_limited()
    }
}
