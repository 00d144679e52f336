//! Input devices: evdev key sources, IR scancode sources and IR learning.
//!
//! # Architecture
//!
//! ```text
//! /dev/input/eventN ──► EvdevSource ──► monitor task ──► Events `key` list
//!
//! /sys/class/rc/rcN ──► RcDevice (sysfs discovery)
//!                          ├── lircN  ──► LircSource ──► learn_code()
//!                          └── inputN/eventN (grabbed while learning)
//! ```
//!
//! Sources are async and `!Send`: they run as local tasks on the
//! scheduler's single thread.
//!
//! # Modules
//!
//! - [`keys`] - Linux key code names
//! - [`evdev`] - `input_event` records and the evdev key source
//! - [`lirc`] - lirc scancode records and the lirc scancode source
//! - [`sysfs`] - remote-control device discovery
//! - [`learn`] - IR code learning state machine and task
//! - [`monitor`] - per-source monitor tasks

// Rust guideline compliant 2026-02

pub mod evdev;
pub mod keys;
pub mod learn;
pub mod lirc;
pub mod monitor;
pub mod sysfs;

mod fd;

use anyhow::Result;
use async_trait::async_trait;

pub use evdev::EvdevSource;
pub use learn::{learn_code, LearnStep, Learner, LearnState};
pub use lirc::{LircSource, Scancode};
pub use monitor::{spawn_monitors, ConfiguredDevices};
pub use sysfs::RcDevice;

/// A decoded key from an input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceKey {
    /// Linux key code.
    pub code: u16,
    /// Key name (`KEY_UP`), or `KEY_<code>` for unknown codes.
    pub name: String,
    /// `true` on press and auto-repeat, `false` on release.
    pub pressed: bool,
}

/// An async stream of keys.
#[async_trait(?Send)]
pub trait InputSource {
    /// Human-readable source name, for logs.
    fn name(&self) -> &str;

    /// Next key, or `None` when the source is exhausted.
    async fn next_key(&mut self) -> Result<Option<DeviceKey>>;
}

/// An async stream of IR scancodes.
#[async_trait(?Send)]
pub trait ScancodeSource {
    /// Next scancode, or `None` when the source is closed or exhausted.
    async fn next_scancode(&mut self) -> Result<Option<Scancode>>;

    /// Close the source. Later reads return `None`.
    fn close(&mut self);

    /// Whether not all protocols could be enabled, so some remotes may go
    /// undetected.
    fn protocols_limited(&self) -> bool {
        false
    }
}

/// Lists the input sources to monitor.
pub trait DeviceEnumerator {
    /// Open every source.
    fn input_sources(&self) -> Result<Vec<Box<dyn InputSource>>>;
}

/// Opens a fresh scancode source for one IR device.
pub trait ScancodeOpener {
    /// Description shown in the configurator header.
    fn describe(&self) -> String;

    /// Open the device for learning.
    fn open(&self) -> Result<Box<dyn ScancodeSource>>;
}
