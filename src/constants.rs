//! Application-wide constants for the kiosk shell.
//!
//! Constants are grouped by domain with documentation explaining their
//! purpose.
//!
//! # Categories
//!
//! - **Loop**: terminal polling and scheduler turn budgets
//! - **UI**: menu keys, labels and default geometry
//! - **System**: virtual terminals and privileged commands
//! - **Device**: IR learning timings
//! - **Paths**: file names under the data directory

// Rust guideline compliant 2026-02

use std::time::Duration;

/// Application version, shown in the footer and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project URL shown in the footer.
pub const HOMEPAGE: &str = "https://github.com/kiosk-shell/kiosk-shell";

// ============================================================================
// Loop
// ============================================================================

/// Maximum time the terminal loop waits for an input event.
pub const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Time budget of one scheduler turn.
///
/// Kept short so pending terminal input is picked up promptly; timers due
/// within the budget still fire during the turn.
pub const SCHEDULER_TURN_BUDGET: Duration = Duration::from_millis(5);

// ============================================================================
// UI
// ============================================================================

/// Registry key of the root menu.
pub const ROOT_MENU_KEY: &str = "menu";

/// Registry key of the system submenu.
pub const SYSTEM_MENU_KEY: &str = "menu.system";

/// Registry key of the configuration submenu.
pub const CONFIG_MENU_KEY: &str = "menu.config";

/// Task bar label width, ellipsis included.
pub const TASK_LABEL_LEN: usize = 15;

/// Width of the menu body once the default style narrows it (percent).
pub const STYLED_BODY_WIDTH_PCT: u16 = 40;

/// Width of the default-style frame overlay (percent).
pub const STYLED_FRAME_WIDTH_PCT: u16 = 75;

/// Character filling the background around the styled frame.
pub const BACKGROUND_FILL: &str = "▒";

// ============================================================================
// System
// ============================================================================

/// Virtual terminal showing the system console.
pub const CONSOLE_VT: u16 = 1;

/// Virtual terminal the kiosk runs on.
pub const DEFAULT_KIOSK_VT: u16 = 7;

/// How long "Show system log" keeps the console visible.
pub const SYSTEM_LOG_DURATION: Duration = Duration::from_secs(5);

// ============================================================================
// Device
// ============================================================================

/// Learning ends after this long without a scancode.
pub const LEARN_INACTIVITY: Duration = Duration::from_secs(5);

/// Minimum spacing between accepted scancodes, in nanoseconds (250 ms).
pub const LEARN_DEBOUNCE_NS: u64 = 250_000_000;

/// Number of recent accepted scancodes kept while learning.
pub const LEARN_KEEP: usize = 5;

/// Identical trailing scancodes needed to confirm a learned code.
pub const LEARN_CONFIRM: usize = 3;

/// How long a "code added" notice stays in the configurator footer.
pub const LEARN_NOTICE: Duration = Duration::from_secs(2);

/// Maximum number of key search results.
pub const KEY_SEARCH_MAX: usize = 20;

/// Root of the remote-control device class in sysfs.
pub const SYSFS_RC_CLASS: &str = "/sys/class/rc";

// ============================================================================
// Paths
// ============================================================================

/// Configuration file name inside the data directory.
pub const CONFIG_FILE: &str = "kiosk.json";

/// Log file name inside the data directory.
pub const LOG_FILE: &str = "kiosk.log";

/// Fallback log file when the data directory is unavailable.
pub const FALLBACK_LOG_FILE: &str = "/tmp/kiosk.log";

/// Default IR keymap file name inside the data directory.
pub const KEYMAP_FILE: &str = "rc-keymap.toml";

/// User plugin directory name inside the data directory.
pub const PLUGINS_DIR: &str = "plugins";
