//! Terminal state guard for RAII cleanup.
//!
//! The guard puts the terminal into kiosk mode when entered and restores it
//! when dropped, including during unwinding.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Restore the terminal, ignoring errors.
///
/// Shared by [`TerminalGuard`] and the panic hook installed by the binary.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(std::io::stdout(), LeaveAlternateScreen, cursor::Show);
}

/// Guard struct that ensures terminal cleanup on drop (including panics).
///
/// When dropped, this guard:
/// - Disables raw mode
/// - Leaves the alternate screen
/// - Shows the cursor
#[derive(Debug)]
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    /// Enable raw mode, enter the alternate screen and hide the cursor.
    ///
    /// If any step fails, whatever was already set up is undone.
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let guard = Self { _private: () };
        execute!(std::io::stdout(), EnterAlternateScreen, cursor::Hide)
            .context("Failed to enter alternate screen")?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}
