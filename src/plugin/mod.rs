//! Plugin runtime.
//!
//! Plugins are units of behavior loaded at startup: built-in Rust units
//! (named `internal:<name>`) and user Lua units from the plugin
//! directories. Each one implements [`Plugin`] and receives its own
//! [`Control`]; the ones that ask for it also get the shared [`Events`].
//!
//! # Lifecycle
//!
//! ```text
//! on_load (all) ─► on_ui_create (all) ─► loop ─► on_main (all, delay 0) ─► ...
//!                                                   │
//!          ui_reset: on_ui_destroy (all) ─► rebuild ─► on_ui_create (all)
//!                                                   │
//!                          shutdown: on_ui_destroy (all) ─► on_unload (all)
//! ```
//!
//! Each phase completes across every plugin before the next starts.

// Rust guideline compliant 2026-02

pub mod builtin;
pub mod control;
pub mod events;
pub mod loader;

use anyhow::Result;

pub use control::{Control, Core, UiSkeleton};
pub use events::{Events, SubscriptionId};
pub use loader::{discover_units, load_plugins, LoadReport, PluginOrigin, PluginRecord, PluginUnit};

/// A loaded plugin. Every hook defaults to doing nothing.
pub trait Plugin {
    /// Whether the plugin needs the Events surface.
    fn wants_events(&self) -> bool {
        false
    }

    /// Hand over the Events surface. Called once, before `on_load`, and only
    /// when [`wants_events`](Self::wants_events) is true.
    fn bind_events(&mut self, _events: Events) -> Result<()> {
        Ok(())
    }

    /// After every plugin was constructed.
    fn on_load(&mut self) -> Result<()> {
        Ok(())
    }

    /// During shutdown, after `on_ui_destroy`.
    fn on_unload(&mut self) -> Result<()> {
        Ok(())
    }

    /// First turn of the loop.
    fn on_main(&mut self) -> Result<()> {
        Ok(())
    }

    /// A fresh UI skeleton exists.
    fn on_ui_create(&mut self) -> Result<()> {
        Ok(())
    }

    /// The UI skeleton is about to go away.
    fn on_ui_destroy(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Constructor of a built-in plugin.
pub type BuiltinFactory = fn(Control) -> Box<dyn Plugin>;
