//! Lua primitive functions exposed to plugin units.
//!
//! # Available Primitives
//!
//! - `log` - Logging functions (info, warn, error, debug), prefixed with the unit name
//! - `plugin` - `plugin.register{...}`, called exactly once per unit
//! - `ctl` - The Control surface (menus, windows, timers, tasks, system commands)
//! - `events` - Event subscriptions, only for units that set `wants_events`
//!
//! # Adding New Primitives
//!
//! 1. Create a new module (e.g., `foo.rs`)
//! 2. Implement a `register(lua: &Lua, ...) -> Result<()>` function
//! 3. Add `pub mod foo;` here
//! 4. Call `foo::register(lua, ...)?;` in `register_all`

// Rust guideline compliant 2026-02

pub mod ctl;
pub mod events;
pub mod log;
pub mod plugin;

use anyhow::Result;
use mlua::prelude::*;

use crate::plugin::Control;

pub use plugin::Registrations;

/// Register every primitive a unit sees before it runs.
///
/// `events` is registered later, once the unit asked for it.
///
/// # Errors
///
/// Returns an error if any primitive registration fails.
pub fn register_all(lua: &Lua, ctl: &Control) -> Result<Registrations> {
    log::register(lua, ctl.plugin_name())?;
    ctl::register(lua, ctl.clone())?;
    plugin::register(lua)
}

/// Call a Lua callback from Rust, logging its error under the plugin name.
pub(crate) fn call_logged(
    plugin: &str,
    what: &str,
    callback: &LuaFunction,
    args: impl IntoLuaMulti,
) -> bool {
    match callback.call::<()>(args) {
        Ok(()) => true,
        Err(e) => {
            ::log::error!("[{plugin}] Lua {what} failed: {e}");
            false
        }
    }
}
