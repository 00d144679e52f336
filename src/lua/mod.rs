//! Lua scripting for user plugin units.
//!
//! # Architecture
//!
//! ```text
//! PluginLoader
//!  └── LuaPlugin (one per unit)
//!       ├── Lua state (mlua, private to the unit)
//!       ├── registered table (hooks: on_load, on_main, on_key, ...)
//!       └── Primitives
//!            ├── log (debug, info, warn, error)
//!            ├── plugin (register)
//!            ├── ctl (menus, windows, timers, tasks, system commands)
//!            └── events (raw and key subscriptions, opt-in)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let plugin = LuaPlugin::load(&unit, control)?;
//! if plugin.wants_events() {
//!     plugin.bind_events(events.clone())?;
//! }
//! plugin.on_load()?;
//! ```

// Rust guideline compliant 2026-02

pub mod primitives;
pub mod runtime;

pub use runtime::LuaPlugin;
