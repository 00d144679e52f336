//! Logging primitive for Lua units.
//!
//! # Usage in Lua
//!
//! ```lua
//! log.info("Menu ready")
//! log.warn("No remote configured")
//! log.debug("Pressed " .. key.name)
//! ```
//!
//! Messages go through the `log` facade under the `lua` target, prefixed
//! with the unit name, so they land in the same file as the shell's own
//! lines.

// Rust guideline compliant 2026-02

use anyhow::{anyhow, Result};
use mlua::Lua;

/// Register the global `log` table for the unit named `plugin`.
///
/// # Errors
///
/// Returns an error if Lua table or function creation fails.
pub fn register(lua: &Lua, plugin: &str) -> Result<()> {
    let log_table = lua
        .create_table()
        .map_err(|e| anyhow!("Failed to create log table: {e}"))?;

    for level in [
        log::Level::Debug,
        log::Level::Info,
        log::Level::Warn,
        log::Level::Error,
    ] {
        let prefix = plugin.to_string();
        let name = level.as_str().to_ascii_lowercase();
        let log_fn = lua
            .create_function(move |_, msg: String| {
                log::log!(target: "lua", level, "[{prefix}] {msg}");
                Ok(())
            })
            .map_err(|e| anyhow!("Failed to create log.{name} function: {e}"))?;
        log_table
            .set(name.as_str(), log_fn)
            .map_err(|e| anyhow!("Failed to set log.{name}: {e}"))?;
    }

    lua.globals()
        .set("log", log_table)
        .map_err(|e| anyhow!("Failed to register log table globally: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::{Function, Table};

    #[test]
    fn test_log_table_created() {
        let lua = Lua::new();
        register(&lua, "clock").expect("Should register log primitives");

        let log_table: Table = lua.globals().get("log").expect("log table should exist");
        for name in ["debug", "info", "warn", "error"] {
            let _: Function = log_table
                .get(name)
                .unwrap_or_else(|e| panic!("log.{name} should exist: {e}"));
        }
    }

    #[test]
    fn test_log_functions_callable() {
        let lua = Lua::new();
        register(&lua, "clock").expect("Should register log primitives");

        lua.load(r#"log.info("tick"); log.error("tock")"#)
            .exec()
            .expect("log functions should be callable");
    }
}
