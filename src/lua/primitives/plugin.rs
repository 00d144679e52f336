//! The `plugin.register` primitive.
//!
//! # Usage in Lua
//!
//! ```lua
//! plugin.register {
//!     wants_events = true,
//!     on_ui_create = function(self)
//!         ctl.menu_setup_root { buttons = { { "Clock", "menu.clock" } } }
//!     end,
//!     on_key = function(self, key) log.info(key.name) end,
//! }
//! ```
//!
//! A unit must call it exactly once while its file runs.

// Rust guideline compliant 2026-02

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use mlua::prelude::*;

/// Tables passed to `plugin.register`, in call order.
#[derive(Clone, Default)]
pub struct Registrations(Rc<RefCell<Vec<LuaTable>>>);

impl std::fmt::Debug for Registrations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Registrations")
            .field(&self.0.borrow().len())
            .finish()
    }
}

impl Registrations {
    /// Number of `plugin.register` calls so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }

    /// The single registered table.
    ///
    /// # Errors
    ///
    /// Fails when the unit registered zero or several times.
    pub fn single(&self) -> Result<LuaTable> {
        let tables = self.0.borrow();
        match tables.as_slice() {
            [table] => Ok(table.clone()),
            [] => bail!("Unit never called plugin.register"),
            many => bail!(
                "Unit called plugin.register {} times, expected once",
                many.len()
            ),
        }
    }
}

/// Register the global `plugin` table.
///
/// # Errors
///
/// Returns an error if Lua table or function creation fails.
pub fn register(lua: &Lua) -> Result<Registrations> {
    let registrations = Registrations::default();

    let plugin_table = lua
        .create_table()
        .map_err(|e| anyhow!("Failed to create plugin table: {e}"))?;

    let slot = registrations.clone();
    let register_fn = lua
        .create_function(move |_, table: LuaTable| {
            slot.0.borrow_mut().push(table);
            Ok(())
        })
        .map_err(|e| anyhow!("Failed to create plugin.register function: {e}"))?;
    plugin_table
        .set("register", register_fn)
        .map_err(|e| anyhow!("Failed to set plugin.register: {e}"))?;

    lua.globals()
        .set("plugin", plugin_table)
        .map_err(|e| anyhow!("Failed to register plugin table globally: {e}"))?;

    Ok(registrations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_registration() {
        let lua = Lua::new();
        let regs = register(&lua).expect("Should register plugin table");
        lua.load("plugin.register{ name = 'x' }")
            .exec()
            .expect("Should run");

        let table = regs.single().expect("Exactly one registration");
        let name: String = table.get("name").expect("Should read name");
        assert_eq!(name, "x");
    }

    #[test]
    fn test_zero_and_double_registration_fail() {
        let lua = Lua::new();
        let regs = register(&lua).expect("Should register plugin table");
        assert!(regs.single().is_err());

        lua.load("plugin.register{}; plugin.register{}")
            .exec()
            .expect("Should run");
        assert_eq!(regs.count(), 2);
        let err = regs.single().expect_err("Two registrations should fail");
        assert!(err.to_string().contains("2 times"));
    }

    #[test]
    fn test_register_requires_table() {
        let lua = Lua::new();
        register(&lua).expect("Should register plugin table");
        assert!(lua.load("plugin.register('nope')").exec().is_err());
    }
}
