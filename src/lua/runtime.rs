//! Lua unit runtime.
//!
//! Every user unit runs in its own Lua state, so units cannot see each
//! other's globals. The unit file runs once at load time and must call
//! `plugin.register{...}` exactly once; the registered table then receives
//! the lifecycle hooks as methods.

// Rust guideline compliant 2026-02

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use mlua::prelude::*;

use super::primitives::{self, events::EventKind};
use crate::plugin::{Control, Events, Plugin, PluginUnit, SubscriptionId};

/// A user unit loaded into its own Lua state.
pub struct LuaPlugin {
    name: String,
    lua: Lua,
    table: LuaTable,
    events: Option<Events>,
    subscriptions: Vec<SubscriptionId>,
}

impl std::fmt::Debug for LuaPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaPlugin")
            .field("name", &self.name)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl LuaPlugin {
    /// Run `unit` in a fresh Lua state bound to `ctl`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or raises an error, or when it
    /// does not call `plugin.register` exactly once.
    pub fn load(unit: &PluginUnit, ctl: Control) -> Result<Self> {
        let lua = Lua::new();
        let registrations = primitives::register_all(&lua, &ctl)
            .context("Failed to register Lua primitives")?;
        if let Some(dir) = &unit.package_dir {
            setup_package_path(&lua, dir)?;
        }

        let source = std::fs::read_to_string(&unit.entry)
            .with_context(|| format!("Failed to read Lua file: {}", unit.entry.display()))?;
        lua.load(&source)
            .set_name(format!("@{}", unit.entry.display()))
            .exec()
            .map_err(|e| anyhow!("Failed to execute Lua file {}: {e}", unit.entry.display()))?;

        let table = registrations.single()?;
        log::debug!("Loaded Lua unit '{}' from {}", unit.name, unit.entry.display());
        Ok(Self {
            name: unit.name.clone(),
            lua,
            table,
            events: None,
            subscriptions: Vec::new(),
        })
    }

    /// Call `hook` on the registered table, if it defines one.
    fn call_hook(&self, hook: &str) -> Result<()> {
        let function: Option<LuaFunction> = self
            .table
            .get(hook)
            .map_err(|e| anyhow!("Invalid '{hook}' in plugin '{}': {e}", self.name))?;
        let Some(function) = function else {
            return Ok(());
        };
        function
            .call::<()>(self.table.clone())
            .map_err(|e| anyhow!("Lua hook '{hook}' of plugin '{}' failed: {e}", self.name))
    }
}

/// Let `require` find modules inside a package unit.
fn setup_package_path(lua: &Lua, dir: &Path) -> Result<()> {
    let package: LuaTable = lua
        .globals()
        .get("package")
        .map_err(|e| anyhow!("Failed to get package table: {e}"))?;
    let current: String = package
        .get("path")
        .map_err(|e| anyhow!("Failed to get package.path: {e}"))?;
    let path = format!(
        "{dir}/?.lua;{dir}/?/init.lua;{current}",
        dir = dir.display()
    );
    package
        .set("path", path)
        .map_err(|e| anyhow!("Failed to set package.path: {e}"))
}

impl Plugin for LuaPlugin {
    fn wants_events(&self) -> bool {
        self.table
            .get::<Option<bool>>("wants_events")
            .ok()
            .flatten()
            .unwrap_or(false)
    }

    fn bind_events(&mut self, events: Events) -> Result<()> {
        primitives::events::register(&self.lua, &self.name, events.clone())?;
        for (hook, kind) in [("on_raw", EventKind::Raw), ("on_key", EventKind::Key)] {
            let function: Option<LuaFunction> = self
                .table
                .get(hook)
                .map_err(|e| anyhow!("Invalid '{hook}' in plugin '{}': {e}", self.name))?;
            if let Some(function) = function {
                let id = primitives::events::subscribe(
                    &events,
                    &self.name,
                    kind,
                    function,
                    Some(self.table.clone()),
                );
                self.subscriptions.push(id);
            }
        }
        self.events = Some(events);
        Ok(())
    }

    fn on_load(&mut self) -> Result<()> {
        self.call_hook("on_load")
    }

    fn on_unload(&mut self) -> Result<()> {
        let result = self.call_hook("on_unload");
        if let Some(events) = &self.events {
            for id in self.subscriptions.drain(..) {
                events.off(&id);
            }
        }
        result
    }

    fn on_main(&mut self) -> Result<()> {
        self.call_hook("on_main")
    }

    fn on_ui_create(&mut self) -> Result<()> {
        self.call_hook("on_ui_create")
    }

    fn on_ui_destroy(&mut self) -> Result<()> {
        self.call_hook("on_ui_destroy")
    }
}
