//! Control primitive: the `ctl` table.
//!
//! # Usage in Lua
//!
//! ```lua
//! ctl.menu_setup_root { buttons = { { "Clock", "menu.clock" } } }
//! ctl.menu_setup("menu.clock", {
//!     title = "Clock",
//!     buttons = { { "Show time", function() ctl.message_box(os.date()) end } },
//! })
//!
//! local timer = ctl.call_later(2.5, function() ctl.redraw() end)
//! timer:cancel()
//!
//! ctl.spawn(function()
//!     ctl.sleep(1)
//!     log.info("one second later")
//! end)
//!
//! ctl.message_box("Reboot now?", {
//!     buttons = "Yes,No",
//!     callback = function(window, index) if index == 1 then ctl.reboot() end end,
//! })
//!
//! local id = ctl.window_make({ type = "paragraph", props = { lines = { "Hi" } } },
//!     { title = "Greeting", flags = "default", overlay = { width = { relative = 50 } } })
//! ctl.window_close(id)
//! ```
//!
//! Menu buttons are `{ label, "menu.key" }` (submenu) or
//! `{ label, function }` (callback). Message box button indices are
//! 1-based. Errors raised by Lua callbacks are logged under the unit name.

// Rust guideline compliant 2026-02

use std::time::Duration;

use anyhow::{anyhow, Result};
use mlua::prelude::*;

use super::call_logged;
use crate::plugin::Control;
use crate::runtime::{Task, TimerHandle};
use crate::tui::{GeometryPatch, MenuButton, MessageBox, MessageButton, RenderNode};
use crate::wm::{OverlaySpec, WindowFlags, WindowId, WindowSpec};

/// Lua handle to a pending `ctl.call_later` timer.
struct LuaTimer(TimerHandle);

impl LuaUserData for LuaTimer {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("cancel", |_, this, ()| Ok(this.0.cancel()));
        methods.add_method("is_pending", |_, this, ()| Ok(this.0.is_pending()));
    }
}

/// Lua handle to a `ctl.spawn` task.
struct LuaTask(Task<()>);

impl LuaUserData for LuaTask {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("abort", |_, this, ()| {
            this.0.abort();
            Ok(())
        });
        methods.add_method("is_finished", |_, this, ()| Ok(this.0.is_finished()));
    }
}

fn duration(seconds: f64) -> LuaResult<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| LuaError::RuntimeError(format!("Invalid delay {seconds}: {e}")))
}

fn parse_buttons(plugin: &str, buttons: Option<LuaTable>) -> LuaResult<Vec<MenuButton>> {
    let Some(buttons) = buttons else {
        return Ok(Vec::new());
    };
    let mut parsed = Vec::new();
    for entry in buttons.sequence_values::<LuaTable>() {
        let entry = entry?;
        let label: String = entry.get(1)?;
        let button = match entry.get::<LuaValue>(2)? {
            LuaValue::String(_) => MenuButton::submenu(label, entry.get::<String>(2)?),
            LuaValue::Function(callback) => {
                let plugin = plugin.to_string();
                MenuButton::callback(label, move || {
                    call_logged(&plugin, "menu callback", &callback, ());
                })
            }
            other => {
                return Err(LuaError::RuntimeError(format!(
                    "Menu button '{label}' needs a submenu key or a function, got {}",
                    other.type_name()
                )))
            }
        };
        parsed.push(button);
    }
    Ok(parsed)
}

fn parse_flags(lua: &Lua, value: LuaValue) -> LuaResult<WindowFlags> {
    match value {
        LuaValue::Nil => Ok(WindowFlags::DEFAULT),
        preset @ LuaValue::String(_) => match lua.unpack::<String>(preset)?.as_str() {
            "default" => Ok(WindowFlags::DEFAULT),
            "default_no_close" => Ok(WindowFlags::DEFAULT_NO_CLOSE),
            "basic" => Ok(WindowFlags::BASIC),
            other => Err(LuaError::RuntimeError(format!(
                "Unknown window flags preset '{other}'"
            ))),
        },
        LuaValue::Table(names) => {
            let mut flags = WindowFlags::BASIC;
            for name in names.sequence_values::<String>() {
                let name = name?;
                flags |= WindowFlags::from_name(&name.to_ascii_uppercase()).ok_or_else(|| {
                    LuaError::RuntimeError(format!("Unknown window flag '{name}'"))
                })?;
            }
            Ok(flags)
        }
        other => Err(LuaError::RuntimeError(format!(
            "Window flags must be a preset name or a list, got {}",
            other.type_name()
        ))),
    }
}

fn parse_overlay(lua: &Lua, value: LuaValue) -> LuaResult<OverlaySpec> {
    match value {
        LuaValue::Nil | LuaValue::Boolean(false) => Ok(OverlaySpec::Off),
        LuaValue::Boolean(true) => Ok(OverlaySpec::Default),
        table @ LuaValue::Table(_) => {
            Ok(OverlaySpec::Patch(lua.from_value::<GeometryPatch>(table)?))
        }
        other => Err(LuaError::RuntimeError(format!(
            "Overlay must be a boolean or a geometry table, got {}",
            other.type_name()
        ))),
    }
}

fn message_box_from(
    lua: &Lua,
    plugin: &str,
    body: String,
    opts: Option<LuaTable>,
) -> LuaResult<MessageBox> {
    let mut message = MessageBox::new(body);
    let Some(opts) = opts else {
        return Ok(message);
    };

    match opts.get::<LuaValue>("buttons")? {
        LuaValue::Nil => {}
        names @ LuaValue::String(_) => message = message.presets(&lua.unpack::<String>(names)?),
        LuaValue::Table(names) => {
            let buttons = names
                .sequence_values::<String>()
                .map(|name| name.map(|n| MessageButton::preset(&n)))
                .collect::<LuaResult<Vec<_>>>()?;
            message = message.buttons(buttons);
        }
        other => {
            return Err(LuaError::RuntimeError(format!(
                "Message box buttons must be a string or a list, got {}",
                other.type_name()
            )))
        }
    }
    if let Some(title) = opts.get::<Option<String>>("title")? {
        message = message.title(title);
    }
    if let Some(autoclose) = opts.get::<Option<bool>>("autoclose")? {
        message.autoclose = autoclose;
    }
    if let Some(callback) = opts.get::<Option<LuaFunction>>("callback")? {
        let plugin = plugin.to_string();
        message = message.callback(move |window, index| {
            call_logged(
                &plugin,
                "message box callback",
                &callback,
                (window.get(), index + 1),
            );
        });
    }
    Ok(message)
}

fn set_fn<F, A, R>(lua: &Lua, table: &LuaTable, name: &str, f: F) -> Result<()>
where
    F: Fn(&Lua, A) -> LuaResult<R> + 'static,
    A: FromLuaMulti,
    R: IntoLuaMulti,
{
    let function = lua
        .create_function(f)
        .map_err(|e| anyhow!("Failed to create ctl.{name} function: {e}"))?;
    table
        .set(name, function)
        .map_err(|e| anyhow!("Failed to set ctl.{name}: {e}"))
}

/// Register the global `ctl` table bound to `ctl`.
///
/// # Errors
///
/// Returns an error if Lua table or function creation fails.
pub fn register(lua: &Lua, ctl: Control) -> Result<()> {
    let table = lua
        .create_table()
        .map_err(|e| anyhow!("Failed to create ctl table: {e}"))?;

    // Menus

    let c = ctl.clone();
    set_fn(lua, &table, "menu_setup", move |_, (key, opts): (String, Option<LuaTable>)| {
        let (title, buttons, append, replace) = match opts {
            Some(opts) => (
                opts.get::<Option<String>>("title")?,
                parse_buttons(c.plugin_name(), opts.get("buttons")?)?,
                opts.get::<Option<bool>>("append")?.unwrap_or(true),
                opts.get::<Option<bool>>("replace")?.unwrap_or(true),
            ),
            None => (None, Vec::new(), true, true),
        };
        c.menu_setup_with(&key, title.as_deref(), buttons, append, replace);
        Ok(())
    })?;

    let c = ctl.clone();
    set_fn(lua, &table, "menu_setup_root", move |_, opts: LuaTable| {
        let title = opts.get::<Option<String>>("title")?;
        let buttons = parse_buttons(c.plugin_name(), opts.get("buttons")?)?;
        let append = opts.get::<Option<bool>>("append")?.unwrap_or(false);
        let replace = opts.get::<Option<bool>>("replace")?.unwrap_or(false);
        c.menu_setup_root_with(title.as_deref(), buttons, append, replace);
        Ok(())
    })?;

    let c = ctl.clone();
    set_fn(lua, &table, "menu_remove", move |_, key: String| {
        c.menu_remove(&key);
        Ok(())
    })?;

    // Loop

    let c = ctl.clone();
    set_fn(lua, &table, "redraw", move |_, ()| {
        c.redraw();
        Ok(())
    })?;

    let c = ctl.clone();
    set_fn(lua, &table, "reset", move |_, ()| {
        c.ui_reset();
        Ok(())
    })?;

    let c = ctl.clone();
    set_fn(lua, &table, "stop", move |_, ()| {
        c.loop_stop();
        Ok(())
    })?;

    let c = ctl.clone();
    set_fn(
        lua,
        &table,
        "call_later",
        move |_, (seconds, callback): (f64, LuaFunction)| {
            let plugin = c.plugin_name().to_string();
            let handle = c.call_later(duration(seconds)?, move || {
                call_logged(&plugin, "timer callback", &callback, ());
            });
            Ok(LuaTimer(handle))
        },
    )?;

    let c = ctl.clone();
    set_fn(lua, &table, "spawn", move |_, callback: LuaFunction| {
        let plugin = c.plugin_name().to_string();
        let task = c.spawn(async move {
            if let Err(e) = callback.call_async::<()>(()).await {
                log::error!("[{plugin}] Lua task failed: {e}");
            }
            Ok(())
        });
        Ok(LuaTask(task))
    })?;

    let sleep_fn = lua
        .create_async_function(|_, seconds: f64| async move {
            tokio::time::sleep(duration(seconds)?).await;
            Ok(())
        })
        .map_err(|e| anyhow!("Failed to create ctl.sleep function: {e}"))?;
    table
        .set("sleep", sleep_fn)
        .map_err(|e| anyhow!("Failed to set ctl.sleep: {e}"))?;

    // Windows

    let c = ctl.clone();
    set_fn(
        lua,
        &table,
        "message_box",
        move |lua, (body, opts): (String, Option<LuaTable>)| {
            let message = message_box_from(lua, c.plugin_name(), body, opts)?;
            Ok(c.message_box(message).get())
        },
    )?;

    let c = ctl.clone();
    set_fn(
        lua,
        &table,
        "window_make",
        move |lua, (tree, opts): (LuaTable, Option<LuaTable>)| {
            let node = RenderNode::from_lua_table(&tree)
                .map_err(|e| LuaError::RuntimeError(format!("Invalid render tree: {e}")))?;
            let mut spec = WindowSpec::new(node);
            let mut active = true;
            if let Some(opts) = opts {
                spec.title = opts.get("title")?;
                spec = spec
                    .flags(parse_flags(lua, opts.get("flags")?)?)
                    .overlay(parse_overlay(lua, opts.get("overlay")?)?);
                active = opts.get::<Option<bool>>("active")?.unwrap_or(true);
            }
            Ok(c.window_make(spec, active).get())
        },
    )?;

    let c = ctl.clone();
    set_fn(lua, &table, "window_close", move |_, id: u64| {
        Ok(c.window_close(WindowId(id)))
    })?;

    let c = ctl.clone();
    set_fn(lua, &table, "window_close_top", move |_, ()| {
        Ok(c.window_close_top())
    })?;

    let c = ctl.clone();
    set_fn(lua, &table, "window_close_all", move |_, ()| {
        c.window_close_all();
        Ok(())
    })?;

    // System

    let c = ctl.clone();
    set_fn(
        lua,
        &table,
        "exec",
        move |_, (args, sudo): (Vec<String>, Option<bool>)| {
            Ok(c.sys_exec(&args, sudo.unwrap_or(false)))
        },
    )?;

    let c = ctl.clone();
    set_fn(lua, &table, "reboot", move |_, ()| Ok(c.sys_reboot()))?;

    let c = ctl.clone();
    set_fn(lua, &table, "poweroff", move |_, ()| Ok(c.sys_poweroff()))?;

    let c = ctl;
    set_fn(lua, &table, "chvt", move |_, vt: u16| Ok(c.sys_chvt(vt)))?;

    lua.globals()
        .set("ctl", table)
        .map_err(|e| anyhow!("Failed to register ctl table globally: {e}"))?;

    Ok(())
}
