//! Event subscription primitive for Lua units.
//!
//! Only units whose registration sets `wants_events = true` get the global
//! `events` table. Callbacks run synchronously while the event is fired and
//! should be fast.
//!
//! # Usage in Lua
//!
//! ```lua
//! local id = events.on("key", function(key)
//!     log.info(key.name .. (key.pressed and " down" or " up"))
//! end)
//!
//! events.on("raw", function(ev)
//!     if ev.type == "key" and ev.key == "f5" then ctl.reset() end
//! end)
//!
//! events.off(id)
//! ```
//!
//! # Event tables
//!
//! - `key`: `{ code = 103, name = "KEY_UP", pressed = true }`
//! - `raw`: `{ type = "key", key = "up", kind = "press" }`,
//!   `{ type = "resize", width = 80, height = 24 }`, `{ type = "paste", text = "..." }`,
//!   `{ type = "mouse" }`, `{ type = "focus_gained" }`, `{ type = "focus_lost" }`

// Rust guideline compliant 2026-02

use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use crossterm::event::{Event, KeyEventKind};
use mlua::prelude::*;

use super::call_logged;
use crate::device::DeviceKey;
use crate::plugin::{Events, SubscriptionId};
use crate::tui::view::key_name;

/// Subscriber list a Lua callback goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Terminal events.
    Raw,
    /// Device keys.
    Key,
}

impl FromStr for EventKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(Self::Raw),
            "key" => Ok(Self::Key),
            other => bail!("Unknown event kind '{other}', expected 'raw' or 'key'"),
        }
    }
}

/// A terminal event as seen from Lua.
pub struct RawEvent(pub Event);

impl IntoLua for RawEvent {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        match &self.0 {
            Event::Key(key) => {
                table.set("type", "key")?;
                table.set("key", key_name(key))?;
                let kind = match key.kind {
                    KeyEventKind::Press => "press",
                    KeyEventKind::Repeat => "repeat",
                    KeyEventKind::Release => "release",
                };
                table.set("kind", kind)?;
            }
            Event::Resize(width, height) => {
                table.set("type", "resize")?;
                table.set("width", *width)?;
                table.set("height", *height)?;
            }
            Event::Paste(text) => {
                table.set("type", "paste")?;
                table.set("text", text.as_str())?;
            }
            Event::Mouse(_) => table.set("type", "mouse")?,
            Event::FocusGained => table.set("type", "focus_gained")?,
            Event::FocusLost => table.set("type", "focus_lost")?,
        }
        Ok(LuaValue::Table(table))
    }
}

/// A device key as seen from Lua.
pub struct KeyArg(pub DeviceKey);

impl IntoLua for KeyArg {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("code", self.0.code)?;
        table.set("name", self.0.name)?;
        table.set("pressed", self.0.pressed)?;
        Ok(LuaValue::Table(table))
    }
}

/// Subscribe a Lua function to `kind`. With `this`, the function is called
/// as a method (`this` first, then the event).
pub fn subscribe(
    events: &Events,
    plugin: &str,
    kind: EventKind,
    callback: LuaFunction,
    this: Option<LuaTable>,
) -> SubscriptionId {
    let plugin = plugin.to_string();
    match kind {
        EventKind::Raw => events.on_raw(move |ev| {
            let arg = RawEvent(ev.clone());
            let what = "raw event callback";
            match &this {
                Some(this) => call_logged(&plugin, what, &callback, (this.clone(), arg)),
                None => call_logged(&plugin, what, &callback, arg),
            };
        }),
        EventKind::Key => events.on_key(move |key| {
            let arg = KeyArg(key.clone());
            let what = "key event callback";
            match &this {
                Some(this) => call_logged(&plugin, what, &callback, (this.clone(), arg)),
                None => call_logged(&plugin, what, &callback, arg),
            };
        }),
    }
}

/// Register the global `events` table.
///
/// Adds:
/// - `events.on(kind, callback)` -> subscription id
/// - `events.off(id)` -> whether it existed
///
/// # Errors
///
/// Returns an error if Lua table or function creation fails.
pub fn register(lua: &Lua, plugin: &str, events: Events) -> Result<()> {
    let table = lua
        .create_table()
        .map_err(|e| anyhow!("Failed to create events table: {e}"))?;

    let ev = events.clone();
    let owner = plugin.to_string();
    let on_fn = lua
        .create_function(move |_, (kind, callback): (String, LuaFunction)| {
            let kind: EventKind = kind
                .parse()
                .map_err(|e: anyhow::Error| LuaError::RuntimeError(e.to_string()))?;
            Ok(subscribe(&ev, &owner, kind, callback, None))
        })
        .map_err(|e| anyhow!("Failed to create events.on function: {e}"))?;
    table
        .set("on", on_fn)
        .map_err(|e| anyhow!("Failed to set events.on: {e}"))?;

    let off_fn = lua
        .create_function(move |_, id: String| Ok(events.off(&id)))
        .map_err(|e| anyhow!("Failed to create events.off function: {e}"))?;
    table
        .set("off", off_fn)
        .map_err(|e| anyhow!("Failed to set events.off: {e}"))?;

    lua.globals()
        .set("events", table)
        .map_err(|e| anyhow!("Failed to register events table globally: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent};

    use super::*;

    #[test]
    fn test_on_fire_off() {
        let lua = Lua::new();
        let events = Events::new();
        register(&lua, "unit", events.clone()).expect("Should register events");

        lua.load(
            r#"
            seen = {}
            sub = events.on("key", function(key)
                table.insert(seen, key.name .. ":" .. tostring(key.pressed))
            end)
            events.on("raw", function(ev) table.insert(seen, ev.type .. ":" .. ev.key) end)
            "#,
        )
        .exec()
        .expect("Should subscribe");
        assert_eq!(events.len(), 2);

        events.fire_key(&DeviceKey {
            code: 28,
            name: "KEY_ENTER".to_string(),
            pressed: false,
        });
        events.fire_raw(&Event::Key(KeyEvent::from(KeyCode::Up)));

        let removed: bool = lua.load("return events.off(sub)").eval().expect("Should off");
        assert!(removed);
        assert_eq!(events.len(), 1);

        let seen: Vec<String> = lua.globals().get("seen").expect("Should read");
        assert_eq!(seen, vec!["KEY_ENTER:false", "key:up"]);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let lua = Lua::new();
        register(&lua, "unit", Events::new()).expect("Should register events");
        let err = lua
            .load(r#"events.on("mouse", function() end)"#)
            .exec()
            .expect_err("Unknown kind");
        assert!(err.to_string().contains("Unknown event kind"));
    }

    #[test]
    fn test_failing_callback_does_not_stop_others() {
        let lua = Lua::new();
        let events = Events::new();
        register(&lua, "unit", events.clone()).expect("Should register events");
        lua.load(
            r#"
            count = 0
            events.on("key", function() error("boom") end)
            events.on("key", function() count = count + 1 end)
            "#,
        )
        .exec()
        .expect("Should subscribe");

        let key = DeviceKey {
            code: 103,
            name: "KEY_UP".to_string(),
            pressed: true,
        };
        assert_eq!(events.fire_key(&key), 2);
        let count: u32 = lua.globals().get("count").expect("Should read");
        assert_eq!(count, 1);
    }
}
