//! Kiosk shell - a full-screen terminal menu extended by plugins.
//!
//! This crate provides the core of the `kiosk` binary: a window compositor,
//! a breadcrumb menu, a cooperative scheduler and the plugin runtime that
//! ties them together.
//!
//! # Architecture
//!
//! The crate follows a single-threaded, shared-state pattern:
//!
//! - **Shell** - Owns the plugins, runs the terminal loop and the shutdown protocol
//! - **Core** - State shared by every plugin's Control (compositor, menu, scheduler)
//! - **WindowManager** - Window tree composited into one render tree
//! - **Scheduler** - Timers and tasks, driven one turn per loop iteration
//! - **Plugins** - Built-ins compiled in, Lua units loaded from the data directory
//!
//! # Modules
//!
//! - [`shell`] - Plugin registry, loop and shutdown
//! - [`plugin`] - Plugin trait, Control and Events surfaces, loader, built-ins
//! - [`lua`] - Lua runtime for user plugin units
//! - [`wm`] - Window compositor and window styles
//! - [`tui`] - Render trees, views, menu, message boxes and the terminal host
//! - [`runtime`] - Cooperative scheduler and timeout scopes
//! - [`device`] - Input devices and IR learning
//! - [`keymap`] - IR keymap files
//! - [`process`] - System commands
//! - [`config`] - Configuration loading/saving

// Rust guideline compliant 2026-02

pub mod config;
pub mod constants;
pub mod device;
pub mod keymap;
pub mod lua;
pub mod plugin;
pub mod process;
pub mod runtime;
pub mod shell;
pub mod tui;
pub mod wm;

// Re-export commonly used types
pub use config::{Config, LoadPolicy};
pub use plugin::{Control, Core, Events, Plugin};
pub use runtime::Scheduler;
pub use shell::{RunSummary, Shell, StopReason};
pub use wm::{WindowId, WindowManager, WindowSpec};
