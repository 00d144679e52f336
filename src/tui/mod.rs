//! TUI - render trees, views and the terminal host.
//!
//! # Architecture
//!
//! ```text
//! View / RenderNode  ──► WindowManager composite ──► Screen (RenderSink)
//!                                                      │
//!                        Host::paint ◄─────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`render_tree`] - Declarative render tree and its ratatui interpreter
//! - [`layout`] - Overlay geometry and rect helpers
//! - [`view`] - `View` trait and shared focus/input helpers
//! - [`menu`] - Menu registry and navigation stack
//! - [`frame`] - Header/body/footer frame around the menu
//! - [`message_box`] - Button message boxes
//! - [`screen`] - Render sink holding the latest composite
//! - [`runner`] - `Host` boundary and the crossterm/ratatui host
//! - [`guard`] - Terminal state RAII guard for cleanup

// Rust guideline compliant 2026-02

pub mod frame;
pub mod guard;
pub mod layout;
pub mod menu;
pub mod message_box;
pub mod render_tree;
pub mod runner;
pub mod screen;
pub mod view;

#[doc(inline)]
pub use frame::MenuFrame;
#[doc(inline)]
pub use guard::{restore_terminal, TerminalGuard};
#[doc(inline)]
pub use layout::{Extent, GeometryPatch, HAlign, OverlayGeometry, VAlign};
#[doc(inline)]
pub use menu::{Menu, MenuAction, MenuButton};
#[doc(inline)]
pub use message_box::{MessageBox, MessageButton};
#[doc(inline)]
pub use render_tree::{RenderNode, SpanColor, SpanStyle, StyledContent};
#[doc(inline)]
pub use runner::{Host, TerminalHost};
#[doc(inline)]
pub use screen::Screen;
#[doc(inline)]
pub use view::{ChangeNotifier, View};
