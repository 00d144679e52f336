//! Window management: an arena-backed window tree composited into one
//! render tree.
//!
//! # Architecture
//!
//! ```text
//! WindowManager (Rc, cloneable)
//!  ├── Tree (RefCell)
//!  │    ├── windows: HashMap<WindowId, Window>
//!  │    ├── root     (always open, never closes, never floats)
//!  │    └── active   (always an open window or the root)
//!  ├── WindowStyle   (per window: TitleBar by default)
//!  ├── ManagerStyle  (whole composite: TaskBar by default)
//!  └── RenderSink    (receives every composite)
//! ```
//!
//! Windows are referred to by [`WindowId`] only. Parent, head child and
//! next sibling links are ids inside the arena.

pub mod manager;
pub mod style;
pub mod window;

pub use manager::{RenderSink, WeakWindowManager, WindowManager};
pub use style::{ManagerStyle, TaskBar, TaskInfo, TitleBar, WindowInfo, WindowStyle};
pub use window::{
    Content, ContentSource, OverlaySpec, StyleChoice, WindowEvent, WindowFlags, WindowHandler,
    WindowId, WindowPatch, WindowSpec,
};
