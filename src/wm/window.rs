//! Window descriptions, flags and lifecycle notifications.
//!
//! A [`WindowSpec`] describes a window before it exists; the compositor turns
//! it into an arena entry keyed by [`WindowId`]. Everything a caller can hold
//! on to is a plain id, so no window ever owns a pointer to another.

// Rust guideline compliant 2026-02

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use super::manager::WindowManager;
use super::style::WindowStyle;
use crate::tui::layout::{GeometryPatch, OverlayGeometry};
use crate::tui::render_tree::RenderNode;
use crate::tui::view::View;

/// Identity of a window, issued by its compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) u64);

impl WindowId {
    /// Raw numeric id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Behavior and decoration switches of a window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowFlags: u8 {
        /// Esc closes the window when its content ignores the key.
        const ESC_CLOSE = 1 << 0;
        /// Draw a border.
        const BORDER = 1 << 1;
        /// Draw the title in the border.
        const TITLE = 1 << 2;
        /// Draw a close affordance in the border.
        const CLOSE = 1 << 3;
        /// List the window in the task bar.
        const TASK = 1 << 4;
    }
}

impl WindowFlags {
    /// No behavior, no decoration.
    pub const BASIC: Self = Self::empty();
    /// Every flag.
    pub const DEFAULT: Self = Self::all();
    /// Every flag except the interactive close paths.
    pub const DEFAULT_NO_CLOSE: Self = Self::BORDER.union(Self::TITLE).union(Self::TASK);
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Which decoration a window uses.
#[derive(Clone, Default)]
pub enum StyleChoice {
    /// The compositor's window style.
    #[default]
    Default,
    /// No decoration.
    None,
    /// An explicit style.
    Custom(Rc<dyn WindowStyle>),
}

impl fmt::Debug for StyleChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::None => write!(f, "None"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Whether and where a window floats over what lies beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlaySpec {
    /// Opaque, full-surface window.
    #[default]
    Off,
    /// Overlay using the compositor's default geometry.
    Default,
    /// Overlay with the given fields replacing the default geometry.
    Patch(GeometryPatch),
}

impl OverlaySpec {
    /// Whether the window floats.
    #[must_use]
    pub fn is_overlay(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Resolve against the compositor default. `None` for opaque windows.
    #[must_use]
    pub fn resolve(&self, default: OverlayGeometry) -> Option<OverlayGeometry> {
        match self {
            Self::Off => None,
            Self::Default => Some(default),
            Self::Patch(patch) => Some(patch.merge_over(default)),
        }
    }
}

/// What a window shows.
#[derive(Clone)]
pub enum Content {
    /// Fixed tree.
    Static(RenderNode),
    /// Interactive view.
    View(Rc<dyn View>),
}

impl Content {
    /// Wrap a view.
    pub fn view(view: impl View + 'static) -> Self {
        Self::View(Rc::new(view))
    }

    pub(crate) fn render(&self) -> RenderNode {
        match self {
            Self::Static(node) => node.clone(),
            Self::View(view) => view.render(),
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(node) => f.debug_tuple("Static").field(node).finish(),
            Self::View(_) => write!(f, "View(..)"),
        }
    }
}

impl From<RenderNode> for Content {
    fn from(node: RenderNode) -> Self {
        Self::Static(node)
    }
}

impl From<Rc<dyn View>> for Content {
    fn from(view: Rc<dyn View>) -> Self {
        Self::View(view)
    }
}

/// Content known up front, or built once the window has an id.
pub enum ContentSource {
    /// Ready-made content.
    Ready(Content),
    /// One-shot factory, invoked with the new window's id.
    Factory(Box<dyn FnOnce(WindowId) -> Content>),
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(content) => f.debug_tuple("Ready").field(content).finish(),
            Self::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Description of a window to construct.
pub struct WindowSpec {
    /// Title; `None` falls back to `WIN-<id>`.
    pub title: Option<String>,
    /// Flags.
    pub flags: WindowFlags,
    /// Decoration.
    pub style: StyleChoice,
    /// Overlay placement.
    pub overlay: OverlaySpec,
    /// Content.
    pub content: ContentSource,
    /// Lifecycle handler.
    pub handler: Option<Rc<dyn WindowHandler>>,
}

impl WindowSpec {
    /// Spec with default flags/style, opaque, showing `content`.
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            title: None,
            flags: WindowFlags::DEFAULT,
            style: StyleChoice::Default,
            overlay: OverlaySpec::Off,
            content: ContentSource::Ready(content.into()),
            handler: None,
        }
    }

    /// Spec whose content is built from the new window's id.
    pub fn from_factory(factory: impl FnOnce(WindowId) -> Content + 'static) -> Self {
        Self {
            content: ContentSource::Factory(Box::new(factory)),
            ..Self::new(RenderNode::empty())
        }
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the flags.
    pub fn flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the decoration.
    pub fn style(mut self, style: StyleChoice) -> Self {
        self.style = style;
        self
    }

    /// Set the overlay placement.
    pub fn overlay(mut self, overlay: OverlaySpec) -> Self {
        self.overlay = overlay;
        self
    }

    /// Attach a lifecycle handler.
    pub fn handler(mut self, handler: Rc<dyn WindowHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl fmt::Debug for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowSpec")
            .field("title", &self.title)
            .field("flags", &self.flags)
            .field("style", &self.style)
            .field("overlay", &self.overlay)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

/// In-place modification of an existing window. `None` fields are kept.
#[derive(Debug, Clone, Default)]
pub struct WindowPatch {
    /// New title (`Some(None)` restores the default title).
    pub title: Option<Option<String>>,
    /// New flags.
    pub flags: Option<WindowFlags>,
    /// New decoration.
    pub style: Option<StyleChoice>,
    /// New overlay placement.
    pub overlay: Option<OverlaySpec>,
}

/// A lifecycle notification travelling from a window up to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    target: WindowId,
    cancelable: bool,
    canceled: bool,
}

impl WindowEvent {
    pub(crate) fn new(target: WindowId, cancelable: bool) -> Self {
        Self {
            target,
            cancelable,
            canceled: false,
        }
    }

    /// Window the notification is about.
    #[must_use]
    pub fn target(&self) -> WindowId {
        self.target
    }

    /// Whether [`cancel`](Self::cancel) has any effect.
    #[must_use]
    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Whether a handler canceled the notification.
    #[must_use]
    pub fn canceled(&self) -> bool {
        self.canceled
    }

    /// Cancel the pending operation. Ignored for non-cancelable events.
    pub fn cancel(&mut self) {
        if self.cancelable {
            self.canceled = true;
        }
    }
}

/// Receives lifecycle notifications for a window and its descendants.
///
/// Each notification is offered to the target's handler and then to every
/// ancestor's handler up to the root. No compositor borrow is held while a
/// handler runs, so handlers may open, close or modify windows.
pub trait WindowHandler {
    /// A window was opened (cancel to suppress activation).
    fn on_open(&self, _wm: &WindowManager, _ev: &mut WindowEvent) {}

    /// A window is about to become active (cancelable).
    fn on_active(&self, _wm: &WindowManager, _ev: &mut WindowEvent) {}

    /// A window is about to close (cancelable).
    fn on_close(&self, _wm: &WindowManager, _ev: &mut WindowEvent) {}

    /// A window was destroyed and unlinked.
    fn on_destroy(&self, _wm: &WindowManager, _ev: &WindowEvent) {}
}

/// Arena entry.
pub(crate) struct Window {
    pub(crate) title: Option<String>,
    pub(crate) flags: WindowFlags,
    pub(crate) style: StyleChoice,
    pub(crate) overlay: OverlaySpec,
    pub(crate) content: Content,
    pub(crate) handler: Option<Rc<dyn WindowHandler>>,
    pub(crate) parent: Option<WindowId>,
    pub(crate) child: Option<WindowId>,
    pub(crate) next: Option<WindowId>,
    pub(crate) attached: bool,
}

impl Window {
    pub(crate) fn title_or_default(&self, id: WindowId) -> String {
        self.title.clone().unwrap_or_else(|| format!("WIN-{id}"))
    }

    pub(crate) fn is_detached(&self) -> bool {
        !self.attached && self.parent.is_none() && self.child.is_none() && self.next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_presets() {
        assert!(WindowFlags::BASIC.is_empty());
        assert!(WindowFlags::DEFAULT.contains(WindowFlags::ESC_CLOSE | WindowFlags::CLOSE));
        assert!(!WindowFlags::DEFAULT_NO_CLOSE.contains(WindowFlags::CLOSE));
        assert!(!WindowFlags::DEFAULT_NO_CLOSE.contains(WindowFlags::ESC_CLOSE));
        assert!(WindowFlags::DEFAULT_NO_CLOSE.contains(WindowFlags::TASK));
    }

    #[test]
    fn test_overlay_resolution() {
        let default = OverlayGeometry::default();
        assert_eq!(OverlaySpec::Off.resolve(default), None);
        assert_eq!(OverlaySpec::Default.resolve(default), Some(default));
        let patch = GeometryPatch {
            width: Some(crate::tui::layout::Extent::Fixed(10)),
            ..GeometryPatch::default()
        };
        let resolved = OverlaySpec::Patch(patch)
            .resolve(default)
            .expect("Should resolve patch");
        assert_eq!(resolved.width, crate::tui::layout::Extent::Fixed(10));
        assert_eq!(resolved.height, default.height);
    }

    #[test]
    fn test_event_cancel_only_when_cancelable() {
        let mut ev = WindowEvent::new(WindowId(3), false);
        ev.cancel();
        assert!(!ev.canceled());

        let mut ev = WindowEvent::new(WindowId(3), true);
        ev.cancel();
        assert!(ev.canceled());
        assert_eq!(ev.target(), WindowId(3));
    }
}
