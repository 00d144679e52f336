//! The compositor's render sink: holds the latest composite until the
//! terminal host paints it.

// Rust guideline compliant 2026-02

use std::cell::{Cell, RefCell};

use super::render_tree::RenderNode;
use crate::wm::RenderSink;

/// Latest composite plus paint bookkeeping.
///
/// Publishing marks the screen dirty. An explicit paint request (a coalesced
/// redraw) also marks it dirty even when nothing was published, forcing a
/// full repaint.
#[derive(Debug, Default)]
pub struct Screen {
    current: RefCell<Option<RenderNode>>,
    dirty: Cell<bool>,
    paint_requests: Cell<u64>,
}

impl Screen {
    /// Empty screen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a repaint on the next host turn.
    pub fn request_paint(&self) {
        self.paint_requests.set(self.paint_requests.get() + 1);
        self.dirty.set(true);
    }

    /// Number of explicit paint requests so far.
    #[must_use]
    pub fn paint_requests(&self) -> u64 {
        self.paint_requests.get()
    }

    /// Whether a paint is pending.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Mark dirty without counting a request (terminal resize).
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    /// The composite to paint, if a paint is pending. Clears the flag.
    pub fn take_paint(&self) -> Option<RenderNode> {
        if !self.dirty.replace(false) {
            return None;
        }
        self.current.borrow().clone()
    }

    /// The latest composite.
    #[must_use]
    pub fn current(&self) -> Option<RenderNode> {
        self.current.borrow().clone()
    }
}

impl RenderSink for Screen {
    fn publish(&self, tree: RenderNode) {
        *self.current.borrow_mut() = Some(tree);
        self.dirty.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_marks_dirty_once() {
        let screen = Screen::new();
        assert!(screen.take_paint().is_none());

        screen.publish(RenderNode::text("a"));
        screen.publish(RenderNode::text("b"));
        assert_eq!(screen.take_paint(), Some(RenderNode::text("b")));
        assert!(screen.take_paint().is_none());
        assert_eq!(screen.paint_requests(), 0);
    }

    #[test]
    fn test_paint_request_forces_repaint() {
        let screen = Screen::new();
        screen.publish(RenderNode::text("a"));
        let _ = screen.take_paint();

        screen.request_paint();
        assert!(screen.is_dirty());
        assert_eq!(screen.take_paint(), Some(RenderNode::text("a")));
        assert_eq!(screen.paint_requests(), 1);
    }
}
