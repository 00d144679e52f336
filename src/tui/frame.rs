//! Header/body/footer frame around the main menu.
//!
//! The frame is the content of the main window. Styling plugins fill the
//! header and footer and may narrow the body; the body is always the menu.

// Rust guideline compliant 2026-02

use std::cell::{Cell, RefCell};

use crossterm::event::KeyEvent;
use ratatui::layout::Constraint;

use super::menu::Menu;
use super::render_tree::RenderNode;
use super::view::{ChangeNotifier, View};

/// Frame around the menu.
#[derive(Debug)]
pub struct MenuFrame {
    menu: Menu,
    header: RefCell<Option<RenderNode>>,
    footer: RefCell<Option<RenderNode>>,
    body_width_pct: Cell<Option<u16>>,
    changed: ChangeNotifier,
}

impl MenuFrame {
    /// Bare frame: no header, no footer, full-width body.
    #[must_use]
    pub fn new(menu: Menu) -> Self {
        let changed = menu.notifier().clone();
        Self {
            menu,
            header: RefCell::new(None),
            footer: RefCell::new(None),
            body_width_pct: Cell::new(None),
            changed,
        }
    }

    /// The framed menu.
    #[must_use]
    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Replace the header.
    pub fn set_header(&self, header: Option<RenderNode>) {
        *self.header.borrow_mut() = header;
        self.changed.notify();
    }

    /// Replace the footer.
    pub fn set_footer(&self, footer: Option<RenderNode>) {
        *self.footer.borrow_mut() = footer;
        self.changed.notify();
    }

    /// Center the body at `pct` percent of the width (`None` = full width).
    pub fn set_body_width(&self, pct: Option<u16>) {
        self.body_width_pct.set(pct.map(|p| p.min(100)));
        self.changed.notify();
    }
}

impl View for MenuFrame {
    fn render(&self) -> RenderNode {
        let mut body = self.menu.render();
        if let Some(pct) = self.body_width_pct.get() {
            let side = (100 - pct) / 2;
            body = RenderNode::columns(vec![
                (Constraint::Percentage(side), RenderNode::empty()),
                (Constraint::Percentage(pct), body),
                (Constraint::Min(0), RenderNode::empty()),
            ]);
        }

        let mut rows = Vec::with_capacity(3);
        if let Some(header) = self.header.borrow().clone() {
            rows.push((Constraint::Length(header.preferred_height(u16::MAX)), header));
        }
        rows.push((Constraint::Min(0), body));
        if let Some(footer) = self.footer.borrow().clone() {
            rows.push((Constraint::Length(footer.preferred_height(u16::MAX)), footer));
        }
        RenderNode::rows(rows)
    }

    fn handle_key(&self, key: &KeyEvent) -> bool {
        self.menu.handle_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_bare_frame_is_just_the_menu() {
        let frame = MenuFrame::new(Menu::new("menu"));
        let RenderNode::VSplit { constraints, children } = frame.render() else {
            panic!("Expected rows");
        };
        assert_eq!(constraints, vec![Constraint::Min(0)]);
        assert_eq!(children[0], frame.menu().render());
    }

    #[test]
    fn test_header_footer_and_narrow_body() {
        let frame = MenuFrame::new(Menu::new("menu"));
        let notified = Rc::new(Cell::new(0));
        let notified_in = Rc::clone(&notified);
        frame.menu().notifier().set(move || notified_in.set(notified_in.get() + 1));

        frame.set_header(Some(RenderNode::paragraph(["", "Kiosk", ""])));
        frame.set_footer(Some(RenderNode::text("v1")));
        frame.set_body_width(Some(40));
        assert_eq!(notified.get(), 3);

        let RenderNode::VSplit { constraints, children } = frame.render() else {
            panic!("Expected rows");
        };
        assert_eq!(
            constraints,
            vec![Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)]
        );
        let RenderNode::HSplit { constraints, .. } = &children[1] else {
            panic!("Expected narrowed body");
        };
        assert_eq!(constraints[1], Constraint::Percentage(40));
    }
}
