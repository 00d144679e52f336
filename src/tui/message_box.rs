//! Transient overlay window with a message and a row of buttons.
//!
//! Clicking a button runs, in order: the auto-close (if enabled for that
//! button), the button's own callback, then the box-wide callback. Both
//! callbacks receive the message box window id and the button index.

// Rust guideline compliant 2026-02

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;

use super::render_tree::{
    ButtonProps, ButtonsProps, ParagraphAlignment, RenderNode, SpanColor, SpanStyle, StyledContent,
    WidgetProps, WidgetType,
};
use super::view::{Selection, View};
use crate::wm::{
    Content, OverlaySpec, WeakWindowManager, WindowFlags, WindowId, WindowManager, WindowSpec,
};

/// Callback receiving the message box window and the clicked button index.
pub type MessageCallback = Rc<dyn Fn(WindowId, usize)>;

/// One message box button.
#[derive(Clone)]
pub struct MessageButton {
    /// Label.
    pub label: String,
    /// Label color.
    pub color: SpanColor,
    /// Runs after the auto-close, before the box-wide callback.
    pub callback: Option<MessageCallback>,
    /// Close the box when clicked (`None` = the box default).
    pub autoclose: Option<bool>,
}

impl MessageButton {
    /// Button with an explicit color.
    pub fn new(label: impl Into<String>, color: SpanColor) -> Self {
        Self {
            label: label.into(),
            color,
            callback: None,
            autoclose: None,
        }
    }

    /// Named preset: `OK` cyan, `Cancel` white, `Yes` cyan, `No` magenta.
    /// Unknown names become plain white buttons.
    #[must_use]
    pub fn preset(name: &str) -> Self {
        let color = match name {
            "OK" | "Yes" => SpanColor::Cyan,
            "No" => SpanColor::Magenta,
            _ => SpanColor::White,
        };
        Self::new(name, color)
    }

    /// Attach a callback.
    pub fn on_click(mut self, callback: impl Fn(WindowId, usize) + 'static) -> Self {
        self.callback = Some(Rc::new(callback));
        self
    }

    /// Override the auto-close behavior.
    #[must_use]
    pub fn autoclose(mut self, autoclose: bool) -> Self {
        self.autoclose = Some(autoclose);
        self
    }
}

impl fmt::Debug for MessageButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageButton")
            .field("label", &self.label)
            .field("color", &self.color)
            .field("autoclose", &self.autoclose)
            .finish_non_exhaustive()
    }
}

/// Description of a message box.
#[derive(Clone)]
pub struct MessageBox {
    /// Body lines.
    pub body: Vec<StyledContent>,
    /// Window title.
    pub title: Option<String>,
    /// Buttons, left to right.
    pub buttons: Vec<MessageButton>,
    /// Box-wide callback.
    pub callback: Option<MessageCallback>,
    /// Default auto-close for buttons that do not override it.
    pub autoclose: bool,
    /// Parent window (`None` = root).
    pub parent: Option<WindowId>,
}

impl MessageBox {
    /// Message box with a single `OK` button.
    pub fn new(body: impl Into<StyledContent>) -> Self {
        Self {
            body: vec![body.into()],
            title: None,
            buttons: vec![MessageButton::preset("OK")],
            callback: None,
            autoclose: true,
            parent: None,
        }
    }

    /// Replace the buttons with presets from a comma-separated list (`"Yes,No"`).
    #[must_use]
    pub fn presets(mut self, names: &str) -> Self {
        self.buttons = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(MessageButton::preset)
            .collect();
        self
    }

    /// Replace the buttons.
    #[must_use]
    pub fn buttons(mut self, buttons: Vec<MessageButton>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the box-wide callback.
    pub fn callback(mut self, callback: impl Fn(WindowId, usize) + 'static) -> Self {
        self.callback = Some(Rc::new(callback));
        self
    }

    /// Open under `parent` instead of the root.
    #[must_use]
    pub fn parent(mut self, parent: WindowId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Open the message box as an active overlay window.
    pub fn open(self, wm: &WindowManager) -> WindowId {
        let parent = self.parent.unwrap_or_else(|| wm.root());
        let mut flags = WindowFlags::BORDER;
        let title = self.title.clone().filter(|t| !t.is_empty());
        if title.is_some() {
            flags |= WindowFlags::TITLE;
        }

        let weak = wm.downgrade();
        let mut spec = WindowSpec::from_factory(move |id| {
            Content::view(MessageBoxView {
                focus: Cell::new(Selection::new(self.buttons.len())),
                message: self,
                wm: weak,
                id,
            })
        })
        .flags(flags)
        .overlay(OverlaySpec::Default);
        spec.title = title;

        wm.make_window(parent, spec, true)
    }
}

impl fmt::Debug for MessageBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBox")
            .field("body", &self.body)
            .field("title", &self.title)
            .field("buttons", &self.buttons)
            .field("autoclose", &self.autoclose)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

struct MessageBoxView {
    message: MessageBox,
    focus: Cell<Selection>,
    wm: WeakWindowManager,
    id: WindowId,
}

impl MessageBoxView {
    fn click(&self, index: usize) {
        let Some(button) = self.message.buttons.get(index) else {
            return;
        };
        if button.autoclose.unwrap_or(self.message.autoclose) {
            if let Some(wm) = self.wm.upgrade() {
                wm.close(self.id);
            }
        }
        if let Some(callback) = &button.callback {
            callback(self.id, index);
        }
        if let Some(callback) = &self.message.callback {
            callback(self.id, index);
        }
    }

    fn refresh(&self) {
        if let Some(wm) = self.wm.upgrade() {
            wm.update();
        }
    }
}

impl View for MessageBoxView {
    fn render(&self) -> RenderNode {
        let mut rows = vec![(
            Constraint::Min(0),
            RenderNode::paragraph(self.message.body.iter().cloned()),
        )];
        if !self.message.buttons.is_empty() {
            let focused = self.focus.get().index();
            let buttons = RenderNode::Widget {
                widget_type: WidgetType::Buttons,
                block: None,
                props: Some(WidgetProps::Buttons(ButtonsProps {
                    buttons: self
                        .message
                        .buttons
                        .iter()
                        .map(|b| ButtonProps {
                            label: b.label.clone(),
                            style: Some(SpanStyle::fg(b.color)),
                            disabled: false,
                        })
                        .collect(),
                    focused: Some(focused),
                    alignment: ParagraphAlignment::Center,
                })),
            };
            rows.push((Constraint::Length(1), RenderNode::empty()));
            rows.push((Constraint::Length(1), buttons));
        }
        RenderNode::rows(rows)
    }

    fn handle_key(&self, key: &KeyEvent) -> bool {
        let mut focus = self.focus.get();
        let moved = match key.code {
            KeyCode::Left | KeyCode::BackTab => {
                focus.up();
                true
            }
            KeyCode::Right | KeyCode::Tab => {
                focus.down();
                true
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.click(focus.index());
                return true;
            }
            _ => false,
        };
        if moved {
            self.focus.set(focus);
            self.refresh();
        }
        moved
    }
}
