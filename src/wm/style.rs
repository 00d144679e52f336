//! Window and compositor decorations.
//!
//! Styles are pure functions from a window's state to a decorated tree. The
//! compositor gathers a [`WindowInfo`] snapshot for every layer it draws and
//! hands it to the window's style together with the rendered content.

// Rust guideline compliant 2026-02

use ratatui::layout::Constraint;

use super::window::{WindowFlags, WindowId};
use crate::constants::TASK_LABEL_LEN;
use crate::tui::render_tree::{
    BlockConfig, BorderStyle, LineWeight, RenderNode, SpanStyle, StyledContent, StyledSpan,
};

/// Snapshot of a window's state at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Window id.
    pub id: WindowId,
    /// Effective title (`WIN-<id>` when unset).
    pub title: String,
    /// Flags.
    pub flags: WindowFlags,
    /// Whether the window floats over what lies beneath it.
    pub is_overlay: bool,
    /// Childless and on the active path.
    pub is_active_child: bool,
    /// Reachable from the active window through head children (inclusive).
    pub on_active_path: bool,
}

/// Per-window decoration.
pub trait WindowStyle {
    /// Decorate `content` for the window described by `info`.
    fn render(&self, info: &WindowInfo, content: RenderNode) -> RenderNode;
}

/// Task bar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Window id.
    pub id: WindowId,
    /// Effective title.
    pub title: String,
    /// Active, or parent of the active leaf.
    pub is_active_parent: bool,
}

/// Compositor-level decoration applied around the whole composite.
pub trait ManagerStyle {
    /// Decorate the composite. `tasks` lists task windows oldest first.
    fn render(&self, tasks: &[TaskInfo], composite: RenderNode) -> RenderNode;
}

/// Default window style: a title bar with an optional close affordance.
///
/// Overlays get a full frame; full-surface windows only a top rule. The
/// frame is drawn double while the window is on the active path.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleBar;

impl TitleBar {
    fn close_label(flags: WindowFlags) -> &'static str {
        if flags.contains(WindowFlags::ESC_CLOSE) {
            "Close [Esc]"
        } else {
            "Close"
        }
    }
}

impl WindowStyle for TitleBar {
    fn render(&self, info: &WindowInfo, content: RenderNode) -> RenderNode {
        if !info.flags.contains(WindowFlags::BORDER) {
            return content;
        }

        let title = info
            .flags
            .contains(WindowFlags::TITLE)
            .then(|| StyledContent::Plain(format!(" {} ", info.title)));
        let title_right = (info.flags.contains(WindowFlags::CLOSE) && info.is_active_child)
            .then(|| StyledContent::Plain(format!(" {} ", Self::close_label(info.flags))));

        content.framed(BlockConfig {
            title,
            title_right,
            borders: if info.is_overlay {
                BorderStyle::All
            } else {
                BorderStyle::Top
            },
            weight: if info.on_active_path {
                LineWeight::Double
            } else {
                LineWeight::Light
            },
            border_style: None,
        })
    }
}

/// One-row task bar listing task windows when more than one is open.
#[derive(Debug, Clone, Copy)]
pub struct TaskBar {
    label_len: usize,
}

impl TaskBar {
    /// Task bar truncating labels to `label_len` characters (0 = never).
    #[must_use]
    pub fn new(label_len: usize) -> Self {
        Self { label_len }
    }

    /// Label for a task, truncated with an ellipsis and marked when active.
    #[must_use]
    pub fn label(&self, task: &TaskInfo) -> String {
        let mut label = task.title.clone();
        if self.label_len > 0 && label.chars().count() > self.label_len {
            label = label.chars().take(self.label_len - 1).collect();
            label.push('\u{2026}');
        }
        if task.is_active_parent {
            format!("[{label}]")
        } else {
            label
        }
    }
}

impl Default for TaskBar {
    fn default() -> Self {
        Self::new(TASK_LABEL_LEN)
    }
}

impl ManagerStyle for TaskBar {
    fn render(&self, tasks: &[TaskInfo], composite: RenderNode) -> RenderNode {
        if tasks.len() <= 1 {
            return composite;
        }

        let mut spans = Vec::with_capacity(tasks.len() * 2);
        for (i, task) in tasks.iter().enumerate() {
            if i > 0 {
                spans.push(StyledSpan {
                    text: " ".to_string(),
                    style: SpanStyle::default(),
                });
            }
            spans.push(StyledSpan {
                text: self.label(task),
                style: SpanStyle {
                    bold: task.is_active_parent,
                    ..SpanStyle::default()
                },
            });
        }

        RenderNode::rows(vec![
            (Constraint::Min(0), composite),
            (Constraint::Length(1), RenderNode::text(StyledContent::Styled(spans))),
        ])
    }
}
