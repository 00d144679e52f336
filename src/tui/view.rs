//! Interactive window content and the small state helpers views share.
//!
//! A window's content is either a fixed [`RenderNode`] or a [`View`]. Views
//! are shared (`Rc<dyn View>`) between the compositor and whoever created
//! them, so both methods take `&self` and keep their mutable state behind
//! `Cell`/`RefCell`.
//!
//! ```text
//! WindowManager::render()  ──► View::render()      (no manager borrow held)
//! WindowManager::handle_key() ─► View::handle_key() (topmost leaf only)
//! ```

// Rust guideline compliant 2026-02

use std::cell::RefCell;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_input::{Input, InputRequest};

use super::render_tree::RenderNode;

/// Interactive window content.
pub trait View {
    /// Describe the current state as a render tree.
    fn render(&self) -> RenderNode;

    /// Handle a key. Returns `true` if the key was consumed.
    fn handle_key(&self, _key: &KeyEvent) -> bool {
        false
    }
}

/// A view that always renders the same tree and ignores keys.
#[derive(Debug, Clone)]
pub struct StaticView(pub RenderNode);

impl View for StaticView {
    fn render(&self) -> RenderNode {
        self.0.clone()
    }
}

/// Hook a view calls after its state changed, so the compositor re-renders.
///
/// Clones share the hook. The hook is cloned out before it runs, so it may
/// be replaced from inside itself.
#[derive(Clone, Default)]
pub struct ChangeNotifier(Rc<RefCell<Option<Rc<dyn Fn()>>>>);

impl ChangeNotifier {
    /// Install the hook.
    pub fn set(&self, hook: impl Fn() + 'static) {
        *self.0.borrow_mut() = Some(Rc::new(hook));
    }

    /// Run the hook, if any.
    pub fn notify(&self) {
        let hook = self.0.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("installed", &self.0.borrow().is_some())
            .finish()
    }
}

/// Focus cursor over a fixed number of items.
///
/// Tracks the focused index and clamps when the item count changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    index: usize,
    count: usize,
}

impl Selection {
    /// Selection over `count` items, focused on the first.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self { index: 0, count }
    }

    /// Move focus up by one. Returns the new index.
    pub fn up(&mut self) -> usize {
        self.index = self.index.saturating_sub(1);
        self.index
    }

    /// Move focus down by one. Returns the new index.
    pub fn down(&mut self) -> usize {
        if self.index + 1 < self.count {
            self.index += 1;
        }
        self.index
    }

    /// Focus the first item.
    pub fn home(&mut self) -> usize {
        self.index = 0;
        self.index
    }

    /// Focus the last item.
    pub fn end(&mut self) -> usize {
        self.index = self.count.saturating_sub(1);
        self.index
    }

    /// Focus a specific index (clamped to bounds).
    pub fn select(&mut self, index: usize) -> usize {
        self.index = index.min(self.count.saturating_sub(1));
        self.index
    }

    /// Focused index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of items.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Update the item count, clamping the focus if items were removed.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        if count > 0 && self.index >= count {
            self.index = count - 1;
        } else if count == 0 {
            self.index = 0;
        }
    }

    /// Apply a navigation key. Returns `true` if the key moved the focus.
    pub fn navigate(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Up => self.up(),
            KeyCode::Down => self.down(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            _ => return false,
        };
        true
    }
}

/// Single-line text field.
///
/// Wraps [`tui_input::Input`], which manages the buffer and cursor.
#[derive(Debug, Default)]
pub struct InputField {
    input: Input,
}

impl InputField {
    /// Empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.input.value()
    }

    /// Apply an editing key. Returns `true` if the key edited the field.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return false;
        }
        let request = match key.code {
            KeyCode::Char(c) => InputRequest::InsertChar(c),
            KeyCode::Backspace => InputRequest::DeletePrevChar,
            KeyCode::Left => InputRequest::GoToPrevChar,
            KeyCode::Right => InputRequest::GoToNextChar,
            _ => return false,
        };
        self.input.handle(request);
        true
    }

    /// Clear the field.
    pub fn reset(&mut self) {
        self.input.reset();
    }
}

/// Stable name of a key, as exposed to Lua plugins (`"up"`, `"enter"`, `"a"`).
#[must_use]
pub fn key_name(key: &KeyEvent) -> String {
    let base = match key.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "backtab".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "page_up".to_string(),
        KeyCode::PageDown => "page_down".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => "unknown".to_string(),
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        format!("ctrl+{base}")
    } else if key.modifiers.contains(KeyModifiers::ALT) {
        format!("alt+{base}")
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_selection_bounds() {
        let mut sel = Selection::new(3);
        assert_eq!(sel.index(), 0);
        assert_eq!(sel.down(), 1);
        assert_eq!(sel.down(), 2);
        assert_eq!(sel.down(), 2);
        assert_eq!(sel.up(), 1);
        assert_eq!(sel.home(), 0);
        assert_eq!(sel.up(), 0);
        assert_eq!(sel.end(), 2);
    }

    #[test]
    fn test_selection_count_change_clamps() {
        let mut sel = Selection::new(5);
        sel.select(4);
        sel.set_count(3);
        assert_eq!(sel.index(), 2);
        sel.set_count(0);
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn test_selection_navigate_ignores_other_keys() {
        let mut sel = Selection::new(2);
        assert!(sel.navigate(&key(KeyCode::Down)));
        assert!(!sel.navigate(&key(KeyCode::Enter)));
        assert_eq!(sel.index(), 1);
    }

    #[test]
    fn test_input_field_editing() {
        let mut field = InputField::new();
        for c in "KEY_X".chars() {
            assert!(field.handle_key(&key(KeyCode::Char(c))));
        }
        assert!(field.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(field.value(), "KEY_");
        assert!(!field.handle_key(&key(KeyCode::Enter)));
        field.reset();
        assert_eq!(field.value(), "");
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(&key(KeyCode::Up)), "up");
        assert_eq!(key_name(&key(KeyCode::Char('q'))), "q");
        assert_eq!(
            key_name(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            "ctrl+c"
        );
    }
}
