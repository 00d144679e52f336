//! Stack-based breadcrumb menu.
//!
//! Menus live in a registry keyed by string. Navigation is a stack of keys
//! whose bottom entry is always the root key. The view shows a `BACK` button
//! and the breadcrumb trail above the buttons of the menu on top of the
//! stack.
//!
//! ```text
//! [ BACK ] /System
//! ┌──────────────────────────┐
//! │ Show system log (5 sec.) │  ◄── focus (Up/Down/Home/End, Enter)
//! │ Reset                    │
//! └──────────────────────────┘
//! ```

// Rust guideline compliant 2026-02

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;

use super::render_tree::{
    ButtonProps, ButtonsProps, ListItemProps, ListProps, ParagraphAlignment, RenderNode,
    WidgetProps, WidgetType,
};
use super::view::{ChangeNotifier, Selection, View};

/// Label of the back button.
pub const BACK_LABEL: &str = "BACK";

/// What a menu button does.
#[derive(Clone)]
pub enum MenuAction {
    /// Push the menu registered under this key.
    Submenu(String),
    /// Run a callback.
    Callback(Rc<dyn Fn()>),
}

impl fmt::Debug for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submenu(key) => f.debug_tuple("Submenu").field(key).finish(),
            Self::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

/// A labelled menu entry.
#[derive(Debug, Clone)]
pub struct MenuButton {
    /// Displayed label.
    pub label: String,
    /// Activation behavior.
    pub action: MenuAction,
}

impl MenuButton {
    /// Button that opens a submenu.
    pub fn submenu(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: MenuAction::Submenu(key.into()),
        }
    }

    /// Button that runs a callback.
    pub fn callback(label: impl Into<String>, f: impl Fn() + 'static) -> Self {
        Self {
            label: label.into(),
            action: MenuAction::Callback(Rc::new(f)),
        }
    }
}

struct MenuEntry {
    title: String,
    buttons: Vec<MenuButton>,
    /// Index 0 is the back button, `1..=buttons.len()` the entries.
    focus: Selection,
}

struct MenuState {
    entries: HashMap<String, MenuEntry>,
    stack: Vec<String>,
}

impl MenuState {
    fn top(&self) -> &MenuEntry {
        let key = self.stack.last().unwrap_or(&self.stack[0]);
        &self.entries[key]
    }

    fn top_mut(&mut self) -> &mut MenuEntry {
        let key = self.stack[self.stack.len() - 1].clone();
        match self.entries.get_mut(&key) {
            Some(entry) => entry,
            None => panic!("Menu stack names unregistered key '{key}'"),
        }
    }
}

/// The breadcrumb menu. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Menu {
    state: Rc<RefCell<MenuState>>,
    changed: ChangeNotifier,
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Menu")
            .field("menus", &state.entries.len())
            .field("stack", &state.stack)
            .finish_non_exhaustive()
    }
}

impl Menu {
    /// Menu whose root is registered under `root_key` with an empty title.
    pub fn new(root_key: impl Into<String>) -> Self {
        let root_key = root_key.into();
        let mut entries = HashMap::new();
        entries.insert(
            root_key.clone(),
            MenuEntry {
                title: String::new(),
                buttons: Vec::new(),
                focus: Selection::new(1),
            },
        );
        Self {
            state: Rc::new(RefCell::new(MenuState {
                entries,
                stack: vec![root_key],
            })),
            changed: ChangeNotifier::default(),
        }
    }

    /// Hook run after every visible change.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.changed
    }

    /// The fixed root key.
    #[must_use]
    pub fn root_key(&self) -> String {
        self.state.borrow().stack[0].clone()
    }

    /// Keys on the navigation stack, root first.
    #[must_use]
    pub fn stack(&self) -> Vec<String> {
        self.state.borrow().stack.clone()
    }

    /// Whether a menu is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.borrow().entries.contains_key(key)
    }

    /// Title of a registered menu.
    #[must_use]
    pub fn title(&self, key: &str) -> Option<String> {
        self.state.borrow().entries.get(key).map(|e| e.title.clone())
    }

    /// Button labels of a registered menu.
    #[must_use]
    pub fn labels(&self, key: &str) -> Vec<String> {
        self.state
            .borrow()
            .entries
            .get(key)
            .map(|e| e.buttons.iter().map(|b| b.label.clone()).collect())
            .unwrap_or_default()
    }

    /// `/`-joined titles of the stack, or `/` when that is empty.
    #[must_use]
    pub fn breadcrumbs(&self) -> String {
        let state = self.state.borrow();
        let crumbs = state
            .stack
            .iter()
            .map(|key| state.entries[key].title.as_str())
            .collect::<Vec<_>>()
            .join("/");
        if crumbs.is_empty() {
            "/".to_string()
        } else {
            crumbs
        }
    }

    /// Register or update a menu.
    ///
    /// With `replace == false` and an existing entry, the new buttons are
    /// merged with the old ones (after them when `append`, else before) and
    /// the old title is kept unless a new one is given. A missing title
    /// defaults to the key.
    pub fn setup(
        &self,
        key: &str,
        title: Option<String>,
        buttons: Vec<MenuButton>,
        append: bool,
        replace: bool,
    ) {
        let on_stack = {
            let mut state = self.state.borrow_mut();
            let previous = state.entries.remove(key);
            let had_buttons = previous.as_ref().is_some_and(|old| !old.buttons.is_empty());

            let (title, buttons, mut focus) = match previous {
                Some(old) if !replace => {
                    let title = title.or(Some(old.title));
                    let mut merged = Vec::with_capacity(old.buttons.len() + buttons.len());
                    if append {
                        merged.extend(old.buttons);
                        merged.extend(buttons);
                    } else {
                        merged.extend(buttons);
                        merged.extend(old.buttons);
                    }
                    (title, merged, old.focus)
                }
                Some(old) => (title, buttons, old.focus),
                None => (title, buttons, Selection::default()),
            };

            focus.set_count(buttons.len() + 1);
            if !had_buttons && !buttons.is_empty() {
                // start on the first entry rather than BACK
                focus.select(1);
            }

            state.entries.insert(
                key.to_string(),
                MenuEntry {
                    title: title.unwrap_or_else(|| key.to_string()),
                    buttons,
                    focus,
                },
            );
            state.stack.iter().any(|k| k == key)
        };
        log::debug!("Menu '{key}' set up");

        if on_stack {
            self.changed.notify();
        }
    }

    /// [`setup`](Self::setup) on the root key.
    pub fn setup_root(
        &self,
        title: Option<String>,
        buttons: Vec<MenuButton>,
        append: bool,
        replace: bool,
    ) {
        let root = self.root_key();
        self.setup(&root, title, buttons, append, replace);
    }

    /// Drop a menu. No-op for the root key or unknown keys.
    ///
    /// If the key is on the stack, the stack is truncated at its first
    /// occurrence.
    pub fn remove(&self, key: &str) {
        let on_stack = {
            let mut state = self.state.borrow_mut();
            if key == state.stack[0] || state.entries.remove(key).is_none() {
                return;
            }
            match state.stack.iter().position(|k| k == key) {
                Some(index) => {
                    state.stack.truncate(index);
                    true
                }
                None => false,
            }
        };
        if on_stack {
            self.changed.notify();
        }
    }

    /// Push a registered submenu. No-op for the root key or unknown keys.
    pub fn push(&self, key: &str) {
        {
            let mut state = self.state.borrow_mut();
            if key == state.stack[0] || !state.entries.contains_key(key) {
                return;
            }
            state.stack.push(key.to_string());
        }
        self.changed.notify();
    }

    /// Pop one level. Returns `false` at depth 1.
    pub fn pop(&self) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.stack.len() <= 1 {
                return false;
            }
            state.stack.pop();
        }
        self.changed.notify();
        true
    }

    /// Activate the button at `index` of the menu on top of the stack.
    pub fn activate(&self, index: usize) {
        let action = {
            let state = self.state.borrow();
            match state.top().buttons.get(index) {
                Some(button) => button.action.clone(),
                None => return,
            }
        };
        match action {
            MenuAction::Submenu(key) => self.push(&key),
            MenuAction::Callback(callback) => callback(),
        }
    }

    fn focus(&self) -> usize {
        self.state.borrow().top().focus.index()
    }
}

impl View for Menu {
    fn render(&self) -> RenderNode {
        let crumbs = self.breadcrumbs();
        let state = self.state.borrow();
        let depth = state.stack.len();
        let entry = state.top();
        let focus = entry.focus.index();

        let back = RenderNode::Widget {
            widget_type: WidgetType::Buttons,
            block: None,
            props: Some(WidgetProps::Buttons(ButtonsProps {
                buttons: vec![ButtonProps {
                    label: BACK_LABEL.to_string(),
                    style: None,
                    disabled: depth <= 1,
                }],
                focused: (focus == 0).then_some(0),
                alignment: ParagraphAlignment::Left,
            })),
        };
        let list = RenderNode::Widget {
            widget_type: WidgetType::List,
            block: None,
            props: Some(WidgetProps::List(ListProps {
                items: entry
                    .buttons
                    .iter()
                    .map(|b| ListItemProps::plain(b.label.clone()))
                    .collect(),
                selected: focus.checked_sub(1),
                highlight_style: None,
                highlight_symbol: None,
            })),
        };

        let back_width = BACK_LABEL.len() as u16 + 4;
        RenderNode::rows(vec![
            (
                Constraint::Length(1),
                RenderNode::columns(vec![
                    (Constraint::Length(back_width + 1), back),
                    (Constraint::Min(0), RenderNode::text(crumbs)),
                ]),
            ),
            (Constraint::Min(0), list),
        ])
    }

    fn handle_key(&self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace => self.pop(),
            KeyCode::Enter => {
                let focus = self.focus();
                if focus == 0 {
                    self.pop();
                } else {
                    self.activate(focus - 1);
                }
                true
            }
            _ => {
                let moved = self.state.borrow_mut().top_mut().focus.navigate(key);
                if moved {
                    self.changed.notify();
                }
                moved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::cell::Cell;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn noop(label: &str) -> MenuButton {
        MenuButton::callback(label, || {})
    }

    #[test]
    fn test_fresh_menu_breadcrumbs() {
        let menu = Menu::new("menu");
        assert_eq!(menu.stack(), vec!["menu".to_string()]);
        assert_eq!(menu.breadcrumbs(), "/");
    }

    #[test]
    fn test_setup_merges_when_not_replacing() {
        let menu = Menu::new("menu");
        menu.setup("m", Some("Title".into()), vec![noop("a")], true, true);
        menu.setup("m", None, vec![noop("b")], true, false);
        assert_eq!(menu.labels("m"), vec!["a", "b"]);
        assert_eq!(menu.title("m").as_deref(), Some("Title"));

        menu.setup("m", None, vec![noop("c")], false, false);
        assert_eq!(menu.labels("m"), vec!["c", "a", "b"]);

        menu.setup("m", None, vec![noop("d")], true, true);
        assert_eq!(menu.labels("m"), vec!["d"]);
        assert_eq!(menu.title("m").as_deref(), Some("m"));
    }

    #[test]
    fn test_root_buttons_prepend_by_default_order() {
        let menu = Menu::new("menu");
        menu.setup_root(None, vec![MenuButton::submenu("System", "system")], false, false);
        menu.setup_root(None, vec![MenuButton::submenu("Configuration", "config")], false, false);
        assert_eq!(menu.labels("menu"), vec!["Configuration", "System"]);
        assert_eq!(menu.title("menu").as_deref(), Some(""));
    }

    #[test]
    fn test_remove_root_is_noop() {
        let menu = Menu::new("menu");
        menu.remove("menu");
        assert!(menu.contains("menu"));
        assert_eq!(menu.stack().len(), 1);
    }

    #[test]
    fn test_remove_truncates_stack() {
        let menu = Menu::new("menu");
        menu.setup("a", Some("A".into()), vec![MenuButton::submenu("to b", "b")], true, true);
        menu.setup("b", Some("B".into()), vec![], true, true);
        menu.push("a");
        menu.push("b");
        assert_eq!(menu.breadcrumbs(), "/A/B");

        menu.remove("a");
        assert_eq!(menu.stack(), vec!["menu".to_string()]);
        assert!(!menu.contains("a"));
        assert!(menu.contains("b"));
    }

    #[test]
    fn test_push_ignores_root_and_unknown() {
        let menu = Menu::new("menu");
        menu.push("menu");
        menu.push("missing");
        assert_eq!(menu.stack().len(), 1);
    }

    #[test]
    fn test_back_keys_pop_only_above_root() {
        let menu = Menu::new("menu");
        menu.setup("sub", None, vec![noop("x")], true, true);
        assert!(!menu.handle_key(&key(KeyCode::Esc)));

        menu.push("sub");
        assert!(menu.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(menu.stack().len(), 1);
    }

    #[test]
    fn test_enter_activates_focused_entry() {
        let menu = Menu::new("menu");
        let hits = Rc::new(Cell::new(0));
        let hits_in = Rc::clone(&hits);
        menu.setup_root(
            None,
            vec![
                MenuButton::submenu("Sub", "sub"),
                MenuButton::callback("Count", move || hits_in.set(hits_in.get() + 1)),
            ],
            false,
            false,
        );
        menu.setup("sub", Some("Sub".into()), vec![noop("inner")], true, true);

        assert!(menu.handle_key(&key(KeyCode::Down)));
        assert!(menu.handle_key(&key(KeyCode::Enter)));
        assert_eq!(hits.get(), 1);

        assert!(menu.handle_key(&key(KeyCode::Home)));
        assert!(menu.handle_key(&key(KeyCode::Enter)));
        assert!(menu.handle_key(&key(KeyCode::Down)));
        assert!(menu.handle_key(&key(KeyCode::Enter)));
        assert_eq!(menu.stack(), vec!["menu".to_string(), "sub".to_string()]);
    }

    #[test]
    fn test_callback_may_reenter_menu() {
        let menu = Menu::new("menu");
        let inner = menu.clone();
        menu.setup_root(
            None,
            vec![MenuButton::callback("Add", move || {
                inner.setup("later", None, vec![], true, true);
            })],
            false,
            false,
        );
        menu.activate(0);
        assert!(menu.contains("later"));
    }

    #[test]
    fn test_changes_on_stack_notify() {
        let menu = Menu::new("menu");
        let count = Rc::new(Cell::new(0));
        let count_in = Rc::clone(&count);
        menu.notifier().set(move || count_in.set(count_in.get() + 1));

        menu.setup("off_stack", None, vec![], true, true);
        assert_eq!(count.get(), 0);
        menu.setup_root(None, vec![noop("a")], false, false);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_render_disables_back_at_root() {
        let menu = Menu::new("menu");
        menu.setup_root(None, vec![noop("a")], false, false);
        let RenderNode::VSplit { children, .. } = menu.render() else {
            panic!("Expected menu layout");
        };
        let RenderNode::HSplit { children: header, .. } = &children[0] else {
            panic!("Expected header row");
        };
        let RenderNode::Widget {
            props: Some(WidgetProps::Buttons(row)),
            ..
        } = &header[0]
        else {
            panic!("Expected back button");
        };
        assert!(row.buttons[0].disabled);
        let RenderNode::Widget {
            props: Some(WidgetProps::List(list)),
            ..
        } = &children[1]
        else {
            panic!("Expected button list");
        };
        assert_eq!(list.selected, Some(0));
    }
}
