//! RC/IR keymap editor window.
//!
//! Lists the keys of a keymap with their learned remote codes and learns
//! new codes from an IR receiver. Layout, top to bottom:
//!
//! ```text
//! RC/IR device (lirc): /sys/class/rc/rc0/lirc0 [252:0] [/dev/lirc0]
//! [ Save and Close ] [ Clear All ]
//! Search for a key to add: vol          (select a key to add)
//!   KEY_VOLUMEUP
//!   KEY_VOLUMEDOWN
//! > KEY_UP                nec:0x46
//!   KEY_LEFT              (not set)
//! ┌──────────────────────────────────────────────────────────┐
//! │ Receiving, press a key for KEY_LEFT on the remote...     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Enter on a key row learns a code for it, Delete clears its codes. Without
//! a receiver the search field is hidden and nothing can be learned.

// Rust guideline compliant 2026-02

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;

use crate::constants::{LEARN_INACTIVITY, LEARN_NOTICE};
use crate::device::{keys, learn_code, ScancodeOpener};
use crate::keymap::{Keymap, KeymapStore, ScanKey};
use crate::plugin::Control;
use crate::runtime::Task;
use crate::tui::render_tree::{
    BlockConfig, ButtonProps, ButtonsProps, InputProps, ListItemProps, ListProps,
    ParagraphAlignment, ParagraphProps, StyledSpan, WidgetProps, WidgetType,
};
use crate::tui::view::{InputField, Selection};
use crate::tui::{
    Extent, GeometryPatch, MessageBox, MessageButton, RenderNode, SpanColor, SpanStyle,
    StyledContent, View,
};
use crate::wm::{
    OverlaySpec, WeakWindowManager, WindowEvent, WindowHandler, WindowId, WindowManager,
    WindowSpec,
};

/// Window title, also used for the editor's message boxes.
pub const TITLE: &str = "RC/IR Configurator";

/// Keys listed even when the keymap has no code for them.
pub const DEFAULT_KEYS: [&str; 8] = [
    "KEY_UP",
    "KEY_LEFT",
    "KEY_RIGHT",
    "KEY_DOWN",
    "KEY_ENTER",
    "KEY_ESC",
    "KEY_POWER",
    "KEY_RESTART",
];

const SIZE_PCT: u16 = 85;
const KEY_COLUMN: usize = 20;
const SEARCH_PROMPT: &str = "Search for a key to add: ";
const SEARCH_HINT: &str = "(select a key to add)";

/// Focusable things, in focus order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Save,
    ClearAll,
    Search,
    Result(&'static str),
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Footer {
    Hidden,
    Learning {
        key: String,
        codes: Vec<ScanKey>,
        limited: bool,
    },
    Added {
        key: String,
        code: ScanKey,
    },
    Failed(String),
}

#[derive(Debug)]
struct State {
    keymap: Keymap,
    rows: Vec<String>,
    changed: bool,
    ask_close: bool,
    search: InputField,
    results: Vec<&'static str>,
    focus: Selection,
    footer: Footer,
    learning: Option<Task<()>>,
}

impl State {
    fn items(&self, searchable: bool) -> Vec<Item> {
        let mut items = vec![Item::Save, Item::ClearAll];
        if searchable {
            items.push(Item::Search);
            items.extend(self.results.iter().map(|&key| Item::Result(key)));
        }
        items.extend(self.rows.iter().cloned().map(Item::Key));
        items
    }

    /// Add rows for keymap keys not listed yet. Returns whether any was added.
    fn sync_rows(&mut self) -> bool {
        let mut added = false;
        for key in self.keymap.by_key().into_keys() {
            if !self.rows.contains(&key) {
                self.rows.push(key);
                added = true;
            }
        }
        added
    }

    fn is_learning(&self) -> bool {
        self.learning.as_ref().is_some_and(|task| !task.is_finished())
    }
}

/// The editor behind a configurator window. Serves as both the window's
/// view and its lifecycle handler.
pub struct KeymapEditor {
    me: Weak<Self>,
    ctl: Control,
    wm: WeakWindowManager,
    store: Rc<dyn KeymapStore>,
    opener: Option<Rc<dyn ScancodeOpener>>,
    id: Cell<Option<WindowId>>,
    state: RefCell<State>,
}

impl std::fmt::Debug for KeymapEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeymapEditor")
            .field("store", &self.store.location())
            .field("id", &self.id.get())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl KeymapEditor {
    /// Load the keymap from `store` and open the editor as an 85% overlay.
    ///
    /// `opener` is the IR receiver to learn from; `None` makes the editor
    /// read-only apart from clearing codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the keymap cannot be loaded.
    pub fn open(
        ctl: &Control,
        store: Rc<dyn KeymapStore>,
        opener: Option<Rc<dyn ScancodeOpener>>,
    ) -> Result<Rc<Self>> {
        let keymap = store.load()?;
        let mut state = State {
            keymap,
            rows: DEFAULT_KEYS.iter().map(ToString::to_string).collect(),
            changed: false,
            ask_close: true,
            search: InputField::new(),
            results: Vec::new(),
            focus: Selection::default(),
            footer: Footer::Hidden,
            learning: None,
        };
        state.sync_rows();
        let searchable = opener.is_some();
        state.focus.set_count(state.items(searchable).len());

        let editor = Rc::new_cyclic(|me| Self {
            me: me.clone(),
            ctl: ctl.clone(),
            wm: ctl.internals().wm.downgrade(),
            store,
            opener,
            id: Cell::new(None),
            state: RefCell::new(state),
        });

        let view: Rc<dyn View> = editor.clone();
        let spec = WindowSpec::new(view)
            .title(TITLE)
            .overlay(OverlaySpec::Patch(GeometryPatch {
                width: Some(Extent::Relative(SIZE_PCT)),
                height: Some(Extent::Relative(SIZE_PCT)),
                ..GeometryPatch::default()
            }))
            .handler(editor.clone());
        let id = ctl.window_make(spec, true);
        editor.id.set(Some(id));
        log::info!("Keymap editor opened on {}", editor.store.location());
        Ok(editor)
    }

    /// Window id, once opened.
    #[must_use]
    pub fn window(&self) -> Option<WindowId> {
        self.id.get()
    }

    /// Whether the keymap was modified since it was loaded.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.state.borrow().changed
    }

    /// Copy of the keymap being edited.
    #[must_use]
    pub fn keymap(&self) -> Keymap {
        self.state.borrow().keymap.clone()
    }

    /// Listed key names, in display order.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.state.borrow().rows.clone()
    }

    fn searchable(&self) -> bool {
        self.opener.is_some()
    }

    fn refresh(&self) {
        {
            let mut state = self.state.borrow_mut();
            let count = state.items(self.searchable()).len();
            state.focus.set_count(count);
        }
        if let Some(wm) = self.wm.upgrade() {
            wm.update();
        }
        self.ctl.redraw();
    }

    fn focused(&self) -> Option<Item> {
        let state = self.state.borrow();
        state
            .items(self.searchable())
            .into_iter()
            .nth(state.focus.index())
    }

    fn set_footer(&self, footer: Footer) {
        self.state.borrow_mut().footer = footer;
        self.refresh();
    }

    // =========================================================================
    // Editing
    // =========================================================================

    fn update_key(&self, key: &str, code: Option<&ScanKey>) {
        {
            let mut state = self.state.borrow_mut();
            state.changed = true;
            match code {
                Some(code) => state.keymap.set_scancode(code, key),
                None => state.keymap.clear_key(key),
            }
            if state.sync_rows() {
                let last = state.items(self.searchable()).len().saturating_sub(1);
                state.focus.set_count(last + 1);
                state.focus.select(last);
            }
        }
        self.refresh();
    }

    /// Drop every code, keeping the listed rows.
    pub fn clear_all(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.changed = true;
            state.keymap.clear_all();
            state.search.reset();
            state.results.clear();
        }
        self.refresh();
    }

    fn update_search(&self) {
        {
            let mut state = self.state.borrow_mut();
            let text = state.search.value().to_string();
            state.results = if text.is_empty() {
                Vec::new()
            } else {
                keys::search(&text)
            };
        }
        self.refresh();
    }

    // =========================================================================
    // Learning
    // =========================================================================

    /// Learn a code for `key` from the receiver. Ignored without a receiver
    /// or while another key is being learned.
    pub fn learn(self: &Rc<Self>, key: &str) {
        let Some(opener) = &self.opener else {
            return;
        };
        if self.state.borrow().is_learning() {
            return;
        }
        let source = match opener.open() {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Failed to open RC/IR device: {e:#}");
                self.set_footer(Footer::Failed(format!("Failed to open RC/IR device: {e:#}")));
                return;
            }
        };
        log::info!("Learning a code for {key}");
        self.set_footer(Footer::Learning {
            key: key.to_string(),
            codes: Vec::new(),
            limited: source.protocols_limited(),
        });

        let weak = Rc::downgrade(self);
        let key = key.to_string();
        let task = self.ctl.spawn(async move {
            let progress = weak.clone();
            let learned = learn_code(source, LEARN_INACTIVITY, move |codes| {
                if let Some(editor) = progress.upgrade() {
                    editor.show_progress(codes);
                }
            })
            .await;

            let added = match learned {
                Ok(Some(code)) => with_editor(&weak, |editor| editor.learned(&key, &code)).is_some(),
                Ok(None) => false,
                Err(e) => {
                    log::warn!("Learning a code for {key} failed: {e:#}");
                    false
                }
            };
            if added {
                tokio::time::sleep(LEARN_NOTICE).await;
            }
            with_editor(&weak, KeymapEditor::finish_learning);
            Ok(())
        });
        self.state.borrow_mut().learning = Some(task);
    }

    fn show_progress(&self, codes: &[ScanKey]) {
        let footer = match &self.state.borrow().footer {
            Footer::Learning { key, limited, .. } => Footer::Learning {
                key: key.clone(),
                codes: codes.to_vec(),
                limited: *limited,
            },
            _ => return,
        };
        self.set_footer(footer);
    }

    fn learned(&self, key: &str, code: &ScanKey) {
        log::info!("Added code {code} to {key}");
        self.update_key(key, Some(code));
        self.set_footer(Footer::Added {
            key: key.to_string(),
            code: code.clone(),
        });
    }

    fn finish_learning(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.learning = None;
            state.footer = Footer::Hidden;
        }
        self.refresh();
    }

    /// Stop learning, closing the receiver.
    pub fn cancel_learning(&self) {
        let task = self.state.borrow_mut().learning.take();
        if let Some(task) = task {
            task.abort();
            self.set_footer(Footer::Hidden);
        }
    }

    // =========================================================================
    // Closing
    // =========================================================================

    fn force_close(&self) {
        self.state.borrow_mut().ask_close = false;
        if let Some(id) = self.id.get() {
            self.ctl.window_close(id);
        }
    }

    /// Save and close. A changed keymap is written and a reboot offered,
    /// since the receiver only picks up keymaps at boot.
    pub fn save(self: &Rc<Self>) {
        self.cancel_learning();
        if !self.changed() {
            self.force_close();
            return;
        }

        // saved untrimmed: ir-keytable crashes on keymaps without protocols
        let keymap = self.keymap();
        if let Err(e) = self.store.save(&keymap) {
            log::error!("{e:#}");
            self.message(
                MessageBox::new(StyledContent::styled(
                    format!("Failed to save the keymap: {e:#}"),
                    SpanStyle::fg(SpanColor::Red),
                ))
                .buttons(vec![MessageButton::new("OK", SpanColor::White)]),
            );
            return;
        }
        log::info!("Keymap saved to {}", self.store.location());

        let reboot = self.ctl.clone();
        let weak = Rc::downgrade(self);
        self.message(
            MessageBox::new(
                "Saved, a reboot is required for the changes to take effect. Reboot now?",
            )
            .buttons(vec![
                MessageButton::new("Reboot", SpanColor::Cyan).on_click(move |_, _| {
                    reboot.sys_reboot();
                }),
                MessageButton::new("No", SpanColor::White),
            ])
            .callback(move |_, _| {
                with_editor(&weak, KeymapEditor::force_close);
            }),
        );
    }

    fn ask_close(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.message(MessageBox::new("Not saved, close anyway?").buttons(vec![
            MessageButton::new("No", SpanColor::White),
            MessageButton::new("Yes", SpanColor::Yellow).on_click(move |_, _| {
                with_editor(&weak, KeymapEditor::force_close);
            }),
        ]));
    }

    fn message(&self, message: MessageBox) {
        let Some(id) = self.id.get() else {
            return;
        };
        self.ctl.message_box(message.title(TITLE).parent(id));
    }

    fn activate(self: &Rc<Self>, item: Item) {
        match item {
            Item::Save => self.save(),
            Item::ClearAll => self.clear_all(),
            Item::Search => {}
            Item::Result(key) => self.learn(key),
            Item::Key(key) => self.learn(&key),
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn header(&self) -> RenderNode {
        match &self.opener {
            Some(opener) => {
                RenderNode::text(format!("RC/IR device (lirc): {}", opener.describe()))
            }
            None => RenderNode::text(StyledContent::styled(
                "RC/IR device not available, cannot add new keys!",
                SpanStyle::fg(SpanColor::Yellow),
            )),
        }
    }

    fn buttons(focused: Option<&Item>) -> RenderNode {
        let focused = match focused {
            Some(Item::Save) => Some(0),
            Some(Item::ClearAll) => Some(1),
            _ => None,
        };
        RenderNode::Widget {
            widget_type: WidgetType::Buttons,
            block: None,
            props: Some(WidgetProps::Buttons(ButtonsProps {
                buttons: vec![
                    ButtonProps::new("Save and Close"),
                    ButtonProps::new("Clear All"),
                ],
                focused,
                alignment: ParagraphAlignment::Left,
            })),
        }
    }

    fn search(state: &State, focused: Option<&Item>) -> RenderNode {
        let input = RenderNode::Widget {
            widget_type: WidgetType::Input,
            block: None,
            props: Some(WidgetProps::Input(InputProps {
                prompt: Some(StyledContent::Plain(SEARCH_PROMPT.to_string())),
                value: state.search.value().to_string(),
                focused: focused == Some(&Item::Search),
            })),
        };
        if state.results.is_empty() {
            return input;
        }
        let hint = RenderNode::text(StyledContent::styled(
            SEARCH_HINT,
            SpanStyle::fg(SpanColor::Cyan),
        ));
        let width = u16::try_from(SEARCH_HINT.len()).unwrap_or(u16::MAX);
        RenderNode::columns(vec![
            (Constraint::Min(0), input),
            (Constraint::Length(width), hint),
        ])
    }

    fn list(items: Vec<ListItemProps>, selected: Option<usize>) -> RenderNode {
        RenderNode::Widget {
            widget_type: WidgetType::List,
            block: None,
            props: Some(WidgetProps::List(ListProps {
                items,
                selected,
                highlight_style: Some(SpanStyle {
                    reversed: true,
                    ..SpanStyle::default()
                }),
                highlight_symbol: Some("> ".to_string()),
            })),
        }
    }

    fn results(state: &State, focused: Option<&Item>) -> RenderNode {
        let selected = match focused {
            Some(Item::Result(key)) => state.results.iter().position(|k| k == key),
            _ => None,
        };
        Self::list(
            state.results.iter().map(|&k| ListItemProps::plain(k)).collect(),
            selected,
        )
    }

    fn key_rows(state: &State, focused: Option<&Item>) -> RenderNode {
        let by_key = state.keymap.by_key();
        let items = state
            .rows
            .iter()
            .map(|key| {
                let mut spans = vec![StyledSpan {
                    text: format!("{key:<KEY_COLUMN$}"),
                    style: SpanStyle::default(),
                }];
                spans.push(match by_key.get(key) {
                    Some(codes) if !codes.is_empty() => StyledSpan {
                        text: format_codes(codes),
                        style: SpanStyle::default(),
                    },
                    _ => StyledSpan {
                        text: "(not set)".to_string(),
                        style: SpanStyle::fg(SpanColor::Yellow),
                    },
                });
                ListItemProps {
                    content: StyledContent::Styled(spans),
                    header: false,
                    style: None,
                }
            })
            .collect();
        let selected = match focused {
            Some(Item::Key(key)) => state.rows.iter().position(|k| k == key),
            _ => None,
        };
        Self::list(items, selected)
    }

    fn footer(state: &State) -> Option<RenderNode> {
        let aligned = |line: StyledContent, alignment: ParagraphAlignment| RenderNode::Widget {
            widget_type: WidgetType::Paragraph,
            block: None,
            props: Some(WidgetProps::Paragraph(ParagraphProps {
                lines: vec![line],
                alignment,
                wrap: true,
            })),
        };
        let cyan = SpanStyle::fg(SpanColor::Cyan);
        match &state.footer {
            Footer::Hidden => None,
            Footer::Learning {
                key,
                codes,
                limited,
            } => {
                let mut rows = vec![(
                    Constraint::Length(1),
                    aligned(
                        format!("Receiving, press a key for {key} on the remote control...")
                            .into(),
                        ParagraphAlignment::Left,
                    ),
                )];
                if *limited {
                    rows.push((
                        Constraint::Length(2),
                        aligned(
                            StyledContent::styled(
                                "Failed to enable all RC protocols, permission denied. \
                                 Not all remotes will be detected!",
                                SpanStyle::fg(SpanColor::Yellow),
                            ),
                            ParagraphAlignment::Center,
                        ),
                    ));
                }
                let progress = if codes.is_empty() {
                    "(press the same key 3 times to confirm, wait 5 sec. to cancel)".to_string()
                } else {
                    format_codes(codes)
                };
                rows.push((
                    Constraint::Length(1),
                    aligned(progress.into(), ParagraphAlignment::Right),
                ));
                Some(RenderNode::rows(rows).framed(BlockConfig {
                    border_style: Some(cyan),
                    ..BlockConfig::default()
                }))
            }
            Footer::Added { key, code } => Some(
                aligned(
                    StyledContent::styled(
                        format!("Added code {code} to {key}."),
                        SpanStyle::fg(SpanColor::Green),
                    ),
                    ParagraphAlignment::Center,
                )
                .framed(BlockConfig::default()),
            ),
            Footer::Failed(message) => Some(
                aligned(
                    StyledContent::styled(message.clone(), SpanStyle::fg(SpanColor::Red)),
                    ParagraphAlignment::Center,
                )
                .framed(BlockConfig::default()),
            ),
        }
    }
}

/// Codes as `proto:0xNN`, space separated.
fn format_codes(codes: &[ScanKey]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn with_editor<R>(weak: &Weak<KeymapEditor>, f: impl FnOnce(&KeymapEditor) -> R) -> Option<R> {
    weak.upgrade().map(|editor| f(&editor))
}

fn len_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

impl View for KeymapEditor {
    fn render(&self) -> RenderNode {
        let state = self.state.borrow();
        let items = state.items(self.searchable());
        let focused = items.get(state.focus.index());

        let mut rows = vec![
            (Constraint::Length(1), self.header()),
            (Constraint::Length(1), RenderNode::empty()),
            (Constraint::Length(1), Self::buttons(focused)),
            (Constraint::Length(1), RenderNode::empty()),
        ];
        if self.searchable() {
            rows.push((Constraint::Length(1), Self::search(&state, focused)));
            if !state.results.is_empty() {
                rows.push((
                    Constraint::Length(len_u16(state.results.len())),
                    Self::results(&state, focused),
                ));
            }
            rows.push((Constraint::Length(1), RenderNode::empty()));
        }
        rows.push((Constraint::Min(1), Self::key_rows(&state, focused)));
        if let Some(footer) = Self::footer(&state) {
            let height = footer.preferred_height(u16::MAX);
            rows.push((Constraint::Length(height), footer));
        }
        RenderNode::rows(rows)
    }

    fn handle_key(&self, key: &KeyEvent) -> bool {
        let Some(item) = self.focused() else {
            return false;
        };

        // Esc while learning stops learning instead of closing the window
        if key.code == KeyCode::Esc && self.state.borrow().is_learning() {
            self.cancel_learning();
            return true;
        }

        if item == Item::Search {
            let edited = self.state.borrow_mut().search.handle_key(key);
            if edited {
                self.update_search();
                return true;
            }
        }

        let moved = {
            let mut state = self.state.borrow_mut();
            match (key.code, &item) {
                (KeyCode::Right, Item::Save) => {
                    state.focus.down();
                    true
                }
                (KeyCode::Left, Item::ClearAll) => {
                    state.focus.up();
                    true
                }
                (KeyCode::Tab, _) => {
                    state.focus.down();
                    true
                }
                (KeyCode::BackTab, _) => {
                    state.focus.up();
                    true
                }
                _ => state.focus.navigate(key),
            }
        };
        if moved {
            self.refresh();
            return true;
        }

        match key.code {
            KeyCode::Enter => {
                if let Some(this) = self.me.upgrade() {
                    this.activate(item);
                }
                true
            }
            KeyCode::Delete => match item {
                Item::Key(key) => {
                    self.update_key(&key, None);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}

impl WindowHandler for KeymapEditor {
    fn on_close(&self, _wm: &WindowManager, ev: &mut WindowEvent) {
        if Some(ev.target()) != self.id.get() {
            return;
        }
        self.cancel_learning();
        let ask = {
            let state = self.state.borrow();
            state.ask_close && state.changed
        };
        if ask {
            if let Some(this) = self.me.upgrade() {
                this.ask_close();
            }
            ev.cancel();
        }
    }

    fn on_destroy(&self, _wm: &WindowManager, ev: &WindowEvent) {
        if Some(ev.target()) == self.id.get() {
            self.cancel_learning();
        }
    }
}

/// Open the editor, or tell the user why it cannot be opened.
pub fn open_or_report(
    ctl: &Control,
    store: Rc<dyn KeymapStore>,
    opener: Option<Rc<dyn ScancodeOpener>>,
) -> Option<Rc<KeymapEditor>> {
    match KeymapEditor::open(ctl, store, opener) {
        Ok(editor) => Some(editor),
        Err(e) => {
            log::error!("{e:#}");
            ctl.message_box(
                MessageBox::new(StyledContent::styled(
                    format!("{e:#}"),
                    SpanStyle::fg(SpanColor::Red),
                ))
                .title(TITLE),
            );
            None
        }
    }
}
