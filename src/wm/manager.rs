//! The window compositor.
//!
//! Owns an arena of windows keyed by [`WindowId`], tracks the active window,
//! and after every mutation recomputes one composite [`RenderNode`] and
//! publishes it to the [`RenderSink`].
//!
//! # Composition
//!
//! ```text
//! active ──head child──► ... ──head child──► leaf
//!
//! render_down(w):
//!   overlay?  Overlay { top: styled(w),
//!                       bottom: next sibling ? render_up(next) : render_down(parent) }
//!   opaque    styled(w)                       (nothing beneath is drawn)
//!
//! render_up(w): descend head children to the leaf, then render_down(leaf)
//! ```
//!
//! # Borrowing
//!
//! The tree lives in a `RefCell`. Every public operation takes short
//! borrows and releases them before calling out to views, styles,
//! handlers or the sink, so all of those may call back into the manager.

// Rust guideline compliant 2026-02

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crossterm::event::{KeyCode, KeyEvent};

use super::style::{ManagerStyle, TaskBar, TaskInfo, TitleBar, WindowInfo, WindowStyle};
use super::window::{
    Content, ContentSource, OverlaySpec, StyleChoice, Window, WindowEvent, WindowFlags,
    WindowHandler, WindowId, WindowPatch, WindowSpec,
};
use crate::tui::layout::{Extent, OverlayGeometry};
use crate::tui::render_tree::RenderNode;

/// Receives every composite the manager produces.
pub trait RenderSink {
    /// Replace the displayed composite.
    fn publish(&self, composite: RenderNode);
}

#[derive(Clone, Copy)]
enum Notification {
    Open,
    Active,
    Close,
    Destroy,
}

struct Tree {
    windows: HashMap<WindowId, Window>,
    root: WindowId,
    active: WindowId,
    next_id: u64,
}

impl Tree {
    fn get(&self, id: WindowId) -> &Window {
        match self.windows.get(&id) {
            Some(window) => window,
            None => panic!("Unknown window {id}"),
        }
    }

    fn get_mut(&mut self, id: WindowId) -> &mut Window {
        match self.windows.get_mut(&id) {
            Some(window) => window,
            None => panic!("Unknown window {id}"),
        }
    }

    fn is_open(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.attached)
    }

    fn leaf_of(&self, mut id: WindowId) -> WindowId {
        while let Some(child) = self.get(id).child {
            id = child;
        }
        id
    }

    fn on_active_path(&self, id: WindowId) -> bool {
        let mut cursor = Some(self.active);
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            cursor = self.get(current).child;
        }
        false
    }

    fn is_active_child(&self, id: WindowId) -> bool {
        self.windows
            .get(&id)
            .is_some_and(|w| w.attached && w.child.is_none())
            && self.on_active_path(id)
    }

    fn is_active_parent(&self, id: WindowId) -> bool {
        self.is_open(id)
            && (self.active == id || self.children(id).into_iter().any(|c| self.is_active_child(c)))
    }

    fn children(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut cursor = self.windows.get(&id).and_then(|w| w.child);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.get(child).next;
        }
        out
    }

    /// Handlers of `id` and each ancestor, target first.
    fn handler_chain(&self, id: WindowId) -> Vec<Rc<dyn WindowHandler>> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(window) = self.windows.get(&current) else {
                break;
            };
            if let Some(handler) = &window.handler {
                chain.push(Rc::clone(handler));
            }
            cursor = window.parent;
        }
        chain
    }

    fn info(&self, id: WindowId) -> WindowInfo {
        let window = self.get(id);
        WindowInfo {
            id,
            title: window.title_or_default(id),
            flags: window.flags,
            is_overlay: window.overlay.is_overlay(),
            is_active_child: self.is_active_child(id),
            on_active_path: self.on_active_path(id),
        }
    }
}

/// One entry of the composite, captured under a tree borrow.
struct Layer {
    info: WindowInfo,
    content: Content,
    style: Option<Rc<dyn WindowStyle>>,
    geometry: Option<OverlayGeometry>,
}

struct Inner {
    tree: RefCell<Tree>,
    sink: RefCell<Option<Rc<dyn RenderSink>>>,
    window_style: RefCell<Option<Rc<dyn WindowStyle>>>,
    manager_style: RefCell<Option<Rc<dyn ManagerStyle>>>,
    default_overlay: Cell<OverlayGeometry>,
}

/// The window compositor. Cheap to clone; clones share one tree.
#[derive(Clone)]
pub struct WindowManager {
    inner: Rc<Inner>,
}

/// Non-owning handle to a [`WindowManager`].
#[derive(Clone, Default)]
pub struct WeakWindowManager {
    inner: Weak<Inner>,
}

impl WeakWindowManager {
    /// The manager, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<WindowManager> {
        self.inner.upgrade().map(|inner| WindowManager { inner })
    }
}

impl std::fmt::Debug for WeakWindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakWindowManager")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl std::fmt::Debug for WindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.inner.tree.borrow();
        f.debug_struct("WindowManager")
            .field("windows", &tree.windows.len())
            .field("root", &tree.root)
            .field("active", &tree.active)
            .finish_non_exhaustive()
    }
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Backdrop shown when nothing else is open.
fn root_content() -> RenderNode {
    RenderNode::Overlay {
        top: Box::new(RenderNode::text("!")),
        bottom: Box::new(RenderNode::fill("\u{2592}")),
        geometry: OverlayGeometry {
            width: Extent::Fixed(1),
            ..OverlayGeometry::default()
        },
    }
}

impl WindowManager {
    /// Compositor with the title-bar window style and the task bar.
    #[must_use]
    pub fn new() -> Self {
        Self::with_styles(
            Some(Rc::new(TitleBar)),
            Some(Rc::new(TaskBar::default())),
            OverlayGeometry::default(),
        )
    }

    /// Compositor with explicit styles and default overlay geometry.
    #[must_use]
    pub fn with_styles(
        window_style: Option<Rc<dyn WindowStyle>>,
        manager_style: Option<Rc<dyn ManagerStyle>>,
        default_overlay: OverlayGeometry,
    ) -> Self {
        let root = WindowId(0);
        let mut windows = HashMap::new();
        windows.insert(
            root,
            Window {
                title: None,
                flags: WindowFlags::BASIC,
                style: StyleChoice::None,
                overlay: OverlaySpec::Off,
                content: Content::Static(root_content()),
                handler: None,
                parent: None,
                child: None,
                next: None,
                attached: true,
            },
        );

        Self {
            inner: Rc::new(Inner {
                tree: RefCell::new(Tree {
                    windows,
                    root,
                    active: root,
                    next_id: 1,
                }),
                sink: RefCell::new(None),
                window_style: RefCell::new(window_style),
                manager_style: RefCell::new(manager_style),
                default_overlay: Cell::new(default_overlay),
            }),
        }
    }

    /// Non-owning handle, for content that needs to trigger re-renders.
    #[must_use]
    pub fn downgrade(&self) -> WeakWindowManager {
        WeakWindowManager {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Route composites to `sink`, publishing the current one immediately.
    pub fn set_sink(&self, sink: Rc<dyn RenderSink>) {
        *self.inner.sink.borrow_mut() = Some(sink);
        self.update();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The root window.
    #[must_use]
    pub fn root(&self) -> WindowId {
        self.inner.tree.borrow().root
    }

    /// The active window.
    #[must_use]
    pub fn active(&self) -> WindowId {
        self.inner.tree.borrow().active
    }

    /// The topmost visual leaf below the active window.
    #[must_use]
    pub fn top(&self) -> WindowId {
        let tree = self.inner.tree.borrow();
        tree.leaf_of(tree.active)
    }

    /// Parent of an attached window.
    #[must_use]
    pub fn parent(&self, id: WindowId) -> Option<WindowId> {
        self.inner.tree.borrow().windows.get(&id).and_then(|w| w.parent)
    }

    /// Children, most recently opened first.
    #[must_use]
    pub fn children(&self, id: WindowId) -> Vec<WindowId> {
        self.inner.tree.borrow().children(id)
    }

    /// Whether the window is attached (the root always is).
    #[must_use]
    pub fn is_open(&self, id: WindowId) -> bool {
        self.inner.tree.borrow().is_open(id)
    }

    /// Whether the id names a window the arena still holds.
    #[must_use]
    pub fn exists(&self, id: WindowId) -> bool {
        self.inner.tree.borrow().windows.contains_key(&id)
    }

    /// Attached, childless and on the active path.
    #[must_use]
    pub fn is_active_child(&self, id: WindowId) -> bool {
        self.inner.tree.borrow().is_active_child(id)
    }

    /// Active, or has a direct child that is the active leaf.
    #[must_use]
    pub fn is_active_parent(&self, id: WindowId) -> bool {
        self.inner.tree.borrow().is_active_parent(id)
    }

    /// Whether the window is reachable from the active window through head children.
    #[must_use]
    pub fn on_active_path(&self, id: WindowId) -> bool {
        let tree = self.inner.tree.borrow();
        tree.windows.contains_key(&id) && tree.on_active_path(id)
    }

    /// Effective title (`WIN-<id>` when unset).
    #[must_use]
    pub fn title(&self, id: WindowId) -> Option<String> {
        self.inner
            .tree
            .borrow()
            .windows
            .get(&id)
            .map(|w| w.title_or_default(id))
    }

    /// Flags of a known window.
    #[must_use]
    pub fn flags(&self, id: WindowId) -> Option<WindowFlags> {
        self.inner.tree.borrow().windows.get(&id).map(|w| w.flags)
    }

    /// Whether the window floats.
    #[must_use]
    pub fn is_overlay(&self, id: WindowId) -> bool {
        self.inner
            .tree
            .borrow()
            .windows
            .get(&id)
            .is_some_and(|w| w.overlay.is_overlay())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Construct a detached window. Factory content runs here, with the new id.
    pub fn make(&self, spec: WindowSpec) -> WindowId {
        let id = {
            let mut tree = self.inner.tree.borrow_mut();
            let id = WindowId(tree.next_id);
            tree.next_id += 1;
            id
        };

        let content = match spec.content {
            ContentSource::Ready(content) => content,
            ContentSource::Factory(factory) => factory(id),
        };

        self.inner.tree.borrow_mut().windows.insert(
            id,
            Window {
                title: spec.title,
                flags: spec.flags,
                style: spec.style,
                overlay: spec.overlay,
                content,
                handler: spec.handler,
                parent: None,
                child: None,
                next: None,
                attached: false,
            },
        );
        log::debug!("Made window {id}");
        id
    }

    /// Attach a detached window as the newest child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not open, or `window` is unknown or not fully
    /// detached.
    pub fn open(&self, parent: WindowId, window: WindowId, active: bool) {
        {
            let mut tree = self.inner.tree.borrow_mut();
            assert!(
                tree.is_open(parent),
                "Cannot open window {window} on closed parent {parent}"
            );
            match tree.windows.get(&window) {
                None => panic!("Cannot open unknown window {window}"),
                Some(w) if !w.is_detached() => panic!("Window {window} already open"),
                Some(_) => {}
            }

            let head = tree.get(parent).child;
            let entry = tree.get_mut(window);
            entry.next = head;
            entry.parent = Some(parent);
            entry.attached = true;
            tree.get_mut(parent).child = Some(window);
        }
        log::debug!("Opened window {window} under {parent}");
        self.update();

        let canceled = self.notify(window, Notification::Open);
        if active && !canceled {
            self.set_active(window);
        }
    }

    /// [`make`](Self::make) + [`open`](Self::open).
    pub fn make_window(&self, parent: WindowId, spec: WindowSpec, active: bool) -> WindowId {
        let id = self.make(spec);
        self.open(parent, id, active);
        id
    }

    /// Rewrite any subset of title/flags/style/overlay. Unknown ids are ignored.
    pub fn modify(&self, id: WindowId, patch: WindowPatch) {
        let attached = {
            let mut tree = self.inner.tree.borrow_mut();
            let is_root = id == tree.root;
            let Some(window) = tree.windows.get_mut(&id) else {
                return;
            };
            if let Some(title) = patch.title {
                window.title = title;
            }
            if let Some(flags) = patch.flags {
                window.flags = flags;
            }
            if let Some(style) = patch.style {
                window.style = style;
            }
            if let Some(overlay) = patch.overlay {
                // the root never floats
                if !is_root {
                    window.overlay = overlay;
                }
            }
            window.attached
        };
        if attached {
            self.update();
        }
    }

    /// Close a window and destroy its subtree.
    ///
    /// Returns `false` without effect for the root, detached or unknown
    /// windows, or when a handler cancels the close.
    pub fn close(&self, id: WindowId) -> bool {
        {
            let tree = self.inner.tree.borrow();
            if id == tree.root || !tree.is_open(id) {
                return false;
            }
        }

        if self.notify(id, Notification::Close) {
            log::debug!("Close of window {id} canceled");
            return false;
        }

        // a handler may have closed it already
        if !self.is_open(id) {
            return true;
        }
        self.destroy(id);
        true
    }

    /// Destroy `id` without offering a cancelable `close` first. Handlers
    /// still receive `destroy`. False for the root and for windows that are
    /// not open.
    pub fn force_close(&self, id: WindowId) -> bool {
        {
            let tree = self.inner.tree.borrow();
            if id == tree.root || !tree.is_open(id) {
                return false;
            }
        }
        self.destroy(id);
        true
    }

    /// Make `id` the active window unless a handler cancels.
    pub fn set_active(&self, id: WindowId) {
        if !self.is_open(id) {
            return;
        }
        if self.notify(id, Notification::Active) {
            return;
        }
        {
            let mut tree = self.inner.tree.borrow_mut();
            if !tree.is_open(id) {
                return;
            }
            tree.active = id;
        }
        self.update();
    }

    /// Route a key to the topmost leaf.
    ///
    /// Unhandled Esc closes the leaf when it has [`WindowFlags::ESC_CLOSE`].
    /// Returns whether the key was consumed.
    pub fn handle_key(&self, key: &KeyEvent) -> bool {
        let (leaf, content, flags, is_root) = {
            let tree = self.inner.tree.borrow();
            let leaf = tree.leaf_of(tree.active);
            let window = tree.get(leaf);
            (leaf, window.content.clone(), window.flags, leaf == tree.root)
        };

        let handled = match &content {
            Content::View(view) => view.handle_key(key),
            Content::Static(_) => false,
        };
        if handled {
            return true;
        }

        if key.code == KeyCode::Esc && flags.contains(WindowFlags::ESC_CLOSE) && !is_root {
            self.close(leaf);
            return true;
        }
        false
    }

    /// Recompute the composite.
    #[must_use]
    pub fn render(&self) -> RenderNode {
        let (layers, tasks) = self.plan();

        let mut layers = layers.into_iter().rev();
        let mut composite = match layers.next() {
            Some(bottom) => styled(bottom),
            None => RenderNode::empty(),
        };
        for layer in layers {
            let geometry = layer.geometry.unwrap_or_default();
            composite = RenderNode::Overlay {
                top: Box::new(styled(layer)),
                bottom: Box::new(composite),
                geometry,
            };
        }

        let manager_style = self.inner.manager_style.borrow().clone();
        match manager_style {
            Some(style) => style.render(&tasks, composite),
            None => composite,
        }
    }

    /// Recompute and publish the composite.
    pub fn update(&self) {
        let composite = self.render();
        let sink = self.inner.sink.borrow().clone();
        if let Some(sink) = sink {
            sink.publish(composite);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Layers from the top leaf down to the first opaque window, plus task bar entries.
    fn plan(&self) -> (Vec<Layer>, Vec<TaskInfo>) {
        let tree = self.inner.tree.borrow();
        let default_overlay = self.inner.default_overlay.get();
        let default_style = self.inner.window_style.borrow().clone();

        let mut layers = Vec::new();
        let mut current = tree.leaf_of(tree.active);
        loop {
            let window = tree.get(current);
            let geometry = if current == tree.root {
                None
            } else {
                window.overlay.resolve(default_overlay)
            };
            let style = match &window.style {
                StyleChoice::Default => default_style.clone(),
                StyleChoice::None => None,
                StyleChoice::Custom(style) => Some(Rc::clone(style)),
            };
            let floats = geometry.is_some();
            layers.push(Layer {
                info: tree.info(current),
                content: window.content.clone(),
                style,
                geometry,
            });
            if !floats {
                break;
            }
            current = match (window.next, window.parent) {
                (Some(next), _) => tree.leaf_of(next),
                (None, Some(parent)) => parent,
                (None, None) => panic!("Overlay window {current} has no parent"),
            };
        }

        let mut tasks: Vec<TaskInfo> = tree
            .children(tree.root)
            .into_iter()
            .filter(|id| tree.get(*id).flags.contains(WindowFlags::TASK))
            .map(|id| TaskInfo {
                id,
                title: tree.get(id).title_or_default(id),
                is_active_parent: tree.is_active_parent(id),
            })
            .collect();
        tasks.reverse();

        (layers, tasks)
    }

    /// Offer a notification to the target and its ancestors. Returns whether it was canceled.
    fn notify(&self, id: WindowId, kind: Notification) -> bool {
        let chain = self.inner.tree.borrow().handler_chain(id);
        self.deliver(&chain, id, kind)
    }

    fn deliver(&self, chain: &[Rc<dyn WindowHandler>], id: WindowId, kind: Notification) -> bool {
        let cancelable = !matches!(kind, Notification::Destroy);
        let mut ev = WindowEvent::new(id, cancelable);
        for handler in chain {
            match kind {
                Notification::Open => handler.on_open(self, &mut ev),
                Notification::Active => handler.on_active(self, &mut ev),
                Notification::Close => handler.on_close(self, &mut ev),
                Notification::Destroy => handler.on_destroy(self, &ev),
            }
        }
        ev.canceled()
    }

    fn destroy(&self, id: WindowId) {
        // children first, depth-first
        loop {
            let child = self.inner.tree.borrow().windows.get(&id).and_then(|w| w.child);
            match child {
                Some(child) => self.destroy(child),
                None => break,
            }
        }

        let (chain, parent, was_active) = {
            let mut tree = self.inner.tree.borrow_mut();
            let chain = tree.handler_chain(id);
            let Some(parent) = tree.get(id).parent else {
                panic!("Destroying window {id} without a parent");
            };
            let next = tree.get(id).next;

            // unlink from the parent's child list
            if tree.get(parent).child == Some(id) {
                tree.get_mut(parent).child = next;
            } else {
                let mut cursor = tree.get(parent).child;
                loop {
                    let Some(sibling) = cursor else {
                        panic!("Window {id} missing from the child list of {parent}");
                    };
                    if tree.get(sibling).next == Some(id) {
                        tree.get_mut(sibling).next = next;
                        break;
                    }
                    cursor = tree.get(sibling).next;
                }
            }
            {
                let entry = tree.get_mut(id);
                entry.next = None;
                entry.parent = None;
                entry.attached = false;
            }

            let was_active = tree.active == id;
            if was_active {
                // fallback in case the reactivation below is canceled
                tree.active = tree.root;
            }
            (chain, parent, was_active)
        };
        log::debug!("Destroyed window {id}");

        if was_active {
            self.set_active(parent);
        }
        self.update();

        self.deliver(&chain, id, Notification::Destroy);
        self.inner.tree.borrow_mut().windows.remove(&id);
    }
}

fn styled(layer: Layer) -> RenderNode {
    let content = layer.content.render();
    match layer.style {
        Some(style) => style.render(&layer.info, content),
        None => content,
    }
}
