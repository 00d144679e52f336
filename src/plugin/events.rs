//! The Events surface: per-kind subscriber lists.
//!
//! Two kinds exist: `raw` (every terminal event, unmodified) and `key`
//! (decoded keys from input devices).
//!
//! # Design Principle: "Subscribe once. React always."
//!
//! Subscribers run synchronously inside [`Events::fire_raw`] /
//! [`Events::fire_key`] and should be fast. Each list is copy-on-write:
//! `fire` iterates a snapshot, so subscribers may subscribe or unsubscribe
//! (themselves included) while it runs. Changes apply from the next fire.

// Rust guideline compliant 2026-02

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crossterm::event::Event;

use crate::device::DeviceKey;

/// Unique identifier of a subscription.
pub type SubscriptionId = String;

type Subscribers<E> = Rc<Vec<(SubscriptionId, Rc<dyn Fn(&E)>)>>;

struct Lists {
    raw: RefCell<Subscribers<Event>>,
    key: RefCell<Subscribers<DeviceKey>>,
    next_id: Cell<u64>,
}

/// Shared subscriber registry. Clones share the lists.
#[derive(Clone)]
pub struct Events {
    lists: Rc<Lists>,
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("raw", &self.lists.raw.borrow().len())
            .field("key", &self.lists.key.borrow().len())
            .field("next_id", &self.lists.next_id.get())
            .finish()
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

fn subscribe<E>(list: &RefCell<Subscribers<E>>, id: SubscriptionId, f: Rc<dyn Fn(&E)>) {
    let mut list = list.borrow_mut();
    let mut next: Vec<_> = list.iter().cloned().collect();
    next.push((id, f));
    *list = Rc::new(next);
}

fn unsubscribe<E>(list: &RefCell<Subscribers<E>>, id: &str) -> bool {
    let mut list = list.borrow_mut();
    if !list.iter().any(|(sub, _)| sub == id) {
        return false;
    }
    let next: Vec<_> = list.iter().filter(|(sub, _)| sub != id).cloned().collect();
    *list = Rc::new(next);
    true
}

fn fire<E>(list: &RefCell<Subscribers<E>>, event: &E) -> usize {
    let snapshot = Rc::clone(&list.borrow());
    for (_, f) in snapshot.iter() {
        f(event);
    }
    snapshot.len()
}

impl Events {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lists: Rc::new(Lists {
                raw: RefCell::new(Rc::new(Vec::new())),
                key: RefCell::new(Rc::new(Vec::new())),
                next_id: Cell::new(0),
            }),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        let id = self.lists.next_id.get();
        self.lists.next_id.set(id + 1);
        format!("evt_{id}")
    }

    /// Subscribe to raw terminal events.
    pub fn on_raw(&self, f: impl Fn(&Event) + 'static) -> SubscriptionId {
        let id = self.next_id();
        subscribe(&self.lists.raw, id.clone(), Rc::new(f));
        log::debug!("Registered raw event callback '{id}'");
        id
    }

    /// Subscribe to device keys.
    pub fn on_key(&self, f: impl Fn(&DeviceKey) + 'static) -> SubscriptionId {
        let id = self.next_id();
        subscribe(&self.lists.key, id.clone(), Rc::new(f));
        log::debug!("Registered key event callback '{id}'");
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn off(&self, id: &str) -> bool {
        unsubscribe(&self.lists.raw, id) || unsubscribe(&self.lists.key, id)
    }

    /// Deliver a terminal event. Returns how many subscribers ran.
    pub fn fire_raw(&self, event: &Event) -> usize {
        fire(&self.lists.raw, event)
    }

    /// Deliver a device key. Returns how many subscribers ran.
    pub fn fire_key(&self, key: &DeviceKey) -> usize {
        fire(&self.lists.key, key)
    }

    /// Total number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.raw.borrow().len() + self.lists.key.borrow().len()
    }

    /// Whether there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
