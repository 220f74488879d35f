//! Reactive nodes and the path-scoped listener registry.
//!
//! # Overview
//!
//! Every container in a tree is one [`Node`]: the container's own fields plus
//! a registry of subscriptions keyed by field. A subscription is registered
//! once per step of its path, each registration holding the tail of the path
//! from that node down to the leaf. A write through [`set`] walks the tail of
//! every registration under the written key, re-resolving it against the new
//! value:
//!
//! - a step whose observed value is unchanged ends the walk, and the leaf is
//!   not delivered (it cannot have changed);
//! - a step whose observed value changed drops the registration at the old
//!   child and descends into the new one;
//! - if any step changed, the whole tail is subscribed again so later writes on
//!   the new chain of nodes reach it.
//!
//! Path steps are shared between all registrations of one subscription, so
//! re-resolution at any level updates the markers seen by every other level.
//!
//! No `RefCell` borrow is held while a setter runs; setters may write to any
//! node, including the one that notified them. A write iterates a snapshot of
//! the registrations under its key, skips those dropped by earlier setters of
//! the same fan-out and re-reads the field before each one, so a nested write
//! is never overtaken by the stale outer value.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::array_edit::ArrayEdit;
use crate::error::StateError;
use crate::value::{array_index, Key, Value};

pub(crate) type NodeRef = Rc<RefCell<Node>>;

/// Largest array length a write may grow an array to.
const MAX_ARRAY_LEN: usize = u32::MAX as usize;

/// Shape of a node, fixed when the node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
}

/// Key of a listener set.
///
/// `Update` is the reserved whole-array structural-update slot; being a
/// separate variant it can never collide with a field key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenKey {
    Key(Key),
    Update,
}

/// The reserved whole-array update token.
pub const UPDATE: ListenKey = ListenKey::Update;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        thread_local! {
            static NEXT: Cell<u64> = const { Cell::new(1) };
        }
        NEXT.with(|next| {
            let id = next.get();
            next.set(id + 1);
            Self(id)
        })
    }
}

/// One step of a subscription path and the child last observed there.
#[derive(Debug)]
pub(crate) struct PathStep {
    key: ListenKey,
    observed: RefCell<Value>,
}

impl PathStep {
    pub(crate) fn new(key: ListenKey, observed: Value) -> Self {
        Self {
            key,
            observed: RefCell::new(observed),
        }
    }
}

pub(crate) type Path = Vec<Rc<PathStep>>;

#[derive(Clone)]
pub(crate) enum Sink {
    Value(Rc<dyn Fn(Value)>),
    Update(Rc<dyn Fn(&ArrayEdit)>),
}

impl Sink {
    pub(crate) fn deliver(&self, value: Value) {
        match self {
            Sink::Value(setter) => setter(value),
            // Structural edits are delivered by the array operations.
            Sink::Update(_) => {}
        }
    }
}

#[derive(Clone)]
struct Registration {
    path: Path,
    sink: Sink,
}

pub(crate) enum Fields {
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
}

pub(crate) struct Node {
    fields: Fields,
    listeners: HashMap<ListenKey, IndexMap<SubscriptionId, Registration>>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        let fields = match kind {
            NodeKind::Object => Fields::Object(IndexMap::new()),
            NodeKind::Array => Fields::Array(Vec::new()),
        };
        Self {
            fields,
            listeners: HashMap::new(),
        }
    }

    pub(crate) fn fill(&mut self, fields: Fields) {
        self.fields = fields;
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.fields {
            Fields::Object(_) => NodeKind::Object,
            Fields::Array(_) => NodeKind::Array,
        }
    }

    fn canonical(&self, key: Key) -> Key {
        match self.kind() {
            NodeKind::Object => key.into_field(),
            NodeKind::Array => key.into_index(),
        }
    }

    fn listen_key(&self, key: &ListenKey) -> ListenKey {
        match key {
            ListenKey::Key(k) => ListenKey::Key(self.canonical(k.clone())),
            ListenKey::Update => ListenKey::Update,
        }
    }

    pub(crate) fn lookup(&self, key: &Key) -> Option<&Value> {
        match (&self.fields, key) {
            (Fields::Object(map), Key::Field(name)) => map.get(name),
            (Fields::Object(map), Key::Index(i)) => map.get(&i.to_string()),
            (Fields::Array(items), Key::Index(i)) => items.get(*i),
            (Fields::Array(items), Key::Field(name)) => array_index(name).and_then(|i| items.get(i)),
        }
    }

    pub(crate) fn child(&self, key: &ListenKey) -> Value {
        match key {
            ListenKey::Key(k) => self.lookup(k).cloned().unwrap_or_default(),
            ListenKey::Update => Value::Undefined,
        }
    }

    pub(crate) fn keys(&self) -> Vec<Key> {
        match &self.fields {
            Fields::Object(map) => map.keys().cloned().map(Key::Field).collect(),
            Fields::Array(items) => (0..items.len()).map(Key::Index).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.fields {
            Fields::Object(map) => map.len(),
            Fields::Array(items) => items.len(),
        }
    }

    /// Value at position `index` in field order.
    pub(crate) fn entry_at(&self, index: usize) -> Option<Value> {
        match &self.fields {
            Fields::Object(map) => map.get_index(index).map(|(_, v)| v.clone()),
            Fields::Array(items) => items.get(index).cloned(),
        }
    }

    pub(crate) fn entries(&self) -> Vec<(Key, Value)> {
        match &self.fields {
            Fields::Object(map) => map
                .iter()
                .map(|(k, v)| (Key::Field(k.clone()), v.clone()))
                .collect(),
            Fields::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v.clone()))
                .collect(),
        }
    }

    pub(crate) fn items_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.fields {
            Fields::Array(items) => Some(items),
            Fields::Object(_) => None,
        }
    }

    /// Stores `value` under an already canonical key.
    fn store(&mut self, key: &Key, value: Value) -> Result<(), StateError> {
        match (&mut self.fields, key) {
            (Fields::Object(map), Key::Field(name)) => {
                map.insert(name.clone(), value);
            }
            (Fields::Object(map), Key::Index(i)) => {
                map.insert(i.to_string(), value);
            }
            (Fields::Array(items), Key::Index(i)) => {
                if *i >= items.len() {
                    let len = i
                        .checked_add(1)
                        .filter(|len| *len <= MAX_ARRAY_LEN)
                        .ok_or_else(|| StateError::InvalidIndex(i.to_string()))?;
                    items
                        .try_reserve(len - items.len())
                        .map_err(|_| StateError::InvalidIndex(i.to_string()))?;
                    items.resize(len, Value::Undefined);
                }
                items[*i] = value;
            }
            (Fields::Array(_), Key::Field(name)) => {
                return Err(StateError::InvalidIndex(name.clone()));
            }
        }
        Ok(())
    }

    fn register(&mut self, key: &ListenKey, id: SubscriptionId, registration: Registration) {
        let key = self.listen_key(key);
        self.listeners.entry(key).or_default().insert(id, registration);
    }

    fn forget(&mut self, key: &ListenKey, id: SubscriptionId) {
        let key = self.listen_key(key);
        if let Some(registrations) = self.listeners.get_mut(&key) {
            registrations.shift_remove(&id);
            if registrations.is_empty() {
                self.listeners.remove(&key);
            }
        }
    }

    pub(crate) fn update_sinks(&self) -> Vec<Rc<dyn Fn(&ArrayEdit)>> {
        self.listeners
            .get(&ListenKey::Update)
            .map(|registrations| {
                registrations
                    .values()
                    .filter_map(|registration| match &registration.sink {
                        Sink::Update(setter) => Some(Rc::clone(setter)),
                        Sink::Value(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self, key: &ListenKey) -> usize {
        let key = self.listen_key(key);
        self.listeners.get(&key).map_or(0, IndexMap::len)
    }
}

/// Writes `value` into field `key` of `this` and notifies the subscriptions
/// registered under that key. Writing the current value is a no-op.
pub(crate) fn set(this: &NodeRef, key: Key, value: Value) -> Result<(), StateError> {
    let (key, pending) = {
        let mut node = this.borrow_mut();
        let key = node.canonical(key);
        if node.lookup(&key).cloned().unwrap_or_default() == value {
            return Ok(());
        }
        node.store(&key, value)?;
        // Snapshot: setters may register or drop listeners on this node.
        let pending: Vec<(SubscriptionId, Registration)> = node
            .listeners
            .get(&ListenKey::Key(key.clone()))
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|(id, registration)| (*id, registration.clone()))
                    .collect()
            })
            .unwrap_or_default();
        (key, pending)
    };
    trace!(%key, subscriptions = pending.len(), "state write");
    let listen_key = ListenKey::Key(key.clone());
    for (id, registration) in pending {
        // Setters run earlier in this fan-out may have dropped the
        // registration or written the field again.
        let current = {
            let node = this.borrow();
            let live = node
                .listeners
                .get(&listen_key)
                .is_some_and(|registrations| registrations.contains_key(&id));
            if !live {
                continue;
            }
            node.lookup(&key).cloned().unwrap_or_default()
        };
        propagate(this, id, registration, current);
    }
    Ok(())
}

fn propagate(this: &NodeRef, id: SubscriptionId, registration: Registration, value: Value) {
    let Registration { path, sink } = registration;
    let Some(last) = path.len().checked_sub(1) else {
        return;
    };
    let mut current = value;
    let mut unchanged = false;
    let mut relinked = false;
    for (i, step) in path.iter().enumerate() {
        if *step.observed.borrow() == current {
            unchanged = true;
            break;
        }
        let previous = step.observed.replace(current.clone());
        if i < last {
            let next = &path[i + 1].key;
            if let Value::State(old) = &previous {
                old.node().borrow_mut().forget(next, id);
            }
            current = current.child(next);
            relinked = true;
        }
    }
    if relinked {
        trace!(?id, depth = path.len(), "subscription re-resolved");
        subscribe(this, &path, &sink, id);
    }
    if !unchanged {
        sink.deliver(current);
    }
}

/// Registers `path` starting at `this`, then the remaining tail at every node
/// the path currently resolves through. Registration stops at the first step
/// that does not resolve to a node; a later write there repairs the chain.
pub(crate) fn subscribe(this: &NodeRef, path: &[Rc<PathStep>], sink: &Sink, id: SubscriptionId) {
    let mut node = Rc::clone(this);
    for (i, step) in path.iter().enumerate() {
        let next = {
            let mut current = node.borrow_mut();
            current.register(
                &step.key,
                id,
                Registration {
                    path: path[i..].to_vec(),
                    sink: sink.clone(),
                },
            );
            current.child(&step.key)
        };
        match next {
            Value::State(child) => node = Rc::clone(child.node()),
            _ => break,
        }
    }
}
