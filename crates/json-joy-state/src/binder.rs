//! Subscribe-only view over a tree.
//!
//! A [`Binder`] accumulates a path of keys from a root state. Binding a
//! setter resolves that path against the tree as it is at that moment,
//! records the value found at each step as the "previous" marker for later
//! re-resolution, registers the setter along the resolved chain and delivers
//! the current leaf value immediately.

use std::fmt;
use std::rc::Rc;

use crate::array_edit::ArrayEdit;
use crate::error::StateError;
use crate::node::{self, ListenKey, PathStep, Sink, SubscriptionId};
use crate::state::State;
use crate::value::{IntoValue, Key, Value};

#[derive(Clone)]
pub struct Binder {
    root: State,
    keys: Vec<ListenKey>,
}

impl Binder {
    pub(crate) fn new(root: &State) -> Self {
        Self {
            root: root.clone(),
            keys: Vec::new(),
        }
    }

    /// Binder for child `key`. Navigating below a primitive or a missing
    /// field is allowed; the value there is `Undefined` until the chain
    /// appears.
    pub fn at(&self, key: impl Into<Key>) -> Binder {
        let mut keys = self.keys.clone();
        keys.push(ListenKey::Key(key.into()));
        Binder {
            root: self.root.clone(),
            keys,
        }
    }

    /// Registers `setter` at this path and calls it with the current value.
    pub fn bind(&self, setter: impl Fn(Value) + 'static) {
        let (path, leaf) = self.resolve();
        let sink = Sink::Value(Rc::new(setter));
        self.subscribe(path, &sink);
        sink.deliver(leaf);
    }

    /// Registers `setter` for structural edits of the array at this path.
    ///
    /// Nothing is delivered until the next `push`, `pop`, `shift`, `unshift`
    /// or `splice`. The attach-point survives replacement of the array or any
    /// of its ancestors.
    pub fn update(&self, setter: impl Fn(&ArrayEdit) + 'static) -> Result<(), StateError> {
        let (mut path, leaf) = self.resolve();
        match &leaf {
            Value::State(state) if state.is_array() => {}
            Value::Undefined => {}
            _ => return Err(StateError::NotArray),
        }
        path.push(Rc::new(PathStep::new(ListenKey::Update, Value::Undefined)));
        self.subscribe(path, &Sink::Update(Rc::new(setter)));
        Ok(())
    }

    /// Binders are read-only; this always fails and changes nothing.
    pub fn set<V: IntoValue>(&self, _key: impl Into<Key>, _value: V) -> Result<(), StateError> {
        Err(StateError::BinderNotAssignable)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.value().as_state().map(State::keys).unwrap_or_default()
    }

    pub fn has(&self, key: impl Into<Key>) -> bool {
        self.value().as_state().is_some_and(|state| state.has(key))
    }

    /// Value currently found at this path.
    pub fn value(&self) -> Value {
        self.resolve().1
    }

    pub fn path(&self) -> Vec<ListenKey> {
        self.keys.clone()
    }

    // Fresh steps per subscription; sharing them between subscriptions
    // derived from one binder would let one re-resolution hide the change from
    // the others.
    fn resolve(&self) -> (Vec<Rc<PathStep>>, Value) {
        let mut current = Value::State(self.root.clone());
        let mut path = Vec::with_capacity(self.keys.len() + 1);
        for key in &self.keys {
            current = current.child(key);
            path.push(Rc::new(PathStep::new(key.clone(), current.clone())));
        }
        (path, current)
    }

    fn subscribe(&self, path: Vec<Rc<PathStep>>, sink: &Sink) {
        node::subscribe(self.root.node(), &path, sink, SubscriptionId::next());
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder").field("path", &self.keys).finish()
    }
}

/// Derives a binder rooted at `state`.
pub fn binder(state: &State) -> Binder {
    Binder::new(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_state;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn navigation_records_the_path() {
        let state = tree_state(json!({"a": {"b": [1]}})).unwrap();
        let leaf = binder(&state).at("a").at("b").at(0);
        assert_eq!(
            leaf.path(),
            vec![
                ListenKey::Key(Key::from("a")),
                ListenKey::Key(Key::from("b")),
                ListenKey::Key(Key::Index(0)),
            ]
        );
        assert_eq!(leaf.value(), Value::from(1));
    }

    #[test]
    fn navigating_past_a_leaf_yields_undefined() {
        let state = tree_state(json!({"a": 1})).unwrap();
        let deep = binder(&state).at("a").at("x");
        assert!(deep.value().is_undefined());
        assert!(deep.keys().is_empty());
    }

    #[test]
    fn empty_path_delivers_the_root() {
        let state = tree_state(json!({"a": 1})).unwrap();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        binder(&state).bind(move |v| *sink.borrow_mut() = v.into_state());
        assert!(seen.borrow().as_ref().unwrap().ptr_eq(&state));
    }

    #[test]
    fn update_requires_an_array() {
        let state = tree_state(json!({"obj": {}, "n": 1, "list": []})).unwrap();
        let root = binder(&state);
        assert_eq!(root.at("obj").update(|_| {}), Err(StateError::NotArray));
        assert_eq!(root.at("n").update(|_| {}), Err(StateError::NotArray));
        assert_eq!(root.at("list").update(|_| {}), Ok(()));
        assert_eq!(root.at("missing").update(|_| {}), Ok(()));
    }

    #[test]
    fn value_follows_the_live_tree() {
        let state = tree_state(json!({"a": {"b": 1}})).unwrap();
        let b = binder(&state).at("a").at("b");
        state.child("a").unwrap().set("b", 2).unwrap();
        assert_eq!(b.value(), Value::from(2));

        state.set("a", tree_state(json!({"b": 3})).unwrap()).unwrap();
        assert_eq!(b.value(), Value::from(3));
    }

    #[test]
    fn update_checks_the_array_present_at_bind_time() {
        let state = tree_state(json!({"list": 1})).unwrap();
        let list = binder(&state).at("list");
        state.set("list", tree_state(json!([])).unwrap()).unwrap();
        assert_eq!(list.update(|_| {}), Ok(()));
    }
}
