//! Read/write view over a node.
//!
//! [`State`] stands in for the plain value: reads return primitives or child
//! states, writes go through the node's notifying `set`. Array-shaped states
//! additionally support the structural operations `push`, `pop`, `shift`,
//! `unshift` and `splice`, which announce an [`ArrayEdit`] to whole-array
//! update subscribers before mutating.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::array_edit::ArrayEdit;
use crate::error::StateError;
use crate::node::{self, NodeKind, NodeRef};
use crate::plain::Plain;
use crate::value::{IntoValue, Key, Value};

/// Handle to one node of a reactive tree. Cloning yields another handle to
/// the same node; equality is node identity.
#[derive(Clone)]
pub struct State {
    node: NodeRef,
}

impl State {
    pub(crate) fn from_node(node: NodeRef) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn kind(&self) -> NodeKind {
        self.node.borrow().kind()
    }

    pub fn is_array(&self) -> bool {
        self.kind() == NodeKind::Array
    }

    pub fn ptr_eq(&self, other: &State) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Reads field `key`; missing fields read as [`Value::Undefined`].
    pub fn get(&self, key: impl Into<Key>) -> Value {
        self.node
            .borrow()
            .lookup(&key.into())
            .cloned()
            .unwrap_or_default()
    }

    /// Reads field `key` when it holds a child node.
    pub fn child(&self, key: impl Into<Key>) -> Option<State> {
        self.get(key).into_state()
    }

    /// Writes field `key` and synchronously notifies every subscription whose
    /// path runs through it. Writing the current value does nothing.
    pub fn set<V: IntoValue>(&self, key: impl Into<Key>, value: V) -> Result<(), StateError> {
        let value = value.into_value()?;
        node::set(&self.node, key.into(), value)
    }

    pub fn has(&self, key: impl Into<Key>) -> bool {
        self.node.borrow().lookup(&key.into()).is_some()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.node.borrow().keys()
    }

    pub fn len(&self) -> usize {
        self.node.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily yields the elements (or object field values) in order. Each
    /// call starts a fresh pass over the current contents.
    pub fn iter(&self) -> Iter {
        Iter {
            state: self.clone(),
            index: 0,
        }
    }

    /// Appends `items`, returning the new length.
    pub fn push<I, V>(&self, items: I) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        let items = collect_values(items)?;
        self.edit(ArrayEdit::Push(items))?;
        Ok(self.len())
    }

    /// Removes the last element; `Undefined` when the array is empty.
    pub fn pop(&self) -> Result<Value, StateError> {
        Ok(self.edit(ArrayEdit::Pop)?.pop().unwrap_or_default())
    }

    /// Removes the first element; `Undefined` when the array is empty.
    pub fn shift(&self) -> Result<Value, StateError> {
        Ok(self.edit(ArrayEdit::Shift)?.pop().unwrap_or_default())
    }

    /// Prepends `items`, returning the new length.
    pub fn unshift<I, V>(&self, items: I) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        let items = collect_values(items)?;
        self.edit(ArrayEdit::Unshift(items))?;
        Ok(self.len())
    }

    /// Replaces `delete_count` elements at `start` with `items`, returning the
    /// removed elements.
    pub fn splice<I, V>(
        &self,
        start: usize,
        delete_count: usize,
        items: I,
    ) -> Result<Vec<Value>, StateError>
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        let items = collect_values(items)?;
        self.edit(ArrayEdit::Splice {
            start,
            delete_count,
            items,
        })
    }

    fn edit(&self, edit: ArrayEdit) -> Result<Vec<Value>, StateError> {
        let sinks = {
            let node = self.node.borrow();
            if node.kind() != NodeKind::Array {
                return Err(StateError::NotArray);
            }
            node.update_sinks()
        };
        debug!(?edit, subscribers = sinks.len(), "array edit");
        for sink in sinks {
            sink(&edit);
        }
        let mut node = self.node.borrow_mut();
        let items = node.items_mut().ok_or(StateError::NotArray)?;
        Ok(edit.apply_in_place(items, Value::clone))
    }

    /// Shallow plain copy: primitives are copied, child nodes are embedded as
    /// [`Plain::State`]. Building a tree from it shares those children.
    pub fn to_plain(&self) -> Plain {
        let node = self.node.borrow();
        match node.kind() {
            NodeKind::Object => Plain::Object(Rc::new(RefCell::new(
                node.entries()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), Plain::from(v)))
                    .collect::<IndexMap<_, _>>(),
            ))),
            NodeKind::Array => Plain::array(node.entries().into_iter().map(|(_, v)| v)),
        }
    }

    /// Snapshot of the tree below this node as JSON.
    ///
    /// Undefined object fields are omitted and undefined array slots become
    /// `null`; binary buffers become arrays of byte values.
    pub fn to_json(&self) -> Result<serde_json::Value, StateError> {
        let mut ancestors = Vec::new();
        state_to_json(self, &mut ancestors)
    }
}

fn collect_values<I, V>(items: I) -> Result<Vec<Value>, StateError>
where
    I: IntoIterator<Item = V>,
    V: IntoValue,
{
    items.into_iter().map(IntoValue::into_value).collect()
}

fn state_to_json(
    state: &State,
    ancestors: &mut Vec<*const RefCell<node::Node>>,
) -> Result<serde_json::Value, StateError> {
    let id = Rc::as_ptr(state.node());
    if ancestors.contains(&id) {
        return Err(StateError::CycleDetected);
    }
    ancestors.push(id);
    let (kind, entries) = {
        let node = state.node().borrow();
        (node.kind(), node.entries())
    };
    let json = match kind {
        NodeKind::Object => {
            let mut map = serde_json::Map::new();
            for (key, value) in entries {
                if let Some(json) = value_to_json(&value, ancestors)? {
                    map.insert(key.to_string(), json);
                }
            }
            serde_json::Value::Object(map)
        }
        NodeKind::Array => {
            let mut items = Vec::with_capacity(entries.len());
            for (_, value) in entries {
                items.push(value_to_json(&value, ancestors)?.unwrap_or(serde_json::Value::Null));
            }
            serde_json::Value::Array(items)
        }
    };
    ancestors.pop();
    Ok(json)
}

fn value_to_json(
    value: &Value,
    ancestors: &mut Vec<*const RefCell<node::Node>>,
) -> Result<Option<serde_json::Value>, StateError> {
    Ok(Some(match value {
        Value::Undefined => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Value::Number(n.clone()),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Binary(bytes) => serde_json::Value::Array(
            bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
        ),
        Value::State(state) => state_to_json(state, ancestors)?,
    }))
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for State {}

// Shallow on purpose: trees may be cyclic.
impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.try_borrow() {
            Ok(node) => f
                .debug_struct("State")
                .field("kind", &node.kind())
                .field("len", &node.len())
                .finish(),
            Err(_) => f.write_str("State { <borrowed> }"),
        }
    }
}

/// Iterator returned by [`State::iter`].
pub struct Iter {
    state: State,
    index: usize,
}

impl Iterator for Iter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let value = self.state.node().borrow().entry_at(self.index)?;
        self.index += 1;
        Some(value)
    }
}

impl IntoIterator for &State {
    type Item = Value;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}
