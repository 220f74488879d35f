//! Tree builder: turns a [`Plain`] value into a tree of reactive nodes.
//!
//! With sharing detection enabled (the default) the builder remembers every
//! source container it has wrapped during one build, keyed by the container's
//! address. A container reached again, through a second path or through a
//! cycle, resolves to the node already built for it. Nodes are registered
//! before their children are built, which is what makes cycles terminate.
//!
//! Without sharing detection every path gets its own node, and a container
//! reached again while it is still being built is reported as
//! [`StateError::CycleDetected`].

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::StateError;
use crate::node::{Fields, Node, NodeKind};
use crate::plain::{Plain, Shared};
use crate::state::State;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// Map a source container reached through several paths to one node.
    pub share_detection: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            share_detection: true,
        }
    }
}

pub struct TreeBuilder {
    options: TreeOptions,
    reached: HashMap<usize, State>,
    in_progress: HashSet<usize>,
    created: usize,
    shared: usize,
}

impl TreeBuilder {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            reached: HashMap::new(),
            in_progress: HashSet::new(),
            created: 0,
            shared: 0,
        }
    }

    /// Builds the tree for `value`. The root must be a container or an
    /// already wrapped state.
    pub fn build(mut self, value: &Plain) -> Result<State, StateError> {
        let root = match value {
            Plain::Array(_) | Plain::Object(_) => self.wrap(value)?,
            Plain::State(state) => return Ok(state.clone()),
            _ => return Err(StateError::NotAContainer),
        };
        debug!(
            nodes = self.created,
            shared = self.shared,
            share_detection = self.options.share_detection,
            "tree state built"
        );
        root.into_state().ok_or(StateError::NotAContainer)
    }

    fn wrap(&mut self, value: &Plain) -> Result<Value, StateError> {
        match value {
            Plain::Array(items) => {
                self.wrap_container(source_id(items), NodeKind::Array, |builder| {
                    let items = items.borrow();
                    let wrapped = items
                        .iter()
                        .map(|item| builder.wrap(item))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Fields::Array(wrapped))
                })
            }
            Plain::Object(map) => {
                self.wrap_container(source_id(map), NodeKind::Object, |builder| {
                    let map = map.borrow();
                    let wrapped = map
                        .iter()
                        .map(|(key, item)| Ok((key.clone(), builder.wrap(item)?)))
                        .collect::<Result<IndexMap<_, _>, StateError>>()?;
                    Ok(Fields::Object(wrapped))
                })
            }
            other => other.to_value().ok_or(StateError::NotAContainer),
        }
    }

    fn wrap_container<F>(
        &mut self,
        source: usize,
        kind: NodeKind,
        fill: F,
    ) -> Result<Value, StateError>
    where
        F: FnOnce(&mut Self) -> Result<Fields, StateError>,
    {
        let share = self.options.share_detection;
        if share {
            if let Some(state) = self.reached.get(&source) {
                self.shared += 1;
                return Ok(Value::State(state.clone()));
            }
        } else if !self.in_progress.insert(source) {
            return Err(StateError::CycleDetected);
        }

        let state = State::from_node(Rc::new(RefCell::new(Node::new(kind))));
        self.created += 1;
        if share {
            self.reached.insert(source, state.clone());
        }
        let fields = fill(self);
        if !share {
            self.in_progress.remove(&source);
        }
        state.node().borrow_mut().fill(fields?);
        Ok(Value::State(state))
    }
}

fn source_id<T>(container: &Shared<T>) -> usize {
    Rc::as_ptr(container) as *const () as usize
}

/// Builds a reactive tree from `value` with sharing detection enabled.
pub fn tree_state(value: impl Into<Plain>) -> Result<State, StateError> {
    TreeBuilder::new(TreeOptions::default()).build(&value.into())
}

/// Builds a reactive tree from `value`; `skip_sharing_check` disables sharing
/// detection for large inputs known to be free of aliasing.
pub fn tree_state_with(
    value: impl Into<Plain>,
    skip_sharing_check: bool,
) -> Result<State, StateError> {
    let options = TreeOptions {
        share_detection: !skip_sharing_check,
    };
    TreeBuilder::new(options).build(&value.into())
}
