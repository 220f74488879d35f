//! Reactive state trees over JSON-like values.
//!
//! [`tree_state`] wraps a nested value into a tree of nodes and returns a
//! [`State`] for its root. Reads through a `State` behave like reads of the
//! plain value; writes notify exactly the subscribers whose path changed.
//! [`binder`] derives a read-only [`Binder`] from a state, used to attach
//! setters to any path, including paths whose ancestors are later replaced.
//!
//! Delivery is synchronous: every write completes its notification fan-out
//! before returning. Trees are single-threaded (`!Send`).
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use json_joy_state::{binder, tree_state, Value};
//! use serde_json::json;
//!
//! let state = tree_state(json!({"a": 1, "b": {"c": 2}})).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! binder(&state).at("b").at("c").bind(move |v| sink.borrow_mut().push(v));
//!
//! state.child("b").unwrap().set("c", 7).unwrap();
//! state.set("b", tree_state(json!({"c": 10})).unwrap()).unwrap();
//!
//! assert_eq!(*seen.borrow(), vec![Value::from(2), Value::from(7), Value::from(10)]);
//! ```

pub mod array_edit;
pub mod binder;
pub mod builder;
pub mod error;
pub mod node;
pub mod plain;
pub mod state;
pub mod value;

pub use array_edit::ArrayEdit;
pub use binder::{binder, Binder};
pub use builder::{tree_state, tree_state_with, TreeBuilder, TreeOptions};
pub use error::StateError;
pub use node::{ListenKey, NodeKind, UPDATE};
pub use plain::Plain;
pub use state::State;
pub use value::{Binary, IntoValue, Key, Value};
