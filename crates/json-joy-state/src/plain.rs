//! Plain (unwrapped) input values for the tree builder.
//!
//! Containers are held behind `Rc<RefCell<..>>` so that a source object has an
//! identity: cloning a [`Plain::Object`] yields a second handle to the same
//! object, which the builder turns into one shared node.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Number;

use crate::error::StateError;
use crate::state::State;
use crate::value::{Binary, Value};

pub type Shared<T> = Rc<RefCell<T>>;

#[derive(Clone, Default)]
pub enum Plain {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Binary(Binary),
    Array(Shared<Vec<Plain>>),
    Object(Shared<IndexMap<String, Plain>>),
    /// An already wrapped subtree, reused as-is by the builder.
    State(State),
}

impl Plain {
    pub fn array<I, V>(items: I) -> Plain
    where
        I: IntoIterator<Item = V>,
        V: Into<Plain>,
    {
        Plain::Array(Rc::new(RefCell::new(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    pub fn object<I, K, V>(entries: I) -> Plain
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Plain>,
    {
        Plain::Object(Rc::new(RefCell::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }

    /// Inserts a field into a plain object, returning the previous value.
    pub fn insert(
        &self,
        key: impl Into<String>,
        value: impl Into<Plain>,
    ) -> Result<Option<Plain>, StateError> {
        match self {
            Plain::Object(map) => Ok(map.borrow_mut().insert(key.into(), value.into())),
            _ => Err(StateError::NotAContainer),
        }
    }

    /// Appends an element to a plain array.
    pub fn push(&self, value: impl Into<Plain>) -> Result<(), StateError> {
        match self {
            Plain::Array(items) => {
                items.borrow_mut().push(value.into());
                Ok(())
            }
            _ => Err(StateError::NotArray),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Plain::Array(_) | Plain::Object(_))
    }

    /// Returns `true` when both handles refer to the same source container.
    pub fn ptr_eq(&self, other: &Plain) -> bool {
        match (self, other) {
            (Plain::Array(a), Plain::Array(b)) => Rc::ptr_eq(a, b),
            (Plain::Object(a), Plain::Object(b)) => Rc::ptr_eq(a, b),
            (Plain::State(a), Plain::State(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// The field value this input stands for, or `None` for raw containers.
    pub(crate) fn to_value(&self) -> Option<Value> {
        Some(match self {
            Plain::Undefined => Value::Undefined,
            Plain::Null => Value::Null,
            Plain::Bool(b) => Value::Bool(*b),
            Plain::Number(n) => Value::Number(n.clone()),
            Plain::String(s) => Value::String(s.clone()),
            Plain::Binary(b) => Value::Binary(b.clone()),
            Plain::State(s) => Value::State(s.clone()),
            Plain::Array(_) | Plain::Object(_) => return None,
        })
    }
}

// Containers print their size only; a plain graph may be cyclic.
impl fmt::Debug for Plain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plain::Undefined => f.write_str("Undefined"),
            Plain::Null => f.write_str("Null"),
            Plain::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Plain::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Plain::String(s) => f.debug_tuple("String").field(s).finish(),
            Plain::Binary(b) => fmt::Debug::fmt(b, f),
            Plain::Array(items) => write!(f, "Array(len={})", items.borrow().len()),
            Plain::Object(map) => write!(f, "Object(len={})", map.borrow().len()),
            Plain::State(s) => fmt::Debug::fmt(s, f),
        }
    }
}

impl From<Value> for Plain {
    fn from(value: Value) -> Self {
        match value {
            Value::Undefined => Plain::Undefined,
            Value::Null => Plain::Null,
            Value::Bool(b) => Plain::Bool(b),
            Value::Number(n) => Plain::Number(n),
            Value::String(s) => Plain::String(s),
            Value::Binary(b) => Plain::Binary(b),
            Value::State(s) => Plain::State(s),
        }
    }
}

macro_rules! plain_from_via_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Plain {
                fn from(v: $t) -> Self {
                    Plain::from(Value::from(v))
                }
            }
        )*
    };
}

plain_from_via_value!(
    bool, i32, i64, u32, u64, usize, f32, f64, &str, String, Number, Binary, State, &State
);

impl From<serde_json::Value> for Plain {
    /// Every JSON container becomes a fresh source object; JSON has no sharing.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Plain::Null,
            serde_json::Value::Bool(b) => Plain::Bool(b),
            serde_json::Value::Number(n) => Plain::Number(n),
            serde_json::Value::String(s) => Plain::String(s),
            serde_json::Value::Array(items) => Plain::array(items),
            serde_json::Value::Object(map) => Plain::object(map),
        }
    }
}
