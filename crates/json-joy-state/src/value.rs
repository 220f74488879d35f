//! Field values, keys and the write-side conversion trait.
//!
//! A field of a [`State`] node holds either a primitive or a reference to a
//! child node. [`Value`] models both; its equality is the identity test used
//! to decide whether a write is a no-op.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use serde_json::Number;

use crate::error::StateError;
use crate::node::ListenKey;
use crate::plain::Plain;
use crate::state::State;

// ── Binary ─────────────────────────────────────────────────────────────────

/// Opaque binary buffer.
///
/// Buffers are atomic leaves: the tree builder never decomposes them and two
/// buffers are equal only when they are the same allocation.
#[derive(Clone)]
pub struct Binary(Rc<[u8]>);

impl Binary {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Rc::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Binary) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Binary {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Binary {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binary({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Binary {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

// ── Key ────────────────────────────────────────────────────────────────────

/// Address of a direct field of a node.
///
/// Keys are interpreted relative to the node they are applied to: on an
/// object `Index(3)` names the field `"3"`, on an array `Field("3")` names
/// index 3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl Key {
    pub(crate) fn into_field(self) -> Key {
        match self {
            Key::Index(i) => Key::Field(i.to_string()),
            key => key,
        }
    }

    pub(crate) fn into_index(self) -> Key {
        match self {
            Key::Field(name) => match array_index(&name) {
                Some(i) => Key::Index(i),
                None => Key::Field(name),
            },
            key => key,
        }
    }
}

/// Parses `name` as an array index; only the canonical decimal spelling counts.
pub(crate) fn array_index(name: &str) -> Option<usize> {
    let index = name.parse::<usize>().ok()?;
    (index.to_string() == name).then_some(index)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => f.write_str(name),
            Key::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::Field(name.clone())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<u32> for Key {
    fn from(index: u32) -> Self {
        Key::Index(index as usize)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        match usize::try_from(index) {
            Ok(i) => Key::Index(i),
            Err(_) => Key::Field(index.to_string()),
        }
    }
}

// ── Value ──────────────────────────────────────────────────────────────────

/// Contents of one field: a primitive or a wrapped child node.
///
/// `Undefined` stands for both an explicit undefined and a missing field.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Binary(Binary),
    State(State),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::State(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&State> {
        match self {
            Value::State(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_state(self) -> Option<State> {
        match self {
            Value::State(s) => Some(s),
            _ => None,
        }
    }

    /// Resolves one path step below this value. Anything that is not a node
    /// has no children.
    pub(crate) fn child(&self, key: &ListenKey) -> Value {
        match self {
            Value::State(state) => state.node().borrow().child(key),
            _ => Value::Undefined,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        a.as_f64() == b.as_f64()
    } else {
        a == b
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a.ptr_eq(b),
            (Value::State(a), Value::State(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

macro_rules! value_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

value_from_number!(i32, i64, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats have no JSON number form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::from(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Binary> for Value {
    fn from(b: Binary) -> Self {
        Value::Binary(b)
    }
}

impl From<State> for Value {
    fn from(s: State) -> Self {
        Value::State(s)
    }
}

impl From<&State> for Value {
    fn from(s: &State) -> Self {
        Value::State(s.clone())
    }
}

// ── IntoValue ──────────────────────────────────────────────────────────────

/// Conversion applied to everything written into a tree.
///
/// Primitives and wrapped states convert; raw containers are rejected with
/// [`StateError::UnwrappedAssignment`] and must go through
/// [`tree_state`](crate::tree_state) first.
pub trait IntoValue {
    fn into_value(self) -> Result<Value, StateError>;
}

macro_rules! into_value_via_from {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Result<Value, StateError> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

into_value_via_from!(
    Value, State, &State, bool, i32, i64, u32, u64, usize, f32, f64, &str, String, Number, Binary
);

impl IntoValue for Plain {
    fn into_value(self) -> Result<Value, StateError> {
        self.to_value().ok_or(StateError::UnwrappedAssignment)
    }
}

impl IntoValue for serde_json::Value {
    fn into_value(self) -> Result<Value, StateError> {
        match self {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => Ok(Value::Number(n)),
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(StateError::UnwrappedAssignment)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_float_spellings_are_equal() {
        assert_eq!(Value::from(7), Value::from(7.0));
        assert_eq!(Value::from(7u64), Value::from(7i64));
        assert_ne!(Value::from(7), Value::from(7.5));
    }

    #[test]
    fn undefined_and_null_are_distinct() {
        assert_ne!(Value::Undefined, Value::Null);
        assert_eq!(Value::default(), Value::Undefined);
    }

    #[test]
    fn binary_equality_is_identity() {
        let a = Binary::new(vec![1, 2, 3]);
        let b = Binary::new(vec![1, 2, 3]);
        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a), Value::from(b));
    }

    #[test]
    fn non_finite_float_becomes_null() {
        assert!(Value::from(f64::NAN).is_null());
    }

    #[test]
    fn key_canonical_forms() {
        assert_eq!(Key::from(3usize).into_field(), Key::from("3"));
        assert_eq!(Key::from("3").into_index(), Key::Index(3));
        assert_eq!(Key::from("03").into_index(), Key::from("03"));
        assert_eq!(Key::from("name").into_index(), Key::from("name"));
        assert_eq!(Key::from(-1), Key::from("-1"));
    }

    #[test]
    fn raw_json_containers_are_rejected() {
        assert_eq!(
            serde_json::json!({"c": 5}).into_value(),
            Err(StateError::UnwrappedAssignment)
        );
        assert_eq!(serde_json::json!("x").into_value(), Ok(Value::from("x")));
    }
}
