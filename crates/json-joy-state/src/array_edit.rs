//! Structural array edits delivered to whole-array update subscribers.

use crate::value::Value;

/// A structural edit of an array, delivered before it is applied.
///
/// Subscribers use it as a transform from the previous array to the next one,
/// so they can replay the same edit on a copy they hold themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayEdit {
    Push(Vec<Value>),
    Pop,
    Shift,
    Unshift(Vec<Value>),
    /// Removes `delete_count` elements at `start` and inserts `items` there.
    /// Both bounds are clamped to the array.
    Splice {
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    },
}

impl ArrayEdit {
    /// Returns a copy of `prev` with this edit applied.
    pub fn apply(&self, prev: &[Value]) -> Vec<Value> {
        self.apply_with(prev, Value::clone)
    }

    /// Like [`apply`](Self::apply) for arrays of any element type; inserted
    /// values are mapped through `convert`.
    pub fn apply_with<T, F>(&self, prev: &[T], convert: F) -> Vec<T>
    where
        T: Clone,
        F: FnMut(&Value) -> T,
    {
        let mut next = prev.to_vec();
        self.apply_in_place(&mut next, convert);
        next
    }

    /// Applies the edit to `target` and returns the removed elements.
    pub(crate) fn apply_in_place<T, F>(&self, target: &mut Vec<T>, convert: F) -> Vec<T>
    where
        F: FnMut(&Value) -> T,
    {
        match self {
            ArrayEdit::Push(items) => {
                target.extend(items.iter().map(convert));
                Vec::new()
            }
            ArrayEdit::Pop => target.pop().into_iter().collect(),
            ArrayEdit::Shift => {
                if target.is_empty() {
                    Vec::new()
                } else {
                    vec![target.remove(0)]
                }
            }
            ArrayEdit::Unshift(items) => {
                let tail = std::mem::take(target);
                target.extend(items.iter().map(convert));
                target.extend(tail);
                Vec::new()
            }
            ArrayEdit::Splice {
                start,
                delete_count,
                items,
            } => {
                let start = (*start).min(target.len());
                let end = start.saturating_add(*delete_count).min(target.len());
                target.splice(start..end, items.iter().map(convert)).collect()
            }
        }
    }
}
