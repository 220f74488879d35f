#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use json_joy_state::{ArrayEdit, Value};

/// Records every value delivered to the setters it hands out.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Rc<RefCell<Vec<Value>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setter(&self) -> impl Fn(Value) + 'static {
        let calls = Rc::clone(&self.calls);
        move |v| calls.borrow_mut().push(v)
    }

    pub fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn last(&self) -> Value {
        self.calls.borrow().last().cloned().expect("setter was never called")
    }

    pub fn values(&self) -> Vec<Value> {
        self.calls.borrow().clone()
    }
}

/// An independently held copy of an array, kept in sync by replaying edits.
#[derive(Clone, Default)]
pub struct Mirror {
    items: Rc<RefCell<Vec<Value>>>,
    edits: Rc<RefCell<Vec<ArrayEdit>>>,
}

impl Mirror {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
            edits: Rc::default(),
        }
    }

    pub fn updater(&self) -> impl Fn(&ArrayEdit) + 'static {
        let items = Rc::clone(&self.items);
        let edits = Rc::clone(&self.edits);
        move |edit| {
            let next = edit.apply(&items.borrow());
            *items.borrow_mut() = next;
            edits.borrow_mut().push(edit.clone());
        }
    }

    pub fn items(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn edits(&self) -> Vec<ArrayEdit> {
        self.edits.borrow().clone()
    }
}

pub fn values(ns: &[i64]) -> Vec<Value> {
    ns.iter().copied().map(Value::from).collect()
}
