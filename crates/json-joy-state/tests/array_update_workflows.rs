mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{values, Mirror, Recorder};
use json_joy_state::{binder, tree_state, ArrayEdit, StateError, Value};
use serde_json::json;

#[test]
fn pop_is_replayed_on_a_mirror() {
    let state = tree_state(json!({"numbers": [1, 2, 3, 4, 5]})).unwrap();
    let root = binder(&state);
    let mirror = Mirror::new(values(&[1, 2, 3, 4, 5]));
    root.at("numbers").update(mirror.updater()).unwrap();
    let whole = Recorder::new();
    root.at("numbers").bind(whole.setter());

    let numbers = state.child("numbers").unwrap();
    assert_eq!(numbers.pop().unwrap(), Value::from(5));
    assert_eq!(mirror.items(), values(&[1, 2, 3, 4]));
    assert_eq!(mirror.edits(), vec![ArrayEdit::Pop]);

    numbers.pop().unwrap();
    assert_eq!(mirror.items(), values(&[1, 2, 3]));
    assert_eq!(numbers.len(), 3);
    // the array node itself did not change
    assert_eq!(whole.count(), 1);
}

#[test]
fn update_setter_runs_before_the_edit_is_applied() {
    let state = tree_state(json!({"numbers": [1, 2, 3, 4]})).unwrap();
    let numbers = state.child("numbers").unwrap();
    let seen_len = Rc::new(Cell::new(0));
    let probe = numbers.clone();
    let len = Rc::clone(&seen_len);
    binder(&state)
        .at("numbers")
        .update(move |_| len.set(probe.len()))
        .unwrap();

    numbers.pop().unwrap();
    assert_eq!(seen_len.get(), 4);
    assert_eq!(numbers.len(), 3);
}

#[test]
fn every_edit_kind_keeps_the_mirror_in_sync() {
    let state = tree_state(json!({"numbers": [1, 2, 3]})).unwrap();
    let mirror = Mirror::new(values(&[1, 2, 3]));
    binder(&state).at("numbers").update(mirror.updater()).unwrap();
    let numbers = state.child("numbers").unwrap();

    assert_eq!(numbers.push([4, 5]).unwrap(), 5);
    assert_eq!(numbers.shift().unwrap(), Value::from(1));
    assert_eq!(numbers.unshift([0]).unwrap(), 5);
    assert_eq!(
        numbers.splice(1, 2, [9, 9, 9]).unwrap(),
        values(&[2, 3])
    );

    let current: Vec<Value> = numbers.iter().collect();
    assert_eq!(current, values(&[0, 9, 9, 9, 4, 5]));
    assert_eq!(mirror.items(), current);
    assert_eq!(mirror.edits().len(), 4);
}

#[test]
fn update_subscription_follows_a_replaced_array() {
    let state = tree_state(json!({"numbers": [1, 2, 3]})).unwrap();
    let mirror = Mirror::new(values(&[1, 2, 3]));
    binder(&state).at("numbers").update(mirror.updater()).unwrap();
    let old = state.child("numbers").unwrap();

    state.set("numbers", tree_state(json!([7, 8])).unwrap()).unwrap();
    assert!(mirror.edits().is_empty());

    old.push([4]).unwrap();
    assert!(mirror.edits().is_empty());

    state.child("numbers").unwrap().push([9]).unwrap();
    assert_eq!(mirror.edits(), vec![ArrayEdit::Push(values(&[9]))]);
}

#[test]
fn update_subscription_follows_a_replaced_ancestor() {
    let state = tree_state(json!({"data": {"numbers": [1]}})).unwrap();
    let mirror = Mirror::new(values(&[5]));
    binder(&state)
        .at("data")
        .at("numbers")
        .update(mirror.updater())
        .unwrap();

    state
        .set("data", tree_state(json!({"numbers": [5]})).unwrap())
        .unwrap();
    state
        .child("data")
        .unwrap()
        .child("numbers")
        .unwrap()
        .push([6])
        .unwrap();
    assert_eq!(mirror.items(), values(&[5, 6]));
}

#[test]
fn element_subscribers_are_not_notified_by_structural_edits() {
    let state = tree_state(json!({"numbers": [1, 2, 3]})).unwrap();
    let last = Recorder::new();
    binder(&state).at("numbers").at(2).bind(last.setter());

    let numbers = state.child("numbers").unwrap();
    numbers.pop().unwrap();
    assert_eq!(last.values(), vec![Value::from(3)]);
    assert!(numbers.get(2).is_undefined());

    numbers.set(2, 30).unwrap();
    assert_eq!(last.last(), Value::from(30));
}

#[test]
fn edits_on_empty_arrays_return_undefined() {
    let state = tree_state(json!([])).unwrap();
    assert!(state.pop().unwrap().is_undefined());
    assert!(state.shift().unwrap().is_undefined());
    assert!(state.splice(3, 1, Vec::<Value>::new()).unwrap().is_empty());
}

#[test]
fn array_operations_on_objects_fail() {
    let state = tree_state(json!({"a": 1})).unwrap();
    assert_eq!(state.pop(), Err(StateError::NotArray));
    assert_eq!(state.push([1]), Err(StateError::NotArray));
    assert_eq!(state.get("a"), Value::from(1));
}

#[test]
fn pushing_unwrapped_containers_fails_without_editing() {
    let state = tree_state(json!({"list": [1]})).unwrap();
    let mirror = Mirror::new(values(&[1]));
    binder(&state).at("list").update(mirror.updater()).unwrap();
    let list = state.child("list").unwrap();

    assert_eq!(
        list.push([json!({"x": 1})]),
        Err(StateError::UnwrappedAssignment)
    );
    assert_eq!(list.len(), 1);
    assert!(mirror.edits().is_empty());

    list.push([tree_state(json!({"x": 1})).unwrap()]).unwrap();
    assert_eq!(list.child(1).unwrap().get("x"), Value::from(1));
}
