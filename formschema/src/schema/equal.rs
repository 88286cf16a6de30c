//! Structural equality over schema and form-data trees.
//!
//! Freshly resolved nodes are rebuilt on every pass, so cycle detection has to
//! compare them by content. Object keys are compared regardless of their
//! order, numbers by value (`1` equals `1.0`), and the set-valued keywords
//! `required`, `type` and `enum` regardless of the order of their members.

use serde_json::{Map, Number, Value};

const SET_KEYWORDS: &[&str] = &["required", "type", "enum"];

/// Deep structural comparison of two values.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => objects_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => a == b,
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|(key, left)| match b.get(key) {
        Some(right) if SET_KEYWORDS.contains(&key.as_str()) => set_equal(left, right),
        Some(right) => deep_equal(left, right),
        None => false,
    })
}

fn set_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return false;
            }
            // each element of `b` pairs with at most one element of `a`
            let mut used = vec![false; b.len()];
            a.iter().all(|x| {
                let pair = (0..b.len()).find(|&i| !used[i] && deep_equal(x, &b[i]));
                pair.map(|i| used[i] = true).is_some()
            })
        }
        _ => deep_equal(a, b),
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
