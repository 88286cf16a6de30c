//! Merge policy for `allOf` branches and activated dependency schemas.
//!
//! The policy is a strategy object: anything implementing [`AllOfMerger`]
//! (including a plain closure) can replace [`DefaultMerger`] for a form.

use serde_json::{Map, Value};

use super::equal::deep_equal;
use crate::error::{Result, SchemaError};

/// Keywords whose value maps names to sub-schemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependencies",
];

/// Keywords whose value is a single sub-schema.
const SCHEMA_KEYWORDS: &[&str] = &[
    "items",
    "additionalItems",
    "additionalProperties",
    "contains",
    "not",
];

/// Merges an ordered list of schema fragments into one.
///
/// The first fragment is the composing node itself (without its `allOf`),
/// followed by the already resolved branches in declaration order.
pub trait AllOfMerger {
    fn merge(&self, fragments: &[Value]) -> Result<Value>;
}

impl<F> AllOfMerger for F
where
    F: Fn(&[Value]) -> Result<Value>,
{
    fn merge(&self, fragments: &[Value]) -> Result<Value> {
        self(fragments)
    }
}

/// Built-in merge policy.
///
/// Fragments are folded left to right. Later fragments win on scalar
/// conflicts, nested objects merge key by key, `required` lists are
/// concatenated without duplicates, and `type` / `enum` are intersected. An
/// empty `type` or `enum` intersection cannot be represented and is reported
/// as [`SchemaError::UnresolvableComposition`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMerger;

impl AllOfMerger for DefaultMerger {
    fn merge(&self, fragments: &[Value]) -> Result<Value> {
        let mut acc = Value::Object(Map::new());
        for fragment in fragments {
            acc = merge_schemas(&acc, fragment)?;
        }
        Ok(acc)
    }
}

/// Merge `right` into `left`.
pub fn merge_schemas(left: &Value, right: &Value) -> Result<Value> {
    let (Some(l), Some(r)) = (left.as_object(), right.as_object()) else {
        // `true` accepts everything and adds nothing.
        return Ok(match right {
            Value::Bool(true) => left.clone(),
            _ => right.clone(),
        });
    };

    let mut acc = l.clone();
    for (key, r_val) in r {
        let Some(l_val) = acc.get(key) else {
            acc.insert(key.clone(), r_val.clone());
            continue;
        };
        let merged = match key.as_str() {
            "type" => intersect_types(l_val, r_val)?,
            "enum" => intersect_enums(l_val, r_val)?,
            "required" => union(l_val, r_val),
            k if SCHEMA_MAP_KEYWORDS.contains(&k) => merge_schema_maps(l_val, r_val)?,
            k if SCHEMA_KEYWORDS.contains(&k) => merge_schemas(l_val, r_val)?,
            _ => merge_plain(l_val, r_val),
        };
        acc.insert(key.clone(), merged);
    }
    Ok(Value::Object(acc))
}

fn merge_schema_maps(left: &Value, right: &Value) -> Result<Value> {
    let (Some(l), Some(r)) = (left.as_object(), right.as_object()) else {
        return Ok(right.clone());
    };
    let mut acc = l.clone();
    for (name, r_schema) in r {
        let merged = match acc.get(name) {
            Some(l_schema) => merge_schemas(l_schema, r_schema)?,
            None => r_schema.clone(),
        };
        acc.insert(name.clone(), merged);
    }
    Ok(Value::Object(acc))
}

fn merge_plain(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut acc = l.clone();
            for (key, r_val) in r {
                let merged = match acc.get(key) {
                    Some(l_val) => merge_plain(l_val, r_val),
                    None => r_val.clone(),
                };
                acc.insert(key.clone(), merged);
            }
            Value::Object(acc)
        }
        _ => right.clone(),
    }
}

fn union(left: &Value, right: &Value) -> Value {
    let (Some(l), Some(r)) = (left.as_array(), right.as_array()) else {
        return right.clone();
    };
    let mut out = l.clone();
    for item in r {
        if !out.iter().any(|x| deep_equal(x, item)) {
            out.push(item.clone());
        }
    }
    Value::Array(out)
}

fn type_names(ty: &Value) -> Vec<&str> {
    match ty {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn intersect_types(left: &Value, right: &Value) -> Result<Value> {
    let l = type_names(left);
    let r = type_names(right);

    let mut common: Vec<&str> = Vec::new();
    for &t in &l {
        let kept = if r.contains(&t) {
            Some(t)
        } else if (t == "number" && r.contains(&"integer"))
            || (t == "integer" && r.contains(&"number"))
        {
            Some("integer")
        } else {
            None
        };
        if let Some(t) = kept
            && !common.contains(&t)
        {
            common.push(t);
        }
    }

    match common.as_slice() {
        [] => Err(SchemaError::composition(
            "type",
            format!("{left} and {right} have no type in common"),
        )),
        [single] => Ok(Value::String(single.to_string())),
        many => Ok(Value::Array(
            many.iter().map(|t| Value::String(t.to_string())).collect(),
        )),
    }
}

fn intersect_enums(left: &Value, right: &Value) -> Result<Value> {
    let (Some(l), Some(r)) = (left.as_array(), right.as_array()) else {
        return Ok(right.clone());
    };
    let common: Vec<Value> = l
        .iter()
        .filter(|x| r.iter().any(|y| deep_equal(x, y)))
        .cloned()
        .collect();
    if common.is_empty() {
        return Err(SchemaError::composition(
            "enum",
            format!("{left} and {right} share no value"),
        ));
    }
    Ok(Value::Array(common))
}
