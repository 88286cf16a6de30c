//! Initial form data computed from `default` keywords.
//!
//! Defaults flow downwards: an object or array default feeds the defaults of
//! its properties and items. What the parent gives a property is laid over
//! the property's own default, so an instance default beats the generic one
//! and the property's default only fills what the parent left out. The
//! current form data is merged over the result so that anything the user
//! already entered wins.

use serde_json::{Map, Value};

use crate::{
    error::{Result, SchemaError},
    schema::{RecursionGuard, Resolver, SchemaKind, needs_resolution},
};

/// Defaults for `schema` merged with `form_data`.
pub fn default_form_state(
    resolver: &Resolver<'_>,
    schema: &Value,
    form_data: &Value,
) -> Result<Value> {
    let defaults = compute_defaults(
        resolver,
        schema,
        &Value::Null,
        form_data,
        &RecursionGuard::new(),
        0,
    )?;
    Ok(merge_defaults_with_form_data(&defaults, form_data))
}

/// Schema of the array item at `index`.
///
/// A single `items` schema applies to every index. Tuple `items` give one
/// schema per index and fall back to `additionalItems` past their end.
pub fn item_schema(schema: &Value, index: usize) -> Option<&Value> {
    match schema.get("items")? {
        Value::Array(fixed) => fixed.get(index).or_else(|| {
            schema
                .get("additionalItems")
                .filter(|additional| additional.is_object())
        }),
        items @ Value::Object(_) => Some(items),
        _ => None,
    }
}

fn compute_defaults(
    resolver: &Resolver<'_>,
    schema: &Value,
    parent_default: &Value,
    form_data: &Value,
    guard: &RecursionGuard,
    depth: usize,
) -> Result<Value> {
    let limit = resolver.max_depth();
    if depth >= limit {
        return Err(SchemaError::DepthExceeded { limit });
    }

    let mut defaults = parent_default.clone();
    let mut guard = guard.clone();
    let resolved;
    let mut schema = schema;
    if needs_resolution(schema) {
        let candidate = resolver.resolve_with_guard(schema, form_data, &guard)?;
        if guard.contains(&candidate) {
            return Ok(defaults);
        }
        guard = guard.with(candidate.clone());
        resolved = candidate;
        schema = &resolved;
    }

    if let Some(own) = schema.get("default") {
        defaults = merge_defaults_with_form_data(own, &defaults);
    }

    match SchemaKind::of(schema) {
        SchemaKind::Object => {
            let Some(Value::Object(properties)) = schema.get("properties") else {
                return Ok(defaults);
            };
            let mut out = Map::new();
            for (name, property) in properties {
                let value = compute_defaults(
                    resolver,
                    property,
                    defaults.get(name).unwrap_or(&Value::Null),
                    form_data.get(name).unwrap_or(&Value::Null),
                    &guard,
                    depth + 1,
                )?;
                if !value.is_null() {
                    out.insert(name.clone(), value);
                }
            }
            if out.is_empty() {
                return Ok(defaults);
            }
            Ok(Value::Object(out))
        }
        SchemaKind::Array => {
            let mut items = match &defaults {
                Value::Array(items) => items.clone(),
                _ => Vec::new(),
            };
            if let Some(Value::Array(fixed)) = schema.get("items")
                && items.len() < fixed.len()
            {
                items.resize(fixed.len(), Value::Null);
            }
            if items.is_empty() {
                return Ok(defaults);
            }

            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let value = match item_schema(schema, index) {
                    Some(item_schema) => compute_defaults(
                        resolver,
                        item_schema,
                        item,
                        form_data.get(index).unwrap_or(&Value::Null),
                        &guard,
                        depth + 1,
                    )?,
                    None => item.clone(),
                };
                out.push(value);
            }
            Ok(Value::Array(out))
        }
        _ => Ok(defaults),
    }
}

/// Lay `form_data` over `defaults`.
///
/// Objects merge key by key and arrays index by index; a `Null` in the form
/// data keeps the default and any other value replaces it.
pub fn merge_defaults_with_form_data(defaults: &Value, form_data: &Value) -> Value {
    match (defaults, form_data) {
        (_, Value::Null) => defaults.clone(),
        (Value::Object(defaults), Value::Object(data)) => {
            let mut out = defaults.clone();
            for (key, value) in data {
                let merged = match defaults.get(key) {
                    Some(default) => merge_defaults_with_form_data(default, value),
                    None => value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (Value::Array(defaults), Value::Array(data)) => Value::Array(
            data.iter()
                .enumerate()
                .map(|(index, value)| match defaults.get(index) {
                    Some(default) => merge_defaults_with_form_data(default, value),
                    None => value.clone(),
                })
                .collect(),
        ),
        _ => form_data.clone(),
    }
}
