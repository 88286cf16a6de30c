//! Effective-schema resolution.
//!
//! A raw node can stand in for another one: `$ref` points elsewhere in the
//! root schema, `allOf` asks for a merge of its branches and `dependencies`
//! switch fragments on depending on the current form data. [`Resolver`]
//! expands those keywords one step at a time until the node has none left,
//! remembering every expansion in a [`RecursionGuard`] so that a schema that
//! expands back into itself stops instead of looping.

use serde_json::{Map, Value, json};

use super::{
    guard::RecursionGuard,
    kind::SchemaKind,
    merge::{AllOfMerger, DefaultMerger},
    pointer::find_definition,
    validator::{JsonSchemaValidator, Validator},
};
use crate::error::{Result, SchemaError};

/// Default ceiling on nested expansions.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Marks properties synthesized from `additionalProperties`.
pub const ADDITIONAL_PROPERTY_FLAG: &str = "__additional_property";

static JSON_SCHEMA_VALIDATOR: JsonSchemaValidator = JsonSchemaValidator;

/// Resolves schema nodes against one root schema.
///
/// A `Resolver` holds no state between calls: every top-level call starts
/// with an empty guard, and results depend only on the node and form data.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    root: &'a Value,
    merger: &'a dyn AllOfMerger,
    validator: &'a dyn Validator,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    /// Resolver with the built-in merge policy and condition checks.
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            merger: &DefaultMerger,
            validator: &JSON_SCHEMA_VALIDATOR,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Replace the `allOf` merge policy.
    pub fn with_merger(mut self, merger: &'a dyn AllOfMerger) -> Self {
        self.merger = merger;
        self
    }

    /// Replace the validator used to pick dependency `oneOf` branches.
    pub fn with_validator(mut self, validator: &'a dyn Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn root(&self) -> &'a Value {
        self.root
    }

    pub fn merger(&self) -> &'a dyn AllOfMerger {
        self.merger
    }

    pub fn validator(&self) -> &'a dyn Validator {
        self.validator
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Effective schema of `schema` for the given form data.
    pub fn resolve(&self, schema: &Value, form_data: &Value) -> Result<Value> {
        self.resolve_with_guard(schema, form_data, &RecursionGuard::new())
    }

    /// Like [`Resolver::resolve`], continuing an existing resolution chain.
    ///
    /// An expansion structurally equal to an entry of `guard` is returned
    /// as-is without being expanded further.
    pub fn resolve_with_guard(
        &self,
        schema: &Value,
        form_data: &Value,
        guard: &RecursionGuard,
    ) -> Result<Value> {
        self.resolve_at(schema, form_data, guard, 0)
    }

    pub(super) fn resolve_at(
        &self,
        schema: &Value,
        form_data: &Value,
        guard: &RecursionGuard,
        depth: usize,
    ) -> Result<Value> {
        if !needs_resolution(schema) {
            return self.stub_additional_properties(schema, form_data, guard, depth);
        }
        if depth >= self.max_depth {
            return Err(SchemaError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        let expanded = self.expand(schema, form_data, guard, depth)?;
        if guard.contains(&expanded) {
            debug!("schema expands into itself, stopping after {} steps", guard.len());
            return Ok(expanded);
        }
        let guard = guard.with(expanded.clone());
        self.resolve_at(&expanded, form_data, &guard, depth + 1)
    }

    /// One expansion step: `$ref` first, then `dependencies`, then `allOf`.
    fn expand(
        &self,
        schema: &Value,
        form_data: &Value,
        guard: &RecursionGuard,
        depth: usize,
    ) -> Result<Value> {
        let Some(obj) = schema.as_object() else {
            return Ok(schema.clone());
        };

        if let Some(pointer) = obj.get("$ref").and_then(Value::as_str) {
            trace!("expanding {pointer}");
            let target = find_definition(pointer, self.root)?;
            let mut local = obj.clone();
            local.shift_remove("$ref");
            return Ok(overlay(target, local));
        }

        if obj.contains_key("dependencies") {
            return self.resolve_dependencies(obj, form_data, guard, depth);
        }

        if let Some(Value::Array(branches)) = obj.get("allOf") {
            let mut base = obj.clone();
            base.shift_remove("allOf");
            let mut fragments = Vec::with_capacity(branches.len() + 1);
            fragments.push(Value::Object(base));
            for branch in branches {
                fragments.push(self.resolve_at(branch, form_data, guard, depth + 1)?);
            }
            trace!("merging {} allOf branches", branches.len());
            return self.merger.merge(&fragments);
        }

        Ok(schema.clone())
    }

    /// Give form-data keys that `properties` does not declare a schema taken
    /// from `additionalProperties`.
    fn stub_additional_properties(
        &self,
        schema: &Value,
        form_data: &Value,
        guard: &RecursionGuard,
        depth: usize,
    ) -> Result<Value> {
        let (Some(obj), Value::Object(fields)) = (schema.as_object(), form_data) else {
            return Ok(schema.clone());
        };
        let additional = match obj.get("additionalProperties") {
            None | Some(Value::Bool(false)) => return Ok(schema.clone()),
            Some(additional) => additional,
        };

        let mut properties = match obj.get("properties") {
            Some(Value::Object(props)) => props.clone(),
            _ => Map::new(),
        };
        let mut stubbed = false;
        for (key, value) in fields {
            if properties.contains_key(key) {
                continue;
            }
            let mut stub = match additional {
                Value::Object(a) if a.contains_key("$ref") => {
                    self.resolve_at(additional, value, guard, depth + 1)?
                }
                Value::Object(_) => additional.clone(),
                _ => json!({ "type": SchemaKind::guess(value).name() }),
            };
            if let Value::Object(stub) = &mut stub {
                stub.insert(ADDITIONAL_PROPERTY_FLAG.to_string(), Value::Bool(true));
            }
            properties.insert(key.clone(), stub);
            stubbed = true;
        }

        if !stubbed {
            return Ok(schema.clone());
        }
        let mut out = obj.clone();
        out.insert("properties".to_string(), Value::Object(properties));
        Ok(Value::Object(out))
    }
}

/// Whether the node still carries a keyword the resolver expands.
pub fn needs_resolution(schema: &Value) -> bool {
    schema.as_object().is_some_and(|obj| {
        obj.get("$ref").is_some_and(Value::is_string)
            || obj.contains_key("dependencies")
            || obj.get("allOf").is_some_and(Value::is_array)
    })
}

/// Resolve `schema` against `root` with the built-in strategies.
pub fn resolve(root: &Value, schema: &Value, form_data: &Value) -> Result<Value> {
    Resolver::new(root).resolve(schema, form_data)
}

/// The target with the referring node's own keys laid over it.
fn overlay(target: &Value, local: Map<String, Value>) -> Value {
    match target {
        Value::Object(target) => {
            let mut out = target.clone();
            for (key, value) in local {
                out.insert(key, value);
            }
            Value::Object(out)
        }
        _ => Value::Object(local),
    }
}
