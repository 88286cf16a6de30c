//! `dependencies` activation.
//!
//! A dependency fires when the form data holds a value for its key. A list of
//! names makes those names required; a schema is merged into the node with the
//! resolver's merge policy. A schema dependency carrying `oneOf` additionally
//! merges the single branch whose condition on the key matches the data.

use serde_json::{Map, Value, json};

use super::{guard::RecursionGuard, resolve::Resolver};
use crate::error::Result;

impl Resolver<'_> {
    pub(super) fn resolve_dependencies(
        &self,
        schema: &Map<String, Value>,
        form_data: &Value,
        guard: &RecursionGuard,
        depth: usize,
    ) -> Result<Value> {
        let mut remaining = schema.clone();
        let dependencies = remaining.shift_remove("dependencies");
        let mut resolved = Value::Object(remaining);

        let Some(Value::Object(dependencies)) = dependencies else {
            return Ok(resolved);
        };

        for (key, dependency) in &dependencies {
            if form_data.get(key).is_none_or(Value::is_null) {
                continue;
            }
            if let Some(Value::Object(props)) = resolved.get("properties")
                && !props.contains_key(key)
            {
                continue;
            }
            trace!("dependency on `{key}` fires");
            resolved = match dependency {
                Value::Array(names) => with_dependent_properties(resolved, names),
                Value::Object(_) => self.with_dependent_schema(
                    &resolved, key, dependency, form_data, guard, depth,
                )?,
                _ => resolved,
            };
        }
        Ok(resolved)
    }

    fn with_dependent_schema(
        &self,
        schema: &Value,
        key: &str,
        dependency: &Value,
        form_data: &Value,
        guard: &RecursionGuard,
        depth: usize,
    ) -> Result<Value> {
        let mut dependent = self.resolve_at(dependency, form_data, guard, depth + 1)?;
        let one_of = dependent
            .as_object_mut()
            .and_then(|obj| obj.shift_remove("oneOf"));

        let merged = self.merger().merge(&[schema.clone(), dependent])?;
        let Some(Value::Array(one_of)) = one_of else {
            return Ok(merged);
        };

        let mut options = Vec::with_capacity(one_of.len());
        for option in &one_of {
            if option.get("$ref").is_some() {
                options.push(self.resolve_at(option, form_data, guard, depth + 1)?);
            } else {
                options.push(option.clone());
            }
        }
        self.with_exactly_one_subschema(merged, key, &options, form_data, guard, depth)
    }

    fn with_exactly_one_subschema(
        &self,
        schema: Value,
        key: &str,
        options: &[Value],
        form_data: &Value,
        guard: &RecursionGuard,
        depth: usize,
    ) -> Result<Value> {
        let matching: Vec<&Value> = options
            .iter()
            .filter(|option| {
                let Some(condition) = option.get("properties").and_then(|p| p.get(key)) else {
                    return false;
                };
                let condition = json!({
                    "type": "object",
                    "properties": { key: condition },
                });
                self.validator().is_valid(&condition, form_data, self.root())
            })
            .collect();

        let [branch] = matching.as_slice() else {
            warn!(
                "ignoring oneOf in dependencies for `{key}`: {} branches match instead of one",
                matching.len()
            );
            return Ok(schema);
        };

        let mut branch = branch.as_object().cloned().unwrap_or_default();
        if let Some(Value::Object(props)) = branch.get_mut("properties") {
            props.shift_remove(key);
        }
        let branch = self.resolve_at(&Value::Object(branch), form_data, guard, depth + 1)?;
        self.merger().merge(&[schema, branch])
    }
}

fn with_dependent_properties(mut schema: Value, names: &[Value]) -> Value {
    let Some(obj) = schema.as_object_mut() else {
        return schema;
    };
    let required = obj
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(required) = required {
        for name in names {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }
    }
    schema
}
