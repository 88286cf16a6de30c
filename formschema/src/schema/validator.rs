//! Condition checks for dependency branches.
//!
//! Picking the active `oneOf` branch of a schema dependency needs a yes/no
//! answer for "does this form data satisfy that condition schema". The
//! default answer comes from the `jsonschema` crate; callers with other
//! needs plug their own check in through [`Validator`].

use std::borrow::Cow;

use serde_json::Value;

/// Decides whether `data` satisfies `schema`.
pub trait Validator {
    fn is_valid(&self, schema: &Value, data: &Value, root: &Value) -> bool;
}

/// Full JSON Schema validation of conditions.
///
/// Conditions are compiled on their own, with the root schema's
/// `definitions` and `$defs` copied in so that local `$ref`s keep working.
/// A condition that does not compile never matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl Validator for JsonSchemaValidator {
    fn is_valid(&self, schema: &Value, data: &Value, root: &Value) -> bool {
        let condition = with_root_definitions(schema, root);
        match jsonschema::validator_for(&condition) {
            Ok(validator) => validator.is_valid(data),
            Err(err) => {
                warn!("condition does not compile, treating it as unmatched: {err}");
                false
            }
        }
    }
}

fn with_root_definitions<'a>(schema: &'a Value, root: &Value) -> Cow<'a, Value> {
    let (Some(obj), Some(root)) = (schema.as_object(), root.as_object()) else {
        return Cow::Borrowed(schema);
    };
    let mut obj = obj.clone();
    for key in ["definitions", "$defs"] {
        if let Some(defs) = root.get(key) {
            obj.entry(key).or_insert_with(|| defs.clone());
        }
    }
    Cow::Owned(Value::Object(obj))
}
