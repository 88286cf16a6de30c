//! Local `$ref` lookup.
//!
//! Only fragment pointers into the root schema (`#`, `#/definitions/item`)
//! are supported; anything else is reported as a missing reference.

use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Find the node a `$ref` points at inside `root`.
pub fn find_definition<'a>(pointer: &str, root: &'a Value) -> Result<&'a Value> {
    let Some(fragment) = pointer.strip_prefix('#') else {
        return Err(SchemaError::reference(pointer));
    };
    let fragment = percent_decode_str(fragment)
        .decode_utf8()
        .map_err(|_| SchemaError::reference(pointer))?;

    // serde_json handles the `~0`/`~1` escapes itself.
    root.pointer(&fragment)
        .ok_or_else(|| SchemaError::reference(pointer))
}
