use std::fmt;

use serde_json::{Map, Value};

use super::{FieldTree, TreeLabel, Walker};
use crate::{
    error::{Result, SchemaError},
    schema::{Resolver, SchemaKind, Validator},
};

/// Tree of data-access paths, parallel to [`IdTree`](super::IdTree).
pub type PathTree = FieldTree<FieldPath>;

/// Segments leading from the form-data root to one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Path of the form-data root itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path one property deeper.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Value at this path, if the form data has one.
    pub fn get<'v>(&self, data: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(data, |value, segment| value.get(segment))
    }

    /// Write `value` at this path, creating missing intermediate objects.
    ///
    /// `Null` along the way counts as missing; any other non-object value in
    /// the way is a [`SchemaError::TypeMismatch`].
    pub fn set(&self, data: &mut Value, value: Value) -> Result<()> {
        let mut current = data;
        for (depth, segment) in self.segments.iter().enumerate() {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            let actual = SchemaKind::guess(current);
            match current {
                Value::Object(fields) => {
                    current = fields.entry(segment.clone()).or_insert(Value::Null);
                }
                _ => {
                    let walked: FieldPath = self.segments[..depth].iter().cloned().collect();
                    return Err(SchemaError::TypeMismatch {
                        path: walked.to_string(),
                        expected: "object".to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
        }
        *current = value;
        Ok(())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl TreeLabel for FieldPath {
    const KEY: &'static str = "$name";

    fn label(&self) -> String {
        self.to_string()
    }
}

impl PathTree {
    /// Build the path tree for `schema`, rooted at `base`.
    pub fn build(
        resolver: &Resolver<'_>,
        schema: &Value,
        base: FieldPath,
        form_data: &Value,
    ) -> Result<Self> {
        let child_path = |parent: &FieldPath, name: &str| parent.join(name);
        Walker::new(resolver)
            .walk(schema, base, form_data, &child_path)
            .map(|(tree, _)| tree)
    }
}

/// Build a path tree with the default merge policy.
pub fn build_paths(
    validator: &dyn Validator,
    schema: &Value,
    base: FieldPath,
    root_schema: &Value,
    form_data: &Value,
) -> Result<PathTree> {
    let resolver = Resolver::new(root_schema).with_validator(validator);
    PathTree::build(&resolver, schema, base, form_data)
}
