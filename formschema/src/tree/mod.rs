//! Field trees derived from a schema.
//!
//! The identifier tree and the path tree are produced by the same walk over
//! the schema, so they always have the same shape: one node per visited
//! schema node, with one child per declared property of object nodes. Arrays
//! do not get a node of their own; their item schema is walked in their place.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    error::{Result, SchemaError},
    schema::{RecursionGuard, Resolver, SchemaKind, needs_resolution},
};

/// Field identifier tree.
pub mod id;

/// Data-path tree.
pub mod path;

pub use id::{IdTree, build_ids};
pub use path::{FieldPath, PathTree, build_paths};

/// Value carried by every node of a field tree.
pub trait TreeLabel {
    /// Key the label is rendered under in JSON (`$id`, `$name`).
    const KEY: &'static str;

    fn label(&self) -> String;
}

/// A tree mirroring the `properties` structure of a resolved schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTree<T> {
    /// Label of this node.
    pub value: T,
    children: Vec<(String, FieldTree<T>)>,
}

impl<T> FieldTree<T> {
    pub fn leaf(value: T) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Child for a property name.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, tree)| tree)
    }

    /// Children in declared property order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Self)> {
        self.children.iter().map(|(key, tree)| (key.as_str(), tree))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(key, _)| key.as_str())
    }

    /// Node reached by following property names from this node.
    pub fn at<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Self> {
        keys.iter()
            .try_fold(self, |tree, key| tree.child(key.as_ref()))
    }

    /// Property names leading to the first node (pre-order) whose label
    /// satisfies `pred`.
    pub fn locate(&self, pred: impl Fn(&T) -> bool) -> Option<Vec<String>> {
        fn go<T>(tree: &FieldTree<T>, pred: &dyn Fn(&T) -> bool, trail: &mut Vec<String>) -> bool {
            if pred(&tree.value) {
                return true;
            }
            for (key, child) in &tree.children {
                trail.push(key.clone());
                if go(child, pred, trail) {
                    return true;
                }
                trail.pop();
            }
            false
        }

        let mut trail = Vec::new();
        go(self, &pred, &mut trail).then_some(trail)
    }

    /// Labels in pre-order.
    pub fn values(&self) -> Vec<&T> {
        let mut out = vec![&self.value];
        for (_, child) in &self.children {
            out.extend(child.values());
        }
        out
    }

    /// Whether both trees have the same keys at every depth.
    pub fn same_shape<U>(&self, other: &FieldTree<U>) -> bool {
        self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|((a_key, a), (b_key, b))| a_key == b_key && a.same_shape(b))
    }

    fn push(&mut self, name: String, child: Self) {
        self.children.push((name, child));
    }
}

impl<T: TreeLabel> FieldTree<T> {
    /// Render as `{"<KEY>": label, "<name>": {...}}`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(T::KEY.to_string(), Value::String(self.value.label()));
        for (key, child) in &self.children {
            obj.insert(key.clone(), child.to_json());
        }
        Value::Object(obj)
    }
}

impl<T: TreeLabel> Serialize for FieldTree<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// The walk shared by both tree builders.
///
/// Every node carrying `$ref`, `allOf` or `dependencies` is resolved before
/// it is inspected, and so is an object node whose form data may hold keys
/// for `additionalProperties`. If the resolved node was already seen on the
/// way down the walk stops there and the unresolved node becomes a leaf.
///
/// Alongside the tree the walk returns the schema it walked: the resolved
/// node with every visited `properties` entry and `items` schema replaced by
/// its own resolved form.
pub(crate) struct Walker<'r, 'a> {
    resolver: &'r Resolver<'a>,
}

impl<'r, 'a> Walker<'r, 'a> {
    pub(crate) fn new(resolver: &'r Resolver<'a>) -> Self {
        Self { resolver }
    }

    pub(crate) fn walk<T>(
        &self,
        schema: &Value,
        label: T,
        form_data: &Value,
        child_label: &dyn Fn(&T, &str) -> T,
    ) -> Result<(FieldTree<T>, Value)> {
        self.walk_at(schema, label, form_data, &RecursionGuard::new(), 0, child_label)
    }

    fn walk_at<T>(
        &self,
        schema: &Value,
        label: T,
        form_data: &Value,
        guard: &RecursionGuard,
        depth: usize,
        child_label: &dyn Fn(&T, &str) -> T,
    ) -> Result<(FieldTree<T>, Value)> {
        let limit = self.resolver.max_depth();
        if depth >= limit {
            return Err(SchemaError::DepthExceeded { limit });
        }

        let mut guard = guard.clone();
        let resolved;
        let mut schema = schema;
        if needs_resolution(schema) {
            let candidate = self
                .resolver
                .resolve_with_guard(schema, form_data, &guard)?;
            if guard.contains(&candidate) {
                debug!("recursive schema, `{}` becomes a leaf", truncated(schema));
            } else {
                guard = guard.with(candidate.clone());
                resolved = candidate;
                schema = &resolved;
            }
        } else if has_open_properties(schema, form_data) {
            resolved = self
                .resolver
                .resolve_with_guard(schema, form_data, &guard)?;
            schema = &resolved;
        }

        // `items` shares the array's label: a plain item schema is walked
        // directly, a bare reference is resolved by the next step first.
        if let Some(items @ Value::Object(_)) = schema.get("items") {
            let (tree, items) =
                self.walk_at(items, label, &Value::Null, &guard, depth + 1, child_label)?;
            return Ok((tree, with_keyword(schema, "items", items)));
        }

        let mut tree = FieldTree::leaf(label);
        if SchemaKind::of(schema).is_object()
            && let Some(Value::Object(properties)) = schema.get("properties")
        {
            let mut walked = Map::new();
            for (name, field) in properties {
                let field_data = form_data.get(name).unwrap_or(&Value::Null);
                let field_label = child_label(&tree.value, name);
                let (child, field) =
                    self.walk_at(field, field_label, field_data, &guard, depth + 1, child_label)?;
                tree.push(name.clone(), child);
                walked.insert(name.clone(), field);
            }
            return Ok((tree, with_keyword(schema, "properties", Value::Object(walked))));
        }
        Ok((tree, schema.clone()))
    }
}

/// Whether resolving would add `additionalProperties` stubs for `form_data`.
fn has_open_properties(schema: &Value, form_data: &Value) -> bool {
    form_data.is_object()
        && schema
            .get("additionalProperties")
            .is_some_and(|additional| additional != &Value::Bool(false))
}

fn with_keyword(schema: &Value, keyword: &str, value: Value) -> Value {
    let mut schema = schema.clone();
    if let Some(obj) = schema.as_object_mut() {
        obj.insert(keyword.to_string(), value);
    }
    schema
}

fn truncated(schema: &Value) -> String {
    let mut text = schema.to_string();
    if text.len() > 80 {
        let mut end = 80;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("...");
    }
    text
}
