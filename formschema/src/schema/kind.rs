//! Effective type classification of schema nodes.

use std::fmt;

use serde_json::Value;

/// The effective kind of a schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// Several declared types, in declaration order.
    Multi(Vec<SchemaKind>),
    /// No classifiable signal at all.
    Unknown,
}

impl SchemaKind {
    /// Classify a node.
    ///
    /// An explicit `type` wins. Without one the kind is inferred from
    /// `properties`/`additionalProperties` (object), `items` (array), `const`
    /// (the constant's own type) and `enum` (string). No resolution happens
    /// here: a bare `$ref` node classifies as [`SchemaKind::Unknown`].
    pub fn of(schema: &Value) -> Self {
        let Some(obj) = schema.as_object() else {
            return Self::Unknown;
        };

        if let Some(ty) = obj.get("type") {
            return Self::from_type_keyword(ty);
        }
        if obj.contains_key("properties") || obj.contains_key("additionalProperties") {
            return Self::Object;
        }
        if obj.contains_key("items") {
            return Self::Array;
        }
        if let Some(value) = obj.get("const") {
            return Self::guess(value);
        }
        if obj.contains_key("enum") {
            return Self::String;
        }
        Self::Unknown
    }

    /// Kind of a concrete JSON value.
    pub fn guess(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Parse a single `type` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "object" => Self::Object,
            "array" => Self::Array,
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            _ => return None,
        })
    }

    fn from_type_keyword(ty: &Value) -> Self {
        match ty {
            Value::String(name) => Self::from_name(name).unwrap_or(Self::Unknown),
            Value::Array(names) => {
                let kinds: Vec<_> = names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(Self::from_name)
                    .collect();
                match kinds.as_slice() {
                    [] => Self::Unknown,
                    [single] => single.clone(),
                    [a, Self::Null] | [Self::Null, a] => a.clone(),
                    _ => Self::Multi(kinds),
                }
            }
            _ => Self::Unknown,
        }
    }

    /// The `type` name of a simple kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Multi(_) => "multi",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multi(kinds) => {
                let names: Vec<_> = kinds.iter().map(Self::name).collect();
                write!(f, "[{}]", names.join(", "))
            }
            other => f.write_str(other.name()),
        }
    }
}
