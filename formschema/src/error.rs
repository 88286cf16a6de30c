use thiserror::Error;

/// Errors raised while resolving a schema or deriving field trees from it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A `$ref` points outside the root schema or at nothing.
    #[error("could not find a definition for {pointer}")]
    Reference { pointer: String },

    /// An `allOf` or `dependencies` merge cannot be reconciled.
    #[error("cannot merge `{keyword}`: {reason}")]
    UnresolvableComposition { keyword: String, reason: String },

    /// Expansion went deeper than the configured ceiling.
    #[error("schema nesting exceeds the maximum depth of {limit}")]
    DepthExceeded { limit: usize },

    /// A field event named an id that the identifier tree does not contain.
    #[error("no field with id `{id}`")]
    UnknownField { id: String },

    /// Form data at `path` has the wrong shape for the requested write.
    #[error("type mismatch at `{path}`: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl SchemaError {
    pub(crate) fn reference(pointer: impl Into<String>) -> Self {
        Self::Reference {
            pointer: pointer.into(),
        }
    }

    pub(crate) fn composition(keyword: &str, reason: impl Into<String>) -> Self {
        Self::UnresolvableComposition {
            keyword: keyword.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the library.
pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
