//! Form options.
//!
//! Options are usually left at their defaults, or read from a small file:
//!
//! ```toml
//! id_prefix = "form"
//! id_separator = "."
//! max_depth = 64
//! ```

use std::{fs, path::Path};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::resolve::DEFAULT_MAX_DEPTH;

/// How identifiers are built and how deep resolution may go.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct FormOptions {
    /// Identifier of the root field.
    pub id_prefix: String,
    /// Placed between a parent identifier and a property name.
    pub id_separator: String,
    /// Ceiling on nested schema expansion.
    pub max_depth: usize,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            id_prefix: "root".to_string(),
            id_separator: "_".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FormOptions {
    /// Load options from a `.toml` or `.json` file; missing keys keep their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let options = match ext {
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => {
                anyhow::bail!("unsupported options file extension: {ext:?}");
            }
        };
        Ok(options)
    }
}
