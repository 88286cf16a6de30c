//! # formschema
//!
//! Schema resolution and field-tree derivation for JSON-Schema driven forms.
//!
//! `formschema` takes a JSON-Schema-flavoured document and the current form
//! data, and produces what a rendering layer needs to draw the form: a fully
//! resolved schema, a tree of unique field identifiers and a parallel tree of
//! data paths.
//!
//! ## Features
//!
//! - `$ref` resolution against the root schema, including recursive schemas
//! - `allOf` merging with a pluggable merge strategy
//! - `dependencies` (property lists, schemas and `oneOf` branches) driven by
//!   the current form data
//! - Identifier and path trees of identical shape
//! - Initial form state computed from `default` keywords
//! - TOML and JSON data files, typed schemas via [`schemars`]
//!
//! ## Quick Start
//!
//! ```rust
//! use formschema::{FormContext, FormOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {"a": {"type": "string"}, "b": {"type": "number"}},
//! });
//! let ctx = FormContext::from_values(schema, json!({}), FormOptions::default());
//! let state = ctx.state().unwrap();
//! assert_eq!(state.id_tree.child("a").unwrap().value, "root_a");
//! ```
//!
//! ## Modules
//!
//! - [`schema`] - Resolution, merging and classification of schema nodes
//! - [`tree`] - Identifier and path trees
//! - [`defaults`] - Initial form data from `default` keywords
//! - [`form`] - Form session driven by field events
//! - [`run`] - Entry points for typed schemas

#[macro_use]
extern crate log;

/// Error types shared by the whole crate.
pub mod error;

/// Schema resolution, merging and classification.
///
/// Everything here is pure: results depend only on the root schema, the node
/// being resolved and the current form data.
pub mod schema;

/// Identifier and path trees derived from a resolved schema.
pub mod tree;

/// Initial form data computed from `default` keywords.
pub mod defaults;

/// Options controlling identifier generation and resolution limits.
pub mod options;

/// Form session state and field events.
pub mod form;

/// Entry points for schemas derived from Rust types.
pub mod run;

pub use defaults::default_form_state;
pub use error::{Result, SchemaError};
pub use form::{FieldEvent, FieldHook, FormContext, FormState};
pub use options::FormOptions;
pub use run::*;
pub use schema::{AllOfMerger, DefaultMerger, JsonSchemaValidator, Resolver, SchemaKind, Validator};
pub use serde_json::Value;
pub use tree::{FieldPath, IdTree, PathTree, build_ids, build_paths};
