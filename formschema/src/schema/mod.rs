//! Schema resolution.
//!
//! ## Architecture
//!
//! - [`equal`] - structural equality used for cycle detection
//! - [`kind`] - effective type classification
//! - [`pointer`] - local `$ref` lookup
//! - [`merge`] - `allOf` merge policy
//! - [`validator`] - condition checks for dependency branches
//! - [`guard`] - per-branch recursion guard
//! - [`resolve`] - the resolver itself

/// `dependencies` activation, implemented on [`Resolver`].
mod dependencies;

pub mod equal;
pub mod guard;
pub mod kind;
pub mod merge;
pub mod pointer;
pub mod resolve;
pub mod validator;

pub use equal::deep_equal;
pub use guard::RecursionGuard;
pub use kind::SchemaKind;
pub use merge::{AllOfMerger, DefaultMerger};
pub use resolve::{Resolver, needs_resolution, resolve};
pub use validator::{JsonSchemaValidator, Validator};
