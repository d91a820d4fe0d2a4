// src/catalog/mod.rs

//! Catalog data model and loading.
//!
//! - [`model`] is the typed, already-decoded view of a catalog that the
//!   applier consumes.
//! - [`loader`] reads the TOML representation used by the CLI. The applier
//!   itself never touches the wire format.

pub mod loader;
pub mod model;

pub use model::{
    Catalog, CommandKind, CommandSpec, Condition, EnvVar, ExecResource, FileResource, FileState,
    Payload, Resource,
};
