// src/dag/mod.rs

//! Dependency graph over catalog resources.
//!
//! [`graph`] builds an immutable DAG from a resource list, rejects
//! structural errors (zero/duplicate ids, missing dependencies, cycles),
//! and tracks per-node apply status so the driver can pull ready nodes and
//! propagate failures to dependents.

pub mod graph;

pub use graph::{DepGraph, GraphError, NodeHandle};
