//! # clawio-core: Foundational Types for the Data Service
//!
//! Leaf crate of the workspace. Defines the two primitives every other crate
//! builds on:
//!
//! 1. **[`Identity`]**: the verified caller, as resolved by the external
//!    authentication collaborator. Constructed only through a validating
//!    constructor so a username is always a single, safe path segment.
//!
//! 2. **[`jail()`] / [`PathResolver`]**: lexical path confinement. Any
//!    client-supplied logical path, however many `..` segments or absolute
//!    prefixes it carries, resolves to a physical path under the data root.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `clawio-*` crates (this is the leaf of the DAG).
//! - No filesystem access: path resolution is purely lexical.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod jail;

pub use error::CoreError;
pub use identity::Identity;
pub use jail::{home_dir, jail, PathResolver};
