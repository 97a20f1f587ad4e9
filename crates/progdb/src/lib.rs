//! progdb - program relation database CLI.
//!
//! This crate provides the `progdb` binary: it loads extractor output from a
//! directory of unit files, builds a fact base with `progdb-core` and answers
//! queries as JSON.
//!
//! ## Modules
//!
//! - `cli` - fact loading and CLI command implementations

pub mod cli;

// Re-export core types for convenience
pub use progdb_core::error::{FactError, FactResult, OutputErrorCode};
pub use progdb_core::output::{ErrorInfo, ErrorResponse, SCHEMA_VERSION};
pub use progdb_core::ProgramFacts;
