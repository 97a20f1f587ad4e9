//! Core fact base for progdb.
//!
//! This crate stores structural facts about a program (classes, methods,
//! fields and the relations between them) and answers queries over them:
//! - Element model and session-scoped element registry
//! - Relation catalog with transposes
//! - Program relation database with override gating
//! - Analyzer and project membership
//! - Converter boundary for library declarations
//! - Class hierarchy analysis (resumable, cancellable)
//! - Connectivity-checked paths
//! - Ingestion of extractor output and the `ProgramFacts` facade
//! - Configuration, error types and JSON output types

pub mod analyzer;
pub mod cha;
pub mod config;
pub mod convert;
pub mod database;
pub mod element;
pub mod error;
pub mod ingest;
pub mod modifiers;
pub mod output;
pub mod path;
pub mod relation;
pub mod resolve;

pub use element::{Category, Element, ElementKey, ElementRef, ElementRegistry};
pub use error::{FactError, FactResult, OutputErrorCode};
pub use ingest::ProgramFacts;
pub use relation::Relation;
