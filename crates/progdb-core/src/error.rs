//! Error types and error code constants for progdb.
//!
//! This module provides a unified error type (`FactError`) covering every
//! failure the fact base can report, from malformed element keys at creation
//! time to path contract violations and aborted extraction passes.
//!
//! ## Error Code Mapping
//!
//! Exit codes used by the CLI:
//! - `2`: Invalid arguments (malformed element key, bad configuration)
//! - `3`: Resolution errors (a handle or element could not be converted)
//! - `4`: Unsupported query (override relations without CHA)
//! - `5`: Path contract violations (disconnected edge, empty path)
//! - `6`: Extraction failed (a compilation unit could not be ingested)
//! - `10`: Internal errors (I/O, unexpected state)
//!
//! ## Recovery
//!
//! `Conversion` is the only kind recovered locally: CHA and non-project
//! range lookups treat it as "no additional facts". Every other kind is
//! surfaced to the caller at the call that caused it.

use std::fmt;

use thiserror::Error;

use crate::element::Category;
use crate::relation::Relation;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (malformed key, bad config).
    InvalidArguments = 2,
    /// A handle or element could not be converted.
    ResolutionError = 3,
    /// The query cannot be answered in the current configuration or state.
    UnsupportedQuery = 4,
    /// A path invariant was violated.
    PathViolation = 5,
    /// The population pass was aborted.
    ExtractionFailed = 6,
    /// Internal errors (I/O, bugs).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the fact base.
#[derive(Debug, Error)]
pub enum FactError {
    /// Malformed element identity at creation time.
    #[error("invalid element key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// The converter cannot map a handle to an element or back.
    #[error("cannot convert '{subject}': {reason}")]
    Conversion { subject: String, reason: String },

    /// An override-family relation was queried before any CHA run.
    #[error("class hierarchy analysis has not run; {relation} is unavailable")]
    ChaNotEnabled { relation: Relation },

    /// The relation cannot be answered under the current configuration.
    #[error("relation {relation} is not supported: {reason}")]
    RelationUnsupported { relation: Relation, reason: String },

    /// A pushed edge does not connect to the current top of the path.
    #[error("edge {edge} is not connectable to path top {top}")]
    DisconnectedEdge { edge: String, top: String },

    /// An endpoint was requested from a path with no edges.
    #[error("path is empty")]
    EmptyPath,

    /// The population pass failed on a compilation unit.
    #[error("extraction failed for {unit}: {message}")]
    Extraction { unit: String, message: String },

    /// The configuration could not be read or parsed.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// I/O failure while reading inputs.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fact base operations.
pub type FactResult<T> = Result<T, FactError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&FactError> for OutputErrorCode {
    fn from(err: &FactError) -> Self {
        match err {
            FactError::InvalidKey { .. } => OutputErrorCode::InvalidArguments,
            FactError::Config { .. } => OutputErrorCode::InvalidArguments,
            FactError::Conversion { .. } => OutputErrorCode::ResolutionError,
            FactError::ChaNotEnabled { .. } => OutputErrorCode::UnsupportedQuery,
            FactError::RelationUnsupported { .. } => OutputErrorCode::UnsupportedQuery,
            FactError::DisconnectedEdge { .. } => OutputErrorCode::PathViolation,
            FactError::EmptyPath => OutputErrorCode::PathViolation,
            FactError::Extraction { .. } => OutputErrorCode::ExtractionFailed,
            FactError::Io(_) => OutputErrorCode::InternalError,
        }
    }
}

impl From<FactError> for OutputErrorCode {
    fn from(err: FactError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl FactError {
    /// Create an invalid key error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        FactError::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid key error for an unrecognized category name.
    pub fn unknown_category(name: &str) -> Self {
        FactError::InvalidKey {
            key: name.to_string(),
            reason: format!(
                "unrecognized category (expected one of {}, {}, {})",
                Category::Class,
                Category::Method,
                Category::Field
            ),
        }
    }

    /// Create a conversion error.
    pub fn conversion(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        FactError::Conversion {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Create an extraction error for a compilation unit.
    pub fn extraction(unit: impl Into<String>, message: impl fmt::Display) -> Self {
        FactError::Extraction {
            unit: unit.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        FactError::Config {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }

    /// Whether this error is recovered locally during lookups.
    pub fn is_conversion(&self) -> bool {
        matches!(self, FactError::Conversion { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_key_maps_to_invalid_arguments() {
            let err = FactError::invalid_key("", "empty id");
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::InvalidArguments
            );
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn conversion_maps_to_resolution_error() {
            let err = FactError::conversion("java.lang.Object", "no live handle");
            assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
            assert!(err.is_conversion());
        }

        #[test]
        fn override_gating_errors_map_to_unsupported_query() {
            let err = FactError::ChaNotEnabled {
                relation: Relation::Overrides,
            };
            assert_eq!(err.error_code().code(), 4);

            let err = FactError::RelationUnsupported {
                relation: Relation::TOverrides,
                reason: "CHA is disabled".to_string(),
            };
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn path_errors_map_to_path_violation() {
            assert_eq!(FactError::EmptyPath.error_code().code(), 5);
            let err = FactError::DisconnectedEdge {
                edge: "a -> b".to_string(),
                top: "c".to_string(),
            };
            assert_eq!(err.error_code(), OutputErrorCode::PathViolation);
        }

        #[test]
        fn extraction_maps_to_extraction_failed() {
            let err = FactError::extraction("src/A.json", "bad relation");
            assert_eq!(err.error_code().code(), 6);
        }

        #[test]
        fn io_maps_to_internal_error() {
            let err = FactError::from(std::io::Error::other("boom"));
            assert_eq!(err.error_code(), OutputErrorCode::InternalError);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn cha_not_enabled_display() {
            let err = FactError::ChaNotEnabled {
                relation: Relation::Overrides,
            };
            assert_eq!(
                err.to_string(),
                "class hierarchy analysis has not run; OVERRIDES is unavailable"
            );
        }

        #[test]
        fn unknown_category_display_lists_categories() {
            let err = FactError::unknown_category("PACKAGE");
            assert_eq!(
                err.to_string(),
                "invalid element key 'PACKAGE': unrecognized category (expected one of CLASS, METHOD, FIELD)"
            );
        }

        #[test]
        fn extraction_display() {
            let err = FactError::extraction("a/B.json", "missing field `id`");
            assert_eq!(
                err.to_string(),
                "extraction failed for a/B.json: missing field `id`"
            );
        }
    }
}
