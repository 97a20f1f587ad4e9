//! JSON output types for CLI responses.
//!
//! Every response carries `status` first and a `schema_version`, so agents
//! can detect incompatible changes. Element lists are emitted in element
//! order (category, then id), which keeps output deterministic.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::cha::ChaReport;
use crate::database::ChaStatus;
use crate::element::{Category, Element};
use crate::error::{FactError, OutputErrorCode};
use crate::ingest::IngestStats;
use crate::modifiers::Modifiers;
use crate::relation::Relation;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Shared Types
// ============================================================================

/// An element as shown in query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub category: Category,
    pub id: String,
    pub in_project: bool,
}

impl ElementInfo {
    pub fn new(element: &Element, in_project: bool) -> Self {
        ElementInfo {
            category: element.category(),
            id: element.id().to_string(),
            in_project,
        }
    }
}

/// Tuple count of one relation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationCount {
    pub relation: Relation,
    pub tuples: usize,
}

// ============================================================================
// Responses
// ============================================================================

/// Response for `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub status: String,
    pub schema_version: String,
    pub snapshot_id: String,
    pub elements: usize,
    pub tuples: usize,
    /// Non-empty relation kinds only.
    pub relations: Vec<RelationCount>,
    pub packages: Vec<String>,
    pub ingest: IngestStats,
    pub cha_status: ChaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cha: Option<ChaReport>,
}

/// Response for `elements`.
#[derive(Debug, Clone, Serialize)]
pub struct ElementsResponse {
    pub status: String,
    pub schema_version: String,
    pub snapshot_id: String,
    pub count: usize,
    pub elements: Vec<ElementInfo>,
}

impl ElementsResponse {
    pub fn new(snapshot_id: impl Into<String>, elements: Vec<ElementInfo>) -> Self {
        ElementsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            snapshot_id: snapshot_id.into(),
            count: elements.len(),
            elements,
        }
    }
}

/// Response for `range` and `overrides`.
#[derive(Debug, Clone, Serialize)]
pub struct RangeResponse {
    pub status: String,
    pub schema_version: String,
    pub snapshot_id: String,
    pub domain: ElementInfo,
    pub relation: Relation,
    pub count: usize,
    pub range: Vec<ElementInfo>,
}

impl RangeResponse {
    pub fn new(
        snapshot_id: impl Into<String>,
        domain: ElementInfo,
        relation: Relation,
        range: Vec<ElementInfo>,
    ) -> Self {
        RangeResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            snapshot_id: snapshot_id.into(),
            domain,
            relation,
            count: range.len(),
            range,
        }
    }
}

/// Response for `modifiers`.
#[derive(Debug, Clone, Serialize)]
pub struct ModifiersResponse {
    pub status: String,
    pub schema_version: String,
    pub element: ElementInfo,
    pub modifiers: Modifiers,
    pub is_abstract_method: bool,
}

impl ModifiersResponse {
    pub fn new(element: ElementInfo, modifiers: Modifiers, is_abstract_method: bool) -> Self {
        ModifiersResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            element,
            modifiers,
            is_abstract_method,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &FactError) -> Self {
        let details = match err {
            FactError::InvalidKey { key, .. } => Some(serde_json::json!({ "key": key })),
            FactError::ChaNotEnabled { relation }
            | FactError::RelationUnsupported { relation, .. } => {
                Some(serde_json::json!({ "relation": relation }))
            }
            FactError::Extraction { unit, .. } => Some(serde_json::json!({ "unit": unit })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &FactError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
