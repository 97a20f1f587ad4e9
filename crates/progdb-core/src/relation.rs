//! Relation catalog: the closed set of directed relation kinds.
//!
//! Every forward relation has a transpose (`T_` prefix) that the database
//! keeps in sync on [`add_relation_and_transpose`]. Override relations are
//! only populated by class hierarchy analysis and are gated until it runs.
//!
//! | Relation | Domain | Range |
//! |----------|--------|-------|
//! | `DECLARES_TYPE` | class | member class |
//! | `DECLARES_METHOD` | class | method |
//! | `DECLARES_FIELD` | class | field |
//! | `EXTENDS_CLASS` | class | superclass |
//! | `IMPLEMENTS_INTERFACE` | class | interface |
//! | `EXTENDS_INTERFACES` | interface | super-interface |
//! | `CALLS` | method | method |
//! | `ACCESSES` | method | field |
//! | `OVERRIDES` | method | overridden method |
//!
//! [`add_relation_and_transpose`]: crate::database::ProgramDatabase::add_relation_and_transpose

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::element::Category;
use crate::error::FactError;

/// A directed relation kind between two elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "DECLARES_TYPE")]
    DeclaresType,
    #[serde(rename = "DECLARES_METHOD")]
    DeclaresMethod,
    #[serde(rename = "DECLARES_FIELD")]
    DeclaresField,
    #[serde(rename = "EXTENDS_CLASS")]
    ExtendsClass,
    #[serde(rename = "IMPLEMENTS_INTERFACE")]
    ImplementsInterface,
    #[serde(rename = "EXTENDS_INTERFACES")]
    ExtendsInterfaces,
    #[serde(rename = "CALLS")]
    Calls,
    #[serde(rename = "ACCESSES")]
    Accesses,
    #[serde(rename = "OVERRIDES")]
    Overrides,
    #[serde(rename = "T_DECLARES_TYPE")]
    TDeclaresType,
    #[serde(rename = "T_DECLARES_METHOD")]
    TDeclaresMethod,
    #[serde(rename = "T_DECLARES_FIELD")]
    TDeclaresField,
    #[serde(rename = "T_EXTENDS_CLASS")]
    TExtendsClass,
    #[serde(rename = "T_IMPLEMENTS_INTERFACE")]
    TImplementsInterface,
    #[serde(rename = "T_EXTENDS_INTERFACES")]
    TExtendsInterfaces,
    #[serde(rename = "T_CALLS")]
    TCalls,
    #[serde(rename = "T_ACCESSES")]
    TAccesses,
    #[serde(rename = "T_OVERRIDES")]
    TOverrides,
}

impl Relation {
    /// Every relation kind, forward relations first.
    pub const ALL: [Relation; 18] = [
        Relation::DeclaresType,
        Relation::DeclaresMethod,
        Relation::DeclaresField,
        Relation::ExtendsClass,
        Relation::ImplementsInterface,
        Relation::ExtendsInterfaces,
        Relation::Calls,
        Relation::Accesses,
        Relation::Overrides,
        Relation::TDeclaresType,
        Relation::TDeclaresMethod,
        Relation::TDeclaresField,
        Relation::TExtendsClass,
        Relation::TImplementsInterface,
        Relation::TExtendsInterfaces,
        Relation::TCalls,
        Relation::TAccesses,
        Relation::TOverrides,
    ];

    /// Relations walked upward from a type during class hierarchy analysis.
    pub const SUPERTYPE_EDGES: [Relation; 3] = [
        Relation::ExtendsClass,
        Relation::ImplementsInterface,
        Relation::ExtendsInterfaces,
    ];

    /// Stable upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::DeclaresType => "DECLARES_TYPE",
            Relation::DeclaresMethod => "DECLARES_METHOD",
            Relation::DeclaresField => "DECLARES_FIELD",
            Relation::ExtendsClass => "EXTENDS_CLASS",
            Relation::ImplementsInterface => "IMPLEMENTS_INTERFACE",
            Relation::ExtendsInterfaces => "EXTENDS_INTERFACES",
            Relation::Calls => "CALLS",
            Relation::Accesses => "ACCESSES",
            Relation::Overrides => "OVERRIDES",
            Relation::TDeclaresType => "T_DECLARES_TYPE",
            Relation::TDeclaresMethod => "T_DECLARES_METHOD",
            Relation::TDeclaresField => "T_DECLARES_FIELD",
            Relation::TExtendsClass => "T_EXTENDS_CLASS",
            Relation::TImplementsInterface => "T_IMPLEMENTS_INTERFACE",
            Relation::TExtendsInterfaces => "T_EXTENDS_INTERFACES",
            Relation::TCalls => "T_CALLS",
            Relation::TAccesses => "T_ACCESSES",
            Relation::TOverrides => "T_OVERRIDES",
        }
    }

    /// The inverse-direction counterpart kept in sync on insertion.
    pub fn transpose(&self) -> Option<Relation> {
        let t = match self {
            Relation::DeclaresType => Relation::TDeclaresType,
            Relation::DeclaresMethod => Relation::TDeclaresMethod,
            Relation::DeclaresField => Relation::TDeclaresField,
            Relation::ExtendsClass => Relation::TExtendsClass,
            Relation::ImplementsInterface => Relation::TImplementsInterface,
            Relation::ExtendsInterfaces => Relation::TExtendsInterfaces,
            Relation::Calls => Relation::TCalls,
            Relation::Accesses => Relation::TAccesses,
            Relation::Overrides => Relation::TOverrides,
            Relation::TDeclaresType => Relation::DeclaresType,
            Relation::TDeclaresMethod => Relation::DeclaresMethod,
            Relation::TDeclaresField => Relation::DeclaresField,
            Relation::TExtendsClass => Relation::ExtendsClass,
            Relation::TImplementsInterface => Relation::ImplementsInterface,
            Relation::TExtendsInterfaces => Relation::ExtendsInterfaces,
            Relation::TCalls => Relation::Calls,
            Relation::TAccesses => Relation::Accesses,
            Relation::TOverrides => Relation::Overrides,
        };
        Some(t)
    }

    /// Whether this is the `T_` direction of a forward relation.
    pub fn is_transpose(&self) -> bool {
        self.as_str().starts_with("T_")
    }

    /// Whether answering this relation needs class hierarchy analysis.
    pub fn requires_cha(&self) -> bool {
        matches!(self, Relation::Overrides | Relation::TOverrides)
    }

    /// Category expected for the domain of this relation.
    pub fn domain_category(&self) -> Category {
        if self.is_transpose() {
            return self.forward().range_category();
        }
        match self {
            Relation::Calls | Relation::Accesses | Relation::Overrides => Category::Method,
            _ => Category::Class,
        }
    }

    /// Category expected for the range of this relation.
    pub fn range_category(&self) -> Category {
        if self.is_transpose() {
            return self.forward().domain_category();
        }
        match self {
            Relation::DeclaresMethod | Relation::Calls | Relation::Overrides => Category::Method,
            Relation::DeclaresField | Relation::Accesses => Category::Field,
            _ => Category::Class,
        }
    }

    /// Whether `(domain, range)` categories fit this relation.
    pub fn accepts(&self, domain: Category, range: Category) -> bool {
        self.domain_category() == domain && self.range_category() == range
    }

    fn forward(&self) -> Relation {
        match self.transpose() {
            Some(t) if self.is_transpose() => t,
            _ => *self,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = FactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relation::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FactError::invalid_key(s, "unknown relation"))
    }
}

// ============================================================================
// Tests
// ============================================================================
