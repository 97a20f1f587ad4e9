//! Program relation database: elements, modifiers and typed relation tuples.
//!
//! For each `(domain, relation)` pair the database stores the set of range
//! elements. Storage is ordered (`BTreeMap`/`BTreeSet`) so every query result
//! iterates deterministically.
//!
//! # Ownership
//!
//! The database owns all relation storage. Queries return owned sets; no
//! caller ever holds a reference into internal storage, so the transpose
//! invariant cannot be broken from outside.
//!
//! # Override Gating
//!
//! `OVERRIDES` and `T_OVERRIDES` are populated only by class hierarchy
//! analysis. Until a CHA run has started they are treated as absent rather
//! than empty, and [`ProgramDatabase::get_range`] fails with
//! [`FactError::ChaNotEnabled`].
//!
//! # Concurrency
//!
//! Population is single-writer (`&mut self`). Once populated the database
//! has no interior mutability and can be shared behind an `Arc` by any number
//! of readers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementRef};
use crate::error::{FactError, FactResult};
use crate::modifiers::Modifiers;
use crate::relation::Relation;

// ============================================================================
// CHA Status
// ============================================================================

/// Lifecycle of class hierarchy analysis over one database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaStatus {
    /// No CHA run has started; override relations are unavailable.
    #[default]
    NotRun,
    /// A run is in progress (possibly paused between worklist items).
    Running,
    /// The worklist was drained.
    Complete,
    /// The run stopped at a cancellation request; overrides are partial.
    Cancelled,
}

impl ChaStatus {
    /// Whether override relations may be queried.
    pub fn has_started(&self) -> bool {
        !matches!(self, ChaStatus::NotRun)
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Default)]
struct ElementRecord {
    modifiers: Modifiers,
    relations: BTreeMap<Relation, BTreeSet<ElementRef>>,
}

/// In-memory relation store.
#[derive(Debug, Default)]
pub struct ProgramDatabase {
    records: BTreeMap<ElementRef, ElementRecord>,
    tuple_count: usize,
    cha_status: ChaStatus,
}

impl ProgramDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Insert Operations
    // ========================================================================

    /// Register an element and record (or overwrite) its modifiers.
    pub fn add_element(&mut self, element: &ElementRef, modifiers: Modifiers) {
        self.record_mut(element).modifiers = modifiers;
    }

    /// Insert `range` into the range-set of `(domain, relation)`.
    ///
    /// Both endpoints become known elements. Returns `false` if the tuple was
    /// already present.
    pub fn add_relation(
        &mut self,
        domain: &ElementRef,
        relation: Relation,
        range: &ElementRef,
    ) -> bool {
        self.record_mut(range);
        let inserted = self
            .record_mut(domain)
            .relations
            .entry(relation)
            .or_default()
            .insert(Arc::clone(range));
        if inserted {
            self.tuple_count += 1;
        }
        inserted
    }

    /// Insert `(domain, relation, range)` and, if `relation` has a transpose,
    /// `(range, transpose, domain)`.
    ///
    /// Returns `true` if either tuple was new.
    pub fn add_relation_and_transpose(
        &mut self,
        domain: &ElementRef,
        relation: Relation,
        range: &ElementRef,
    ) -> bool {
        let forward = self.add_relation(domain, relation, range);
        let backward = match relation.transpose() {
            Some(transpose) => self.add_relation(range, transpose, domain),
            None => false,
        };
        forward || backward
    }

    fn record_mut(&mut self, element: &ElementRef) -> &mut ElementRecord {
        self.records.entry(Arc::clone(element)).or_default()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Modifier bits of `element`; `Modifiers::NONE` if unknown.
    pub fn modifiers(&self, element: &Element) -> Modifiers {
        self.records
            .get(element)
            .map(|r| r.modifiers)
            .unwrap_or_default()
    }

    /// The range-set of `(domain, relation)`.
    ///
    /// Unknown domains yield an empty set. Override-family relations fail
    /// with [`FactError::ChaNotEnabled`] before any CHA run.
    pub fn get_range(
        &self,
        domain: &Element,
        relation: Relation,
    ) -> FactResult<BTreeSet<ElementRef>> {
        if relation.requires_cha() && !self.cha_status.has_started() {
            return Err(FactError::ChaNotEnabled { relation });
        }
        Ok(self.range_unchecked(domain, relation))
    }

    /// Range lookup without override gating, for the CHA engine itself.
    pub(crate) fn range_unchecked(
        &self,
        domain: &Element,
        relation: Relation,
    ) -> BTreeSet<ElementRef> {
        self.records
            .get(domain)
            .and_then(|r| r.relations.get(&relation))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `element` was registered or appeared as a relation endpoint.
    pub fn contains(&self, element: &Element) -> bool {
        self.records.contains_key(element)
    }

    /// Every known element.
    pub fn all_elements(&self) -> BTreeSet<ElementRef> {
        self.records.keys().cloned().collect()
    }

    /// Number of known elements.
    pub fn element_count(&self) -> usize {
        self.records.len()
    }

    /// Number of stored tuples, transposes included.
    pub fn tuple_count(&self) -> usize {
        self.tuple_count
    }

    /// Number of stored tuples for one relation kind.
    pub fn tuple_count_for(&self, relation: Relation) -> usize {
        self.records
            .values()
            .filter_map(|r| r.relations.get(&relation))
            .map(BTreeSet::len)
            .sum()
    }

    pub fn cha_status(&self) -> ChaStatus {
        self.cha_status
    }

    pub(crate) fn set_cha_status(&mut self, status: ChaStatus) {
        self.cha_status = status;
    }
}

// ============================================================================
// Tests
// ============================================================================
