//! Extractor-facing ingestion and the `ProgramFacts` facade.
//!
//! The extractor is an external collaborator. It hands over facts either
//! through the in-process API ([`ProgramFacts::add_element`],
//! [`ProgramFacts::add_relation_and_transpose`], ...) or as serialized
//! compilation-unit batches ([`UnitFacts`]) consumed by
//! [`ProgramFacts::build`].
//!
//! ## Unit Format
//!
//! ```json
//! {
//!   "path": "src/com/acme/Shape.java",
//!   "package": "com.acme",
//!   "elements": [{"category": "CLASS", "id": "com.acme.Shape", "modifiers": 1}],
//!   "relations": [{
//!     "domain": {"category": "CLASS", "id": "com.acme.Shape"},
//!     "relation": "EXTENDS_CLASS",
//!     "range": {"category": "CLASS", "id": "java.lang.Object"}
//!   }]
//! }
//! ```
//!
//! A unit is validated as a whole before anything is inserted, so a rejected
//! unit leaves no trace in the database.
//!
//! ## Snapshot Identity
//!
//! Accepted units feed a SHA-256 fingerprint of their canonical JSON. The hex
//! digest is reported as the snapshot id.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, info_span, warn};

use crate::analyzer::{Analyzer, ProjectPackages};
use crate::cha::{
    self, ignore_progress_error, CancellationToken, ChaReport, ChaWorklist, HierarchyEnv,
    ProgressSink,
};
use crate::config::AnalysisConfig;
use crate::convert::{Converter, NullConverter};
use crate::database::{ChaStatus, ProgramDatabase};
use crate::element::{Category, Element, ElementKey, ElementRef, ElementRegistry};
use crate::error::{FactError, FactResult};
use crate::modifiers::Modifiers;
use crate::relation::Relation;
use crate::resolve::Resolver;

// ============================================================================
// Unit Facts
// ============================================================================

fn default_true() -> bool {
    true
}

/// An element declared by a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementFact {
    pub category: Category,
    pub id: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

/// A relation tuple observed in a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationFact {
    pub domain: ElementKey,
    pub relation: Relation,
    pub range: ElementKey,
    /// Also insert the transpose tuple.
    #[serde(default = "default_true")]
    pub transpose: bool,
}

/// Everything the extractor learned from one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFacts {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementFact>,
    #[serde(default)]
    pub relations: Vec<RelationFact>,
}

impl UnitFacts {
    pub fn new(path: impl Into<String>) -> Self {
        UnitFacts {
            path: path.into(),
            package: None,
            elements: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Parse a unit from JSON. `origin` names the unit in errors.
    pub fn from_json_str(origin: &str, json: &str) -> FactResult<Self> {
        serde_json::from_str(json).map_err(|e| FactError::extraction(origin, e))
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_element(
        mut self,
        category: Category,
        id: impl Into<String>,
        modifiers: Modifiers,
    ) -> Self {
        self.elements.push(ElementFact {
            category,
            id: id.into(),
            modifiers,
        });
        self
    }

    pub fn with_relation(
        mut self,
        domain: ElementKey,
        relation: Relation,
        range: ElementKey,
    ) -> Self {
        self.relations.push(RelationFact {
            domain,
            relation,
            range,
            transpose: true,
        });
        self
    }
}

/// A unit whose keys all parsed and whose relations all type-check.
struct PreparedUnit {
    elements: Vec<(ElementRef, Modifiers)>,
    relations: Vec<(ElementRef, Relation, ElementRef, bool)>,
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Running SHA-256 over accepted units.
#[derive(Clone, Default)]
pub struct Fingerprint {
    hasher: Sha256,
    units: usize,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, unit: &UnitFacts) -> FactResult<()> {
        let bytes = serde_json::to_vec(unit).map_err(|e| FactError::extraction(&unit.path, e))?;
        self.hasher.update(&bytes);
        self.hasher.update(b"\n");
        self.units += 1;
        Ok(())
    }

    /// Number of units hashed so far.
    pub fn units(&self) -> usize {
        self.units
    }

    /// Hex digest of everything hashed so far.
    pub fn hex_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprint")
            .field("units", &self.units)
            .field("digest", &self.hex_digest())
            .finish()
    }
}

/// Counters of the population pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub units_ingested: usize,
    pub units_skipped: usize,
}

// ============================================================================
// ProgramFacts
// ============================================================================

/// A populated fact base with its session state.
///
/// Owns the element registry, the database, project membership, the
/// converter and the configuration.
#[derive(Debug)]
pub struct ProgramFacts<C: Converter = NullConverter> {
    config: AnalysisConfig,
    registry: ElementRegistry,
    db: ProgramDatabase,
    project: ProjectPackages,
    converter: C,
    fingerprint: Fingerprint,
    stats: IngestStats,
    worklist: Option<ChaWorklist>,
}

impl<C: Converter> ProgramFacts<C> {
    /// An empty fact base. Configured packages are registered immediately.
    pub fn new(config: AnalysisConfig, converter: C) -> Self {
        let project = config.packages.iter().map(String::as_str).collect();
        ProgramFacts {
            config,
            registry: ElementRegistry::new(),
            db: ProgramDatabase::new(),
            project,
            converter,
            fingerprint: Fingerprint::new(),
            stats: IngestStats::default(),
            worklist: None,
        }
    }

    /// Populate from unit batches, then run CHA if the configuration asks for it.
    ///
    /// Any failure aborts the build; no partially built facts are returned.
    pub fn build<I>(
        config: AnalysisConfig,
        converter: C,
        units: I,
        progress: &mut dyn ProgressSink,
    ) -> FactResult<Self>
    where
        I: IntoIterator<Item = FactResult<UnitFacts>>,
    {
        let mut facts = ProgramFacts::new(config, converter);
        facts.populate(units, progress)?;
        if facts.config.cha {
            facts.run_cha(progress, &CancellationToken::new())?;
        }
        Ok(facts)
    }

    // ========================================================================
    // Ingestion API
    // ========================================================================

    /// Ingest unit batches, one progress unit each.
    ///
    /// With `fail_fast` any failure aborts with [`FactError::Extraction`];
    /// otherwise failing units are skipped with a warning and counted.
    pub fn populate<I>(
        &mut self,
        units: I,
        progress: &mut dyn ProgressSink,
    ) -> FactResult<IngestStats>
    where
        I: IntoIterator<Item = FactResult<UnitFacts>>,
    {
        let _span = info_span!("populate").entered();
        let units = units.into_iter();
        ignore_progress_error(progress.begin_task("populating fact base", units.size_hint().0));

        for (index, item) in units.enumerate() {
            let outcome = item
                .map_err(|e| as_extraction(format!("unit #{}", index), e))
                .and_then(|unit| {
                    self.ingest_unit(&unit)?;
                    Ok(unit)
                });
            match outcome {
                Ok(unit) => {
                    self.fingerprint.update(&unit)?;
                    self.stats.units_ingested += 1;
                    debug!(
                        unit = %unit.path,
                        elements = unit.elements.len(),
                        relations = unit.relations.len(),
                        "ingested"
                    );
                }
                Err(err) if self.config.fail_fast => return Err(err),
                Err(err) => {
                    warn!(error = %err, "skipping unit");
                    self.stats.units_skipped += 1;
                }
            }
            ignore_progress_error(progress.worked(1));
        }

        ignore_progress_error(progress.done());
        info!(
            units = self.stats.units_ingested,
            skipped = self.stats.units_skipped,
            elements = self.db.element_count(),
            tuples = self.db.tuple_count(),
            "population finished"
        );
        Ok(self.stats)
    }

    /// Validate and insert one unit. Errors name the unit.
    pub fn ingest_unit(&mut self, unit: &UnitFacts) -> FactResult<()> {
        let prepared = self
            .prepare(unit)
            .map_err(|e| as_extraction(unit.path.clone(), e))?;

        if let Some(package) = &unit.package {
            self.project.register(package.as_str());
        }
        for (element, modifiers) in &prepared.elements {
            self.db.add_element(element, *modifiers);
        }
        for (domain, relation, range, transpose) in &prepared.relations {
            if *transpose {
                self.db.add_relation_and_transpose(domain, *relation, range);
            } else {
                self.db.add_relation(domain, *relation, range);
            }
        }
        Ok(())
    }

    fn prepare(&self, unit: &UnitFacts) -> FactResult<PreparedUnit> {
        let elements = unit
            .elements
            .iter()
            .map(|fact| Ok((self.registry.get(fact.category, &fact.id)?, fact.modifiers)))
            .collect::<FactResult<Vec<_>>>()?;

        let relations = unit
            .relations
            .iter()
            .map(|fact| {
                if fact.relation.requires_cha() {
                    return Err(FactError::extraction(
                        &unit.path,
                        format!("{} is computed by class hierarchy analysis", fact.relation),
                    ));
                }
                if !fact.relation.accepts(fact.domain.category, fact.range.category) {
                    return Err(FactError::extraction(
                        &unit.path,
                        format!(
                            "{} does not relate {} to {}",
                            fact.relation, fact.domain.category, fact.range.category
                        ),
                    ));
                }
                let domain = self.registry.intern(&fact.domain)?;
                let range = self.registry.intern(&fact.range)?;
                Ok((domain, fact.relation, range, fact.transpose))
            })
            .collect::<FactResult<Vec<_>>>()?;

        Ok(PreparedUnit {
            elements,
            relations,
        })
    }

    /// Register a project package.
    pub fn register_package(&mut self, package: impl Into<String>) -> bool {
        self.project.register(package)
    }

    /// Intern `(category, id)` and record its modifiers.
    pub fn add_element(
        &mut self,
        category: Category,
        id: &str,
        modifiers: Modifiers,
    ) -> FactResult<ElementRef> {
        let element = self.registry.get(category, id)?;
        self.db.add_element(&element, modifiers);
        Ok(element)
    }

    pub fn add_relation(
        &mut self,
        domain: &ElementRef,
        relation: Relation,
        range: &ElementRef,
    ) -> bool {
        self.db.add_relation(domain, relation, range)
    }

    pub fn add_relation_and_transpose(
        &mut self,
        domain: &ElementRef,
        relation: Relation,
        range: &ElementRef,
    ) -> bool {
        self.db.add_relation_and_transpose(domain, relation, range)
    }

    // ========================================================================
    // Class Hierarchy Analysis
    // ========================================================================

    /// Run (or resume) CHA until the worklist drains or `cancel` is set.
    ///
    /// Elements ingested since the previous run are enqueued first.
    pub fn run_cha(
        &mut self,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> FactResult<ChaReport> {
        if !self.config.cha {
            return Err(FactError::RelationUnsupported {
                relation: Relation::Overrides,
                reason: "class hierarchy analysis is disabled by configuration".to_string(),
            });
        }
        if let Some(worklist) = &mut self.worklist {
            let added = worklist.enqueue_new(&self.db);
            if added > 0 {
                debug!(added, "enqueued elements ingested since the last run");
            }
        }
        let db = &mut self.db;
        let worklist = self.worklist.get_or_insert_with(|| ChaWorklist::seed(db));
        let env = HierarchyEnv::new(&self.project, &self.converter, &self.registry);
        worklist.run(db, &env, progress, cancel)
    }

    /// Report of the last CHA run, if any.
    pub fn cha_report(&self) -> Option<&ChaReport> {
        self.worklist.as_ref().map(ChaWorklist::report)
    }

    pub fn is_cha_enabled(&self) -> bool {
        self.config.cha
    }

    pub fn cha_status(&self) -> ChaStatus {
        self.db.cha_status()
    }

    // ========================================================================
    // Query API
    // ========================================================================

    fn analyzer(&self) -> Analyzer<'_> {
        Analyzer::new(&self.db, &self.project)
    }

    fn resolver(&self) -> Resolver<'_, C> {
        Resolver::new(self.analyzer(), &self.converter, &self.registry)
    }

    fn check_supported(&self, relation: Relation) -> FactResult<()> {
        if relation.requires_cha() && !self.config.cha {
            return Err(FactError::RelationUnsupported {
                relation,
                reason: "class hierarchy analysis is disabled by configuration".to_string(),
            });
        }
        Ok(())
    }

    /// Range of `(element, relation)`, with library fallback for
    /// non-project classes.
    pub fn get_range(
        &self,
        element: &Element,
        relation: Relation,
    ) -> FactResult<BTreeSet<ElementRef>> {
        self.check_supported(relation)?;
        self.resolver().get_range(element, relation)
    }

    /// Stored range of `(element, relation)` restricted to project elements.
    pub fn get_range_in_project(
        &self,
        element: &Element,
        relation: Relation,
    ) -> FactResult<BTreeSet<ElementRef>> {
        self.check_supported(relation)?;
        self.analyzer().get_range_in_project(element, relation)
    }

    pub fn all_elements(&self) -> BTreeSet<ElementRef> {
        self.db.all_elements()
    }

    pub fn modifiers(&self, element: &Element) -> Modifiers {
        self.db.modifiers(element)
    }

    pub fn is_abstract_method(&self, element: &Element) -> bool {
        self.analyzer().is_abstract_method(element)
    }

    pub fn is_project_element(&self, element: &Element) -> bool {
        self.project.contains(element)
    }

    /// Methods `method` overrides, computed on demand.
    ///
    /// Uses the same matching as CHA but does not need it to have run.
    pub fn overridden_methods(&self, method: &Element) -> FactResult<BTreeSet<ElementRef>> {
        cha::overridden_methods(&self.resolver(), method)
    }

    pub fn convert_to_element(&self, handle: &C::Handle) -> FactResult<ElementRef> {
        self.converter.resolve_to_element(handle, &self.registry)
    }

    pub fn convert_to_handle(&self, element: &Element) -> FactResult<C::Handle> {
        self.converter.resolve_to_handle(element)
    }

    /// Canonical element for `(category, id)`.
    pub fn element(&self, category: Category, id: &str) -> FactResult<ElementRef> {
        self.registry.get(category, id)
    }

    /// Canonical element for a key.
    pub fn lookup(&self, key: &ElementKey) -> FactResult<ElementRef> {
        self.registry.intern(key)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn database(&self) -> &ProgramDatabase {
        &self.db
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn project(&self) -> &ProjectPackages {
        &self.project
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn ingest_stats(&self) -> IngestStats {
        self.stats
    }

    /// Hex SHA-256 over every accepted unit.
    pub fn snapshot_id(&self) -> String {
        self.fingerprint.hex_digest()
    }
}

/// Wrap a failure as an extraction error for `unit`, unless it already is one.
fn as_extraction(unit: impl Into<String>, err: FactError) -> FactError {
    match err {
        FactError::Extraction { .. } => err,
        other => FactError::extraction(unit, other),
    }
}

// ============================================================================
// Tests
// ============================================================================
