//! Class hierarchy analysis: saturating `OVERRIDES` over a populated database.
//!
//! The engine is a fixed point over an explicit FIFO worklist seeded with
//! every element in the database (sorted, so runs are reproducible). Each
//! [`ChaWorklist::step`] processes exactly one element:
//!
//! 1. Non-methods and abstract methods are skipped.
//! 2. The declaring class's supertypes are walked breadth-first over
//!    `EXTENDS_CLASS`, `IMPLEMENTS_INTERFACE` and `EXTENDS_INTERFACES`, each
//!    type visited once.
//! 3. In every visited type the first non-static, non-initializer method with
//!    the same *name* is a match. Parameter types are not compared.
//! 4. Matches outside the project are registered with modifiers read through
//!    the converter (abstract ones get the abstract-inferred marker; a
//!    conversion failure records `0`).
//! 5. `(m, OVERRIDES, match)` and its transpose are inserted.
//!
//! Elements synthesized in step 4 are not enqueued.
//!
//! # Cooperative Control
//!
//! Callers may step manually and query the database between items, or call
//! [`ChaWorklist::run`], which checks a [`CancellationToken`] before every
//! item and reports one progress unit per item to a [`ProgressSink`].
//! Cancellation leaves every inserted tuple in place; running the same
//! worklist again resumes where it stopped.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, trace};

use crate::analyzer::{Analyzer, ProjectPackages};
use crate::convert::Converter;
use crate::database::{ChaStatus, ProgramDatabase};
use crate::element::{Element, ElementRef, ElementRegistry, MethodElement};
use crate::error::FactResult;
use crate::modifiers::Modifiers;
use crate::relation::Relation;
use crate::resolve::Resolver;

// ============================================================================
// Cancellation
// ============================================================================

/// Shared cancellation flag, checked between worklist items.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// A progress sink could not record an update.
#[derive(Debug, Error)]
#[error("progress reporting failed: {message}")]
pub struct ProgressError {
    pub message: String,
}

impl ProgressError {
    pub fn new(message: impl Into<String>) -> Self {
        ProgressError {
            message: message.into(),
        }
    }
}

/// Receiver of discrete progress units.
///
/// Failures never affect the analysis: callers log them and carry on.
pub trait ProgressSink {
    fn begin_task(&mut self, name: &str, total: usize) -> Result<(), ProgressError>;
    fn worked(&mut self, units: usize) -> Result<(), ProgressError>;
    fn done(&mut self) -> Result<(), ProgressError>;
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin_task(&mut self, _name: &str, _total: usize) -> Result<(), ProgressError> {
        Ok(())
    }

    fn worked(&mut self, _units: usize) -> Result<(), ProgressError> {
        Ok(())
    }

    fn done(&mut self) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Turns progress units into `trace!` events.
#[derive(Debug, Clone, Default)]
pub struct TracingProgress {
    task: String,
    total: usize,
    completed: usize,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

impl ProgressSink for TracingProgress {
    fn begin_task(&mut self, name: &str, total: usize) -> Result<(), ProgressError> {
        self.task = name.to_string();
        self.total = total;
        self.completed = 0;
        trace!(task = %self.task, total, "begin");
        Ok(())
    }

    fn worked(&mut self, units: usize) -> Result<(), ProgressError> {
        self.completed += units;
        trace!(task = %self.task, completed = self.completed, total = self.total, "worked");
        Ok(())
    }

    fn done(&mut self) -> Result<(), ProgressError> {
        trace!(task = %self.task, completed = self.completed, "done");
        Ok(())
    }
}

/// Log and drop a progress failure.
pub(crate) fn ignore_progress_error(result: Result<(), ProgressError>) {
    if let Err(err) = result {
        trace!(error = %err, "ignoring progress failure");
    }
}

// ============================================================================
// Override Matching
// ============================================================================

/// Methods that `method` overrides, by name-only matching up the hierarchy.
///
/// Empty for non-methods and abstract methods. Conversion failures along the
/// way shrink the result instead of failing it.
pub fn overridden_methods<C: Converter>(
    resolver: &Resolver<'_, C>,
    method: &Element,
) -> FactResult<BTreeSet<ElementRef>> {
    let mut overridden = BTreeSet::new();
    let analyzer = resolver.analyzer();
    let Some(signature) = method.as_method() else {
        return Ok(overridden);
    };
    if analyzer.is_abstract_method(method) {
        return Ok(overridden);
    }
    let Some(declaring) = resolver.registry().declaring_class(method) else {
        return Ok(overridden);
    };

    let mut visited: BTreeSet<ElementRef> = BTreeSet::new();
    let mut queue: VecDeque<ElementRef> = VecDeque::new();
    visited.insert(Arc::clone(&declaring));
    enqueue_supertypes(resolver, &declaring, &mut visited, &mut queue)?;

    while let Some(ty) = queue.pop_front() {
        if let Some(found) = match_method(resolver, signature, &ty)? {
            overridden.insert(found);
        }
        enqueue_supertypes(resolver, &ty, &mut visited, &mut queue)?;
    }
    Ok(overridden)
}

fn enqueue_supertypes<C: Converter>(
    resolver: &Resolver<'_, C>,
    ty: &Element,
    visited: &mut BTreeSet<ElementRef>,
    queue: &mut VecDeque<ElementRef>,
) -> FactResult<()> {
    for relation in Relation::SUPERTYPE_EDGES {
        for supertype in resolver.get_range(ty, relation)? {
            if visited.insert(Arc::clone(&supertype)) {
                queue.push_back(supertype);
            }
        }
    }
    Ok(())
}

/// First method declared in `ty` with the same name as `method`.
///
/// Overloads are not told apart: only the name is compared, and only the
/// first candidate in element order is taken.
fn match_method<C: Converter>(
    resolver: &Resolver<'_, C>,
    method: &MethodElement,
    ty: &Element,
) -> FactResult<Option<ElementRef>> {
    let db = resolver.analyzer().database();
    let candidates = resolver.get_range(ty, Relation::DeclaresMethod)?;
    Ok(candidates.into_iter().find(|candidate| {
        candidate.as_method().is_some_and(|m| {
            !m.is_initializer() && !db.modifiers(candidate).is_static() && m.name() == method.name()
        })
    }))
}

// ============================================================================
// Worklist
// ============================================================================

/// Borrowed inputs CHA needs besides the database itself.
#[derive(Debug)]
pub struct HierarchyEnv<'a, C: Converter> {
    pub project: &'a ProjectPackages,
    pub converter: &'a C,
    pub registry: &'a ElementRegistry,
}

impl<'a, C: Converter> HierarchyEnv<'a, C> {
    pub fn new(
        project: &'a ProjectPackages,
        converter: &'a C,
        registry: &'a ElementRegistry,
    ) -> Self {
        HierarchyEnv {
            project,
            converter,
            registry,
        }
    }

    /// Resolver over `db` with this environment.
    pub fn resolver<'d>(&'d self, db: &'d ProgramDatabase) -> Resolver<'d, C> {
        Resolver::new(Analyzer::new(db, self.project), self.converter, self.registry)
    }
}

/// Counters of one CHA run (cumulative across resumes).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChaReport {
    /// Worklist items popped.
    pub processed: usize,
    /// New `OVERRIDES` tuples.
    pub overrides_added: usize,
    /// Non-project methods first registered by CHA.
    pub synthesized: usize,
    /// Whether the last run stopped at a cancellation request.
    pub cancelled: bool,
}

/// Resumable CHA worklist.
#[derive(Debug, Default)]
pub struct ChaWorklist {
    queue: VecDeque<ElementRef>,
    /// Every element ever enqueued, plus the ones CHA synthesized.
    seen: BTreeSet<ElementRef>,
    report: ChaReport,
}

impl ChaWorklist {
    /// Seed with every element currently in `db`, in sorted order.
    pub fn seed(db: &ProgramDatabase) -> Self {
        let mut worklist = ChaWorklist::default();
        worklist.enqueue_new(db);
        worklist
    }

    /// Enqueue elements of `db` this worklist has not seen, in sorted order.
    ///
    /// Returns how many were added.
    pub fn enqueue_new(&mut self, db: &ProgramDatabase) -> usize {
        let before = self.queue.len();
        for element in db.all_elements() {
            if self.seen.insert(Arc::clone(&element)) {
                self.queue.push_back(element);
            }
        }
        self.queue.len() - before
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn report(&self) -> &ChaReport {
        &self.report
    }

    /// Process one worklist item.
    ///
    /// Returns the processed element, or `None` once the worklist is drained
    /// (at which point the database is marked complete).
    pub fn step<C: Converter>(
        &mut self,
        db: &mut ProgramDatabase,
        env: &HierarchyEnv<'_, C>,
    ) -> FactResult<Option<ElementRef>> {
        let Some(next) = self.queue.pop_front() else {
            db.set_cha_status(ChaStatus::Complete);
            return Ok(None);
        };
        db.set_cha_status(ChaStatus::Running);
        self.report.processed += 1;

        // Matches paired with the modifiers to record for non-project ones.
        let matches: Vec<(ElementRef, Option<Modifiers>)> = {
            let resolver = env.resolver(db);
            overridden_methods(&resolver, &next)?
                .into_iter()
                .map(|found| {
                    let modifiers = (!env.project.contains(&found)).then(|| {
                        resolver
                            .declared_modifiers(&found)
                            .map(Modifiers::inferred_for_library)
                            .unwrap_or(Modifiers::NONE)
                    });
                    (found, modifiers)
                })
                .collect()
        };

        for (found, modifiers) in matches {
            if let Some(modifiers) = modifiers {
                if !db.contains(&found) {
                    self.report.synthesized += 1;
                }
                self.seen.insert(Arc::clone(&found));
                db.add_element(&found, modifiers);
            }
            if db.add_relation_and_transpose(&next, Relation::Overrides, &found) {
                self.report.overrides_added += 1;
                debug!(method = %next, overrides = %found, "override");
            }
        }
        Ok(Some(next))
    }

    /// Step until drained or cancelled.
    pub fn run<C: Converter>(
        &mut self,
        db: &mut ProgramDatabase,
        env: &HierarchyEnv<'_, C>,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> FactResult<ChaReport> {
        let _span = info_span!("cha", pending = self.remaining()).entered();
        ignore_progress_error(progress.begin_task("class hierarchy analysis", self.remaining()));
        self.report.cancelled = false;
        db.set_cha_status(ChaStatus::Running);

        loop {
            if cancel.is_cancelled() {
                db.set_cha_status(ChaStatus::Cancelled);
                self.report.cancelled = true;
                info!(remaining = self.remaining(), "class hierarchy analysis cancelled");
                break;
            }
            if self.step(db, env)?.is_none() {
                break;
            }
            ignore_progress_error(progress.worked(1));
        }

        ignore_progress_error(progress.done());
        info!(
            processed = self.report.processed,
            overrides = self.report.overrides_added,
            synthesized = self.report.synthesized,
            "class hierarchy analysis finished"
        );
        Ok(self.report.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
