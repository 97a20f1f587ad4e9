//! Analyzer: query layer over the database, plus project membership.

use std::collections::BTreeSet;

use crate::database::ProgramDatabase;
use crate::element::{Element, ElementRef};
use crate::error::FactResult;
use crate::relation::Relation;

// ============================================================================
// Project Membership
// ============================================================================

/// Package names belonging to the analyzed project.
///
/// An element is in-project iff its package name is in this set. Populated
/// during extraction, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProjectPackages {
    packages: BTreeSet<String>,
}

impl ProjectPackages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package. Returns `false` if it was already registered.
    pub fn register(&mut self, package: impl Into<String>) -> bool {
        self.packages.insert(package.into())
    }

    pub fn contains_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub fn contains(&self, element: &Element) -> bool {
        self.contains_package(element.package_name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProjectPackages {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ProjectPackages {
            packages: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Borrowed query view over a database and its project membership.
#[derive(Debug, Clone, Copy)]
pub struct Analyzer<'a> {
    db: &'a ProgramDatabase,
    project: &'a ProjectPackages,
}

impl<'a> Analyzer<'a> {
    pub fn new(db: &'a ProgramDatabase, project: &'a ProjectPackages) -> Self {
        Analyzer { db, project }
    }

    pub fn database(&self) -> &'a ProgramDatabase {
        self.db
    }

    pub fn project(&self) -> &'a ProjectPackages {
        self.project
    }

    /// Range of `(domain, relation)`, straight from the database.
    pub fn get_range(
        &self,
        domain: &Element,
        relation: Relation,
    ) -> FactResult<BTreeSet<ElementRef>> {
        self.db.get_range(domain, relation)
    }

    /// Range of `(domain, relation)` restricted to project elements.
    pub fn get_range_in_project(
        &self,
        domain: &Element,
        relation: Relation,
    ) -> FactResult<BTreeSet<ElementRef>> {
        let range = self.get_range(domain, relation)?;
        Ok(range
            .into_iter()
            .filter(|e| self.project.contains(e))
            .collect())
    }

    pub fn is_project_element(&self, element: &Element) -> bool {
        self.project.contains(element)
    }

    /// Whether `element` is a method without an implementation.
    ///
    /// Decided by the abstract-inferred threshold on recorded modifiers.
    pub fn is_abstract_method(&self, element: &Element) -> bool {
        element.is_method() && self.db.modifiers(element).is_abstract_marker()
    }
}

// ============================================================================
// Tests
// ============================================================================
