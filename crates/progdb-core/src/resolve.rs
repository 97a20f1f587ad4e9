//! Range lookups that fall back to the converter for non-project types.
//!
//! The extractor only walks project sources, so the database knows little
//! about library types beyond their appearance as hierarchy endpoints. For a
//! non-project class and a declaration or hierarchy relation, the range is
//! read from the converter's view of the library declaration instead. Any
//! conversion failure yields the empty set.

use std::collections::BTreeSet;

use tracing::trace;

use crate::analyzer::Analyzer;
use crate::convert::Converter;
use crate::element::{Category, Element, ElementRef, ElementRegistry};
use crate::error::FactResult;
use crate::modifiers::Modifiers;
use crate::relation::Relation;

/// Relations answered from library declarations for non-project classes.
fn declaration_view(relation: Relation) -> bool {
    matches!(
        relation,
        Relation::DeclaresType
            | Relation::DeclaresMethod
            | Relation::DeclaresField
            | Relation::ExtendsClass
            | Relation::ImplementsInterface
            | Relation::ExtendsInterfaces
    )
}

/// Analyzer plus converter: the lookup path used by CHA and the facade.
pub struct Resolver<'a, C: Converter> {
    analyzer: Analyzer<'a>,
    converter: &'a C,
    registry: &'a ElementRegistry,
}

impl<'a, C: Converter> Resolver<'a, C> {
    pub fn new(analyzer: Analyzer<'a>, converter: &'a C, registry: &'a ElementRegistry) -> Self {
        Resolver {
            analyzer,
            converter,
            registry,
        }
    }

    pub fn analyzer(&self) -> Analyzer<'a> {
        self.analyzer
    }

    pub fn registry(&self) -> &'a ElementRegistry {
        self.registry
    }

    /// Range of `(domain, relation)`, consulting the converter for
    /// non-project classes.
    pub fn get_range(
        &self,
        domain: &Element,
        relation: Relation,
    ) -> FactResult<BTreeSet<ElementRef>> {
        if declaration_view(relation)
            && domain.category() == Category::Class
            && !self.analyzer.is_project_element(domain)
        {
            return Ok(self.non_project_range(domain, relation));
        }
        self.analyzer.get_range(domain, relation)
    }

    /// Declared modifiers of a non-project member, read through the converter.
    pub fn declared_modifiers(&self, element: &Element) -> FactResult<Modifiers> {
        let handle = self.converter.resolve_to_handle(element)?;
        Ok(self.converter.declaration(&handle)?.modifiers)
    }

    fn non_project_range(&self, domain: &Element, relation: Relation) -> BTreeSet<ElementRef> {
        match self.declared_range(domain, relation) {
            Ok(range) => range,
            Err(err) => {
                trace!(element = %domain, %relation, error = %err, "library lookup failed");
                BTreeSet::new()
            }
        }
    }

    fn declared_range(
        &self,
        domain: &Element,
        relation: Relation,
    ) -> FactResult<BTreeSet<ElementRef>> {
        let handle = self.converter.resolve_to_handle(domain)?;
        let declaration = self.converter.declaration(&handle)?;

        let handles = match relation {
            Relation::DeclaresType => declaration.member_types,
            Relation::DeclaresMethod => declaration.methods,
            Relation::DeclaresField => declaration.fields,
            Relation::ExtendsClass => declaration.superclass.into_iter().collect(),
            Relation::ImplementsInterface if !declaration.is_interface => declaration.interfaces,
            Relation::ExtendsInterfaces if declaration.is_interface => declaration.interfaces,
            _ => Vec::new(),
        };

        let range = handles
            .iter()
            .filter_map(|h| match self.converter.resolve_to_element(h, self.registry) {
                Ok(element) => Some(element),
                Err(err) => {
                    trace!(element = %domain, %relation, error = %err, "skipping library member");
                    None
                }
            })
            .collect();
        Ok(range)
    }
}

// ============================================================================
// Tests
// ============================================================================
