//! Conversion boundary between elements and host declaration handles.
//!
//! The extractor that walks source code also knows how to reach library
//! declarations the project only references (superclasses, interfaces and
//! their members). The [`Converter`] trait is the seam through which the
//! core asks for those facts:
//!
//! - `resolve_to_element`: host handle to interned element
//! - `resolve_to_handle`: element to host handle; fails for elements with no
//!   live declaration (for example, synthesized non-project elements)
//! - `declaration`: what a handle declares and extends
//!
//! Every failure is a [`FactError::Conversion`]. Callers inside the core
//! recover from it locally and treat it as "no additional facts".
//!
//! Two implementations ship with the crate:
//! - [`NullConverter`]: knows nothing; every lookup fails
//! - [`LibraryIndex`]: an in-memory model of library types, loadable from JSON

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::element::{Category, Element, ElementKey, ElementRef, ElementRegistry};
use crate::error::{FactError, FactResult};
use crate::modifiers::Modifiers;

// ============================================================================
// Converter Trait
// ============================================================================

/// What a host declaration reports about itself.
///
/// Member declarations (methods, fields) only carry modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration<H> {
    pub modifiers: Modifiers,
    pub is_interface: bool,
    pub superclass: Option<H>,
    pub interfaces: Vec<H>,
    pub member_types: Vec<H>,
    pub methods: Vec<H>,
    pub fields: Vec<H>,
}

impl<H> Declaration<H> {
    /// A declaration with modifiers and nothing else.
    pub fn member(modifiers: Modifiers) -> Self {
        Declaration {
            modifiers,
            is_interface: false,
            superclass: None,
            interfaces: Vec::new(),
            member_types: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }
}

/// Maps between elements and the host's native declaration handles.
pub trait Converter {
    /// Host declaration handle.
    type Handle: Clone + fmt::Debug;

    /// Map a host handle to its canonical element.
    fn resolve_to_element(
        &self,
        handle: &Self::Handle,
        registry: &ElementRegistry,
    ) -> FactResult<ElementRef>;

    /// Map an element back to a live host handle.
    fn resolve_to_handle(&self, element: &Element) -> FactResult<Self::Handle>;

    /// Read the declaration behind a handle.
    fn declaration(&self, handle: &Self::Handle) -> FactResult<Declaration<Self::Handle>>;
}

// ============================================================================
// Null Converter
// ============================================================================

/// A converter with no host: every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConverter;

impl Converter for NullConverter {
    type Handle = ElementKey;

    fn resolve_to_element(
        &self,
        handle: &ElementKey,
        _registry: &ElementRegistry,
    ) -> FactResult<ElementRef> {
        Err(FactError::conversion(handle.to_string(), "no host declarations available"))
    }

    fn resolve_to_handle(&self, element: &Element) -> FactResult<ElementKey> {
        Err(FactError::conversion(element.id(), "no host declarations available"))
    }

    fn declaration(&self, handle: &ElementKey) -> FactResult<Declaration<ElementKey>> {
        Err(FactError::conversion(handle.to_string(), "no host declarations available"))
    }
}

// ============================================================================
// Library Index
// ============================================================================

/// A library member as written in a library index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryMember {
    pub id: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

/// A library type as written in a library index file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryType {
    pub id: String,
    pub modifiers: Modifiers,
    pub interface: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub member_types: Vec<String>,
    pub methods: Vec<LibraryMember>,
    pub fields: Vec<LibraryMember>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    types: Vec<LibraryType>,
}

/// In-memory converter over a set of library type declarations.
///
/// Handles are element keys; a key resolves iff the index declares it.
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    declarations: BTreeMap<ElementKey, Declaration<ElementKey>>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a library index from JSON (`{"types": [...]}`).
    pub fn from_json_str(json: &str) -> FactResult<Self> {
        let file: LibraryFile = serde_json::from_str(json)
            .map_err(|e| FactError::config(format!("invalid library index: {}", e)))?;
        let mut index = LibraryIndex::new();
        for ty in file.types {
            index.insert_type(ty);
        }
        Ok(index)
    }

    /// Read a library index file.
    pub fn from_path(path: &Path) -> FactResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|e| match e {
            FactError::Config { message } => {
                FactError::config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Add a type and its members to the index.
    pub fn insert_type(&mut self, ty: LibraryType) {
        let class_key = |id: &String| ElementKey::new(Category::Class, id.as_str());

        for method in &ty.methods {
            self.declarations.insert(
                ElementKey::new(Category::Method, method.id.as_str()),
                Declaration::member(method.modifiers),
            );
        }
        for field in &ty.fields {
            self.declarations.insert(
                ElementKey::new(Category::Field, field.id.as_str()),
                Declaration::member(field.modifiers),
            );
        }

        let declaration = Declaration {
            modifiers: ty.modifiers,
            is_interface: ty.interface,
            superclass: ty.superclass.as_ref().map(class_key),
            interfaces: ty.interfaces.iter().map(class_key).collect(),
            member_types: ty.member_types.iter().map(class_key).collect(),
            methods: ty
                .methods
                .iter()
                .map(|m| ElementKey::new(Category::Method, m.id.as_str()))
                .collect(),
            fields: ty
                .fields
                .iter()
                .map(|f| ElementKey::new(Category::Field, f.id.as_str()))
                .collect(),
        };
        self.declarations.insert(class_key(&ty.id), declaration);
    }

    /// Number of declarations (types and members).
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl Converter for LibraryIndex {
    type Handle = ElementKey;

    fn resolve_to_element(
        &self,
        handle: &ElementKey,
        registry: &ElementRegistry,
    ) -> FactResult<ElementRef> {
        registry
            .intern(handle)
            .map_err(|e| FactError::conversion(handle.to_string(), e.to_string()))
    }

    fn resolve_to_handle(&self, element: &Element) -> FactResult<ElementKey> {
        let key = element.key();
        if self.declarations.contains_key(&key) {
            Ok(key)
        } else {
            Err(FactError::conversion(key.to_string(), "not declared in the library index"))
        }
    }

    fn declaration(&self, handle: &ElementKey) -> FactResult<Declaration<ElementKey>> {
        self.declarations
            .get(handle)
            .cloned()
            .ok_or_else(|| {
                FactError::conversion(handle.to_string(), "not declared in the library index")
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"{
        "types": [
            {
                "id": "java.util.AbstractList",
                "modifiers": 1025,
                "superclass": "java.util.AbstractCollection",
                "interfaces": ["java.util.List"],
                "methods": [
                    {"id": "java.util.AbstractList.get(int)", "modifiers": 1025},
                    {"id": "java.util.AbstractList.clear()", "modifiers": 1}
                ]
            },
            {
                "id": "java.util.List",
                "modifiers": 1537,
                "interface": true,
                "interfaces": ["java.util.Collection"]
            }
        ]
    }"#;

    #[test]
    fn null_converter_fails_every_lookup() {
        let registry = ElementRegistry::new();
        let element = registry.get(Category::Class, "java.lang.Object").unwrap();
        let err = NullConverter.resolve_to_handle(&element).unwrap_err();
        assert!(err.is_conversion());
        assert!(NullConverter
            .resolve_to_element(&element.key(), &registry)
            .is_err());
    }

    #[test]
    fn library_index_answers_declarations() {
        let index = LibraryIndex::from_json_str(LIBRARY).unwrap();
        let registry = ElementRegistry::new();
        let list = registry.get(Category::Class, "java.util.AbstractList").unwrap();

        let handle = index.resolve_to_handle(&list).unwrap();
        let decl = index.declaration(&handle).unwrap();

        assert!(!decl.is_interface);
        assert_eq!(
            decl.superclass,
            Some(ElementKey::new(Category::Class, "java.util.AbstractCollection"))
        );
        assert_eq!(decl.methods.len(), 2);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn library_members_carry_modifiers() {
        let index = LibraryIndex::from_json_str(LIBRARY).unwrap();
        let get = ElementKey::new(Category::Method, "java.util.AbstractList.get(int)");
        let decl = index.declaration(&get).unwrap();
        assert!(decl.modifiers.is_abstract());
    }

    #[test]
    fn handles_round_trip_to_interned_elements() {
        let index = LibraryIndex::from_json_str(LIBRARY).unwrap();
        let registry = ElementRegistry::new();
        let key = ElementKey::new(Category::Class, "java.util.List");

        let element = index.resolve_to_element(&key, &registry).unwrap();
        let again = registry.get(Category::Class, "java.util.List").unwrap();
        assert!(std::sync::Arc::ptr_eq(&element, &again));
        assert_eq!(index.resolve_to_handle(&element).unwrap(), key);
    }

    #[test]
    fn unknown_elements_do_not_resolve() {
        let index = LibraryIndex::from_json_str(LIBRARY).unwrap();
        let registry = ElementRegistry::new();
        let synthesized = registry.get(Category::Method, "com.acme.Gone.run()").unwrap();
        assert!(index.resolve_to_handle(&synthesized).unwrap_err().is_conversion());
    }

    #[test]
    fn malformed_library_is_a_config_error() {
        let err = LibraryIndex::from_json_str("{\"types\": 3}").unwrap_err();
        assert!(matches!(err, FactError::Config { .. }));
    }
}
