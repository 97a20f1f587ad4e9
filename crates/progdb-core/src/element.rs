//! Element model: canonical program entities and the registry that interns them.
//!
//! An [`Element`] is a class, method or field identified by a stable string
//! key:
//!
//! | Category | Key shape | Example |
//! |----------|-----------|---------|
//! | `CLASS` | dotted class name | `com.acme.Shape$Inner` |
//! | `METHOD` | class `.` name `(` params `)` | `com.acme.Shape.area(int,java.lang.String)` |
//! | `FIELD` | class `.` name | `com.acme.Shape.sides` |
//!
//! Equality, ordering and hashing derive solely from `(category, id)`.
//!
//! # Registry
//!
//! [`ElementRegistry`] owns the interned elements of one analysis session.
//! Asking it twice for the same key returns the same shared [`ElementRef`]
//! (`Arc::ptr_eq` holds). The registry is dropped with its session; there is
//! no process-wide cache.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FactError, FactResult};

/// Name of instance constructors in method keys.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name of static initializers in method keys.
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

static CLASS_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").unwrap());

static METHOD_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<class>[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\.(?P<name><init>|<clinit>|[A-Za-z_$][\w$]*)\((?P<params>[^()]*)\)$")
        .unwrap()
});

static FIELD_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<class>[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\.(?P<name>[A-Za-z_$][\w$]*)$")
        .unwrap()
});

// ============================================================================
// Category
// ============================================================================

/// Category of a program element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Class,
    Method,
    Field,
}

impl Category {
    /// All categories, in ordering order.
    pub const ALL: [Category; 3] = [Category::Class, Category::Method, Category::Field];

    /// Stable upper-case name (`CLASS`, `METHOD`, `FIELD`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Class => "CLASS",
            Category::Method => "METHOD",
            Category::Field => "FIELD",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FactError::unknown_category(s))
    }
}

// ============================================================================
// Element Key
// ============================================================================

/// Serializable `(category, id)` pair naming an element.
///
/// Parses from and prints as `CATEGORY:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementKey {
    pub category: Category,
    pub id: String,
}

impl ElementKey {
    /// Create a new key. The id is not validated until it is interned.
    pub fn new(category: Category, id: impl Into<String>) -> Self {
        ElementKey {
            category,
            id: id.into(),
        }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.id)
    }
}

impl FromStr for ElementKey {
    type Err = FactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, id) = s
            .split_once(':')
            .ok_or_else(|| FactError::invalid_key(s, "expected CATEGORY:id"))?;
        Ok(ElementKey::new(category.parse()?, id))
    }
}

// ============================================================================
// Element Variants
// ============================================================================

/// A class or interface.
#[derive(Debug, Clone)]
pub struct ClassElement {
    id: String,
}

impl ClassElement {
    fn parse(id: &str) -> FactResult<Self> {
        if !CLASS_KEY.is_match(id) {
            return Err(FactError::invalid_key(id, "not a dotted class name"));
        }
        Ok(ClassElement { id: id.to_string() })
    }

    /// Package containing the class; empty for the default package.
    pub fn package_name(&self) -> &str {
        self.id.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }

    /// Class name without its package.
    pub fn simple_name(&self) -> &str {
        self.id.rsplit_once('.').map(|(_, name)| name).unwrap_or(self.id.as_str())
    }
}

/// A method, constructor or static initializer.
#[derive(Debug, Clone)]
pub struct MethodElement {
    id: String,
    declaring_class: String,
    name: String,
    parameters: Vec<String>,
}

impl MethodElement {
    fn parse(id: &str) -> FactResult<Self> {
        let caps = METHOD_KEY
            .captures(id)
            .ok_or_else(|| FactError::invalid_key(id, "expected Class.name(params)"))?;
        let parameters = caps["params"]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Ok(MethodElement {
            id: id.to_string(),
            declaring_class: caps["class"].to_string(),
            name: caps["name"].to_string(),
            parameters,
        })
    }

    /// Method name without class or parameters.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type names, in declaration order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Whether this is a constructor or a static initializer.
    pub fn is_initializer(&self) -> bool {
        self.name.starts_with(CONSTRUCTOR_NAME) || self.name.starts_with(STATIC_INITIALIZER_NAME)
    }
}

/// A field.
#[derive(Debug, Clone)]
pub struct FieldElement {
    id: String,
    declaring_class: String,
    name: String,
}

impl FieldElement {
    fn parse(id: &str) -> FactResult<Self> {
        let caps = FIELD_KEY
            .captures(id)
            .ok_or_else(|| FactError::invalid_key(id, "expected Class.field"))?;
        Ok(FieldElement {
            id: id.to_string(),
            declaring_class: caps["class"].to_string(),
            name: caps["name"].to_string(),
        })
    }

    /// Field name without class.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Element
// ============================================================================

/// A program element. Immutable once created.
#[derive(Debug, Clone)]
pub enum Element {
    Class(ClassElement),
    Method(MethodElement),
    Field(FieldElement),
}

/// Shared handle to an interned element.
pub type ElementRef = Arc<Element>;

impl Element {
    /// Parse an element of the given category from its key.
    ///
    /// Prefer [`ElementRegistry::get`], which also interns the result.
    pub fn parse(category: Category, id: &str) -> FactResult<Self> {
        if id.is_empty() {
            return Err(FactError::invalid_key(id, "empty id"));
        }
        Ok(match category {
            Category::Class => Element::Class(ClassElement::parse(id)?),
            Category::Method => Element::Method(MethodElement::parse(id)?),
            Category::Field => Element::Field(FieldElement::parse(id)?),
        })
    }

    pub fn category(&self) -> Category {
        match self {
            Element::Class(_) => Category::Class,
            Element::Method(_) => Category::Method,
            Element::Field(_) => Category::Field,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Element::Class(c) => &c.id,
            Element::Method(m) => &m.id,
            Element::Field(f) => &f.id,
        }
    }

    pub fn key(&self) -> ElementKey {
        ElementKey::new(self.category(), self.id())
    }

    /// Short name: class name, `name(params)` for methods, field name.
    pub fn simple_name(&self) -> String {
        match self {
            Element::Class(c) => c.simple_name().to_string(),
            Element::Method(m) => format!("{}({})", m.name, m.parameters.join(",")),
            Element::Field(f) => f.name.clone(),
        }
    }

    /// Id of the declaring class, for members.
    pub fn declaring_class_id(&self) -> Option<&str> {
        match self {
            Element::Class(_) => None,
            Element::Method(m) => Some(&m.declaring_class),
            Element::Field(f) => Some(&f.declaring_class),
        }
    }

    /// Package of the element (members report their declaring class's package).
    pub fn package_name(&self) -> &str {
        match self {
            Element::Class(c) => c.package_name(),
            Element::Method(_) | Element::Field(_) => {
                let class = self.declaring_class_id().unwrap_or("");
                class.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
            }
        }
    }

    pub fn as_method(&self) -> Option<&MethodElement> {
        match self {
            Element::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Element::Method(_))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.category() == other.category() && self.id() == other.id()
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.category().hash(state);
        self.id().hash(state);
    }
}

impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Element {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category()
            .cmp(&other.category())
            .then_with(|| self.id().cmp(other.id()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Session-scoped interning cache for elements.
///
/// Safe to share between threads; lookups of known keys take a read lock only.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    cache: RwLock<HashMap<ElementKey, ElementRef>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical element for `(category, id)`, creating it on first request.
    pub fn get(&self, category: Category, id: &str) -> FactResult<ElementRef> {
        let key = ElementKey::new(category, id);
        if let Some(existing) = self.cache.read().get(&key) {
            return Ok(Arc::clone(existing));
        }

        let element = Element::parse(category, id)?;
        let mut cache = self.cache.write();
        // Another writer may have interned the key between the two locks.
        let entry = cache.entry(key).or_insert_with(|| Arc::new(element));
        Ok(Arc::clone(entry))
    }

    /// Look up by an unparsed category name.
    pub fn get_named(&self, category: &str, id: &str) -> FactResult<ElementRef> {
        self.get(category.parse()?, id)
    }

    /// Intern the element named by `key`.
    pub fn intern(&self, key: &ElementKey) -> FactResult<ElementRef> {
        self.get(key.category, &key.id)
    }

    /// The class declaring a method or field.
    pub fn declaring_class(&self, element: &Element) -> Option<ElementRef> {
        let class_id = element.declaring_class_id()?;
        self.get(Category::Class, class_id).ok()
    }

    /// Number of interned elements.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
