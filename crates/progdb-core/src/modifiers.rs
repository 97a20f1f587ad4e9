//! Modifier bit-sets attached to elements.
//!
//! Bits follow the JVM access flag layout so extractor output can be stored
//! verbatim. [`Modifiers::ABSTRACT_INFERRED`] is a synthetic high bit: any
//! value at or above it marks a method that has no implementation (interface
//! methods, abstract methods, and library methods inferred abstract during
//! class hierarchy analysis).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer modifier bit-set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(pub u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const PUBLIC: Modifiers = Modifiers(0x0001);
    pub const PRIVATE: Modifiers = Modifiers(0x0002);
    pub const PROTECTED: Modifiers = Modifiers(0x0004);
    pub const STATIC: Modifiers = Modifiers(0x0008);
    pub const FINAL: Modifiers = Modifiers(0x0010);
    pub const SYNCHRONIZED: Modifiers = Modifiers(0x0020);
    pub const INTERFACE: Modifiers = Modifiers(0x0200);
    pub const ABSTRACT: Modifiers = Modifiers(0x0400);
    /// Synthetic marker: abstract, possibly non-project, inferred.
    pub const ABSTRACT_INFERRED: Modifiers = Modifiers(0x4000);

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub fn is_static(&self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }

    /// Whether the value reaches the abstract-inferred threshold.
    ///
    /// This is a magnitude comparison, not a bit test: any higher synthetic
    /// bit counts as well.
    pub fn is_abstract_marker(&self) -> bool {
        self.0 >= Modifiers::ABSTRACT_INFERRED.0
    }

    /// Modifiers recorded for a library method discovered by CHA.
    ///
    /// Declared-abstract methods also get the abstract-inferred marker.
    pub fn inferred_for_library(declared: Modifiers) -> Modifiers {
        if declared.is_abstract() {
            declared.with(Modifiers::ABSTRACT_INFERRED)
        } else {
            declared
        }
    }
}

impl From<u32> for Modifiers {
    fn from(bits: u32) -> Self {
        Modifiers(bits)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
