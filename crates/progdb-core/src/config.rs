//! Analysis configuration, loaded from TOML.
//!
//! ```toml
//! cha = true
//! packages = ["com.acme", "com.acme.util"]
//! library = "library.json"
//! fail_fast = true
//! ```
//!
//! Every field is optional. Relative `library` paths are resolved against the
//! directory containing the configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FactError, FactResult};

fn default_true() -> bool {
    true
}

/// Options for building and querying a fact base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Run class hierarchy analysis after population.
    #[serde(default = "default_true")]
    pub cha: bool,
    /// Project packages registered before any unit is ingested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    /// JSON library index for non-project declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
    /// Abort population on the first malformed unit.
    #[serde(default = "default_true")]
    pub fail_fast: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            cha: true,
            packages: Vec::new(),
            library: None,
            fail_fast: true,
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> FactResult<Self> {
        toml::from_str(content).map_err(|e| FactError::config(e.to_string()))
    }

    /// Read a configuration file.
    pub fn from_file(path: &Path) -> FactResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AnalysisConfig = toml::from_str(&content)
            .map_err(|e| FactError::config(format!("{}: {}", path.display(), e)))?;
        if let (Some(library), Some(dir)) = (config.library.as_ref(), path.parent()) {
            if library.is_relative() {
                config.library = Some(dir.join(library));
            }
        }
        Ok(config)
    }

    pub fn with_cha(mut self, cha: bool) -> Self {
        self.cha = cha;
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.packages.push(package.into());
        self
    }

    pub fn with_library(mut self, library: impl Into<PathBuf>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}
