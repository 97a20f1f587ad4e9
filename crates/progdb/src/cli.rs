//! CLI command implementations.
//!
//! Each `run_*` function answers one subcommand against a built fact base
//! and returns the response value; `main.rs` owns argument parsing and
//! printing.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use progdb_core::cha::TracingProgress;
use progdb_core::config::AnalysisConfig;
use progdb_core::convert::LibraryIndex;
use progdb_core::element::{Category, Element, ElementKey, ElementRef};
use progdb_core::error::{FactError, FactResult};
use progdb_core::ingest::{ProgramFacts, UnitFacts};
use progdb_core::output::{
    ElementInfo, ElementsResponse, ModifiersResponse, RangeResponse, RelationCount, StatsResponse,
    SCHEMA_VERSION,
};
use progdb_core::relation::Relation;

/// Fact base built by the CLI: library declarations come from a JSON index.
pub type CliFacts = ProgramFacts<LibraryIndex>;

// ============================================================================
// Loading
// ============================================================================

/// Where the fact base comes from, plus command-line overrides.
#[derive(Debug, Clone, Default)]
pub struct FactsOptions {
    /// Directory tree of `*.json` unit files.
    pub facts: PathBuf,
    pub config: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub packages: Vec<String>,
    pub no_cha: bool,
}

impl FactsOptions {
    /// Configuration file values with command-line overrides applied.
    pub fn resolve_config(&self) -> FactResult<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        if self.no_cha {
            config = config.with_cha(false);
        }
        if let Some(library) = &self.library {
            config = config.with_library(library.clone());
        }
        for package in &self.packages {
            config = config.with_package(package.clone());
        }
        Ok(config)
    }
}

/// Unit files under `dir`, sorted by path.
pub fn unit_files(dir: &Path) -> FactResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FactError::config(format!(
            "facts directory not found: {}",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Read and parse one unit file.
pub fn read_unit(path: &Path) -> FactResult<UnitFacts> {
    let origin = path.display().to_string();
    let content =
        std::fs::read_to_string(path).map_err(|e| FactError::extraction(&origin, e))?;
    UnitFacts::from_json_str(&origin, &content)
}

/// Build the fact base described by `options`.
pub fn open_facts(options: &FactsOptions) -> FactResult<CliFacts> {
    let config = options.resolve_config()?;
    let library = match &config.library {
        Some(path) => LibraryIndex::from_path(path)?,
        None => LibraryIndex::new(),
    };
    let files = unit_files(&options.facts)?;
    debug!(files = files.len(), declarations = library.len(), "loading facts");

    let units = files.iter().map(|path| read_unit(path));
    ProgramFacts::build(config, library, units, &mut TracingProgress::new())
}

// ============================================================================
// Commands
// ============================================================================

fn info(facts: &CliFacts, element: &Element) -> ElementInfo {
    ElementInfo::new(element, facts.is_project_element(element))
}

fn infos<'a>(
    facts: &CliFacts,
    elements: impl IntoIterator<Item = &'a ElementRef>,
) -> Vec<ElementInfo> {
    elements.into_iter().map(|e| info(facts, e)).collect()
}

/// Parse `CATEGORY:id` and intern it.
pub fn parse_element(facts: &CliFacts, key: &str) -> FactResult<ElementRef> {
    let key: ElementKey = key.parse()?;
    facts.lookup(&key)
}

/// `stats`: sizes, packages, CHA outcome and snapshot id.
pub fn run_stats(facts: &CliFacts) -> StatsResponse {
    let db = facts.database();
    let relations = Relation::ALL
        .into_iter()
        .map(|relation| RelationCount {
            relation,
            tuples: db.tuple_count_for(relation),
        })
        .filter(|count| count.tuples > 0)
        .collect();

    StatsResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        snapshot_id: facts.snapshot_id(),
        elements: db.element_count(),
        tuples: db.tuple_count(),
        relations,
        packages: facts.project().iter().map(str::to_string).collect(),
        ingest: facts.ingest_stats(),
        cha_status: facts.cha_status(),
        cha: facts.cha_report().cloned(),
    }
}

/// `elements [--category C] [--in-project]`.
pub fn run_elements(
    facts: &CliFacts,
    category: Option<&str>,
    in_project: bool,
) -> FactResult<ElementsResponse> {
    let category: Option<Category> = category.map(str::parse).transpose()?;
    let elements = facts
        .all_elements()
        .into_iter()
        .filter(|e| match category {
            Some(c) => e.category() == c,
            None => true,
        })
        .filter(|e| !in_project || facts.is_project_element(e))
        .map(|e| info(facts, &e))
        .collect();
    Ok(ElementsResponse::new(facts.snapshot_id(), elements))
}

/// `range <CATEGORY:id> <RELATION> [--in-project]`.
pub fn run_range(
    facts: &CliFacts,
    key: &str,
    relation: &str,
    in_project: bool,
) -> FactResult<RangeResponse> {
    let element = parse_element(facts, key)?;
    let relation: Relation = relation.parse()?;
    let range = if in_project {
        facts.get_range_in_project(&element, relation)?
    } else {
        facts.get_range(&element, relation)?
    };
    Ok(RangeResponse::new(
        facts.snapshot_id(),
        info(facts, &element),
        relation,
        infos(facts, &range),
    ))
}

/// `overrides <method-id>`.
///
/// Reads the stored `OVERRIDES` range when CHA is enabled, otherwise
/// computes the overridden set on demand.
pub fn run_overrides(facts: &CliFacts, method_id: &str) -> FactResult<RangeResponse> {
    let method = facts.element(Category::Method, method_id)?;
    let overridden = if facts.is_cha_enabled() {
        facts.get_range(&method, Relation::Overrides)?
    } else {
        facts.overridden_methods(&method)?
    };
    Ok(RangeResponse::new(
        facts.snapshot_id(),
        info(facts, &method),
        Relation::Overrides,
        infos(facts, &overridden),
    ))
}

/// `modifiers <CATEGORY:id>`.
pub fn run_modifiers(facts: &CliFacts, key: &str) -> FactResult<ModifiersResponse> {
    let element = parse_element(facts, key)?;
    Ok(ModifiersResponse::new(
        info(facts, &element),
        facts.modifiers(&element),
        facts.is_abstract_method(&element),
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn unit_files_are_sorted_json_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b/Two.json", "{}");
        write(dir.path(), "a/One.json", "{}");
        write(dir.path(), "a/notes.txt", "");

        let files = unit_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a/One.json", "b/Two.json"]);
    }

    #[test]
    fn missing_facts_dir_is_a_config_error() {
        let err = unit_files(Path::new("/nonexistent/progdb/facts")).unwrap_err();
        assert_eq!(err.error_code().code(), 2);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "progdb.toml", "cha = true\npackages = [\"a\"]\n");
        let options = FactsOptions {
            facts: dir.path().to_path_buf(),
            config: Some(dir.path().join("progdb.toml")),
            library: Some(PathBuf::from("/opt/lib.json")),
            packages: vec!["b".to_string()],
            no_cha: true,
        };

        let config = options.resolve_config().unwrap();
        assert!(!config.cha);
        assert_eq!(config.packages, vec!["a", "b"]);
        assert_eq!(config.library, Some(PathBuf::from("/opt/lib.json")));
    }

    #[test]
    fn unreadable_unit_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Broken.json", "{ not json");
        let err = read_unit(&dir.path().join("Broken.json")).unwrap_err();
        match err {
            FactError::Extraction { unit, .. } => assert!(unit.ends_with("Broken.json")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
