//! Regulation catalog.
//!
//! The catalog is an ordered list of known regulations. Each entry carries
//! the keyword variants used to spot the regulation in a question and the
//! file name patterns used to tag documents at ingestion time. Adding a
//! regulation is a data change in `catalog.yaml`; no code knows the names.

use reglens_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Regulation name given to passages whose source matched no entry.
pub const UNKNOWN_REGULATION: &str = "Unknown";

const BUILTIN_CATALOG: &str = include_str!("../catalog.yaml");

/// One known regulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegulationEntry {
    /// Canonical name, used as the passage metadata value and search filter
    pub name: String,

    /// Variants matched case-insensitively as substrings of a query
    pub keywords: Vec<String>,

    /// Variants matched case-insensitively against ingested file names
    #[serde(default)]
    pub source_patterns: Vec<String>,
}

/// Ordered set of known regulations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegulationCatalog {
    regulations: Vec<RegulationEntry>,
}

impl RegulationCatalog {
    /// Build a catalog from entries, normalising variants to lowercase.
    pub fn new(regulations: Vec<RegulationEntry>) -> AppResult<Self> {
        let catalog = Self {
            regulations: regulations
                .into_iter()
                .map(|entry| RegulationEntry {
                    name: entry.name.trim().to_string(),
                    keywords: normalise(entry.keywords),
                    source_patterns: normalise(entry.source_patterns),
                })
                .collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> AppResult<Self> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml(yaml: &str) -> AppResult<Self> {
        let parsed: RegulationCatalog = serde_yaml::from_str(yaml)
            .map_err(|e| AppError::Config(format!("Failed to parse regulation catalog: {}", e)))?;
        Self::new(parsed.regulations)
    }

    /// Load the workspace catalog at `path`, or the built-in one if the
    /// file does not exist.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No catalog at {:?}, using built-in catalog", path);
            return Self::builtin();
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read catalog {:?}: {}", path, e))
        })?;
        let catalog = Self::from_yaml(&contents)?;

        tracing::info!(
            "Loaded regulation catalog from {:?} ({} regulations)",
            path,
            catalog.len()
        );
        Ok(catalog)
    }

    /// Entries in catalog order.
    pub fn entries(&self) -> &[RegulationEntry] {
        &self.regulations
    }

    /// Canonical names in catalog order.
    pub fn names(&self) -> Vec<&str> {
        self.regulations.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.regulations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regulations.is_empty()
    }

    /// Regulations mentioned in `query`, in catalog order, each at most once.
    ///
    /// Plain case-insensitive substring matching; no tokenisation.
    pub fn detect_regulations(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();

        self.regulations
            .iter()
            .filter(|entry| entry.keywords.iter().any(|k| query.contains(k.as_str())))
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Regulation a document belongs to, judged from its file name.
    ///
    /// Returns [`UNKNOWN_REGULATION`] when no pattern matches.
    pub fn tag_source(&self, file_name: &str) -> &str {
        let file_name = file_name.to_lowercase();

        self.regulations
            .iter()
            .find(|entry| {
                entry
                    .source_patterns
                    .iter()
                    .any(|p| file_name.contains(p.as_str()))
            })
            .map(|entry| entry.name.as_str())
            .unwrap_or(UNKNOWN_REGULATION)
    }

    fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();

        for entry in &self.regulations {
            if entry.name.is_empty() {
                return Err(AppError::Config(
                    "Catalog entry with empty name".to_string(),
                ));
            }
            if entry.name == UNKNOWN_REGULATION {
                return Err(AppError::Config(format!(
                    "'{}' is reserved and cannot be a catalog entry",
                    UNKNOWN_REGULATION
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate catalog entry: {}",
                    entry.name
                )));
            }
            if entry.keywords.is_empty() {
                return Err(AppError::Config(format!(
                    "Catalog entry '{}' has no keywords",
                    entry.name
                )));
            }
        }

        Ok(())
    }
}

fn normalise(variants: Vec<String>) -> Vec<String> {
    variants
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> RegulationCatalog {
        RegulationCatalog::builtin().unwrap()
    }

    #[test]
    fn test_builtin_catalog_order() {
        assert_eq!(
            catalog().names(),
            vec![
                "SR 11-7",
                "NIST AI RMF",
                "ISO 42001",
                "NAIC Model Bulletin",
                "Colorado SB21-169"
            ]
        );
    }

    #[test]
    fn test_detect_single_regulation_any_variant_any_case() {
        let catalog = catalog();
        for query in [
            "What does SR 11-7 say about model documentation?",
            "what does sr11-7 require",
            "Summarise SR1107 validation",
            "sr 1107 ongoing monitoring",
        ] {
            assert_eq!(catalog.detect_regulations(query), vec!["SR 11-7"], "{}", query);
        }
    }

    #[test]
    fn test_detect_two_regulations_in_catalog_order() {
        let detected =
            catalog().detect_regulations("How do NIST AI RMF and SR 11-7 differ on risk?");
        assert_eq!(detected, vec!["SR 11-7", "NIST AI RMF"]);
    }

    #[test]
    fn test_detect_each_regulation_once() {
        // "nist" and "ai rmf" both match NIST AI RMF
        let detected = catalog().detect_regulations("NIST ai rmf governance, per NIST");
        assert_eq!(detected, vec!["NIST AI RMF"]);
    }

    #[test]
    fn test_detect_nothing() {
        assert!(catalog()
            .detect_regulations("What is effective challenge?")
            .is_empty());
    }

    #[test]
    fn test_substring_match_without_tokenisation() {
        let detected = catalog().detect_regulations("the naic's bulletin");
        assert_eq!(detected, vec!["NAIC Model Bulletin"]);
    }

    #[test]
    fn test_tag_source() {
        let catalog = catalog();
        assert_eq!(catalog.tag_source("SR1107a1.txt"), "SR 11-7");
        assert_eq!(catalog.tag_source("NIST.AI.100-1.txt"), "NIST AI RMF");
        assert_eq!(catalog.tag_source("iso_42001_excerpt.md"), "ISO 42001");
        assert_eq!(catalog.tag_source("colorado-sb21-169.txt"), "Colorado SB21-169");
        assert_eq!(catalog.tag_source("meeting-notes.txt"), UNKNOWN_REGULATION);
    }

    #[test]
    fn test_new_regulation_is_data_only() {
        let yaml = r#"
regulations:
  - name: EU AI Act
    keywords: ["EU AI Act", "2024/1689"]
    sourcePatterns: ["eu_ai_act"]
"#;
        let catalog = RegulationCatalog::from_yaml(yaml).unwrap();
        assert_eq!(
            catalog.detect_regulations("What does the eu ai act say?"),
            vec!["EU AI Act"]
        );
        assert_eq!(catalog.tag_source("EU_AI_Act.txt"), "EU AI Act");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = r#"
regulations:
  - name: SR 11-7
    keywords: ["sr 11-7"]
  - name: SR 11-7
    keywords: ["sr11-7"]
"#;
        assert!(RegulationCatalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_entry_without_keywords_rejected() {
        let yaml = r#"
regulations:
  - name: SR 11-7
    keywords: ["  "]
"#;
        assert!(RegulationCatalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_falls_back_to_builtin() {
        let temp = TempDir::new().unwrap();
        let catalog = RegulationCatalog::load(&temp.path().join("catalog.yaml")).unwrap();
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn test_load_workspace_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "regulations:\n  - name: DORA\n    keywords: [dora]\n",
        )
        .unwrap();

        let catalog = RegulationCatalog::load(&path).unwrap();
        assert_eq!(catalog.names(), vec!["DORA"]);
    }
}
