//! Application configuration for the curriculum tools.
//!
//! User config lives at `~/.curriculum/curriculum.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CurriculumError, Result};
use crate::types::{RecordField, SchemaVariant};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "curriculum.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".curriculum";

// ---------------------------------------------------------------------------
// Config structs (matching curriculum.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Outcomes table location and header mapping.
    #[serde(default)]
    pub source: SourceConfig,

    /// Hierarchy building policy.
    #[serde(default)]
    pub hierarchy: HierarchyConfig,

    /// Document store settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the outcomes CSV file.
    #[serde(default = "default_source_path")]
    pub path: String,

    /// Raw header aliases per canonical field.
    #[serde(default)]
    pub columns: ColumnAliases,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            columns: ColumnAliases::default(),
        }
    }
}

fn default_source_path() -> String {
    "data/OutcomesContent2.csv".into()
}

/// `[source.columns]` section: which raw headers feed each record field.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnAliases {
    #[serde(default = "default_stage_columns")]
    pub stage: Vec<String>,
    #[serde(default = "default_area_columns")]
    pub area: Vec<String>,
    #[serde(default = "default_focus_area_columns")]
    pub focus_area: Vec<String>,
    #[serde(default = "default_content_group_columns")]
    pub content_group: Vec<String>,
    #[serde(default = "default_content_point_columns")]
    pub content_point: Vec<String>,
    #[serde(default = "default_outcome_code_1_columns")]
    pub outcome_code_1: Vec<String>,
    #[serde(default = "default_outcome_code_2_columns")]
    pub outcome_code_2: Vec<String>,
}

impl ColumnAliases {
    /// Aliases configured for `field`.
    pub fn aliases(&self, field: RecordField) -> &[String] {
        match field {
            RecordField::Stage => &self.stage,
            RecordField::Area => &self.area,
            RecordField::FocusArea => &self.focus_area,
            RecordField::ContentGroup => &self.content_group,
            RecordField::ContentPoint => &self.content_point,
            RecordField::OutcomeCode1 => &self.outcome_code_1,
            RecordField::OutcomeCode2 => &self.outcome_code_2,
        }
    }

    /// Resolve a raw header to the field it feeds, if any.
    pub fn resolve(&self, header: &str) -> Option<RecordField> {
        let header = header.trim_start_matches('\u{feff}').trim();
        RecordField::ALL.into_iter().find(|field| {
            self.aliases(*field)
                .iter()
                .any(|alias| alias.trim().eq_ignore_ascii_case(header))
        })
    }
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            stage: default_stage_columns(),
            area: default_area_columns(),
            focus_area: default_focus_area_columns(),
            content_group: default_content_group_columns(),
            content_point: default_content_point_columns(),
            outcome_code_1: default_outcome_code_1_columns(),
            outcome_code_2: default_outcome_code_2_columns(),
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}
fn default_stage_columns() -> Vec<String> {
    names(&["Stage"])
}
fn default_area_columns() -> Vec<String> {
    names(&["Area"])
}
fn default_focus_area_columns() -> Vec<String> {
    names(&["Focus Area", "Focus areas & outcomes", "FocusArea"])
}
fn default_content_group_columns() -> Vec<String> {
    names(&["Content groups", "Content group", "ContentGroup"])
}
fn default_content_point_columns() -> Vec<String> {
    names(&["Content points", "Content point", "ContentPoint"])
}
fn default_outcome_code_1_columns() -> Vec<String> {
    names(&["Outcome Code 1", "OutcomeCode1"])
}
fn default_outcome_code_2_columns() -> Vec<String> {
    names(&["Outcome Code 2", "OutcomeCode2"])
}

/// `[hierarchy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Stages kept in the hierarchy; rows for any other stage are skipped.
    /// An empty list accepts every non-blank stage.
    #[serde(default = "default_allowed_stages")]
    pub allowed_stages: Vec<String>,

    /// Hierarchy shape.
    #[serde(default)]
    pub schema: SchemaVariant,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            allowed_stages: default_allowed_stages(),
            schema: SchemaVariant::default(),
        }
    }
}

fn default_allowed_stages() -> Vec<String> {
    names(&["Early Stage 1", "Stage 1", "Stage 2"])
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// libSQL database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Collection the structure document is written to.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Document id within the collection.
    #[serde(default = "default_document")]
    pub document: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            collection: default_collection(),
            document: default_document(),
        }
    }
}

fn default_db_path() -> String {
    "var/curriculum.db".into()
}
fn default_collection() -> String {
    "curriculum_structure".into()
}
fn default_document() -> String {
    "structure".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime build policy, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Stage allow-list (empty accepts any non-blank stage).
    pub allowed_stages: Vec<String>,
    /// Hierarchy shape to produce.
    pub schema: SchemaVariant,
}

impl BuildConfig {
    /// Whether rows for `stage` belong in the hierarchy.
    pub fn accepts_stage(&self, stage: &str) -> bool {
        if stage.is_empty() {
            return false;
        }
        self.allowed_stages.is_empty() || self.allowed_stages.iter().any(|s| s == stage)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for BuildConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            allowed_stages: config.hierarchy.allowed_stages.clone(),
            schema: config.hierarchy.schema,
        }
    }
}

/// Where a finalized structure is published in the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub collection: String,
    pub document: String,
}

impl From<&AppConfig> for PublishTarget {
    fn from(config: &AppConfig) -> Self {
        Self {
            collection: config.storage.collection.clone(),
            document: config.storage.document.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.curriculum/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CurriculumError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.curriculum/curriculum.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CurriculumError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CurriculumError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CurriculumError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CurriculumError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CurriculumError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("allowed_stages"));
        assert!(toml_str.contains("curriculum_structure"));
        assert!(toml_str.contains("Focus areas & outcomes"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.hierarchy.allowed_stages.len(), 3);
        assert_eq!(parsed.hierarchy.schema, SchemaVariant::Grouped);
        assert_eq!(parsed.storage.document, "structure");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[hierarchy]
allowed_stages = ["Stage 3"]
schema = "legacy"

[source.columns]
stage = ["Level"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.hierarchy.schema, SchemaVariant::Legacy);
        assert_eq!(config.source.path, "data/OutcomesContent2.csv");
        assert_eq!(config.source.columns.resolve("level"), Some(RecordField::Stage));
        assert_eq!(config.source.columns.resolve("Stage"), None);
        assert_eq!(
            config.source.columns.resolve("Content points"),
            Some(RecordField::ContentPoint)
        );
    }

    #[test]
    fn header_resolution_tolerates_case_space_and_bom() {
        let columns = ColumnAliases::default();
        assert_eq!(columns.resolve("\u{feff}Stage"), Some(RecordField::Stage));
        assert_eq!(columns.resolve("  focus area "), Some(RecordField::FocusArea));
        assert_eq!(
            columns.resolve("Focus areas & outcomes"),
            Some(RecordField::FocusArea)
        );
        assert_eq!(columns.resolve("OUTCOME CODE 2"), Some(RecordField::OutcomeCode2));
        assert_eq!(columns.resolve("Notes"), None);
    }

    #[test]
    fn build_config_from_app_config() {
        let app = AppConfig::default();
        let build = BuildConfig::from(&app);
        assert!(build.accepts_stage("Early Stage 1"));
        assert!(!build.accepts_stage("Unknown Stage"));
        assert!(!build.accepts_stage(""));

        let open = BuildConfig {
            allowed_stages: vec![],
            schema: SchemaVariant::Grouped,
        };
        assert!(open.accepts_stage("Stage 6"));
        assert!(!open.accepts_stage(""));
    }

    #[test]
    fn publish_target_from_app_config() {
        let target = PublishTarget::from(&AppConfig::default());
        assert_eq!(target.collection, "curriculum_structure");
        assert_eq!(target.document, "structure");
    }
}
