//! Shared types, error model, and configuration for the curriculum tools.
//!
//! This crate is the foundation depended on by all other curriculum crates.
//! It provides:
//! - [`CurriculumError`]: the unified error type
//! - Domain types ([`CurriculumRecord`], [`RecordField`], [`SchemaVariant`], [`BuildId`])
//! - Configuration ([`AppConfig`], [`BuildConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, ColumnAliases, HierarchyConfig, PublishTarget, SourceConfig,
    StorageConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CurriculumError, Result};
pub use types::{BuildId, CurriculumRecord, LookupLevel, RecordField, SchemaVariant};
