//! Curriculum structure building and lookup.
//!
//! This crate turns flat outcome records into a nested, deduplicated
//! hierarchy (`hierarchy`), freezes it into a deterministic serializable form
//! (`finalize`), answers lookups over it (`query`), and ties the steps to a
//! record source and the document store (`pipeline`).

pub mod finalize;
pub mod hierarchy;
pub mod pipeline;
pub mod query;

pub use finalize::{FinalizedFocusArea, FinalizedStructure, finalize};
pub use hierarchy::{BuildStats, HierarchyBuilder, HierarchyNode, SkipReason, build_hierarchy};
pub use pipeline::{
    BuildResult, ProgressReporter, SilentProgress, build_structure, load_published,
    publish_structure,
};
pub use query::CurriculumQuery;
