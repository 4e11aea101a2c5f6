//! End-to-end pipeline: records → hierarchy → finalized structure → document store.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use curriculum_shared::{
    BuildConfig, BuildId, CurriculumError, LookupLevel, PublishTarget, Result,
};
use curriculum_source::RecordSource;
use curriculum_storage::{Storage, WriteReceipt};

use crate::finalize::{FinalizedStructure, finalize};
use crate::hierarchy::{BuildStats, build_hierarchy};

/// Result of one [`build_structure`] run. Each run owns its own structure.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Identifier of this build.
    pub build_id: BuildId,
    /// The finalized hierarchy.
    pub structure: FinalizedStructure,
    /// Record and skip counters.
    pub stats: BuildStats,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the source has produced its records.
    fn records_read(&self, count: usize);
    /// Called when the build completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn records_read(&self, _count: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full build.
///
/// 1. Read every record from the source
/// 2. Fold records into the hierarchy
/// 3. Finalize into a deterministic structure
///
/// Either the whole build succeeds (possibly with skipped records) or it
/// fails because the source could not be read; nothing partial is returned.
#[instrument(skip_all, fields(source = source.name(), schema = %config.schema))]
pub fn build_structure(
    source: &dyn RecordSource,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();
    let build_id = BuildId::new();

    info!(%build_id, "starting build");

    progress.phase("Reading records");
    let records = source.read_records()?;
    progress.records_read(records.len());

    progress.phase("Building hierarchy");
    let (node, stats) = build_hierarchy(records.into_iter().map(Ok), config)?;

    progress.phase("Finalizing structure");
    let structure = finalize(node);

    let result = BuildResult {
        build_id,
        structure,
        stats,
        elapsed: start.elapsed(),
    };

    info!(
        build_id = %result.build_id,
        stages = result.structure.stages().len(),
        leaf_count = result.structure.leaf_count(),
        skipped = result.stats.skipped(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Store a finalized structure as one document at `target`.
#[instrument(skip_all, fields(collection = %target.collection, document = %target.document))]
pub async fn publish_structure(
    storage: &Storage,
    result: &BuildResult,
    target: &PublishTarget,
) -> Result<WriteReceipt> {
    let body = result.structure.to_json()?;
    let build_id = result.build_id.to_string();

    let receipt = storage
        .put_document(
            &target.collection,
            &target.document,
            &body,
            Some(build_id.as_str()),
        )
        .await?;

    info!(
        build_id = %build_id,
        changed = receipt.changed,
        content_hash = %receipt.meta.content_hash,
        "structure published"
    );
    Ok(receipt)
}

/// Read back a previously published structure.
pub async fn load_published(
    storage: &Storage,
    target: &PublishTarget,
) -> Result<FinalizedStructure> {
    let doc = storage
        .get_document(&target.collection, &target.document)
        .await?
        .ok_or_else(|| {
            CurriculumError::not_found(
                LookupLevel::Document,
                format!("{}/{}", target.collection, target.document),
            )
        })?;
    FinalizedStructure::from_json(doc.body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
