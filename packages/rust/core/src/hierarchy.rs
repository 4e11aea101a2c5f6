//! Hierarchy builder.
//!
//! Folds flat outcome records into a nested Stage → Area → FocusArea →
//! (ContentGroup →) ContentPoint mapping, aggregating outcome codes per
//! content point. Every level is get-or-create; nothing is ever overwritten.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, instrument};

use curriculum_shared::{BuildConfig, CurriculumRecord, RecordField, Result, SchemaVariant};

/// Outcome codes attached to one content point.
pub type OutcomeSet = HashSet<String>;

/// Content point → outcome codes.
pub type ContentGroupNode = HashMap<String, OutcomeSet>;

/// Area → focus areas.
pub type AreaNode = HashMap<String, FocusAreaNode>;

/// Stage → areas.
pub type StageNode = HashMap<String, AreaNode>;

/// Contents of one focus area, shaped by the active [`SchemaVariant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusAreaNode {
    /// Content group → content point → outcome codes.
    Grouped(HashMap<String, ContentGroupNode>),
    /// Bare content points (legacy layout, no groups or outcomes).
    Points(HashSet<String>),
}

impl FocusAreaNode {
    fn empty(schema: SchemaVariant) -> Self {
        match schema {
            SchemaVariant::Grouped => Self::Grouped(HashMap::new()),
            SchemaVariant::Legacy => Self::Points(HashSet::new()),
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Self::Grouped(groups) => groups.values().map(HashMap::len).sum(),
            Self::Points(points) => points.len(),
        }
    }
}

/// Working structure produced by the builder; mutable only during the fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyNode {
    pub stages: HashMap<String, StageNode>,
}

impl HierarchyNode {
    /// Number of distinct content point paths.
    pub fn leaf_count(&self) -> usize {
        self.stages
            .values()
            .flat_map(HashMap::values)
            .flat_map(HashMap::values)
            .map(FocusAreaNode::leaf_count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Why a record was left out of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Stage is blank or not in the allow-list.
    UnknownStage(String),
    /// A field needed to place the record has no column.
    MissingField(RecordField),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStage(stage) => write!(f, "unrecognized stage '{stage}'"),
            Self::MissingField(field) => write!(f, "missing field {field}"),
        }
    }
}

/// Counters collected while folding records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Records offered to the builder.
    pub records_read: usize,
    /// Records that contributed to the hierarchy.
    pub records_used: usize,
    /// Records dropped by the stage allow-list.
    pub skipped_unknown_stage: usize,
    /// Records dropped for a missing field, by field.
    pub skipped_missing_field: BTreeMap<RecordField, usize>,
    /// Distinct content point paths in the result.
    pub leaf_count: usize,
}

impl BuildStats {
    /// Total records skipped for any reason.
    pub fn skipped(&self) -> usize {
        self.skipped_unknown_stage + self.skipped_missing_field.values().sum::<usize>()
    }

    fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::UnknownStage(_) => self.skipped_unknown_stage += 1,
            SkipReason::MissingField(field) => {
                *self.skipped_missing_field.entry(*field).or_default() += 1;
            }
        }
    }
}

/// Incremental builder. One instance per build; never shared between builds.
#[derive(Debug)]
pub struct HierarchyBuilder<'a> {
    config: &'a BuildConfig,
    root: HierarchyNode,
    stats: BuildStats,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self {
            config,
            root: HierarchyNode::default(),
            stats: BuildStats::default(),
        }
    }

    /// Fold one record in. Skipped records are counted, never fatal.
    pub fn insert(&mut self, record: CurriculumRecord) -> std::result::Result<(), SkipReason> {
        let index = self.begin(&record);
        let outcome = self.place(record);
        self.tally(index, &outcome);
        outcome
    }

    /// Like [`insert`](Self::insert), leaving the skip reason to the counters.
    fn fold(&mut self, record: CurriculumRecord) {
        let index = self.begin(&record);
        let outcome = self.place(record);
        self.tally(index, &outcome);
    }

    fn begin(&mut self, record: &CurriculumRecord) -> usize {
        let index = self.stats.records_read;
        self.stats.records_read += 1;
        if index == 0 {
            debug!(?record, "sample record");
        }
        index
    }

    fn tally(&mut self, index: usize, outcome: &std::result::Result<(), SkipReason>) {
        match outcome {
            Ok(()) => self.stats.records_used += 1,
            Err(reason) => {
                debug!(row = index, %reason, "skipping record");
                self.stats.record_skip(reason);
            }
        }
    }

    fn place(&mut self, record: CurriculumRecord) -> std::result::Result<(), SkipReason> {
        let codes: Vec<String> = record.outcome_codes().map(str::to_owned).collect();

        let CurriculumRecord {
            stage,
            area,
            focus_area,
            content_group,
            content_point,
            ..
        } = record;

        let stage = stage.ok_or(SkipReason::MissingField(RecordField::Stage))?;
        if !self.config.accepts_stage(&stage) {
            return Err(SkipReason::UnknownStage(stage));
        }
        let area = area.ok_or(SkipReason::MissingField(RecordField::Area))?;
        let focus_area = focus_area.ok_or(SkipReason::MissingField(RecordField::FocusArea))?;
        let content_point =
            content_point.ok_or(SkipReason::MissingField(RecordField::ContentPoint))?;

        let schema = self.config.schema;
        let focus = self
            .root
            .stages
            .entry(stage)
            .or_default()
            .entry(area)
            .or_default()
            .entry(focus_area)
            .or_insert_with(|| FocusAreaNode::empty(schema));

        match focus {
            FocusAreaNode::Grouped(groups) => {
                let outcomes = groups
                    .entry(content_group.unwrap_or_default())
                    .or_default()
                    .entry(content_point)
                    .or_default();
                outcomes.extend(codes);
            }
            FocusAreaNode::Points(points) => {
                points.insert(content_point);
            }
        }

        Ok(())
    }

    /// Stop folding and hand back the hierarchy with its counters.
    pub fn finish(mut self) -> (HierarchyNode, BuildStats) {
        self.stats.leaf_count = self.root.leaf_count();
        (self.root, self.stats)
    }
}

/// Build a hierarchy from a sequence of records.
///
/// Fails only when the sequence itself yields an error; individual records
/// that cannot be placed are skipped and counted in [`BuildStats`].
#[instrument(skip_all, fields(schema = %config.schema))]
pub fn build_hierarchy<I>(records: I, config: &BuildConfig) -> Result<(HierarchyNode, BuildStats)>
where
    I: IntoIterator<Item = Result<CurriculumRecord>>,
{
    let mut builder = HierarchyBuilder::new(config);
    for record in records {
        builder.fold(record?);
    }
    let (node, stats) = builder.finish();

    info!(
        records_read = stats.records_read,
        records_used = stats.records_used,
        skipped_unknown_stage = stats.skipped_unknown_stage,
        skipped_missing_field = stats.skipped_missing_field.values().sum::<usize>(),
        leaf_count = stats.leaf_count,
        "hierarchy built"
    );

    Ok((node, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
