//! Finalizer: freezes a [`HierarchyNode`] into a serialization-ready structure.
//!
//! Maps become `BTreeMap`s and sets become sorted, deduplicated `Vec`s, so the
//! output is byte-for-byte stable for a given input regardless of row order.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use curriculum_shared::{Result, SchemaVariant};

use crate::hierarchy::{FocusAreaNode, HierarchyNode};

/// Content point → sorted outcome codes.
pub type FinalizedGroup = BTreeMap<String, Vec<String>>;

/// Area → focus areas.
pub type FinalizedArea = BTreeMap<String, FinalizedFocusArea>;

/// Stage → areas.
pub type FinalizedStage = BTreeMap<String, FinalizedArea>;

/// Frozen contents of one focus area.
///
/// Serializes as a JSON object (grouped) or a JSON array (legacy), which is
/// also how it is told apart when read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalizedFocusArea {
    Grouped(BTreeMap<String, FinalizedGroup>),
    Points(Vec<String>),
}

impl FinalizedFocusArea {
    fn leaf_count(&self) -> usize {
        match self {
            Self::Grouped(groups) => groups.values().map(BTreeMap::len).sum(),
            Self::Points(points) => points.len(),
        }
    }
}

/// Immutable, fully-built curriculum hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalizedStructure {
    stages: BTreeMap<String, FinalizedStage>,
}

impl FinalizedStructure {
    pub fn stages(&self) -> &BTreeMap<String, FinalizedStage> {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of distinct content point paths.
    pub fn leaf_count(&self) -> usize {
        self.stages
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(FinalizedFocusArea::leaf_count)
            .sum()
    }

    /// Shape of the structure, or `None` when it has no focus areas to tell by.
    pub fn schema(&self) -> Option<SchemaVariant> {
        self.stages
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .next()
            .map(|focus| match focus {
                FinalizedFocusArea::Grouped(_) => SchemaVariant::Grouped,
                FinalizedFocusArea::Points(_) => SchemaVariant::Legacy,
            })
    }

    /// Plain nested JSON value handed to the document store.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Convert a built hierarchy into its frozen, deterministic form.
pub fn finalize(node: HierarchyNode) -> FinalizedStructure {
    let stages = node
        .stages
        .into_iter()
        .map(|(stage, areas)| {
            let areas = areas
                .into_iter()
                .map(|(area, focus_areas)| {
                    let focus_areas = focus_areas
                        .into_iter()
                        .map(|(focus, content)| (focus, finalize_focus_area(content)))
                        .collect();
                    (area, focus_areas)
                })
                .collect();
            (stage, areas)
        })
        .collect();

    FinalizedStructure { stages }
}

fn finalize_focus_area(node: FocusAreaNode) -> FinalizedFocusArea {
    match node {
        FocusAreaNode::Grouped(groups) => FinalizedFocusArea::Grouped(
            groups
                .into_iter()
                .map(|(group, points)| {
                    let points = points
                        .into_iter()
                        .map(|(point, codes)| (point, sorted(codes)))
                        .collect();
                    (group, points)
                })
                .collect(),
        ),
        FocusAreaNode::Points(points) => FinalizedFocusArea::Points(sorted(points)),
    }
}

/// Lexicographic (byte-order) sequence of a set.
fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.into_iter().collect();
    items.sort_unstable();
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    use crate::hierarchy::build_hierarchy;
    use curriculum_shared::{BuildConfig, CurriculumRecord, RecordField};
    use proptest::prelude::*;

    fn record(point: &str, code1: &str, code2: &str) -> CurriculumRecord {
        CurriculumRecord::default()
            .with(RecordField::Stage, "Stage 1")
            .with(RecordField::Area, "Math")
            .with(RecordField::FocusArea, "Number")
            .with(RecordField::ContentGroup, "Addition")
            .with(RecordField::ContentPoint, point)
            .with(RecordField::OutcomeCode1, code1)
            .with(RecordField::OutcomeCode2, code2)
    }

    fn build(records: Vec<CurriculumRecord>, config: &BuildConfig) -> FinalizedStructure {
        let (node, _) = build_hierarchy(records.into_iter().map(Ok), config).expect("build");
        finalize(node)
    }

    #[test]
    fn outcome_sequences_are_sorted_and_unique() {
        let structure = build(
            vec![
                record("Add to 10", "MA1-2", "MA1-1"),
                record("Add to 10", "MA1-1", ""),
                record("Add to 10", "MA1-10", "MA1-2"),
            ],
            &BuildConfig::default(),
        );

        let json = structure.to_json().unwrap();
        assert_eq!(
            json["Stage 1"]["Math"]["Number"]["Addition"]["Add to 10"],
            serde_json::json!(["MA1-1", "MA1-10", "MA1-2"])
        );
    }

    #[test]
    fn serializes_to_plain_nested_object() {
        let structure = build(
            vec![record("Add to 10", "MA1-1", ""), record("Add to 20", "", "")],
            &BuildConfig::default(),
        );
        let expected = serde_json::json!({
            "Stage 1": {
                "Math": {
                    "Number": {
                        "Addition": {
                            "Add to 10": ["MA1-1"],
                            "Add to 20": []
                        }
                    }
                }
            }
        });
        assert_eq!(structure.to_json().unwrap(), expected);
        assert_eq!(structure.schema(), Some(SchemaVariant::Grouped));
        assert_eq!(structure.leaf_count(), 2);
    }

    #[test]
    fn legacy_structure_serializes_point_lists() {
        let config = BuildConfig {
            schema: SchemaVariant::Legacy,
            ..BuildConfig::default()
        };
        let structure = build(
            vec![record("b", "", ""), record("a", "", ""), record("b", "", "")],
            &config,
        );
        assert_eq!(
            structure.to_json().unwrap(),
            serde_json::json!({"Stage 1": {"Math": {"Number": ["a", "b"]}}})
        );
        assert_eq!(structure.schema(), Some(SchemaVariant::Legacy));
    }

    #[test]
    fn json_roundtrip_preserves_both_shapes() {
        let grouped = build(vec![record("Add", "MA1-1", "")], &BuildConfig::default());
        let back = FinalizedStructure::from_json(grouped.to_json().unwrap()).unwrap();
        assert_eq!(back, grouped);

        let legacy_config = BuildConfig {
            schema: SchemaVariant::Legacy,
            ..BuildConfig::default()
        };
        let legacy = build(vec![record("Add", "", "")], &legacy_config);
        let back = FinalizedStructure::from_json(legacy.to_json().unwrap()).unwrap();
        assert_eq!(back, legacy);
    }

    #[test]
    fn rejects_non_structure_json() {
        let err = FinalizedStructure::from_json(serde_json::json!({"Stage 1": 3})).unwrap_err();
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn empty_hierarchy_finalizes_empty() {
        let structure = finalize(HierarchyNode::default());
        assert!(structure.is_empty());
        assert_eq!(structure.schema(), None);
        assert_eq!(structure.to_json().unwrap(), serde_json::json!({}));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    type LeafPath = (String, String, String, String, String);

    /// Records with every column optional, so missing-field skips are exercised.
    fn arb_record() -> impl Strategy<Value = CurriculumRecord> {
        let cell = |values: Vec<&'static str>| {
            prop::option::of(prop::sample::select(values)).prop_map(|v| v.map(str::to_owned))
        };
        let codes = move || cell(vec!["MA1-1", "MA1-2", "EN1-1", "", " "]);
        (
            cell(vec!["Early Stage 1", "Stage 1", "Stage 2", "Unknown Stage", ""]),
            cell(vec!["Math", "English"]),
            cell(vec!["Number", "Reading"]),
            cell(vec!["A", "B", ""]),
            cell(vec!["p1", "p2", "p3", ""]),
            codes(),
            codes(),
        )
            .prop_map(
                |(stage, area, focus_area, content_group, content_point, code1, code2)| {
                    CurriculumRecord {
                        stage,
                        area,
                        focus_area,
                        content_group,
                        content_point,
                        outcome_code_1: code1,
                        outcome_code_2: code2,
                    }
                },
            )
    }

    fn arb_records_and_shuffle()
    -> impl Strategy<Value = (Vec<CurriculumRecord>, Vec<CurriculumRecord>)> {
        prop::collection::vec(arb_record(), 0..48)
            .prop_flat_map(|records| (Just(records.clone()), Just(records).prop_shuffle()))
    }

    /// Leaf path → outcome codes, computed directly from the records.
    fn expected_leaves(
        records: &[CurriculumRecord],
        config: &BuildConfig,
    ) -> HashMap<LeafPath, BTreeSet<String>> {
        let mut leaves: HashMap<LeafPath, BTreeSet<String>> = HashMap::new();
        for record in records {
            let field = |f: RecordField| record.get(f).map(str::to_owned);
            let (Some(stage), Some(area), Some(focus), Some(point)) = (
                field(RecordField::Stage),
                field(RecordField::Area),
                field(RecordField::FocusArea),
                field(RecordField::ContentPoint),
            ) else {
                continue;
            };
            if !config.accepts_stage(&stage) {
                continue;
            }
            let group = field(RecordField::ContentGroup).unwrap_or_default();
            let path = (stage, area, focus, group, point);
            leaves
                .entry(path)
                .or_default()
                .extend(record.outcome_codes().map(str::to_owned));
        }
        leaves
    }

    fn actual_leaves(structure: &FinalizedStructure) -> HashMap<LeafPath, Vec<String>> {
        let mut leaves = HashMap::new();
        for (stage, areas) in structure.stages() {
            for (area, focus_areas) in areas {
                for (focus, content) in focus_areas {
                    let FinalizedFocusArea::Grouped(groups) = content else {
                        panic!("grouped build produced a point list");
                    };
                    for (group, points) in groups {
                        for (point, codes) in points {
                            let path = (
                                stage.clone(),
                                area.clone(),
                                focus.clone(),
                                group.clone(),
                                point.clone(),
                            );
                            leaves.insert(path, codes.clone());
                        }
                    }
                }
            }
        }
        leaves
    }

    proptest! {
        #[test]
        fn proptest_shuffled_input_builds_identical_structure(
            (records, shuffled) in arb_records_and_shuffle()
        ) {
            let config = BuildConfig::default();
            let original = build(records, &config);
            let reordered = build(shuffled, &config);
            prop_assert_eq!(&original, &reordered);
            prop_assert_eq!(
                serde_json::to_string(&original).unwrap(),
                serde_json::to_string(&reordered).unwrap()
            );
        }

        #[test]
        fn proptest_leaves_match_distinct_input_paths(
            records in prop::collection::vec(arb_record(), 0..48)
        ) {
            let config = BuildConfig::default();
            let expected = expected_leaves(&records, &config);
            let structure = build(records, &config);
            let actual = actual_leaves(&structure);

            prop_assert_eq!(structure.leaf_count(), expected.len());
            prop_assert_eq!(actual.len(), expected.len());
            for (path, codes) in &actual {
                // Strictly increasing means sorted and free of duplicates.
                prop_assert!(codes.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(codes.iter().all(|c| !c.trim().is_empty()));
                let want: Vec<String> = expected[path].iter().cloned().collect();
                prop_assert_eq!(codes, &want);
            }
            prop_assert!(!structure.stages().contains_key("Unknown Stage"));
        }
    }
}
