//! Read-only lookups over a [`FinalizedStructure`].
//!
//! The structure is never mutated after finalization, so a [`CurriculumQuery`]
//! can be cloned freely and shared across threads without locking.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use curriculum_shared::{CurriculumError, LookupLevel, Result};

use crate::finalize::{
    FinalizedArea, FinalizedFocusArea, FinalizedGroup, FinalizedStage, FinalizedStructure,
};

/// Point-lookup facade over a finalized structure.
#[derive(Debug, Clone)]
pub struct CurriculumQuery {
    structure: Arc<FinalizedStructure>,
}

impl CurriculumQuery {
    pub fn new(structure: impl Into<Arc<FinalizedStructure>>) -> Self {
        Self {
            structure: structure.into(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.structure.leaf_count()
    }

    /// All stages, sorted.
    pub fn list_stages(&self) -> Vec<String> {
        self.structure.stages().keys().cloned().collect()
    }

    /// Areas under `stage`, sorted.
    pub fn list_areas(&self, stage: &str) -> Result<Vec<String>> {
        Ok(self.stage(stage)?.keys().cloned().collect())
    }

    /// Focus areas under `stage`/`area`, sorted.
    pub fn list_focus_areas(&self, stage: &str, area: &str) -> Result<Vec<String>> {
        Ok(self.area(stage, area)?.keys().cloned().collect())
    }

    /// Content groups under a focus area, sorted. Legacy structures have none.
    pub fn list_content_groups(
        &self,
        stage: &str,
        area: &str,
        focus_area: &str,
    ) -> Result<Vec<String>> {
        match self.focus_area(stage, area, focus_area)? {
            FinalizedFocusArea::Grouped(groups) => Ok(groups.keys().cloned().collect()),
            FinalizedFocusArea::Points(_) => Ok(Vec::new()),
        }
    }

    /// Content points under a focus area, sorted.
    ///
    /// With `content_group`, only that group's points are listed. Without it,
    /// a grouped focus area yields the union of points across its groups.
    pub fn list_content_points(
        &self,
        stage: &str,
        area: &str,
        focus_area: &str,
        content_group: Option<&str>,
    ) -> Result<Vec<String>> {
        let focus = self.focus_area(stage, area, focus_area)?;
        match (focus, content_group) {
            (FinalizedFocusArea::Grouped(groups), Some(group)) => {
                Ok(group_of(groups, group)?.keys().cloned().collect())
            }
            (FinalizedFocusArea::Grouped(groups), None) => {
                let points: BTreeSet<&String> = groups.values().flat_map(|g| g.keys()).collect();
                Ok(points.into_iter().cloned().collect())
            }
            (FinalizedFocusArea::Points(points), None) => Ok(points.clone()),
            (FinalizedFocusArea::Points(_), Some(group)) => {
                Err(CurriculumError::not_found(LookupLevel::ContentGroup, group))
            }
        }
    }

    /// Outcome codes of one content point, sorted. Empty if none are attached.
    pub fn list_outcomes(
        &self,
        stage: &str,
        area: &str,
        focus_area: &str,
        content_group: &str,
        content_point: &str,
    ) -> Result<Vec<String>> {
        match self.focus_area(stage, area, focus_area)? {
            FinalizedFocusArea::Grouped(groups) => group_of(groups, content_group)?
                .get(content_point)
                .cloned()
                .ok_or_else(|| {
                    CurriculumError::not_found(LookupLevel::ContentPoint, content_point)
                }),
            FinalizedFocusArea::Points(_) => {
                Err(CurriculumError::not_found(LookupLevel::ContentGroup, content_group))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Path resolution
    // -----------------------------------------------------------------------

    fn stage(&self, stage: &str) -> Result<&FinalizedStage> {
        self.structure
            .stages()
            .get(stage)
            .ok_or_else(|| CurriculumError::not_found(LookupLevel::Stage, stage))
    }

    fn area(&self, stage: &str, area: &str) -> Result<&FinalizedArea> {
        self.stage(stage)?
            .get(area)
            .ok_or_else(|| CurriculumError::not_found(LookupLevel::Area, area))
    }

    fn focus_area(
        &self,
        stage: &str,
        area: &str,
        focus_area: &str,
    ) -> Result<&FinalizedFocusArea> {
        self.area(stage, area)?
            .get(focus_area)
            .ok_or_else(|| CurriculumError::not_found(LookupLevel::FocusArea, focus_area))
    }
}

fn group_of<'s>(
    groups: &'s BTreeMap<String, FinalizedGroup>,
    group: &str,
) -> Result<&'s FinalizedGroup> {
    groups
        .get(group)
        .ok_or_else(|| CurriculumError::not_found(LookupLevel::ContentGroup, group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finalize::finalize;
    use crate::hierarchy::build_hierarchy;
    use curriculum_shared::{BuildConfig, CurriculumRecord, RecordField, SchemaVariant};

    fn record(row: [&str; 7]) -> CurriculumRecord {
        RecordField::ALL
            .into_iter()
            .zip(row)
            .fold(CurriculumRecord::default(), |rec, (field, value)| rec.with(field, value))
    }

    fn query_over(rows: &[[&str; 7]], schema: SchemaVariant) -> CurriculumQuery {
        let config = BuildConfig {
            schema,
            ..BuildConfig::default()
        };
        let records = rows.iter().map(|row| Ok(record(*row)));
        let (node, _) = build_hierarchy(records, &config).expect("build");
        CurriculumQuery::new(finalize(node))
    }

    const ROWS: &[[&str; 7]] = &[
        ["Stage 1", "Math", "Number", "Addition", "Add to 10", "MA1-1", ""],
        ["Stage 1", "Math", "Number", "Addition", "Add to 10", "MA1-2", "MA1-1"],
        ["Stage 1", "Math", "Number", "Subtraction", "Take away", "MA1-3", ""],
        ["Stage 1", "Math", "Number", "Subtraction", "Add to 10", "", ""],
        ["Stage 1", "Math", "Measurement", "Length", "Compare lengths", "MA1-9", ""],
        ["Stage 1", "English", "Reading", "Phonics", "Blend sounds", "EN1-4", ""],
        ["Early Stage 1", "Math", "Number", "Counting", "Count to 20", "MAe-1", ""],
    ];

    fn grouped() -> CurriculumQuery {
        query_over(ROWS, SchemaVariant::Grouped)
    }

    #[test]
    fn lists_stages_and_areas_sorted() {
        let q = grouped();
        assert_eq!(q.list_stages(), vec!["Early Stage 1", "Stage 1"]);
        assert_eq!(q.list_areas("Stage 1").unwrap(), vec!["English", "Math"]);
        assert_eq!(
            q.list_focus_areas("Stage 1", "Math").unwrap(),
            vec!["Measurement", "Number"]
        );
        assert_eq!(
            q.list_content_groups("Stage 1", "Math", "Number").unwrap(),
            vec!["Addition", "Subtraction"]
        );
    }

    #[test]
    fn missing_stage_is_not_found() {
        let err = grouped().list_areas("Stage 3").unwrap_err();
        assert!(matches!(
            err,
            CurriculumError::NotFound { level: LookupLevel::Stage, ref key } if key == "Stage 3"
        ));
    }

    #[test]
    fn content_points_by_group_and_union() {
        let q = grouped();
        assert_eq!(
            q.list_content_points("Stage 1", "Math", "Number", Some("Subtraction"))
                .unwrap(),
            vec!["Add to 10", "Take away"]
        );
        assert_eq!(
            q.list_content_points("Stage 1", "Math", "Number", None).unwrap(),
            vec!["Add to 10", "Take away"]
        );
    }

    #[test]
    fn content_points_report_the_missing_level() {
        let q = grouped();
        let err = q
            .list_content_points("Stage 1", "Science", "Number", None)
            .unwrap_err();
        assert!(matches!(err, CurriculumError::NotFound { level: LookupLevel::Area, .. }));

        let err = q
            .list_content_points("Stage 1", "Math", "Algebra", None)
            .unwrap_err();
        assert!(matches!(err, CurriculumError::NotFound { level: LookupLevel::FocusArea, .. }));

        let err = q
            .list_content_points("Stage 1", "Math", "Number", Some("Division"))
            .unwrap_err();
        assert!(matches!(err, CurriculumError::NotFound { level: LookupLevel::ContentGroup, .. }));
    }

    #[test]
    fn outcomes_are_deduplicated_and_sorted() {
        let q = grouped();
        assert_eq!(
            q.list_outcomes("Stage 1", "Math", "Number", "Addition", "Add to 10")
                .unwrap(),
            vec!["MA1-1", "MA1-2"]
        );
    }

    #[test]
    fn outcomes_empty_when_point_has_none() {
        let q = grouped();
        assert!(
            q.list_outcomes("Stage 1", "Math", "Number", "Subtraction", "Add to 10")
                .unwrap()
                .is_empty()
        );
        let err = q
            .list_outcomes("Stage 1", "Math", "Number", "Subtraction", "Divide")
            .unwrap_err();
        assert!(matches!(err, CurriculumError::NotFound { level: LookupLevel::ContentPoint, .. }));
    }

    #[test]
    fn legacy_structure_has_no_groups() {
        let q = query_over(ROWS, SchemaVariant::Legacy);
        assert!(q.list_content_groups("Stage 1", "Math", "Number").unwrap().is_empty());
        assert_eq!(
            q.list_content_points("Stage 1", "Math", "Number", None).unwrap(),
            vec!["Add to 10", "Take away"]
        );
        assert!(
            q.list_content_points("Stage 1", "Math", "Number", Some("Addition"))
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            q.list_outcomes("Stage 1", "Math", "Number", "Addition", "Add to 10")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn empty_structure_has_no_stages() {
        let q = CurriculumQuery::new(FinalizedStructure::default());
        assert!(q.list_stages().is_empty());
        assert_eq!(q.leaf_count(), 0);
        assert!(q.list_areas("Stage 1").unwrap_err().is_not_found());
    }

    #[test]
    fn concurrent_readers_share_one_structure() {
        let q = grouped();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let q = q.clone();
                std::thread::spawn(move || {
                    q.list_outcomes("Stage 1", "Math", "Number", "Addition", "Add to 10")
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec!["MA1-1", "MA1-2"]);
        }
    }
}
