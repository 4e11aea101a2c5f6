//! Record sources for curriculum outcome tables.
//!
//! A source turns some tabular input into an ordered list of
//! [`CurriculumRecord`]s with headers already mapped to canonical fields.
//! Failure to read the input is a [`CurriculumError::SourceRead`]; individual
//! odd rows are passed through for the builder's skip policy to judge.

mod csv_source;

pub use csv_source::{CsvRecordSource, read_csv};

use curriculum_shared::{CurriculumRecord, Result};

/// Producer of flat outcome records.
pub trait RecordSource: Send + Sync {
    /// Human-readable identifier used in logs.
    fn name(&self) -> &str;
    /// Read every record, in table order.
    fn read_records(&self) -> Result<Vec<CurriculumRecord>>;
}

/// In-memory source over records obtained elsewhere.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    name: String,
    records: Vec<CurriculumRecord>,
}

impl VecSource {
    pub fn new(name: impl Into<String>, records: Vec<CurriculumRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

impl RecordSource for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_records(&self) -> Result<Vec<CurriculumRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curriculum_shared::RecordField;

    #[test]
    fn vec_source_returns_records_in_order() {
        let records = vec![
            CurriculumRecord::default().with(RecordField::Stage, "Stage 1"),
            CurriculumRecord::default().with(RecordField::Stage, "Stage 2"),
        ];
        let source = VecSource::new("memory", records.clone());
        assert_eq!(source.name(), "memory");
        assert_eq!(source.read_records().unwrap(), records);
    }
}
