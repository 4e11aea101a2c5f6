//! CSV-backed record source.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use curriculum_shared::{ColumnAliases, CurriculumError, CurriculumRecord, RecordField, Result};

use crate::RecordSource;

/// Reads an outcomes table from a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
    name: String,
    columns: ColumnAliases,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnAliases) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            name,
            columns,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn read_records(&self) -> Result<Vec<CurriculumRecord>> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            CurriculumError::source_read(format!("cannot open {}: {e}", self.path.display()))
        })?;
        let records = read_csv(file, &self.columns)?;
        debug!(rows = records.len(), "CSV file read");
        Ok(records)
    }
}

/// Parse CSV from any reader, mapping headers through `columns`.
///
/// Cells are trimmed. Rows shorter than the header leave the trailing fields
/// unset instead of failing the read.
pub fn read_csv<R: Read>(reader: R, columns: &ColumnAliases) -> Result<Vec<CurriculumRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| CurriculumError::source_read(format!("cannot read header row: {e}")))?
        .clone();

    let mapping = map_headers(headers.iter(), columns);

    let mut records = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        // +2: one for the header row, one for 1-based numbering.
        let row = row
            .map_err(|e| CurriculumError::source_read(format!("row {}: {e}", idx + 2)))?;

        let mut record = CurriculumRecord::default();
        for (value, field) in row.iter().zip(mapping.iter()) {
            if let Some(field) = field {
                record.set(*field, value);
            }
        }
        records.push(record);
    }

    Ok(records)
}

/// Resolve each header position to a field. Later duplicates of a field are ignored.
fn map_headers<'a>(
    headers: impl Iterator<Item = &'a str>,
    columns: &ColumnAliases,
) -> Vec<Option<RecordField>> {
    let mut seen = HashSet::new();
    let mapping: Vec<Option<RecordField>> = headers
        .map(|header| {
            let Some(field) = columns.resolve(header) else {
                debug!(header, "unmapped column");
                return None;
            };
            if !seen.insert(field) {
                warn!(header, %field, "duplicate column for field, ignoring");
                return None;
            }
            Some(field)
        })
        .collect();

    for field in RecordField::ALL {
        if !seen.contains(&field) {
            debug!(%field, "no column for field");
        }
    }

    mapping
}
