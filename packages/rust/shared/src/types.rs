//! Core domain types for curriculum outcome tables.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BuildId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying a single structure build (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub Uuid);

impl BuildId {
    /// Generate a new time-sortable build identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BuildId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RecordField
// ---------------------------------------------------------------------------

/// Canonical field names of a curriculum record, broadest level first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordField {
    Stage,
    Area,
    FocusArea,
    ContentGroup,
    ContentPoint,
    OutcomeCode1,
    OutcomeCode2,
}

impl RecordField {
    /// Every field, in table order.
    pub const ALL: [RecordField; 7] = [
        RecordField::Stage,
        RecordField::Area,
        RecordField::FocusArea,
        RecordField::ContentGroup,
        RecordField::ContentPoint,
        RecordField::OutcomeCode1,
        RecordField::OutcomeCode2,
    ];

    /// Normalized field name as used in serialized records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "Stage",
            Self::Area => "Area",
            Self::FocusArea => "FocusArea",
            Self::ContentGroup => "ContentGroup",
            Self::ContentPoint => "ContentPoint",
            Self::OutcomeCode1 => "OutcomeCode1",
            Self::OutcomeCode2 => "OutcomeCode2",
        }
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CurriculumRecord
// ---------------------------------------------------------------------------

/// One flat row of the outcomes table, with headers already mapped to fields.
///
/// `None` means the source had no column for the field; `Some("")` means the
/// column exists but the cell is empty. The builder treats the two differently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurriculumRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_point: Option<String>,
    #[serde(default, rename = "OutcomeCode1", skip_serializing_if = "Option::is_none")]
    pub outcome_code_1: Option<String>,
    #[serde(default, rename = "OutcomeCode2", skip_serializing_if = "Option::is_none")]
    pub outcome_code_2: Option<String>,
}

impl CurriculumRecord {
    /// Read a field by name.
    pub fn get(&self, field: RecordField) -> Option<&str> {
        match field {
            RecordField::Stage => self.stage.as_deref(),
            RecordField::Area => self.area.as_deref(),
            RecordField::FocusArea => self.focus_area.as_deref(),
            RecordField::ContentGroup => self.content_group.as_deref(),
            RecordField::ContentPoint => self.content_point.as_deref(),
            RecordField::OutcomeCode1 => self.outcome_code_1.as_deref(),
            RecordField::OutcomeCode2 => self.outcome_code_2.as_deref(),
        }
    }

    /// Set a field by name.
    pub fn set(&mut self, field: RecordField, value: impl Into<String>) {
        let slot = match field {
            RecordField::Stage => &mut self.stage,
            RecordField::Area => &mut self.area,
            RecordField::FocusArea => &mut self.focus_area,
            RecordField::ContentGroup => &mut self.content_group,
            RecordField::ContentPoint => &mut self.content_point,
            RecordField::OutcomeCode1 => &mut self.outcome_code_1,
            RecordField::OutcomeCode2 => &mut self.outcome_code_2,
        };
        *slot = Some(value.into());
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, field: RecordField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Outcome codes carried by this row, trimmed, with blanks removed.
    pub fn outcome_codes(&self) -> impl Iterator<Item = &str> {
        [self.outcome_code_1.as_deref(), self.outcome_code_2.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

// ---------------------------------------------------------------------------
// SchemaVariant
// ---------------------------------------------------------------------------

/// Shape of the hierarchy produced from the outcomes table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Stage → Area → FocusArea → ContentGroup → ContentPoint → outcome codes.
    #[default]
    Grouped,
    /// Stage → Area → FocusArea → ContentPoint list (older table layout).
    Legacy,
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grouped => f.write_str("grouped"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = crate::CurriculumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grouped" => Ok(Self::Grouped),
            "legacy" => Ok(Self::Legacy),
            other => Err(crate::CurriculumError::validation(format!(
                "unknown schema variant '{other}': expected 'grouped' or 'legacy'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// LookupLevel
// ---------------------------------------------------------------------------

/// Where a lookup failed, reported by `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupLevel {
    Stage,
    Area,
    FocusArea,
    ContentGroup,
    ContentPoint,
    Document,
}

impl std::fmt::Display for LookupLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Stage => "stage",
            Self::Area => "area",
            Self::FocusArea => "focus area",
            Self::ContentGroup => "content group",
            Self::ContentPoint => "content point",
            Self::Document => "document",
        };
        f.write_str(name)
    }
}
