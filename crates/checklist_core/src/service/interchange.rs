//! JSON import/export of checklist collections.
//!
//! # Responsibility
//! - Parse and shape-check an import payload before any store mutation.
//! - Render export payloads and their dated file names.
//!
//! # Invariants
//! - Import payloads are a bare top-level array; anything else is rejected.
//! - One malformed record rejects the whole payload.
//! - Incoming identifiers are never trusted; the store remaps them.
//! - Only the nested `sections` schema (legacy name `checklists`) is accepted.
//! - Names are trimmed and blank sections/items dropped, as on the form path;
//!   a record left without a named item is malformed.

use crate::model::checklist::{normalize_optional, Checklist};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

const EXPORT_FILE_PREFIX: &str = "aerosim-checklists";

/// Import rejection reasons. Any of these leaves the store untouched.
#[derive(Debug)]
pub enum ImportError {
    InvalidJson(serde_json::Error),
    NotAnArray,
    MalformedRecord { index: usize, reason: String },
    /// Record uses the flat `steps` layout, which has no section structure.
    LegacyStepsSchema { index: usize },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "import file is not valid JSON: {err}"),
            Self::NotAnArray => write!(f, "import file must contain a top-level array"),
            Self::MalformedRecord { index, reason } => {
                write!(f, "import record #{index} is malformed: {reason}")
            }
            Self::LegacyStepsSchema { index } => write!(
                f,
                "import record #{index} uses the unsupported flat `steps` layout"
            ),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            _ => None,
        }
    }
}

/// Checklist record as read from an import file, before id remapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportedChecklist {
    pub title: String,
    #[serde(default)]
    pub aircraft: Option<String>,
    #[serde(alias = "checklists")]
    pub sections: Vec<ImportedSection>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportedSection {
    pub name: String,
    pub items: Vec<ImportedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportedItem {
    pub name: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Parses raw import text.
pub fn parse_import(text: &str) -> Result<Vec<ImportedChecklist>, ImportError> {
    let payload: Value = serde_json::from_str(text).map_err(ImportError::InvalidJson)?;
    parse_import_value(&payload)
}

/// Shape-checks an already decoded payload and extracts its records.
pub fn parse_import_value(payload: &Value) -> Result<Vec<ImportedChecklist>, ImportError> {
    let records = payload.as_array().ok_or(ImportError::NotAnArray)?;
    records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_record(index, record))
        .collect()
}

fn parse_record(index: usize, record: &Value) -> Result<ImportedChecklist, ImportError> {
    let object = record.as_object().ok_or_else(|| ImportError::MalformedRecord {
        index,
        reason: "record is not an object".to_string(),
    })?;
    if object.contains_key("steps")
        && !object.contains_key("sections")
        && !object.contains_key("checklists")
    {
        return Err(ImportError::LegacyStepsSchema { index });
    }

    let mut imported: ImportedChecklist =
        serde_json::from_value(record.clone()).map_err(|err| ImportError::MalformedRecord {
            index,
            reason: err.to_string(),
        })?;

    imported.title = imported.title.trim().to_string();
    if imported.title.is_empty() {
        return Err(malformed(index, "title is blank"));
    }
    if imported.sections.is_empty() {
        return Err(malformed(index, "no sections"));
    }

    imported.aircraft = normalize_optional(imported.aircraft.take());
    imported.sections = imported
        .sections
        .into_iter()
        .filter_map(normalize_section)
        .collect();
    if imported.sections.is_empty() {
        return Err(malformed(index, "no named section with a named item"));
    }
    Ok(imported)
}

/// Trims names like form validation does; blank entries are dropped.
fn normalize_section(mut section: ImportedSection) -> Option<ImportedSection> {
    section.name = section.name.trim().to_string();
    if section.name.is_empty() {
        return None;
    }
    section.items = section
        .items
        .into_iter()
        .filter_map(|mut item| {
            item.name = item.name.trim().to_string();
            if item.name.is_empty() {
                return None;
            }
            item.action = normalize_optional(item.action.take());
            item.comment = normalize_optional(item.comment.take());
            Some(item)
        })
        .collect();
    (!section.items.is_empty()).then_some(section)
}

fn malformed(index: usize, reason: &str) -> ImportError {
    ImportError::MalformedRecord {
        index,
        reason: reason.to_string(),
    }
}

/// Renders the collection as pretty JSON with declaration-ordered fields.
pub fn render_export(checklists: &[Checklist]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(checklists)
}

/// Returns the export file name for `date`, e.g. `aerosim-checklists-2024-05-01.json`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("{EXPORT_FILE_PREFIX}-{}.json", date.format("%Y-%m-%d"))
}
