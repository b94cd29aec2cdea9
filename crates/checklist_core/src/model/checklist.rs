//! Checklist domain records.
//!
//! # Responsibility
//! - Define the nested record persisted and exchanged by the core.
//! - Provide read/patch helpers that keep completion state consistent.
//!
//! # Invariants
//! - `completed` starts as `false` and only changes through an explicit
//!   toggle, reset, or merge carry-over.
//! - Section and item order is significant and preserved by serialization.
//! - Serialized field order follows declaration order.
//! - Decoding tolerates drifted field types: a mistyped field reads as its
//!   default and a list entry that is not a record is skipped.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Numeric identifier shared by checklists, sections, and items.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type Identifier = u64;

/// Single actionable line of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Identifier,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    /// Expected switch/control position, e.g. `ON`.
    #[serde(default, deserialize_with = "lenient")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub completed: bool,
}

impl Item {
    /// Creates an incomplete item.
    pub fn new(
        id: Identifier,
        name: impl Into<String>,
        action: Option<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            action: normalize_optional(action),
            comment: normalize_optional(comment),
            completed: false,
        }
    }

    /// Returns whether this item is the same logical line as `name`/`action`.
    ///
    /// Used by merge to carry completion state across edits.
    pub fn matches(&self, name: &str, action: Option<&str>) -> bool {
        self.name == name && self.action.as_deref() == action
    }
}

/// Named sub-checklist, e.g. `Preflight` or `Before Start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Identifier,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub items: Vec<Item>,
}

impl Section {
    /// Returns the first item matching `name`/`action`.
    pub fn find_item(&self, name: &str, action: Option<&str>) -> Option<&Item> {
        self.items.iter().find(|item| item.matches(name, action))
    }
}

/// Top-level checklist owned by the collection store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Identifier,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    /// Free-form aircraft label. `None` means unclassified.
    #[serde(default, deserialize_with = "lenient")]
    pub aircraft: Option<String>,
    /// Serialized as `sections`; `checklists` is the legacy name of the same
    /// nested list.
    #[serde(default, alias = "checklists", deserialize_with = "lenient_list")]
    pub sections: Vec<Section>,
    #[serde(rename = "createdAt", default, deserialize_with = "lenient")]
    pub created_at: DateTime<Utc>,
}

impl Checklist {
    /// Returns the first section whose name equals `name` exactly.
    pub fn find_section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Returns whether this checklist carries exactly the aircraft `label`.
    pub fn is_for_aircraft(&self, label: &str) -> bool {
        self.aircraft.as_deref() == Some(label)
    }

    /// Iterates all items across sections in display order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.sections.iter().flat_map(|section| section.items.iter())
    }

    /// Counts `(completed, total)` items across all sections.
    pub fn progress_counts(&self) -> (usize, usize) {
        self.items().fold((0, 0), |(done, total), item| {
            (done + usize::from(item.completed), total + 1)
        })
    }

    /// Flips the addressed item and returns its new state.
    ///
    /// Returns `None` when section or item does not resolve.
    pub fn toggle_item(&mut self, section_id: Identifier, item_id: Identifier) -> Option<bool> {
        let item = self
            .sections
            .iter_mut()
            .find(|section| section.id == section_id)?
            .items
            .iter_mut()
            .find(|item| item.id == item_id)?;
        item.completed = !item.completed;
        Some(item.completed)
    }

    /// Clears `completed` on every item.
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            for item in &mut section.items {
                item.completed = false;
            }
        }
    }

    /// Collects every identifier carried by this checklist, itself included.
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut ids = vec![self.id];
        for section in &self.sections {
            ids.push(section.id);
            ids.extend(section.items.iter().map(|item| item.id));
        }
        ids
    }

    /// Rewrites blank optional text to `None` throughout the checklist.
    pub fn normalize(&mut self) {
        self.aircraft = normalize_optional(self.aircraft.take());
        for section in &mut self.sections {
            for item in &mut section.items {
                item.action = normalize_optional(item.action.take());
                item.comment = normalize_optional(item.comment.take());
            }
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// Trims optional text and maps blank values to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(raw)
        } else {
            Some(trimmed.to_string())
        }
    })
}
