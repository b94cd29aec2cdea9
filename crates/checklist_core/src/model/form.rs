//! Submitted checklist definitions.
//!
//! # Responsibility
//! - Define the plain-data shape the presentation layer submits on save.
//! - Validate and normalize it into `ValidatedForm` before merge.
//!
//! # Invariants
//! - A `ValidatedForm` has a non-blank title and at least one section, and
//!   every section has a non-blank name and at least one item.
//! - All text is trimmed; blank optional text is `None`.

use crate::model::checklist::normalize_optional;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw checklist definition collected from user input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedForm {
    pub title: String,
    #[serde(default)]
    pub aircraft: Option<String>,
    #[serde(default)]
    pub sections: Vec<SubmittedSection>,
}

/// Raw section entry; blank names drop the whole section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedSection {
    pub name: String,
    #[serde(default)]
    pub items: Vec<SubmittedItem>,
}

/// Raw item entry; blank names drop the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedItem {
    pub name: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl SubmittedItem {
    pub fn new(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: Some(action.into()),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl SubmittedSection {
    pub fn new(name: impl Into<String>, items: Vec<SubmittedItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }
}

impl SubmittedForm {
    pub fn new(title: impl Into<String>, aircraft: Option<&str>) -> Self {
        Self {
            title: title.into(),
            aircraft: aircraft.map(str::to_string),
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, section: SubmittedSection) -> Self {
        self.sections.push(section);
        self
    }

    /// Trims input, drops blank sections/items, and enforces save rules.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank.
    /// - `NoSections` when no section has a non-blank name.
    /// - `NoItems` when named sections exist but none keeps an item.
    pub fn validate(&self) -> Result<ValidatedForm, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let mut named_sections = 0usize;
        let mut sections = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let name = section.name.trim();
            if name.is_empty() {
                continue;
            }
            named_sections += 1;

            let items: Vec<ValidatedItem> = section
                .items
                .iter()
                .filter_map(|item| {
                    let item_name = item.name.trim();
                    if item_name.is_empty() {
                        return None;
                    }
                    Some(ValidatedItem {
                        name: item_name.to_string(),
                        action: normalize_optional(item.action.clone()),
                        comment: normalize_optional(item.comment.clone()),
                    })
                })
                .collect();

            if !items.is_empty() {
                sections.push(ValidatedSection {
                    name: name.to_string(),
                    items,
                });
            }
        }

        if named_sections == 0 {
            return Err(ValidationError::NoSections);
        }
        if sections.is_empty() {
            return Err(ValidationError::NoItems);
        }

        Ok(ValidatedForm {
            title: title.to_string(),
            aircraft: normalize_optional(self.aircraft.clone()),
            sections,
        })
    }
}

/// Normalized definition accepted by the merge engine.
///
/// Only constructible through `SubmittedForm::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    title: String,
    aircraft: Option<String>,
    sections: Vec<ValidatedSection>,
}

impl ValidatedForm {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn aircraft(&self) -> Option<&str> {
        self.aircraft.as_deref()
    }

    pub fn sections(&self) -> &[ValidatedSection] {
        &self.sections
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSection {
    pub name: String,
    pub items: Vec<ValidatedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    pub name: String,
    pub action: Option<String>,
    pub comment: Option<String>,
}

/// Save-time rejection reasons surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
    NoSections,
    NoItems,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "checklist title must not be blank"),
            Self::NoSections => write!(f, "checklist needs at least one named section"),
            Self::NoItems => write!(f, "checklist sections need at least one named item"),
        }
    }
}

impl Error for ValidationError {}
