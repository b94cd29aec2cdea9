//! Read-only projections of the checklist collection.
//!
//! # Invariants
//! - Projections never mutate the collection.
//! - Output order is store order.
//! - Unclassified checklists only appear under the empty filter.

use crate::model::checklist::Checklist;
use std::collections::BTreeSet;

/// One checklist with its aggregated completion counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistProgress<'a> {
    pub checklist: &'a Checklist,
    pub completed_count: usize,
    pub total_count: usize,
}

impl<'a> ChecklistProgress<'a> {
    pub fn of(checklist: &'a Checklist) -> Self {
        let (completed_count, total_count) = checklist.progress_counts();
        Self {
            checklist,
            completed_count,
            total_count,
        }
    }

    /// Rounded completion percentage; `0` for a checklist without items.
    pub fn percent(&self) -> u32 {
        if self.total_count == 0 {
            return 0;
        }
        let ratio = self.completed_count as f64 / self.total_count as f64;
        (ratio * 100.0).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.total_count > 0 && self.completed_count == self.total_count
    }
}

/// Lists checklists whose aircraft equals `filter` exactly.
///
/// An empty `filter` returns every checklist.
pub fn list_by_aircraft<'a>(checklists: &'a [Checklist], filter: &str) -> Vec<ChecklistProgress<'a>> {
    checklists
        .iter()
        .filter(|checklist| filter.is_empty() || checklist.is_for_aircraft(filter))
        .map(ChecklistProgress::of)
        .collect()
}

/// Returns the non-empty aircraft labels present in `checklists`.
pub fn distinct_aircraft(checklists: &[Checklist]) -> BTreeSet<String> {
    checklists
        .iter()
        .filter_map(|checklist| checklist.aircraft.as_deref())
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
