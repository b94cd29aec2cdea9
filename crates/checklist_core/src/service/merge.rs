//! Merge of submitted definitions against prior checklist state.
//!
//! # Responsibility
//! - Build a checklist from a validated definition with fresh identifiers.
//! - Carry `completed` flags from the prior version for matching items.
//!
//! # Invariants
//! - Sections match by exact name; the first prior section with that name wins.
//! - Items match by exact `(name, action)` inside the matched section only.
//! - Prior sections/items absent from the definition are dropped.
//! - The prior checklist `id` and `created_at` are preserved on update.

use crate::ids::{BatchSeed, IdAllocator, IdScope};
use crate::model::checklist::{Checklist, Item, Section};
use crate::model::form::ValidatedForm;
use chrono::Utc;

/// Produces the checklist that results from saving `form`.
///
/// With `previous = None` this is the create path: a new checklist id and
/// creation timestamp are issued. Otherwise the result keeps the previous
/// identity and inherits completion state where items still match.
pub fn merge(
    previous: Option<&Checklist>,
    form: &ValidatedForm,
    allocator: &mut IdAllocator,
    seed: BatchSeed,
) -> Checklist {
    let sections = form
        .sections()
        .iter()
        .enumerate()
        .map(|(section_index, section)| {
            let prior_section = previous.and_then(|old| old.find_section(&section.name));
            let items = section
                .items
                .iter()
                .enumerate()
                .map(|(item_index, item)| {
                    let id = allocator.allocate(IdScope::Item, seed, section_index, item_index);
                    let mut merged =
                        Item::new(id, item.name.clone(), item.action.clone(), item.comment.clone());
                    merged.completed = prior_section
                        .and_then(|old| old.find_item(&item.name, item.action.as_deref()))
                        .is_some_and(|old| old.completed);
                    merged
                })
                .collect();

            Section {
                id: allocator.allocate(IdScope::Section, seed, section_index, 0),
                name: section.name.clone(),
                items,
            }
        })
        .collect();

    let (id, created_at) = match previous {
        Some(old) => (old.id, old.created_at),
        None => (
            allocator.allocate(IdScope::Checklist, seed, 0, 0),
            Utc::now(),
        ),
    };

    Checklist {
        id,
        title: form.title().to_string(),
        aircraft: form.aircraft().map(str::to_string),
        sections,
        created_at,
    }
}
