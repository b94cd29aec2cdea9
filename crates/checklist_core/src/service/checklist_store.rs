//! Collection store: the single owner of the checklist collection.
//!
//! # Responsibility
//! - Funnel every mutation (create/update/delete/toggle/reset/import) through
//!   one explicit object.
//! - Write the full collection snapshot through to storage after each change.
//! - Keep identifiers unique across the whole collection.
//!
//! # Invariants
//! - Validation and import shape errors leave the collection untouched.
//! - Storage write failures do not roll back memory; they set the unsaved flag
//!   until the next successful write.
//! - Toggle/reset/delete on unknown ids are silent no-ops and do not write.

use crate::ids::{IdAllocator, IdScope};
use crate::model::checklist::{Checklist, Identifier, Item, Section};
use crate::model::form::{SubmittedForm, ValidationError};
use crate::repo::collection_repo::{CollectionRepository, LoadedCollection, RepoError};
use crate::service::interchange::{self, ImportError, ImportedChecklist};
use crate::service::merge::merge;
use crate::service::query::{self, ChecklistProgress};
use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by collection store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Submitted definition was rejected; nothing changed.
    Validation(ValidationError),
    /// Update target does not exist.
    NotFound(Identifier),
    /// Import payload was rejected; nothing changed.
    Import(ImportError),
    /// Stored collection could not be read at open time.
    StorageRead(RepoError),
    /// Mutation applied in memory but the durable write failed.
    StorageWrite(RepoError),
    Export(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "checklist not found: {id}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::StorageRead(err) => write!(f, "failed to load checklists: {err}"),
            Self::StorageWrite(err) => write!(f, "failed to save checklists: {err}"),
            Self::Export(err) => write!(f, "failed to export checklists: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Import(err) => Some(err),
            Self::StorageRead(err) | Self::StorageWrite(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ImportError> for StoreError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

/// In-memory checklist collection with write-through persistence.
pub struct ChecklistStore<R: CollectionRepository> {
    repo: R,
    checklists: Vec<Checklist>,
    allocator: IdAllocator,
    dark_mode: bool,
    unsaved: bool,
}

impl<R: CollectionRepository> ChecklistStore<R> {
    /// Loads the stored collection and preferences.
    ///
    /// Loading is lenient: an unparseable payload yields an empty collection,
    /// undecodable records are skipped, and missing or duplicated identifiers
    /// are re-issued and written back. Whenever something could not be read,
    /// the raw payload is copied aside before any later write replaces it.
    ///
    /// # Errors
    /// - `StorageRead` when the storage backend itself fails.
    pub fn open(repo: R) -> StoreResult<Self> {
        let loaded = match repo.load_collection() {
            Ok(loaded) => loaded,
            Err(RepoError::Serialization(err)) => {
                warn!(
                    "event=collection_load module=store status=error error_code=payload_unreadable error={err}"
                );
                preserve_unreadable(&repo);
                LoadedCollection::default()
            }
            Err(err) => return Err(StoreError::StorageRead(err)),
        };
        if loaded.skipped_records > 0 {
            warn!(
                "event=collection_load module=store status=partial skipped_records={}",
                loaded.skipped_records
            );
            preserve_unreadable(&repo);
        }
        let dark_mode = repo.load_dark_mode().unwrap_or_else(|err| {
            warn!("event=preference_load module=store status=error key=dark_mode error={err}");
            false
        });

        let mut store = Self {
            repo,
            checklists: loaded.checklists,
            allocator: IdAllocator::new(),
            dark_mode,
            unsaved: false,
        };
        let repaired = store.repair_loaded();
        info!(
            "event=collection_load module=store status=ok checklists={} repaired_ids={}",
            store.checklists.len(),
            repaired
        );
        if repaired > 0 {
            if let Err(err) = store.persist("load_repair") {
                warn!(
                    "event=collection_load module=store status=unsaved repaired_ids={repaired} error={err}"
                );
            }
        }
        Ok(store)
    }

    /// Validates `form` and appends it as a new checklist.
    pub fn create(&mut self, form: &SubmittedForm) -> StoreResult<Checklist> {
        let validated = form.validate().map_err(|err| {
            warn!("event=checklist_create module=store status=rejected reason={err:?}");
            err
        })?;

        let seed = self.allocator.begin_batch();
        let checklist = merge(None, &validated, &mut self.allocator, seed);
        self.checklists.push(checklist.clone());
        info!(
            "event=checklist_create module=store status=ok checklist_id={} sections={}",
            checklist.id,
            checklist.sections.len()
        );

        self.persist("create")?;
        Ok(checklist)
    }

    /// Replaces checklist `id` with `form`, carrying matching completion state.
    ///
    /// # Errors
    /// - `Validation` when `form` is rejected.
    /// - `NotFound` when no checklist has `id`.
    pub fn update(&mut self, id: Identifier, form: &SubmittedForm) -> StoreResult<Checklist> {
        let validated = form.validate().map_err(|err| {
            warn!(
                "event=checklist_update module=store status=rejected checklist_id={id} reason={err:?}"
            );
            err
        })?;
        let index = self
            .position(id)
            .ok_or(StoreError::NotFound(id))?;

        let seed = self.allocator.begin_batch();
        let merged = merge(
            Some(&self.checklists[index]),
            &validated,
            &mut self.allocator,
            seed,
        );
        let previous = std::mem::replace(&mut self.checklists[index], merged.clone());
        self.allocator.release(
            previous
                .identifiers()
                .into_iter()
                .filter(|old_id| *old_id != previous.id),
        );

        let (carried, total) = merged.progress_counts();
        info!(
            "event=checklist_update module=store status=ok checklist_id={id} items={total} carried_completed={carried}"
        );

        self.persist("update")?;
        Ok(merged)
    }

    /// Removes checklist `id`. Returns `false` (and writes nothing) if absent.
    pub fn delete(&mut self, id: Identifier) -> StoreResult<bool> {
        let Some(index) = self.position(id) else {
            info!("event=checklist_delete module=store status=noop checklist_id={id}");
            return Ok(false);
        };

        let removed = self.checklists.remove(index);
        self.allocator.release(removed.identifiers());
        info!("event=checklist_delete module=store status=ok checklist_id={id}");

        self.persist("delete")?;
        Ok(true)
    }

    /// Flips the completion flag of one item.
    ///
    /// Returns the item's new state, or `None` when any id does not resolve.
    pub fn toggle_item(
        &mut self,
        checklist_id: Identifier,
        section_id: Identifier,
        item_id: Identifier,
    ) -> StoreResult<Option<bool>> {
        let toggled = self
            .checklists
            .iter_mut()
            .find(|checklist| checklist.id == checklist_id)
            .and_then(|checklist| checklist.toggle_item(section_id, item_id));

        match toggled {
            Some(completed) => {
                self.persist("toggle_item")?;
                Ok(Some(completed))
            }
            None => {
                info!(
                    "event=item_toggle module=store status=noop checklist_id={checklist_id} section_id={section_id} item_id={item_id}"
                );
                Ok(None)
            }
        }
    }

    /// Clears every completion flag of checklist `id`.
    ///
    /// Returns `false` when the checklist does not exist.
    pub fn reset_checklist(&mut self, id: Identifier) -> StoreResult<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        self.checklists[index].reset();
        info!("event=checklist_reset module=store status=ok checklist_id={id}");
        self.persist("reset")?;
        Ok(true)
    }

    /// Appends every record of `payload` with freshly issued identifiers.
    ///
    /// The whole payload is shape-checked first; one malformed record rejects
    /// the batch. Storage is written once for the batch.
    ///
    /// Returns the identifiers of the appended checklists, in payload order.
    pub fn import_batch(&mut self, payload: &Value) -> StoreResult<Vec<Identifier>> {
        let records = interchange::parse_import_value(payload).map_err(|err| {
            warn!("event=collection_import module=store status=rejected error={err}");
            err
        })?;
        self.append_imported(records)
    }

    /// Parses `text` as an import file and appends its records.
    pub fn import_json(&mut self, text: &str) -> StoreResult<Vec<Identifier>> {
        let records = interchange::parse_import(text).map_err(|err| {
            warn!("event=collection_import module=store status=rejected error={err}");
            err
        })?;
        self.append_imported(records)
    }

    /// Returns a deep copy of the whole collection.
    pub fn export_all(&self) -> Vec<Checklist> {
        self.checklists.clone()
    }

    /// Renders the whole collection in the import/export file format.
    pub fn export_json(&self) -> StoreResult<String> {
        interchange::render_export(&self.checklists).map_err(StoreError::Export)
    }

    pub fn list_by_aircraft(&self, filter: &str) -> Vec<ChecklistProgress<'_>> {
        query::list_by_aircraft(&self.checklists, filter)
    }

    pub fn distinct_aircraft(&self) -> BTreeSet<String> {
        query::distinct_aircraft(&self.checklists)
    }

    pub fn get(&self, id: Identifier) -> Option<&Checklist> {
        self.checklists.iter().find(|checklist| checklist.id == id)
    }

    pub fn checklists(&self) -> &[Checklist] {
        &self.checklists
    }

    pub fn len(&self) -> usize {
        self.checklists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checklists.is_empty()
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Stores the dark-mode preference under its own key.
    pub fn set_dark_mode(&mut self, enabled: bool) -> StoreResult<()> {
        self.dark_mode = enabled;
        self.repo.save_dark_mode(enabled).map_err(|err| {
            error!("event=preference_persist module=store status=error key=dark_mode error={err}");
            StoreError::StorageWrite(err)
        })
    }

    /// Flips the dark-mode preference and returns the new value.
    pub fn toggle_dark_mode(&mut self) -> StoreResult<bool> {
        let enabled = !self.dark_mode;
        self.set_dark_mode(enabled)?;
        Ok(enabled)
    }

    /// Whether the last collection write failed and memory is ahead of storage.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Retries writing the current collection to storage.
    pub fn flush(&mut self) -> StoreResult<()> {
        self.persist("flush")
    }

    fn position(&self, id: Identifier) -> Option<usize> {
        self.checklists
            .iter()
            .position(|checklist| checklist.id == id)
    }

    fn append_imported(&mut self, records: Vec<ImportedChecklist>) -> StoreResult<Vec<Identifier>> {
        let seed = self.allocator.begin_batch();
        let imported_at = Utc::now();
        let mut ids = Vec::with_capacity(records.len());

        for (record_index, record) in records.into_iter().enumerate() {
            let record_seed = seed.for_record(record_index);
            let sections = record
                .sections
                .into_iter()
                .enumerate()
                .map(|(section_index, section)| {
                    let items = section
                        .items
                        .into_iter()
                        .enumerate()
                        .map(|(item_index, item)| {
                            let id = self.allocator.allocate(
                                IdScope::Item,
                                record_seed,
                                section_index,
                                item_index,
                            );
                            let mut remapped = Item::new(id, item.name, item.action, item.comment);
                            remapped.completed = item.completed;
                            remapped
                        })
                        .collect();
                    Section {
                        id: self.allocator.allocate(
                            IdScope::Section,
                            record_seed,
                            section_index,
                            0,
                        ),
                        name: section.name,
                        items,
                    }
                })
                .collect();

            let checklist = Checklist {
                id: self
                    .allocator
                    .allocate(IdScope::Checklist, record_seed, 0, 0),
                title: record.title,
                aircraft: record.aircraft,
                sections,
                created_at: record.created_at.unwrap_or(imported_at),
            };
            ids.push(checklist.id);
            self.checklists.push(checklist);
        }

        info!(
            "event=collection_import module=store status=ok imported={} total={}",
            ids.len(),
            self.checklists.len()
        );
        self.persist("import")?;
        Ok(ids)
    }

    /// Normalizes loaded records and re-issues missing/duplicate identifiers.
    ///
    /// Returns how many identifiers were re-issued.
    fn repair_loaded(&mut self) -> usize {
        for checklist in &mut self.checklists {
            checklist.normalize();
        }
        self.allocator.reserve(
            self.checklists
                .iter()
                .flat_map(Checklist::identifiers)
                .filter(|id| *id != 0),
        );

        let seed = self.allocator.begin_batch();
        let mut seen = HashSet::new();
        let mut repaired = 0usize;
        let allocator = &mut self.allocator;
        let mut claim = |id: &mut Identifier, scope: IdScope, section: usize, item: usize| {
            if *id == 0 || !seen.insert(*id) {
                *id = allocator.allocate(scope, seed, section, item);
                seen.insert(*id);
                repaired += 1;
            }
        };

        for checklist in &mut self.checklists {
            claim(&mut checklist.id, IdScope::Checklist, 0, 0);
            for (section_index, section) in checklist.sections.iter_mut().enumerate() {
                claim(&mut section.id, IdScope::Section, section_index, 0);
                for (item_index, item) in section.items.iter_mut().enumerate() {
                    claim(&mut item.id, IdScope::Item, section_index, item_index);
                }
            }
        }
        repaired
    }

    fn persist(&mut self, op: &str) -> StoreResult<()> {
        match self.repo.save_collection(&self.checklists) {
            Ok(()) => {
                self.unsaved = false;
                Ok(())
            }
            Err(err) => {
                self.unsaved = true;
                error!(
                    "event=collection_persist module=store status=error op={op} checklists={} error={err}",
                    self.checklists.len()
                );
                Err(StoreError::StorageWrite(err))
            }
        }
    }
}

fn preserve_unreadable<R: CollectionRepository>(repo: &R) {
    match repo.preserve_unreadable_collection() {
        Ok(()) => info!("event=collection_preserve module=store status=ok"),
        Err(err) => error!("event=collection_preserve module=store status=error error={err}"),
    }
}
