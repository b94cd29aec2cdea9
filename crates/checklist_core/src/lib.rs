//! Core domain logic for checklist management.
//! This crate owns the checklist collection, its merge rules, and persistence.

pub mod config;
pub mod db;
pub mod ids;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigOverrides, CoreConfig};
pub use ids::{BatchSeed, IdAllocator, IdScope};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::checklist::{Checklist, Identifier, Item, Section};
pub use model::form::{
    SubmittedForm, SubmittedItem, SubmittedSection, ValidatedForm, ValidationError,
};
pub use repo::collection_repo::{
    CollectionRepository, LoadedCollection, RepoError, RepoResult, SqliteCollectionRepository,
};
pub use service::checklist_store::{ChecklistStore, StoreError, StoreResult};
pub use service::interchange::{export_file_name, ImportError};
pub use service::merge::merge;
pub use service::query::ChecklistProgress;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
