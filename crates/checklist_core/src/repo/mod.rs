//! Repository layer over durable checklist storage.
//!
//! # Responsibility
//! - Define the persistence contract used by the collection store.
//! - Keep SQLite and JSON payload details out of the service layer.
//!
//! # Invariants
//! - The collection is written as one whole snapshot, never per checklist.
//! - The dark-mode preference lives under its own key.

pub mod collection_repo;
