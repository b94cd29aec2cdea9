//! Checklist domain model.
//!
//! # Responsibility
//! - Define the canonical checklist → section → item structure.
//! - Define the validated submission shape consumed by the merge engine.
//!
//! # Invariants
//! - Every checklist, section, and item is identified by an `Identifier`.
//! - Blank optional text is represented as `None`, never as `Some("")`.

pub mod checklist;
pub mod form;
