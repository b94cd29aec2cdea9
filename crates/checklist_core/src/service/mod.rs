//! Core use-case services.
//!
//! # Responsibility
//! - Own the checklist collection and every mutation applied to it.
//! - Keep presentation callers decoupled from storage and payload details.

pub mod checklist_store;
pub mod interchange;
pub mod merge;
pub mod query;
