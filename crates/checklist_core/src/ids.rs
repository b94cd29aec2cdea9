//! Identifier allocation for checklists, sections, and items.
//!
//! # Responsibility
//! - Derive identifiers from a batch timestamp, a per-scope stride, and a
//!   small random perturbation.
//! - Keep every issued identifier distinct from identifiers already in use.
//!
//! # Invariants
//! - Batch seeds are strictly increasing within one allocator.
//! - `allocate` never returns `0` nor an identifier present in the reserved set.
//! - This is a single-process disambiguator, not a distributed ID scheme.

use crate::model::checklist::Identifier;
use chrono::Utc;
use rand::Rng;
use std::collections::HashSet;

const RECORD_STRIDE: u64 = 10_000_000;
const SECTION_STRIDE: u64 = 100_000;
const ITEM_STRIDE: u64 = 1_000;
const JITTER_RANGE: u64 = 1_000;

/// Which level of the checklist tree an identifier is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScope {
    Checklist,
    Section,
    Item,
}

/// Base timestamp shared by every identifier of one save/import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BatchSeed(u64);

impl BatchSeed {
    /// Derives the seed for the `index`-th checklist record of an import batch.
    pub fn for_record(self, index: usize) -> Self {
        Self(self.0.wrapping_add(RECORD_STRIDE.wrapping_mul(index as u64)))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Batch-scoped identifier allocator with a reserved-id set.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last_seed: u64,
    reserved: HashSet<Identifier>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks identifiers as taken so later allocations avoid them.
    pub fn reserve(&mut self, ids: impl IntoIterator<Item = Identifier>) {
        self.reserved.extend(ids);
    }

    /// Returns identifiers to the pool after their owner was removed.
    pub fn release(&mut self, ids: impl IntoIterator<Item = Identifier>) {
        for id in ids {
            self.reserved.remove(&id);
        }
    }

    pub fn is_reserved(&self, id: Identifier) -> bool {
        self.reserved.contains(&id)
    }

    /// Starts a new batch, seeded from the wall clock in milliseconds.
    ///
    /// Two batches started within the same millisecond still get distinct,
    /// increasing seeds.
    pub fn begin_batch(&mut self) -> BatchSeed {
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let seed = now_ms.max(self.last_seed.saturating_add(1));
        self.last_seed = seed;
        BatchSeed(seed)
    }

    /// Issues one identifier for `scope` at the given tree position.
    ///
    /// `section_index` is ignored for checklist scope; `item_index` is only
    /// used for item scope.
    pub fn allocate(
        &mut self,
        scope: IdScope,
        seed: BatchSeed,
        section_index: usize,
        item_index: usize,
    ) -> Identifier {
        let jitter = rand::thread_rng().gen_range(0..JITTER_RANGE);
        let mut candidate = scope_offset(scope, section_index, item_index)
            .wrapping_add(seed.0)
            .wrapping_add(jitter);

        while candidate == 0 || self.reserved.contains(&candidate) {
            candidate = candidate.wrapping_add(1);
        }

        self.reserved.insert(candidate);
        candidate
    }
}

fn scope_offset(scope: IdScope, section_index: usize, item_index: usize) -> u64 {
    let section_base = SECTION_STRIDE.wrapping_mul(section_index as u64 + 1);
    match scope {
        IdScope::Checklist => 0,
        IdScope::Section => section_base,
        IdScope::Item => {
            section_base.wrapping_add(ITEM_STRIDE.wrapping_mul(item_index as u64 + 1))
        }
    }
}
