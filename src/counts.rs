//! Floating-point count tables.
//!
//! These tables are where training statistics accumulate, and the only form
//! in which statistics are persisted:
//!
//! ```text
//! CountsTable<K>    K -> f64            (name key count)
//! BiCountsTable<K>  K -> [f64; 2]       (name key count0 count1)
//! CountsTrio        transitions + (history count, diversity) for one model level
//! ```
//!
//! Missing keys read as `0.0`. Adds accumulate and never overwrite. Pruning
//! removes every entry under a threshold in place. Merging per-worker tables
//! with `add_all` is associative and commutative, so tables built in parallel
//! can be combined in any order.
//!
//! Persisted entries are one per line in hash order; readers accept them in
//! any order and fail on the first malformed line.

#[path = "counts/bi_table.rs"]
mod bi_table;
#[path = "counts/io.rs"]
mod io;
#[path = "counts/table.rs"]
mod table;

pub use bi_table::BiCountsTable;
pub use table::CountsTable;

pub(crate) use io::{for_each_entry, split_entry};

use crate::event::EventKey;
use crate::transition::Transition;
use std::sync::Arc;

/// Counts for one back-off level of one model: transitions, and per history
/// its total count and the number of distinct futures seen with it.
///
/// Histories are keyed by the same shared instance the transitions hold.
#[derive(Debug, Default, Clone)]
pub struct CountsTrio {
    pub trans: CountsTable<Transition>,
    pub hist_and_diversity: BiCountsTable<Arc<EventKey>>,
}

impl CountsTrio {
    /// Accumulator index of the history count.
    pub const HIST: usize = 0;
    /// Accumulator index of the diversity (distinct futures) count.
    pub const DIVERSITY: usize = 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn transition(&self) -> &CountsTable<Transition> {
        &self.trans
    }

    pub fn history(&self) -> &BiCountsTable<Arc<EventKey>> {
        &self.hist_and_diversity
    }
}
