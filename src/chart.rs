//! CKY chart with tiered beam pruning and pooled items.
//!
//! The chart is a triangular table of cells indexed by `(start, end)`, both
//! inclusive. Cells are filled bottom-up by the decoder; the chart itself
//! only stores, ranks, prunes and recycles items:
//!
//! ```text
//!            end →
//!          0     1     2     3
//! start 0 [NN ] [NPB] [ . ] [S  ]      diagonal: preterminals + unaries
//!       1       [VBD] [VP ] [ . ]
//!       2             [ . ] [ . ]
//!       3                   [ . ]
//! ```
//!
//! ## Beam
//!
//! An item is compared against the best log-probability seen in its cell
//! (`top`) with a factor that depends on what the item is:
//!
//! ```text
//! preterminal                         never pruned
//! partial NP (NP hack enabled)        top - f - 3
//! stopped item while relaxed          never pruned
//! span > 120                          top - max(1, f - 3)
//! span > 100                          top - max(2, f - 2)
//! otherwise                           top - f
//! ```
//!
//! `span` is `end - start` over inclusive ends. An item survives iff
//! `log_prob >= top - factor`. The same test runs when
//! an item is offered to a cell (cheap rejection against the current top)
//! and when the cell is finalised by [`Chart::prune`].
//!
//! ## Items and the pool
//!
//! Items live in an [`ItemPool`] and are referred to by [`ItemId`]. A cell
//! keeps at most one item per [`ItemSignature`] (the better one). Items that
//! leave a cell are released back to the pool unless a surviving item still
//! refers to them, in which case they stay pinned until the chart is
//! cleared.
//!
//! ## Debugging
//!
//! Set `HDPARSE_DEBUG_CHART=1` (with `trace` logging enabled) to log every
//! cell as it is pruned.

#[path = "chart/item.rs"]
mod item;
#[path = "chart/pool.rs"]
mod pool;
#[cfg(test)]
#[path = "chart/tests.rs"]
mod tests;

pub use item::{Item, ItemSignature, OpenSide, SideState};
pub use pool::{ItemId, ItemPool};

use crate::error::Result;
use crate::sexp::{Symbol, symbols};
use crate::treebank::Treebank;
use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::f64::consts::LN_10;
use std::sync::Arc;
use std::time::Duration;

// --- Configuration ------------------------------------------------------------

/// Which beam formula [`Chart::outside_beam`] applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BeamVariant {
    /// Tiered beam: NP allowance, relaxed stopped items, long-span clamps.
    #[default]
    Tiered,
    /// Narrow span-dependent beam for stopped items only; every other item
    /// uses the plain prune factor. Never selected by the shipped settings.
    SpanDependentStopped,
}

/// Beam settings for one parse attempt, all in natural-log units.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamConfig {
    pub prune_factor: f64,
    pub use_prune_factor: bool,
    pub np_prune_hack: bool,
    /// Stopped items are exempt from the beam.
    pub relax: bool,
    /// Per-cell hard cap, when enabled.
    pub cell_limit: Option<usize>,
    pub variant: BeamVariant,
}

impl Default for BeamConfig {
    fn default() -> Self {
        BeamConfig {
            prune_factor: 4.0 * LN_10,
            use_prune_factor: true,
            np_prune_hack: true,
            relax: false,
            cell_limit: None,
            variant: BeamVariant::Tiered,
        }
    }
}

/// Which items of a cell the hard cap applies to.
pub trait CellLimitPolicy: Send + Sync {
    fn applies(&self, item: &Item) -> bool;
}

/// The cap applies to every item.
#[derive(Debug, Default, Clone, Copy)]
pub struct LimitAllItems;

impl CellLimitPolicy for LimitAllItems {
    fn applies(&self, _item: &Item) -> bool {
        true
    }
}

/// Counters for one sentence.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChartStats {
    /// Items accepted into some cell.
    pub added: usize,
    /// Items that displaced an equivalent, worse item.
    pub replaced: usize,
    /// Items turned away because an equivalent item was at least as good.
    pub rejected_equivalent: usize,
    /// Items turned away on arrival by the beam.
    pub rejected_beam: usize,
    /// Items evicted by [`Chart::prune`] through the beam.
    pub pruned: usize,
    /// Items evicted by the cell limit.
    pub limited: usize,
    /// Largest number of live pool items.
    pub peak_items: usize,
    /// Wall time of the whole sentence, filled in by the decoder.
    pub elapsed: Duration,
}

// --- Cells --------------------------------------------------------------------

#[derive(Debug)]
struct Cell {
    items: Vec<ItemId>,
    by_signature: FxHashMap<ItemSignature, usize>,
    /// Items displaced by better equivalents, released at the next prune.
    retired: Vec<ItemId>,
    top_prob: f64,
    top_item: Option<ItemId>,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            items: Vec::new(),
            by_signature: FxHashMap::default(),
            retired: Vec::new(),
            top_prob: f64::NEG_INFINITY,
            top_item: None,
        }
    }
}

impl Cell {
    fn reset(&mut self) {
        self.items.clear();
        self.by_signature.clear();
        self.retired.clear();
        self.top_prob = f64::NEG_INFINITY;
        self.top_item = None;
    }
}

// --- Chart --------------------------------------------------------------------

pub struct Chart {
    size: usize,
    cells: Vec<Cell>,
    pool: ItemPool,
    /// Items out of every cell but still referred to by a surviving item.
    pinned: Vec<ItemId>,
    treebank: Arc<dyn Treebank>,
    limit_policy: Arc<dyn CellLimitPolicy>,
    beam: BeamConfig,
    stats: ChartStats,
    trace: bool,
}

impl Chart {
    pub fn new(pool_capacity: usize, treebank: Arc<dyn Treebank>) -> Self {
        Chart {
            size: 0,
            cells: Vec::new(),
            pool: ItemPool::with_capacity(pool_capacity),
            pinned: Vec::new(),
            treebank,
            limit_policy: Arc::new(LimitAllItems),
            beam: BeamConfig::default(),
            stats: ChartStats::default(),
            trace: std::env::var_os("HDPARSE_DEBUG_CHART").is_some(),
        }
    }

    pub fn with_limit_policy(mut self, policy: Arc<dyn CellLimitPolicy>) -> Self {
        self.limit_policy = policy;
        self
    }

    /// Tear down the previous sentence and size the chart for `size` words.
    pub fn begin(&mut self, size: usize) {
        self.teardown();
        self.size = size;
        self.cells.resize_with(size * size, Cell::default);
        self.stats = ChartStats::default();
        self.pool.reset_peak();
    }

    /// Release every item and empty every cell.
    pub fn teardown(&mut self) {
        for cell in &mut self.cells {
            cell.reset();
        }
        self.pinned.clear();
        self.pool.release_all();
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn beam(&self) -> &BeamConfig {
        &self.beam
    }

    pub fn set_beam(&mut self, beam: BeamConfig) {
        self.beam = beam;
    }

    pub fn stats(&self) -> &ChartStats {
        &self.stats
    }

    pub fn pool(&self) -> &ItemPool {
        &self.pool
    }

    fn cell_index(&self, start: usize, end: usize) -> usize {
        assert!(start <= end && end < self.size, "span ({start}, {end}) outside a chart of size {}", self.size);
        start * self.size + end
    }

    fn cell(&self, start: usize, end: usize) -> &Cell {
        &self.cells[self.cell_index(start, end)]
    }

    pub fn item(&self, id: ItemId) -> &Item {
        self.pool.get(id)
    }

    /// Items currently in cell `(start, end)`, in insertion order.
    pub fn items(&self, start: usize, end: usize) -> &[ItemId] {
        &self.cell(start, end).items
    }

    pub fn top_prob(&self, start: usize, end: usize) -> f64 {
        self.cell(start, end).top_prob
    }

    pub fn top_item(&self, start: usize, end: usize) -> Option<ItemId> {
        self.cell(start, end).top_item
    }

    // --- Beam -----------------------------------------------------------------

    /// Whether `item` falls outside the beam below `top`.
    pub fn outside_beam(&self, item: &Item, top: f64) -> bool {
        if !self.beam.use_prune_factor || item.is_preterminal() {
            return false;
        }
        let factor = match self.beam.variant {
            BeamVariant::Tiered => match self.tiered_factor(item) {
                Some(factor) => factor,
                None => return false,
            },
            BeamVariant::SpanDependentStopped => span_dependent_factor(item, self.beam.prune_factor),
        };
        item.log_prob < top - factor
    }

    /// `None` when the item is exempt.
    fn tiered_factor(&self, item: &Item) -> Option<f64> {
        let f = self.beam.prune_factor;
        if self.beam.np_prune_hack && item.has_children() && self.treebank.is_np(item.label) {
            return Some(f + 3.0);
        }
        if self.beam.relax && item.stop {
            return None;
        }
        let span = item.span();
        Some(if span > 120 {
            (f - 3.0).max(1.0)
        } else if span > 100 {
            (f - 2.0).max(2.0)
        } else {
            f
        })
    }

    // --- Insertion ------------------------------------------------------------

    /// Offer `item` to its cell.
    ///
    /// Returns the new handle when the item was taken, `None` when the beam
    /// or a better equivalent item turned it away.
    pub fn add(&mut self, item: Item) -> Result<Option<ItemId>> {
        let index = self.cell_index(item.start, item.end);
        if self.outside_beam(&item, self.cells[index].top_prob) {
            self.stats.rejected_beam += 1;
            return Ok(None);
        }
        let signature = item.signature();
        let log_prob = item.log_prob;

        let existing = self.cells[index].by_signature.get(&signature).copied();
        if let Some(position) = existing {
            let old = self.cells[index].items[position];
            if self.pool.get(old).log_prob >= log_prob {
                self.stats.rejected_equivalent += 1;
                return Ok(None);
            }
        }

        let id = self.pool.alloc(item)?;
        self.stats.peak_items = self.stats.peak_items.max(self.pool.live());
        let cell = &mut self.cells[index];
        match existing {
            Some(position) => {
                let old = std::mem::replace(&mut cell.items[position], id);
                cell.retired.push(old);
                self.stats.replaced += 1;
            }
            None => {
                cell.by_signature.insert(signature, cell.items.len());
                cell.items.push(id);
            }
        }
        if log_prob > cell.top_prob {
            cell.top_prob = log_prob;
            cell.top_item = Some(id);
        }
        self.stats.added += 1;
        Ok(Some(id))
    }

    // --- Pruning --------------------------------------------------------------

    /// Finalise cell `(start, end)`: apply the beam against the cell's top,
    /// then the cell limit. Returns the number of items evicted.
    pub fn prune(&mut self, start: usize, end: usize) -> usize {
        let index = self.cell_index(start, end);
        let top = self.cells[index].top_prob;
        let items = std::mem::take(&mut self.cells[index].items);
        let before = items.len();

        let (mut kept, mut evicted): (Vec<ItemId>, Vec<ItemId>) =
            items.into_iter().partition(|id| !self.outside_beam(self.pool.get(*id), top));
        self.stats.pruned += evicted.len();

        if let Some(limit) = self.beam.cell_limit {
            let (eligible, exempt): (Vec<ItemId>, Vec<ItemId>) =
                kept.iter().partition(|id| self.limit_policy.applies(self.pool.get(**id)));
            if eligible.len() > limit {
                let mut ranked = eligible;
                ranked.sort_by_key(|id| Reverse(OrderedFloat(self.pool.get(*id).log_prob)));
                let over = ranked.split_off(limit);
                self.stats.limited += over.len();
                let survivors: FxHashSet<ItemId> = ranked.into_iter().chain(exempt).collect();
                kept.retain(|id| survivors.contains(id));
                evicted.extend(over);
            }
        }

        let retired = std::mem::take(&mut self.cells[index].retired);
        evicted.extend(retired);
        self.release_unreferenced(&kept, evicted);

        let cell = &mut self.cells[index];
        cell.by_signature.clear();
        cell.top_prob = f64::NEG_INFINITY;
        cell.top_item = None;
        for (position, id) in kept.iter().enumerate() {
            let item = self.pool.get(*id);
            cell.by_signature.insert(item.signature(), position);
            if item.log_prob > cell.top_prob {
                cell.top_prob = item.log_prob;
                cell.top_item = Some(*id);
            }
        }
        cell.items = kept;

        let removed = before - self.cells[index].items.len();
        if self.trace {
            log::trace!(
                "cell ({start}, {end}): kept {} of {before}, top {:.3}",
                self.cells[index].items.len(),
                self.cells[index].top_prob
            );
        }
        removed
    }

    /// Release `candidates` except those reachable from `roots`; the
    /// reachable ones are pinned.
    fn release_unreferenced(&mut self, roots: &[ItemId], candidates: Vec<ItemId>) {
        if candidates.is_empty() {
            return;
        }
        let candidate_set: FxHashSet<ItemId> = candidates.iter().copied().collect();
        let mut reachable = FxHashSet::default();
        let mut stack: Vec<ItemId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            for child in self.pool.get(id).references() {
                if candidate_set.contains(&child) && reachable.insert(child) {
                    stack.push(child);
                }
            }
        }
        for id in candidates {
            if reachable.contains(&id) {
                self.pinned.push(id);
            } else {
                self.pool.release(id);
            }
        }
    }

    /// Drop every non-preterminal item, keeping the preterminals of the
    /// diagonal, so a wider beam can be tried without re-seeding.
    ///
    /// Every cell's top is recomputed from what is left: the preterminals on
    /// the diagonal, negative infinity elsewhere.
    pub fn clear_non_preterminals(&mut self) {
        for start in 0..self.size {
            for end in start..self.size {
                let index = self.cell_index(start, end);
                let cell = &mut self.cells[index];
                let items = std::mem::take(&mut cell.items);
                for id in cell.retired.drain(..) {
                    self.pool.release(id);
                }
                cell.reset();
                for id in items {
                    let item = self.pool.get(id);
                    if start == end && item.is_preterminal() {
                        cell.by_signature.insert(item.signature(), cell.items.len());
                        if item.log_prob > cell.top_prob {
                            cell.top_prob = item.log_prob;
                            cell.top_item = Some(id);
                        }
                        cell.items.push(id);
                    } else {
                        self.pool.release(id);
                    }
                }
            }
        }
        for id in self.pinned.drain(..) {
            self.pool.release(id);
        }
    }

    /// Forget the best log-probability of cell `(start, end)` so the next
    /// items compete only among themselves.
    pub fn reset_top(&mut self, start: usize, end: usize) {
        let index = self.cell_index(start, end);
        self.cells[index].top_prob = f64::NEG_INFINITY;
        self.cells[index].top_item = None;
    }

    /// Best item of cell `(start, end)` labelled `label`.
    pub fn best_with_label(&self, start: usize, end: usize, label: Symbol) -> Option<ItemId> {
        self.items(start, end)
            .iter()
            .copied()
            .filter(|id| self.item(*id).label == label)
            .max_by_key(|id| OrderedFloat(self.item(*id).log_prob))
    }

    /// Best `+TOP+` item over the whole sentence.
    pub fn best_parse(&self) -> Option<ItemId> {
        if self.size == 0 {
            return None;
        }
        self.best_with_label(0, self.size - 1, symbols::top())
    }
}

/// Narrow beam for stopped items that tightens with span length.
fn span_dependent_factor(item: &Item, prune_factor: f64) -> f64 {
    if !item.stop {
        return prune_factor;
    }
    let span = item.span() as f64;
    if span < 5.0 { 4.0 } else { LN_10 * (3.8 - 0.08 * span).max(2.0) }
}
