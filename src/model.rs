//! Smoothed conditional probability models.
//!
//! A [`ProbabilityStructure`] says how one kind of generation event breaks
//! into a future and a sequence of increasingly coarse histories:
//!
//! ```text
//! level 0   P(H | P, w, t)       most specific
//! level 1   P(H | P, t)
//! level 2   P(H | P)             least specific, always weight 1
//! ```
//!
//! A [`Model`] counts every level into a [`CountsTrio`] and estimates by
//! deleted interpolation from the coarsest level up:
//!
//! ```text
//! λ_i  = c(h_i) / (c(h_i) + fudgeTerm + fudge · u(h_i))      u = diversity
//! p    = λ_i · c(f, h_i) / c(h_i) + (1 - λ_i) · p
//! ```
//!
//! [`ModelCollection`] derives every model the decoder needs, plus its
//! lookup maps, from one set of [`ObservedEvents`](crate::training::ObservedEvents).

#[path = "model/collection.rs"]
mod collection;
#[path = "model/structures.rs"]
mod structures;
#[cfg(test)]
#[path = "model/tests.rs"]
mod tests;

pub use collection::ModelCollection;
pub use structures::{
    HeadStructure, LexPriorStructure, ModNonterminalStructure, ModWordStructure, NonterminalPriorStructure,
    SubcatStructure, TopLexStructure, TopNonterminalStructure,
};

use crate::counts::CountsTrio;
use crate::event::{CanonicalMap, Canonicalized, EventKey};
use crate::sexp::logprob::LOG_OF_ZERO;
use crate::transition::Transition;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Decomposition of one event kind into back-off levels.
pub trait ProbabilityStructure: Send + Sync {
    type Event;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn num_levels(&self) -> usize;

    fn history(&self, event: &Self::Event, level: usize) -> EventKey;

    fn future(&self, event: &Self::Event, level: usize) -> EventKey;

    fn lambda_fudge(&self) -> f64 {
        5.0
    }

    fn lambda_fudge_term(&self) -> f64 {
        0.0
    }

    fn transition(&self, event: &Self::Event, level: usize) -> Transition {
        Transition::new(self.history(event, level), self.future(event, level))
    }
}

// --- Model --------------------------------------------------------------------

pub struct Model<S: ProbabilityStructure> {
    structure: S,
    levels: Vec<CountsTrio>,
    futures: CanonicalMap<EventKey>,
    histories: CanonicalMap<EventKey>,
    distinct_histories: usize,
}

impl<S: ProbabilityStructure> Model<S> {
    pub fn new(structure: S) -> Self {
        let levels = (0..structure.num_levels()).map(|_| CountsTrio::new()).collect();
        Model {
            structure,
            levels,
            futures: CanonicalMap::new(),
            histories: CanonicalMap::new(),
            distinct_histories: 0,
        }
    }

    pub fn structure(&self) -> &S {
        &self.structure
    }

    pub fn level(&self, level: usize) -> &CountsTrio {
        &self.levels[level]
    }

    /// Count `event` `count` times at every level.
    pub fn add_event(&mut self, event: &S::Event, count: f64) {
        for (level, trio) in self.levels.iter_mut().enumerate() {
            let mut transition = self.structure.transition(event, level);
            if let (_, Canonicalized::Registered) = transition.canonicalize(&mut self.futures, &mut self.histories) {
                self.distinct_histories += 1;
            }
            let history = Arc::clone(transition.history());
            if !trio.trans.contains(&transition) {
                trio.hist_and_diversity.add(history.clone(), CountsTrio::DIVERSITY);
            }
            trio.trans.add_count(transition, count);
            trio.hist_and_diversity.add_count(history, CountsTrio::HIST, count);
        }
    }

    /// Unsmoothed log-probability of `transition` at one level.
    pub fn level_log_prob(&self, transition: &Transition, level: usize) -> f64 {
        let trio = &self.levels[level];
        let history = trio.hist_and_diversity.count(transition.history(), CountsTrio::HIST);
        let joint = trio.trans.count(transition);
        if history <= 0.0 || joint <= 0.0 { LOG_OF_ZERO } else { (joint / history).ln() }
    }

    /// Smoothed log-probability of `event`; [`LOG_OF_ZERO`] when every level
    /// assigns it zero.
    pub fn estimate_log_prob(&self, event: &S::Event) -> f64 {
        let fudge = self.structure.lambda_fudge();
        let fudge_term = self.structure.lambda_fudge_term();
        let last = self.levels.len().saturating_sub(1);
        let mut prob = 0.0;
        for (level, trio) in self.levels.iter().enumerate().rev() {
            let transition = self.structure.transition(event, level);
            let Some([history, diversity]) = trio.hist_and_diversity.get(transition.history()) else {
                // Unseen history: this level has no weight.
                continue;
            };
            if history <= 0.0 {
                continue;
            }
            let estimate = trio.trans.count(&transition) / history;
            let lambda =
                if level == last { 1.0 } else { history / (history + fudge_term + fudge * diversity) };
            prob = lambda * estimate + (1.0 - lambda) * prob;
        }
        if prob > 0.0 { prob.ln() } else { LOG_OF_ZERO }
    }

    /// [`Model::estimate_log_prob`] through a per-decoder memo.
    pub fn cached_log_prob(&self, cache: &mut LogProbCache<S::Event>, event: &S::Event) -> f64
    where
        S::Event: Eq + Hash + Clone,
    {
        cache.get_or_insert_with(event, || self.estimate_log_prob(event))
    }

    /// Histories registered as canonical across all levels.
    pub fn distinct_histories(&self) -> usize {
        self.distinct_histories
    }

    /// Distinct transitions per level, for logging.
    pub fn sizes(&self) -> Vec<usize> {
        self.levels.iter().map(|trio| trio.trans.len()).collect()
    }
}

// --- Cache --------------------------------------------------------------------

/// Memo of smoothed log-probabilities keyed by event.
#[derive(Debug)]
pub struct LogProbCache<E> {
    map: FxHashMap<E, f64>,
    hits: u64,
    misses: u64,
}

impl<E> Default for LogProbCache<E> {
    fn default() -> Self {
        LogProbCache { map: FxHashMap::default(), hits: 0, misses: 0 }
    }
}

impl<E: Eq + Hash + Clone> LogProbCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(&mut self, event: &E, compute: impl FnOnce() -> f64) -> f64 {
        if let Some(&value) = self.map.get(event) {
            self.hits += 1;
            return value;
        }
        self.misses += 1;
        let value = compute();
        self.map.insert(event.clone(), value);
        value
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
