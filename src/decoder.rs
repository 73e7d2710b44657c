//! Bottom-up CKY decoding over the trained models.
//!
//! One sentence is decoded in attempts. Each attempt fills the chart span by
//! span with a given beam width; if no `+TOP+` item covers the sentence the
//! beam is widened, and as a last resort the hard constraints are relaxed:
//!
//! ```text
//! attempt   beam (log10)         zero probability
//! 1         pruneFactor          item dropped
//! 2         pruneFactor + inc    item dropped
//! ...       up to maxPruneFactor item dropped
//! last      maxPruneFactor       replaced by LOG_PROB_SMALL   (relaxConstraints)
//! ```
//!
//! Within one attempt every cell goes through the same steps:
//!
//! ```text
//! (start, end)
//!   complete     join stopped modifiers onto open modificands at every split,
//!                right modifiers before left ones
//!   close        stop probabilities for items whose subcats are satisfied,
//!                unary projections of stopped items, repeated to a fixpoint
//!   prune        beam + optional cell limit
//! ```
//!
//! The diagonal is seeded once per sentence with one preterminal per
//! candidate tag; later attempts keep those preterminals and recompute the
//! rest. Once the whole sentence is covered, `+TOP+` items are added over
//! the full span and the best one is rendered back into a treebank tree.

#[cfg(test)]
#[path = "decoder/tests.rs"]
mod tests;

use crate::chart::{BeamConfig, BeamVariant, Chart, ChartStats, Item, ItemId, SideState};
use crate::error::{Error, Result};
use crate::model::{LogProbCache, ModelCollection};
use crate::settings::{DecoderSettings, SettingsHandle};
use crate::sexp::logprob::{LOG_OF_ZERO, LOG_PROB_CERTAIN, LOG_PROB_SMALL};
use crate::sexp::{Sexp, Symbol, symbols};
use crate::shift::Shift;
use crate::subcat::Subcat;
use crate::trainer_event::{HeadEvent, ModifierEvent, PriorEvent, Side};
use crate::training::normalize_word;
use crate::treebank::Language;
use crate::word::Word;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

// --- Input --------------------------------------------------------------------

/// One word of a sentence to parse, with the tags it may take. An empty tag
/// list lets the decoder choose from everything seen in training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputWord {
    pub word: Symbol,
    pub tags: Vec<Symbol>,
}

impl InputWord {
    pub fn new(word: Symbol) -> Self {
        InputWord { word, tags: Vec::new() }
    }

    pub fn tagged(word: Symbol, tags: impl IntoIterator<Item = Symbol>) -> Self {
        InputWord { word, tags: tags.into_iter().collect() }
    }

    fn from_sexp(sexp: &Sexp) -> Result<InputWord> {
        match sexp {
            Sexp::Symbol(word) => Ok(InputWord::new(*word)),
            Sexp::List(items) if items.len() == 2 => {
                let word = items[0].expect_symbol("sentence word")?;
                let tags = match &items[1] {
                    Sexp::Symbol(tag) => vec![*tag],
                    Sexp::List(tags) => tags.iter().map(|t| t.expect_symbol("word tag")).collect::<Result<_>>()?,
                };
                Ok(InputWord { word, tags })
            }
            _ => Err(Error::malformed(0, format!("expected `word`, `(word tag)` or `(word (tag ...))`, found {sexp}"))),
        }
    }
}

/// Read one sentence: a list whose elements are `word`, `(word tag)` or
/// `(word (tag ...))`.
pub fn read_sentence(sexp: &Sexp) -> Result<Vec<InputWord>> {
    let items = sexp.list().ok_or_else(|| Error::malformed(0, format!("a sentence must be a list, found {sexp}")))?;
    items.iter().map(InputWord::from_sexp).collect()
}

// --- Output -------------------------------------------------------------------

/// Best parse of one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Parse {
    pub tree: Sexp,
    pub log_prob: f64,
    /// Beam width (natural-log units) of the attempt that found the parse.
    pub prune_factor: f64,
    /// Whether the hard constraints had to be relaxed.
    pub relaxed: bool,
}

impl fmt::Display for Parse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tree)
    }
}

// --- Caches -------------------------------------------------------------------

/// One memo per model, valid for one sentence.
#[derive(Default)]
struct Caches {
    head: LogProbCache<HeadEvent>,
    left_subcat: LogProbCache<HeadEvent>,
    right_subcat: LogProbCache<HeadEvent>,
    mod_nonterminal: LogProbCache<ModifierEvent>,
    mod_word: LogProbCache<ModifierEvent>,
    lex_prior: LogProbCache<PriorEvent>,
    nonterminal_prior: LogProbCache<PriorEvent>,
    top_nonterminal: LogProbCache<HeadEvent>,
    top_lex: LogProbCache<HeadEvent>,
}

impl Caches {
    fn clear(&mut self) {
        self.head.clear();
        self.left_subcat.clear();
        self.right_subcat.clear();
        self.mod_nonterminal.clear();
        self.mod_word.clear();
        self.lex_prior.clear();
        self.nonterminal_prior.clear();
        self.top_nonterminal.clear();
        self.top_lex.clear();
    }

    fn hits_and_misses(&self) -> (u64, u64) {
        let heads = [&self.head, &self.left_subcat, &self.right_subcat, &self.top_nonterminal, &self.top_lex];
        let mods = [&self.mod_nonterminal, &self.mod_word];
        let priors = [&self.lex_prior, &self.nonterminal_prior];
        let hits = heads.iter().map(|c| c.hits()).sum::<u64>()
            + mods.iter().map(|c| c.hits()).sum::<u64>()
            + priors.iter().map(|c| c.hits()).sum::<u64>();
        let misses = heads.iter().map(|c| c.misses()).sum::<u64>()
            + mods.iter().map(|c| c.misses()).sum::<u64>()
            + priors.iter().map(|c| c.misses()).sum::<u64>();
        (hits, misses)
    }
}

// --- Decoder ------------------------------------------------------------------

/// Sentence-at-a-time parser. Owns its chart and caches, so one decoder
/// serves one thread; the models are shared.
pub struct Decoder {
    models: Arc<ModelCollection>,
    language: Language,
    shifter: Arc<dyn Shift>,
    settings: DecoderSettings,
    handle: Option<(SettingsHandle, u64)>,
    chart: Chart,
    caches: Caches,
    /// Zero probabilities drop an item instead of being softened.
    hard_constraints: bool,
    /// Surface words of the current sentence.
    words: Vec<Symbol>,
    /// Unparenthesised commas of the current sentence.
    comma: Vec<bool>,
    /// Positions that may be conjunctions.
    conj: Vec<bool>,
    stop_word: Arc<Word>,
    last_stats: ChartStats,
}

impl Decoder {
    pub fn new(models: Arc<ModelCollection>, language: Language, settings: DecoderSettings) -> Self {
        let shifter = settings.shifter.build(Arc::clone(&language.treebank));
        let chart = Chart::new(settings.item_pool_size, Arc::clone(&language.treebank));
        Decoder {
            models,
            language,
            shifter,
            settings,
            handle: None,
            chart,
            caches: Caches::default(),
            hard_constraints: true,
            words: Vec::new(),
            comma: Vec::new(),
            conj: Vec::new(),
            stop_word: Arc::new(Word::stop()),
            last_stats: ChartStats::default(),
        }
    }

    /// Follow `handle`: settings are re-read whenever its version moves.
    pub fn with_settings_handle(models: Arc<ModelCollection>, language: Language, handle: SettingsHandle) -> Result<Self> {
        let (version, settings) = handle.snapshot();
        let mut decoder = Decoder::new(models, language, settings.decoder()?);
        decoder.handle = Some((handle, version));
        Ok(decoder)
    }

    pub fn settings(&self) -> &DecoderSettings {
        &self.settings
    }

    /// Counters of the most recent sentence.
    pub fn last_stats(&self) -> &ChartStats {
        &self.last_stats
    }

    fn refresh_settings(&mut self) -> Result<()> {
        let Some((handle, seen)) = &self.handle else {
            return Ok(());
        };
        if handle.version() == *seen {
            return Ok(());
        }
        let (version, settings) = handle.snapshot();
        let settings = settings.decoder()?;
        if settings.item_pool_size != self.settings.item_pool_size {
            self.chart = Chart::new(settings.item_pool_size, Arc::clone(&self.language.treebank));
        }
        if settings.shifter != self.settings.shifter {
            self.shifter = settings.shifter.build(Arc::clone(&self.language.treebank));
        }
        log::info!("decoder picked up settings version {version}");
        self.settings = settings;
        if let Some((_, seen)) = &mut self.handle {
            *seen = version;
        }
        Ok(())
    }

    /// Parse one sentence.
    ///
    /// `Ok(None)` when no attempt produced a parse. Sentences longer than
    /// the configured maximum and pool exhaustion are errors that leave the
    /// decoder ready for the next sentence.
    pub fn parse(&mut self, sentence: &[InputWord]) -> Result<Option<Parse>> {
        self.refresh_settings()?;
        let length = sentence.len();
        if length == 0 {
            return Ok(None);
        }
        if length > self.settings.max_sentence_length {
            return Err(Error::SentenceTooLong { length, max: self.settings.max_sentence_length });
        }

        let started = Instant::now();
        self.caches.clear();
        self.chart.begin(length);
        self.prepare(sentence);
        let result = self.search(sentence);

        let mut stats = self.chart.stats().clone();
        stats.elapsed = started.elapsed();
        let (hits, misses) = self.caches.hits_and_misses();
        log::debug!(
            "{length} words: {} items added, {} pruned, peak {} live, cache {hits}/{} hits, {:?}",
            stats.added,
            stats.pruned,
            stats.peak_items,
            hits + misses,
            stats.elapsed
        );
        self.last_stats = stats;
        self.chart.teardown();
        result
    }

    /// `(beam, relaxed)` for every attempt, in order.
    fn attempts(&self) -> Vec<(f64, bool)> {
        let s = &self.settings;
        let mut attempts = vec![(s.prune_factor, false)];
        if s.use_prune_factor {
            let mut factor = s.prune_factor + s.prune_factor_increment;
            while factor <= s.max_prune_factor + s.prune_factor_increment / 2.0 {
                attempts.push((factor, false));
                factor += s.prune_factor_increment;
            }
        }
        if s.relax_constraints {
            let last = attempts[attempts.len() - 1].0;
            attempts.push((last, true));
        }
        attempts
    }

    fn beam_config(&self, prune_factor: f64, relaxed: bool) -> BeamConfig {
        BeamConfig {
            prune_factor,
            use_prune_factor: self.settings.use_prune_factor,
            np_prune_hack: self.settings.np_prune_hack,
            relax: relaxed,
            cell_limit: self.settings.use_cell_limit.then_some(self.settings.cell_limit),
            variant: BeamVariant::default(),
        }
    }

    fn search(&mut self, sentence: &[InputWord]) -> Result<Option<Parse>> {
        let length = sentence.len();
        for (attempt, (prune_factor, relaxed)) in self.attempts().into_iter().enumerate() {
            self.hard_constraints = !relaxed;
            let beam = self.beam_config(prune_factor, relaxed);
            self.chart.set_beam(beam);
            if attempt == 0 {
                self.seed(sentence)?;
            } else {
                let beam = prune_factor / std::f64::consts::LN_10;
                if relaxed {
                    log::warn!("no parse; retrying with beam {beam:.2} and relaxed constraints");
                } else {
                    log::debug!("no parse; retrying with beam {beam:.2}");
                }
                self.chart.clear_non_preterminals();
                for position in 0..length {
                    self.close_cell(position, position)?;
                }
            }

            for span in 2..=length {
                for start in 0..=length - span {
                    let end = start + span - 1;
                    self.complete(start, end)?;
                    self.close_cell(start, end)?;
                    self.chart.prune(start, end);
                }
            }

            self.chart.reset_top(0, length - 1);
            self.add_top_unaries(length - 1)?;
            if let Some(top) = self.chart.best_parse() {
                let item = self.chart.item(top);
                let Some(root) = item.head_child else {
                    continue;
                };
                let log_prob = item.log_prob;
                let (tree, _) = self.render(root);
                return Ok(Some(Parse { tree, log_prob, prune_factor, relaxed }));
            }
        }
        Ok(None)
    }

    // --- Sentence setup -------------------------------------------------------

    fn prepare(&mut self, sentence: &[InputWord]) {
        let treebank = &*self.language.treebank;
        self.words = sentence.iter().map(|w| w.word).collect();
        self.conj = vec![false; sentence.len()];
        self.comma.clear();
        let mut depth = 0usize;
        for word in &self.words {
            if treebank.is_left_paren(*word) {
                depth += 1;
            } else if treebank.is_right_paren(*word) {
                depth = depth.saturating_sub(1);
            }
            self.comma.push(depth == 0 && treebank.is_comma(*word));
        }
    }

    /// The word the models know `word` as.
    fn lexicalize(&self, word: Symbol, position: usize) -> Symbol {
        let normal = normalize_word(word, self.settings.downcase_words);
        if self.models.vocabulary.contains(&normal) {
            normal
        } else {
            self.language.word_features.unknown_class(word.as_str(), position == 0)
        }
    }

    /// Preterminals for every word, each diagonal cell closed under unaries.
    fn seed(&mut self, sentence: &[InputWord]) -> Result<()> {
        let models = Arc::clone(&self.models);
        let treebank = Arc::clone(&self.language.treebank);
        for (position, input) in sentence.iter().enumerate() {
            let word = self.lexicalize(input.word, position);
            let tags = if input.tags.is_empty() { models.tags_for(word).to_vec() } else { input.tags.clone() };

            let mut candidates = Vec::with_capacity(tags.len());
            for tag in tags {
                let head_word = Arc::new(Word::new(word, tag));
                let prior = self.log_prior(&PriorEvent::new(Arc::clone(&head_word), tag));
                candidates.push((head_word, prior));
            }
            let all_zero = candidates.iter().all(|(_, prior)| *prior == LOG_OF_ZERO);
            let mut seeded = 0;
            for (head_word, prior) in candidates {
                let prior = if prior > LOG_OF_ZERO {
                    prior
                } else if all_zero && self.settings.relax_constraints {
                    LOG_PROB_SMALL
                } else {
                    continue;
                };
                if treebank.is_conjunction(head_word.tag) {
                    self.conj[position] = true;
                }
                let verb = treebank.is_verb_tag(head_word.tag);
                if self.chart.add(Item::preterminal(head_word, position, verb, prior))?.is_some() {
                    seeded += 1;
                }
            }
            if seeded == 0 {
                log::warn!("no usable tag for `{}` at position {position}", input.word);
            }
            self.close_cell(position, position)?;
        }
        Ok(())
    }

    // --- Probabilities --------------------------------------------------------

    /// `None` when the item must be dropped.
    fn soften(&self, log_prob: f64) -> Option<f64> {
        if log_prob > LOG_OF_ZERO {
            Some(log_prob)
        } else if self.hard_constraints {
            None
        } else {
            Some(LOG_PROB_SMALL)
        }
    }

    fn log_prior(&mut self, event: &PriorEvent) -> f64 {
        let lex = self.models.lex_prior.cached_log_prob(&mut self.caches.lex_prior, event);
        if lex == LOG_OF_ZERO {
            return LOG_OF_ZERO;
        }
        let nonterminal = self.models.nonterminal_prior.cached_log_prob(&mut self.caches.nonterminal_prior, event);
        if nonterminal == LOG_OF_ZERO { LOG_OF_ZERO } else { lex + nonterminal }
    }

    /// Modifier label and head word; the label alone for `+STOP+`.
    fn log_prob_mod(&mut self, event: &ModifierEvent) -> f64 {
        let nonterminal = self.models.mod_nonterminal.cached_log_prob(&mut self.caches.mod_nonterminal, event);
        if event.is_stop() || nonterminal == LOG_OF_ZERO {
            return nonterminal;
        }
        let word = self.models.mod_word.cached_log_prob(&mut self.caches.mod_word, event);
        if word == LOG_OF_ZERO { LOG_OF_ZERO } else { nonterminal + word }
    }

    fn log_prob_top(&mut self, event: &HeadEvent) -> f64 {
        let nonterminal = self.models.top_nonterminal.cached_log_prob(&mut self.caches.top_nonterminal, event);
        if nonterminal == LOG_OF_ZERO {
            return LOG_OF_ZERO;
        }
        let lex = self.models.top_lex.cached_log_prob(&mut self.caches.top_lex, event);
        if lex == LOG_OF_ZERO { LOG_OF_ZERO } else { nonterminal + lex }
    }

    fn log_prob_subcat(&mut self, side: Side, event: &HeadEvent, frames: usize) -> f64 {
        if frames == 1 {
            return LOG_PROB_CERTAIN;
        }
        match side {
            Side::Left => self.models.left_subcat.cached_log_prob(&mut self.caches.left_subcat, event),
            Side::Right => self.models.right_subcat.cached_log_prob(&mut self.caches.right_subcat, event),
        }
    }

    fn modifier_event(&self, item: &Item, side: Side, modifier: Symbol, mod_head_word: Arc<Word>) -> ModifierEvent {
        let state = item.side(side);
        ModifierEvent {
            mod_head_word,
            head_word: Arc::clone(&item.head_word),
            modifier,
            previous_mods: state.prev_mods.clone(),
            previous_words: state.prev_words.clone(),
            parent: item.label,
            head: item.head_label,
            subcat: state.subcat.clone(),
            prev_punc: None,
            prev_conj: None,
            is_conj_p_conj: false,
            verb_intervening: state.verb,
            head_adjacent: state.children.is_empty(),
            side,
        }
    }

    // --- Cell operations ------------------------------------------------------

    /// Stop probabilities and unaries for cell `(start, end)` until nothing
    /// new is added.
    fn close_cell(&mut self, start: usize, end: usize) -> Result<()> {
        let existing = self.chart.items(start, end).to_vec();
        let mut stopped = Vec::new();
        for id in existing {
            let item = self.chart.item(id);
            if item.is_preterminal() {
                stopped.push(id);
            } else if !item.stop {
                stopped.extend(self.add_stop_probs(id)?);
            }
        }
        while !stopped.is_empty() {
            let mut unaries = Vec::new();
            for id in std::mem::take(&mut stopped) {
                unaries.extend(self.add_unaries(id)?);
            }
            for id in unaries {
                stopped.extend(self.add_stop_probs(id)?);
            }
        }
        Ok(())
    }

    /// Project the stopped item `id` to every parent seen above its label,
    /// once per pair of subcat frames.
    fn add_unaries(&mut self, id: ItemId) -> Result<Vec<ItemId>> {
        let item = self.chart.item(id).clone();
        if !item.stop {
            return Ok(Vec::new());
        }
        let models = Arc::clone(&self.models);
        let mut added = Vec::new();
        for &parent in models.parents_of(item.label) {
            let lefts = models.subcats(Side::Left, item.label, parent);
            let rights = models.subcats(Side::Right, item.label, parent);

            let prior = self.log_prior(&PriorEvent::new(Arc::clone(&item.head_word), parent));
            let Some(prior) = self.soften(prior) else {
                continue;
            };
            for left in lefts {
                for right in rights {
                    let event =
                        HeadEvent::new(Arc::clone(&item.head_word), parent, item.label, left.clone(), right.clone());
                    let head = models.head.cached_log_prob(&mut self.caches.head, &event);
                    let Some(head) = self.soften(head) else {
                        continue;
                    };
                    let left_prob = self.log_prob_subcat(Side::Left, &event, lefts.len());
                    let Some(left_prob) = self.soften(left_prob) else {
                        continue;
                    };
                    let right_prob = self.log_prob_subcat(Side::Right, &event, rights.len());
                    let Some(right_prob) = self.soften(right_prob) else {
                        continue;
                    };

                    let mut unary = Item {
                        label: parent,
                        head_label: item.label,
                        head_word: Arc::clone(&item.head_word),
                        start: item.start,
                        end: item.end,
                        head_child: Some(id),
                        left: SideState::open(left.clone(), models.num_prev_mods, models.num_prev_words),
                        right: SideState::open(right.clone(), models.num_prev_mods, models.num_prev_words),
                        stop: false,
                        contains_verb: item.contains_verb,
                        log_tree_prob: item.log_tree_prob + head + left_prob + right_prob,
                        log_prior: prior,
                        log_prob: 0.0,
                    };
                    unary.update_log_prob();
                    if let Some(new_id) = self.chart.add(unary)? {
                        added.push(new_id);
                    }
                }
            }
        }
        Ok(added)
    }

    /// Close both sides of `id` with `+STOP+` once its subcats are empty.
    fn add_stop_probs(&mut self, id: ItemId) -> Result<Option<ItemId>> {
        let item = self.chart.item(id);
        if item.stop || !item.left.subcat.is_empty() || !item.right.subcat.is_empty() {
            return Ok(None);
        }
        let item = item.clone();
        let mut log_prob = 0.0;
        for side in [Side::Left, Side::Right] {
            let event = self.modifier_event(&item, side, symbols::stop(), Arc::clone(&self.stop_word));
            let prob = self.log_prob_mod(&event);
            let Some(prob) = self.soften(prob) else {
                return Ok(None);
            };
            log_prob += prob;
        }
        let treebank = &*self.language.treebank;
        let mut stopped = item;
        stopped.stop = true;
        stopped.contains_verb = if self.settings.base_nps_cannot_contain_verbs && treebank.is_base_np(stopped.label) {
            false
        } else {
            stopped.contains_verb || stopped.left.verb || stopped.right.verb
        };
        stopped.log_tree_prob += log_prob;
        stopped.update_log_prob();
        self.chart.add(stopped)
    }

    fn comma_violation(&self, split: usize, end: usize) -> bool {
        self.comma[split] && end + 1 < self.words.len() && !self.comma[end + 1] && !self.conj[end]
    }

    /// Every join producing an item over `(start, end)`.
    fn complete(&mut self, start: usize, end: usize) -> Result<()> {
        for split in start..end {
            if self.settings.use_comma_constraint && self.comma_violation(split, end) {
                // Only base NPs may take a modifier across the comma.
                self.joins(Side::Left, (split + 1, end), (start, split), true)?;
                continue;
            }
            self.joins(Side::Right, (start, split), (split + 1, end), false)?;
            self.joins(Side::Left, (split + 1, end), (start, split), false)?;
        }
        Ok(())
    }

    fn joins(
        &mut self,
        side: Side,
        modificand_cell: (usize, usize),
        modifier_cell: (usize, usize),
        base_np_only: bool,
    ) -> Result<()> {
        let treebank = Arc::clone(&self.language.treebank);
        let modificands: Vec<ItemId> = self
            .chart
            .items(modificand_cell.0, modificand_cell.1)
            .iter()
            .copied()
            .filter(|id| {
                let item = self.chart.item(*id);
                !item.stop && derivation_order_ok(item, side) && (!base_np_only || treebank.is_base_np(item.label))
            })
            .collect();
        if modificands.is_empty() {
            return Ok(());
        }
        let modifiers: Vec<ItemId> = self
            .chart
            .items(modifier_cell.0, modifier_cell.1)
            .iter()
            .copied()
            .filter(|id| self.chart.item(*id).stop)
            .collect();
        for &modificand in &modificands {
            for &modifier in &modifiers {
                self.join(modificand, modifier, side)?;
            }
        }
        Ok(())
    }

    /// Attach the stopped item `modifier` to `modificand` on `side`.
    fn join(&mut self, modificand: ItemId, modifier: ItemId, side: Side) -> Result<()> {
        let treebank = Arc::clone(&self.language.treebank);
        let (label, mod_head_word, mod_verb, mod_tree, mod_start, mod_end) = {
            let m = self.chart.item(modifier);
            (m.label, Arc::clone(&m.head_word), m.contains_verb, m.log_tree_prob, m.start, m.end)
        };
        let item = self.chart.item(modificand);
        let is_argument = treebank.is_argument(label);
        if is_argument && !item.side(side).subcat.contains(label) {
            return Ok(());
        }
        let event = self.modifier_event(item, side, label, mod_head_word);
        let mut joined = item.clone();
        let prob = self.log_prob_mod(&event);
        let Some(prob) = self.soften(prob) else {
            return Ok(());
        };

        joined.start = joined.start.min(mod_start);
        joined.end = joined.end.max(mod_end);
        let parent = joined.label;
        let state = joined.side_mut(side);
        if is_argument {
            state.subcat.remove(label);
        }
        state.children.push(modifier);
        state.verb |= mod_verb;
        let (prev_mods, prev_words) = self.history_windows(parent, &state.children);
        state.prev_mods = prev_mods;
        state.prev_words = prev_words;
        joined.log_tree_prob += mod_tree + prob;
        joined.update_log_prob();
        self.chart.add(joined)?;
        Ok(())
    }

    /// Previous-modifier windows of an item labelled `parent` whose side
    /// holds `children` (nearest to the head first).
    fn history_windows(&self, parent: Symbol, children: &[ItemId]) -> (Vec<Symbol>, Vec<Word>) {
        let (num_mods, num_words) = (self.models.num_prev_mods, self.models.num_prev_words);
        let mut mods = Vec::with_capacity(num_mods);
        let mut words = Vec::with_capacity(num_words);
        for id in children.iter().rev() {
            let child = self.chart.item(*id);
            if mods.len() < num_mods && !self.shifter.skip(parent, child.label) {
                mods.push(child.label);
            }
            if words.len() < num_words && self.shifter.shifts_word(parent, &child.head_word) {
                words.push(Word::clone(&child.head_word));
            }
        }
        mods.resize(num_mods, symbols::start());
        words.resize(num_words, Word::start());
        (mods, words)
    }

    /// `+TOP+` items over `(0, end)` from every stopped item there.
    fn add_top_unaries(&mut self, end: usize) -> Result<()> {
        let candidates: Vec<ItemId> =
            self.chart.items(0, end).iter().copied().filter(|id| self.chart.item(*id).stop).collect();
        for id in candidates {
            let item = self.chart.item(id);
            if item.label == symbols::top() {
                continue;
            }
            let (label, head_word, contains_verb, tree) =
                (item.label, Arc::clone(&item.head_word), item.contains_verb, item.log_tree_prob);
            let event = HeadEvent::new(Arc::clone(&head_word), symbols::top(), label, Subcat::new(), Subcat::new());
            let prob = self.log_prob_top(&event);
            let Some(prob) = self.soften(prob) else {
                continue;
            };
            let mut top = Item {
                label: symbols::top(),
                head_label: label,
                head_word,
                start: 0,
                end,
                head_child: Some(id),
                left: SideState::default(),
                right: SideState::default(),
                stop: true,
                contains_verb,
                log_tree_prob: tree + prob,
                log_prior: 0.0,
                log_prob: 0.0,
            };
            top.update_log_prob();
            self.chart.add(top)?;
        }
        Ok(())
    }

    // --- Output ---------------------------------------------------------------

    /// Treebank tree for the stopped item `id`, and whether it was a base NP.
    ///
    /// Argument marks are stripped, `NPB` becomes `NP`, and an `NP` whose
    /// only child is a base NP absorbs it.
    fn render(&self, id: ItemId) -> (Sexp, bool) {
        let item = self.chart.item(id);
        if item.is_preterminal() {
            return (sexp_list![item.label, self.words[item.start]], false);
        }
        let treebank = &*self.language.treebank;
        let base_np = treebank.is_base_np(item.label);
        let label = if base_np { treebank.np_label() } else { treebank.strip_augmentation(item.label) };

        let mut children: Vec<(Sexp, bool)> = item.children_in_order().into_iter().map(|c| self.render(c)).collect();
        if !base_np && treebank.is_np(label) && children.len() == 1 && children[0].1 {
            if let Some((Sexp::List(mut inner), _)) = children.pop() {
                inner[0] = Sexp::Symbol(label);
                return (Sexp::List(inner), false);
            }
        }
        let mut node = Vec::with_capacity(children.len() + 1);
        node.push(Sexp::Symbol(label));
        node.extend(children.into_iter().map(|(child, _)| child));
        (Sexp::List(node), base_np)
    }
}

/// Right modifiers are generated before left ones: a left join needs the
/// right subcat satisfied, a right join needs no left modifiers yet.
fn derivation_order_ok(item: &Item, side: Side) -> bool {
    match side {
        Side::Left => item.right.subcat.is_empty(),
        Side::Right => item.left.children.is_empty(),
    }
}
