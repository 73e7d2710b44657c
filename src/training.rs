//! Training: from treebank trees to counted generation events.
//!
//! ```text
//! treebank text
//!     -> preprocess   (unwrap, drop empty elements, mark -A, strip tags, NPB)
//!     -> HeadTree     (head child + lexical head per node, rare words mapped)
//!     -> Trainer      (top, prior, head, gap and modifier events per node)
//!     -> ObservedEvents
//! ```
//!
//! Each internal node decomposes the Collins way: the head child is
//! generated from the parent, then left and right subcat frames, then the
//! modifiers on each side outward from the head, each side closed by a
//! `+STOP+` modifier. The previous-modifier window is maintained by the
//! configured [`Shift`] policy, exactly as the decoder rebuilds it.

#[path = "training/observed.rs"]
mod observed;
#[path = "training/preprocess.rs"]
mod preprocess;
#[cfg(test)]
#[path = "training/tests.rs"]
mod tests;

pub use observed::ObservedEvents;
pub use preprocess::{HeadTree, HeadTreeOptions, RawTree, preprocess};

use crate::error::{Error, Result};
use crate::settings::TrainerSettings;
use crate::sexp::{SexpReader, Symbol, symbols};
use crate::shift::Shift;
use crate::subcat::Subcat;
use crate::trainer_event::{GapDirection, GapEvent, HeadEvent, ModifierEvent, PriorEvent, Side, TrainerEvent};
use crate::treebank::Language;
use crate::word::Word;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Lowercase `word` when downcasing is on.
pub(crate) fn normalize_word(word: Symbol, downcase: bool) -> Symbol {
    if !downcase {
        return word;
    }
    let lower = word.as_str().to_lowercase();
    if lower == word.as_str() { word } else { Symbol::new(&lower) }
}

pub struct Trainer {
    language: Language,
    shifter: Arc<dyn Shift>,
    settings: TrainerSettings,
}

impl Trainer {
    pub fn new(language: Language, settings: TrainerSettings) -> Self {
        let shifter = settings.shifter.build(Arc::clone(&language.treebank));
        Trainer { language, shifter, settings }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    /// Count the events of every tree in `treebank_text`.
    ///
    /// Trees that fail to parse into a tree shape are skipped with a warning;
    /// malformed s-expression text is an error.
    pub fn train(&self, treebank_text: &str) -> Result<ObservedEvents> {
        let mut trees = Vec::new();
        for (idx, sexp) in SexpReader::new(treebank_text).enumerate() {
            let sexp = sexp?;
            match preprocess(&sexp, &self.language) {
                Ok(Some(tree)) => trees.push(tree),
                Ok(None) => log::debug!("tree {} is empty after removing null elements", idx + 1),
                Err(err) => log::warn!("skipping tree {}: {err}", idx + 1),
            }
        }
        if trees.is_empty() {
            return Err(Error::EmptyTreebank);
        }

        let frequencies = self.word_frequencies(&trees);
        let mut events = ObservedEvents::new();
        for tree in &trees {
            let head_tree = self.head_tree(tree, &frequencies);
            self.collect_stats(&head_tree, &mut events);
        }
        if self.settings.count_threshold > 0.0 {
            events.prune(self.settings.count_threshold);
        }
        log::info!("trained on {} trees: {} distinct events", trees.len(), events.len());
        Ok(events)
    }

    fn word_frequencies(&self, trees: &[RawTree]) -> FxHashMap<Symbol, usize> {
        let mut frequencies = FxHashMap::default();
        for tree in trees {
            for (word, _) in tree.leaves() {
                *frequencies.entry(normalize_word(word, self.settings.downcase_words)).or_insert(0) += 1;
            }
        }
        frequencies
    }

    /// Head-annotate `tree`, mapping words seen fewer than
    /// `unknownWordThreshold` times to their unknown-word class.
    pub fn head_tree(&self, tree: &RawTree, frequencies: &FxHashMap<Symbol, usize>) -> HeadTree {
        let threshold = self.settings.unknown_word_threshold;
        let lexicalize = |word: Symbol, tag: Symbol, position: usize| {
            let normal = normalize_word(word, self.settings.downcase_words);
            if frequencies.get(&normal).copied().unwrap_or(0) < threshold {
                Word::new(self.language.word_features.unknown_class(word.as_str(), position == 0), tag)
            } else {
                Word::new(normal, tag)
            }
        };
        let options = HeadTreeOptions {
            language: &self.language,
            base_nps_cannot_contain_verbs: self.settings.base_nps_cannot_contain_verbs,
            lexicalize: &lexicalize,
        };
        HeadTree::build(tree, &options)
    }

    /// Add the events of one head-annotated tree to `events`.
    pub fn collect_stats(&self, tree: &HeadTree, events: &mut ObservedEvents) {
        let treebank = &*self.language.treebank;
        let top = HeadEvent::new(
            Arc::clone(&tree.head_word),
            symbols::top(),
            treebank.strip_gap(tree.label),
            Subcat::new(),
            Subcat::new(),
        );
        events.add(TrainerEvent::Head(top), 1.0);
        self.collect_node(tree, events);
    }

    fn collect_node(&self, node: &HeadTree, events: &mut ObservedEvents) {
        let treebank = &*self.language.treebank;
        let label = treebank.strip_gap(node.label);
        events.add(TrainerEvent::Prior(PriorEvent::new(Arc::clone(&node.head_word), label)), 1.0);

        if node.is_preterminal() {
            // Lexical event: feeds the part-of-speech map and the vocabulary.
            let word = node.head_word.word;
            let lexical = HeadEvent::new(Arc::clone(&node.head_word), label, word, Subcat::new(), Subcat::new());
            events.add(TrainerEvent::Head(lexical), 1.0);
            return;
        }

        let left: Vec<&HeadTree> = node.left_modifiers().collect();
        let right: Vec<&HeadTree> = node.right_modifiers().collect();
        let left_subcat = self.subcat(&left);
        let right_subcat = self.subcat(&right);

        if let Some(gap) = self.gap_event(node, &left, &right) {
            events.add(TrainerEvent::Gap(gap), 1.0);
        }
        let head = HeadEvent::new(
            Arc::clone(&node.head_word),
            label,
            treebank.strip_gap(node.head_child().label),
            left_subcat.clone(),
            right_subcat.clone(),
        );
        events.add(TrainerEvent::Head(head), 1.0);

        self.collect_modifiers(node, Side::Left, &left, left_subcat, events);
        self.collect_modifiers(node, Side::Right, &right, right_subcat, events);

        for child in &node.children {
            self.collect_node(child, events);
        }
    }

    fn subcat(&self, modifiers: &[&HeadTree]) -> Subcat {
        let treebank = &*self.language.treebank;
        Subcat::from_labels(
            modifiers.iter().filter(|m| treebank.is_argument(m.label)).map(|m| treebank.strip_gap(m.label)),
        )
    }

    fn gap_event(&self, node: &HeadTree, left: &[&HeadTree], right: &[&HeadTree]) -> Option<GapEvent> {
        let treebank = &*self.language.treebank;
        if !treebank.has_gap(node.label) {
            return None;
        }
        let has_gap = |m: &&HeadTree| treebank.has_gap(m.label);
        let direction = if treebank.has_gap(node.head_child().label) {
            GapDirection::Head
        } else if left.iter().any(has_gap) {
            GapDirection::Left
        } else if right.iter().any(has_gap) {
            GapDirection::Right
        } else {
            log::debug!("gap on {} is not passed to any child", node.label);
            return None;
        };
        Some(GapEvent {
            direction,
            head_word: Arc::clone(&node.head_word),
            parent: treebank.strip_gap(node.label),
            head: treebank.strip_gap(node.head_child().label),
        })
    }

    fn collect_modifiers(
        &self,
        node: &HeadTree,
        side: Side,
        modifiers: &[&HeadTree],
        subcat: Subcat,
        events: &mut ObservedEvents,
    ) {
        let treebank = &*self.language.treebank;
        let parent = treebank.strip_gap(node.label);
        let head = treebank.strip_gap(node.head_child().label);

        let mut prev_mods = vec![symbols::start(); self.settings.num_prev_mods];
        let mut prev_words = vec![Word::start(); self.settings.num_prev_words];
        let mut dynamic = subcat;
        let mut verb_intervening = false;
        let mut prev: Option<&HeadTree> = None;

        for i in 0..=modifiers.len() {
            if let Some(p) = prev {
                self.shifter.shift_mod(parent, &mut prev_mods, treebank.strip_gap(p.label));
                self.shifter.shift_word(parent, &mut prev_words, &p.head_word);
                verb_intervening |= p.contains_verb;
            }
            let current = modifiers.get(i).copied();
            let (modifier, mod_head_word) = match current {
                Some(m) => (treebank.strip_gap(m.label), Arc::clone(&m.head_word)),
                None => (symbols::stop(), Arc::new(Word::stop())),
            };
            let event = ModifierEvent {
                mod_head_word,
                head_word: Arc::clone(&node.head_word),
                modifier,
                previous_mods: prev_mods.clone(),
                previous_words: prev_words.clone(),
                parent,
                head,
                subcat: dynamic.clone(),
                prev_punc: prev.filter(|p| treebank.is_punctuation(p.label)).map(|p| Arc::clone(&p.head_word)),
                prev_conj: prev.filter(|p| treebank.is_conjunction(p.label)).map(|p| Arc::clone(&p.head_word)),
                is_conj_p_conj: current.is_some() && treebank.is_conjunction(modifier) && i + 1 < modifiers.len(),
                verb_intervening,
                head_adjacent: i == 0,
                side,
            };
            events.add(TrainerEvent::Modifier(event), 1.0);

            if let Some(m) = current {
                if treebank.is_argument(m.label) {
                    dynamic.remove(treebank.strip_gap(m.label));
                }
                prev = Some(m);
            }
        }
        if !dynamic.is_empty() {
            log::warn!("subcat {dynamic} left over on the {side:?} side of {parent}");
        }
    }
}
