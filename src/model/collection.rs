use super::structures::*;
use super::Model;
use crate::sexp::{Symbol, symbols};
use crate::subcat::Subcat;
use crate::trainer_event::{HeadEvent, Side};
use crate::training::ObservedEvents;
use crate::treebank::Language;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// Every model the decoder consults, plus the lookup maps it derives from
/// the same observations.
pub struct ModelCollection {
    pub head: Model<HeadStructure>,
    pub left_subcat: Model<SubcatStructure>,
    pub right_subcat: Model<SubcatStructure>,
    pub mod_nonterminal: Model<ModNonterminalStructure>,
    pub mod_word: Model<ModWordStructure>,
    pub lex_prior: Model<LexPriorStructure>,
    pub nonterminal_prior: Model<NonterminalPriorStructure>,
    pub top_nonterminal: Model<TopNonterminalStructure>,
    pub top_lex: Model<TopLexStructure>,

    /// Word -> tags it was seen with, sorted.
    pub pos_map: FxHashMap<Symbol, Vec<Symbol>>,
    /// Head child label -> parent labels it was seen under, sorted.
    pub head_to_parents: FxHashMap<Symbol, Vec<Symbol>>,
    /// `(head, parent)` -> left subcat frames seen.
    pub left_subcats: FxHashMap<(Symbol, Symbol), Vec<Subcat>>,
    /// `(head, parent)` -> right subcat frames seen.
    pub right_subcats: FxHashMap<(Symbol, Symbol), Vec<Subcat>>,
    pub vocabulary: FxHashSet<Symbol>,
    /// Tags seen with any unknown-word class, for words whose class never occurred.
    pub unknown_tags: Vec<Symbol>,
    /// Width of the previous-modifier and previous-word windows.
    pub num_prev_mods: usize,
    pub num_prev_words: usize,
}

/// A lexical event has the preterminal as parent and the word itself as head.
fn is_lexical(event: &HeadEvent) -> bool {
    event.parent == event.head_word.tag && event.head == event.head_word.word
}

fn sorted<T: Ord>(set: BTreeSet<T>) -> Vec<T> {
    set.into_iter().collect()
}

impl ModelCollection {
    pub fn derive(events: &ObservedEvents, language: &Language) -> ModelCollection {
        let mut models = ModelCollection {
            head: Model::new(HeadStructure::new(language)),
            left_subcat: Model::new(SubcatStructure::new(Side::Left, language)),
            right_subcat: Model::new(SubcatStructure::new(Side::Right, language)),
            mod_nonterminal: Model::new(ModNonterminalStructure::new(language)),
            mod_word: Model::new(ModWordStructure::new(language)),
            lex_prior: Model::new(LexPriorStructure),
            nonterminal_prior: Model::new(NonterminalPriorStructure),
            top_nonterminal: Model::new(TopNonterminalStructure),
            top_lex: Model::new(TopLexStructure),
            pos_map: FxHashMap::default(),
            head_to_parents: FxHashMap::default(),
            left_subcats: FxHashMap::default(),
            right_subcats: FxHashMap::default(),
            vocabulary: FxHashSet::default(),
            unknown_tags: Vec::new(),
            num_prev_mods: 1,
            num_prev_words: 1,
        };

        let mut pos: FxHashMap<Symbol, BTreeSet<Symbol>> = FxHashMap::default();
        let mut parents: FxHashMap<Symbol, BTreeSet<Symbol>> = FxHashMap::default();
        let mut unknown_tags = BTreeSet::new();
        let unknown_prefix = "+unknown";

        for (event, count) in events.heads.iter() {
            if event.parent == symbols::top() {
                models.top_nonterminal.add_event(event, count);
                models.top_lex.add_event(event, count);
            } else if is_lexical(event) {
                let word = event.head_word.word;
                pos.entry(word).or_default().insert(event.head_word.tag);
                models.vocabulary.insert(word);
                if word.as_str().starts_with(unknown_prefix) {
                    unknown_tags.insert(event.head_word.tag);
                }
            } else {
                models.head.add_event(event, count);
                models.left_subcat.add_event(event, count);
                models.right_subcat.add_event(event, count);
                parents.entry(event.head).or_default().insert(event.parent);
                for (side, map) in [(Side::Left, &mut models.left_subcats), (Side::Right, &mut models.right_subcats)] {
                    let frames = map.entry((event.head, event.parent)).or_default();
                    let frame = event.subcat(side);
                    if !frames.contains(frame) {
                        frames.push(frame.clone());
                    }
                }
            }
        }
        for (event, count) in events.modifiers.iter() {
            models.mod_nonterminal.add_event(event, count);
            models.mod_word.add_event(event, count);
            models.num_prev_mods = event.previous_mods.len().max(1);
            models.num_prev_words = event.previous_words.len().max(1);
        }
        for (event, count) in events.priors.iter() {
            models.lex_prior.add_event(event, count);
            models.nonterminal_prior.add_event(event, count);
        }
        if !events.gaps.is_empty() {
            log::debug!("{} gap events observed; gaps are not modelled while decoding", events.gaps.len());
        }

        models.pos_map = pos.into_iter().map(|(w, tags)| (w, sorted(tags))).collect();
        models.head_to_parents = parents.into_iter().map(|(h, ps)| (h, sorted(ps))).collect();
        for frames in models.left_subcats.values_mut().chain(models.right_subcats.values_mut()) {
            frames.sort();
        }
        models.unknown_tags = sorted(unknown_tags);

        log::info!(
            "derived models: vocabulary {}, head {:?}, mod-nonterminal {:?}, mod-word {:?}",
            models.vocabulary.len(),
            models.head.sizes(),
            models.mod_nonterminal.sizes(),
            models.mod_word.sizes()
        );
        models
    }

    /// Candidate tags for a (possibly unknown-class) word.
    pub fn tags_for(&self, word: Symbol) -> &[Symbol] {
        match self.pos_map.get(&word) {
            Some(tags) => tags.as_slice(),
            None => match self.pos_map.get(&symbols::unknown()) {
                Some(tags) => tags.as_slice(),
                None => self.unknown_tags.as_slice(),
            },
        }
    }

    pub fn parents_of(&self, head: Symbol) -> &[Symbol] {
        self.head_to_parents.get(&head).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn subcats(&self, side: Side, head: Symbol, parent: Symbol) -> &[Subcat] {
        let map = match side {
            Side::Left => &self.left_subcats,
            Side::Right => &self.right_subcats,
        };
        map.get(&(head, parent)).map(Vec::as_slice).unwrap_or(&[])
    }
}
