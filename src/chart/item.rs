use super::pool::ItemId;
use crate::sexp::Symbol;
use crate::subcat::Subcat;
use crate::trainer_event::Side;
use crate::word::Word;
use std::sync::Arc;

/// Derivation state of one side of an item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideState {
    /// Arguments still to be generated on this side.
    pub subcat: Subcat,
    /// Modifiers attached so far, nearest to the head first.
    pub children: Vec<ItemId>,
    /// Window of previous modifier labels, most recent first.
    pub prev_mods: Vec<Symbol>,
    /// Window of previous modifier head words, most recent first.
    pub prev_words: Vec<Word>,
    /// Some modifier attached on this side dominates a verb.
    pub verb: bool,
}

impl SideState {
    /// Fresh side: nothing attached, windows padded with `+START+`.
    pub fn open(subcat: Subcat, num_prev_mods: usize, num_prev_words: usize) -> Self {
        SideState {
            subcat,
            children: Vec::new(),
            prev_mods: vec![crate::sexp::symbols::start(); num_prev_mods],
            prev_words: vec![Word::start(); num_prev_words],
            verb: false,
        }
    }
}

/// One parse hypothesis over the span `start..=end`.
///
/// A preterminal item has no head child. Every other item is headed by an
/// item over the same span (a unary chain) and grows outward by attaching
/// stopped items from adjacent spans on either side.
#[derive(Debug, Clone)]
pub struct Item {
    pub label: Symbol,
    /// Label of the head child; the tag itself for a preterminal.
    pub head_label: Symbol,
    pub head_word: Arc<Word>,
    pub start: usize,
    pub end: usize,
    pub head_child: Option<ItemId>,
    pub left: SideState,
    pub right: SideState,
    /// Both sides have generated `+STOP+`.
    pub stop: bool,
    pub contains_verb: bool,
    /// Log-probability of the derivation below and including this item.
    pub log_tree_prob: f64,
    /// Log-probability of the item's label and head word, used for ranking.
    pub log_prior: f64,
    /// `log_tree_prob + log_prior`: the figure the beam compares.
    pub log_prob: f64,
}

impl Item {
    /// Preterminal hypothesis `tag` for the word at `position`.
    pub fn preterminal(word: Arc<Word>, position: usize, contains_verb: bool, log_prior: f64) -> Item {
        Item {
            label: word.tag,
            head_label: word.tag,
            head_word: word,
            start: position,
            end: position,
            head_child: None,
            left: SideState::default(),
            right: SideState::default(),
            stop: true,
            contains_verb,
            log_tree_prob: 0.0,
            log_prior,
            log_prob: log_prior,
        }
    }

    pub fn is_preterminal(&self) -> bool {
        self.head_child.is_none()
    }

    /// `end - start`: zero for a single word.
    pub fn span(&self) -> usize {
        self.end - self.start
    }

    pub fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.left.children.is_empty() || !self.right.children.is_empty()
    }

    /// Recompute `log_prob` after either component changed.
    pub fn update_log_prob(&mut self) {
        self.log_prob = self.log_tree_prob + self.log_prior;
    }

    /// Every item this one refers to.
    pub fn references(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.head_child.into_iter().chain(self.left.children.iter().copied()).chain(self.right.children.iter().copied())
    }

    /// Children in surface order: left modifiers outermost first, the head,
    /// then right modifiers.
    pub fn children_in_order(&self) -> Vec<ItemId> {
        let mut ordered: Vec<ItemId> = self.left.children.iter().rev().copied().collect();
        ordered.extend(self.head_child);
        ordered.extend(self.right.children.iter().copied());
        ordered
    }

    /// Key under which two items are interchangeable for every future step.
    pub fn signature(&self) -> ItemSignature {
        if self.stop {
            return ItemSignature::Stopped {
                label: self.label,
                head_word: Word::clone(&self.head_word),
                contains_verb: self.contains_verb,
                preterminal: self.is_preterminal(),
            };
        }
        let side = |s: &SideState| OpenSide {
            subcat: s.subcat.clone(),
            prev_mods: s.prev_mods.clone(),
            prev_words: s.prev_words.clone(),
            verb: s.verb,
            adjacent: s.children.is_empty(),
        };
        ItemSignature::Open {
            label: self.label,
            head_label: self.head_label,
            head_word: Word::clone(&self.head_word),
            left: side(&self.left),
            right: side(&self.right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpenSide {
    subcat: Subcat,
    prev_mods: Vec<Symbol>,
    prev_words: Vec<Word>,
    verb: bool,
    adjacent: bool,
}

/// Dynamic-programming equivalence of items within one cell.
///
/// A finished constituent only exposes its label, head word and whether it
/// dominates a verb to the steps above it; an open one also carries its
/// subcats and history windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemSignature {
    Stopped { label: Symbol, head_word: Word, contains_verb: bool, preterminal: bool },
    Open { label: Symbol, head_label: Symbol, head_word: Word, left: OpenSide, right: OpenSide },
}
