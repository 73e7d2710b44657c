//! Generation events: one record per generative step of the grammar.
//!
//! Training walks head-annotated trees and emits these; decoding builds the
//! same records to look up probabilities. Each kind has a fixed s-expression
//! form used by the observed-events file:
//!
//! ```text
//! head   (headWord parent head (leftSubcat) (rightSubcat))
//! gap    (direction headWord parent head)
//! prior  (headWord label)
//! mod    (modHeadWord headWord modifier (prevMods) (prevWords) parent head (subcat) verbIntervening side)
//! ```

use crate::error::{Error, Result};
use crate::sexp::{Sexp, SexpCodec, Symbol, symbols};
use crate::subcat::Subcat;
use crate::word::Word;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// --- Side / direction ---------------------------------------------------------

/// Side of the head child a modifier is generated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn symbol(self) -> Symbol {
        match self {
            Side::Left => sym!("left"),
            Side::Right => sym!("right"),
        }
    }

    pub fn from_symbol(symbol: Symbol) -> Option<Side> {
        match symbol.as_str() {
            "left" => Some(Side::Left),
            "right" => Some(Side::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Where a gap (trace) is passed when a constituent carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapDirection {
    Head,
    Left,
    Right,
}

impl GapDirection {
    pub fn symbol(self) -> Symbol {
        match self {
            GapDirection::Head => sym!("head"),
            GapDirection::Left => sym!("left"),
            GapDirection::Right => sym!("right"),
        }
    }

    pub fn from_symbol(symbol: Symbol) -> Option<GapDirection> {
        match symbol.as_str() {
            "head" => Some(GapDirection::Head),
            "left" => Some(GapDirection::Left),
            "right" => Some(GapDirection::Right),
            _ => None,
        }
    }
}

impl From<Side> for GapDirection {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => GapDirection::Left,
            Side::Right => GapDirection::Right,
        }
    }
}

// --- Common contract ----------------------------------------------------------

/// Behaviour shared by every concrete generation event.
pub trait GenerationEvent: Clone + Eq + Hash + SexpCodec + fmt::Display {
    /// Event name used in the observed-events file.
    const NAME: &'static str;

    fn head_word(&self) -> Option<&Arc<Word>>;

    fn mod_head_word(&self) -> Option<&Arc<Word>> {
        None
    }

    fn parent(&self) -> Option<Symbol>;

    /// Independent copy: no word is shared with `self`.
    fn copy(&self) -> Self;

    /// Copy sharing the head-word allocation with `self`.
    fn shallow_copy(&self) -> Self {
        self.clone()
    }

    fn into_trainer_event(self) -> TrainerEvent;
}

fn fresh(word: &Arc<Word>) -> Arc<Word> {
    Arc::new(Word::clone(word))
}

fn word_from(sexp: &Sexp) -> Result<Arc<Word>> {
    Word::from_sexp(sexp).map(Arc::new)
}

macro_rules! impl_display_via_sexp {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_sexp())
            }
        }
    )*};
}

// --- Head ---------------------------------------------------------------------

/// Generation of the head child `head` of `parent`, with its subcat frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadEvent {
    pub head_word: Arc<Word>,
    pub parent: Symbol,
    pub head: Symbol,
    pub left_subcat: Subcat,
    pub right_subcat: Subcat,
}

impl HeadEvent {
    pub fn new(head_word: Arc<Word>, parent: Symbol, head: Symbol, left_subcat: Subcat, right_subcat: Subcat) -> Self {
        HeadEvent { head_word, parent, head, left_subcat, right_subcat }
    }

    pub fn subcat(&self, side: Side) -> &Subcat {
        match side {
            Side::Left => &self.left_subcat,
            Side::Right => &self.right_subcat,
        }
    }
}

impl GenerationEvent for HeadEvent {
    const NAME: &'static str = "head";

    fn head_word(&self) -> Option<&Arc<Word>> {
        Some(&self.head_word)
    }

    fn parent(&self) -> Option<Symbol> {
        Some(self.parent)
    }

    fn copy(&self) -> Self {
        HeadEvent { head_word: fresh(&self.head_word), ..self.clone() }
    }

    fn into_trainer_event(self) -> TrainerEvent {
        TrainerEvent::Head(self)
    }
}

impl SexpCodec for HeadEvent {
    fn to_sexp(&self) -> Sexp {
        sexp_list![self.head_word.to_sexp(), self.parent, self.head, self.left_subcat.to_sexp(), self.right_subcat.to_sexp()]
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        let items = sexp.expect_list(5, "head event")?;
        Ok(HeadEvent {
            head_word: word_from(&items[0])?,
            parent: items[1].expect_symbol("head event parent")?,
            head: items[2].expect_symbol("head event head")?,
            left_subcat: Subcat::from_sexp(&items[3])?,
            right_subcat: Subcat::from_sexp(&items[4])?,
        })
    }
}

// --- Gap ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GapEvent {
    pub direction: GapDirection,
    pub head_word: Arc<Word>,
    pub parent: Symbol,
    pub head: Symbol,
}

impl GenerationEvent for GapEvent {
    const NAME: &'static str = "gap";

    fn head_word(&self) -> Option<&Arc<Word>> {
        Some(&self.head_word)
    }

    fn parent(&self) -> Option<Symbol> {
        Some(self.parent)
    }

    fn copy(&self) -> Self {
        GapEvent { head_word: fresh(&self.head_word), ..self.clone() }
    }

    fn into_trainer_event(self) -> TrainerEvent {
        TrainerEvent::Gap(self)
    }
}

impl SexpCodec for GapEvent {
    fn to_sexp(&self) -> Sexp {
        sexp_list![self.direction.symbol(), self.head_word.to_sexp(), self.parent, self.head]
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        let items = sexp.expect_list(4, "gap event")?;
        let direction = items[0].expect_symbol("gap direction")?;
        let direction = GapDirection::from_symbol(direction)
            .ok_or_else(|| Error::malformed(0, format!("unknown gap direction `{direction}`")))?;
        Ok(GapEvent {
            direction,
            head_word: word_from(&items[1])?,
            parent: items[2].expect_symbol("gap event parent")?,
            head: items[3].expect_symbol("gap event head")?,
        })
    }
}

// --- Prior --------------------------------------------------------------------

/// Marginal occurrence of a lexicalized constituent `(headWord, label)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriorEvent {
    pub head_word: Arc<Word>,
    pub label: Symbol,
}

impl PriorEvent {
    pub fn new(head_word: Arc<Word>, label: Symbol) -> Self {
        PriorEvent { head_word, label }
    }

    /// Every prior shares one constant history, so its counts are plain
    /// marginal frequencies.
    pub fn history() -> Symbol {
        symbols::stop()
    }
}

impl GenerationEvent for PriorEvent {
    const NAME: &'static str = "prior";

    fn head_word(&self) -> Option<&Arc<Word>> {
        Some(&self.head_word)
    }

    fn parent(&self) -> Option<Symbol> {
        None
    }

    fn copy(&self) -> Self {
        PriorEvent { head_word: fresh(&self.head_word), label: self.label }
    }

    fn into_trainer_event(self) -> TrainerEvent {
        TrainerEvent::Prior(self)
    }
}

impl SexpCodec for PriorEvent {
    fn to_sexp(&self) -> Sexp {
        sexp_list![self.head_word.to_sexp(), self.label]
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        let items = sexp.expect_list(2, "prior event")?;
        Ok(PriorEvent { head_word: word_from(&items[0])?, label: items[1].expect_symbol("prior event label")? })
    }
}

// --- Modifier -----------------------------------------------------------------

/// Generation of one modifier (or the closing `+STOP+`) on one side of a head.
///
/// `prev_punc`, `prev_conj`, `is_conj_p_conj` and `head_adjacent` describe
/// the generation context but are not part of the event's identity and are
/// not persisted.
#[derive(Debug, Clone)]
pub struct ModifierEvent {
    pub mod_head_word: Arc<Word>,
    pub head_word: Arc<Word>,
    pub modifier: Symbol,
    pub previous_mods: Vec<Symbol>,
    pub previous_words: Vec<Word>,
    pub parent: Symbol,
    pub head: Symbol,
    pub subcat: Subcat,
    pub prev_punc: Option<Arc<Word>>,
    pub prev_conj: Option<Arc<Word>>,
    pub is_conj_p_conj: bool,
    pub verb_intervening: bool,
    pub head_adjacent: bool,
    pub side: Side,
}

impl ModifierEvent {
    /// The most recent previous modifier (`+START+` when none).
    pub fn last_previous_mod(&self) -> Symbol {
        self.previous_mods.first().copied().unwrap_or_else(symbols::start)
    }

    pub fn is_stop(&self) -> bool {
        self.modifier == symbols::stop()
    }
}

impl PartialEq for ModifierEvent {
    fn eq(&self, other: &Self) -> bool {
        self.side == other.side
            && self.modifier == other.modifier
            && self.parent == other.parent
            && self.head == other.head
            && self.verb_intervening == other.verb_intervening
            && self.mod_head_word == other.mod_head_word
            && self.head_word == other.head_word
            && self.previous_mods == other.previous_mods
            && self.previous_words == other.previous_words
            && self.subcat == other.subcat
    }
}

impl Eq for ModifierEvent {}

impl Hash for ModifierEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mod_head_word.hash(state);
        self.head_word.hash(state);
        self.modifier.hash(state);
        self.previous_mods.hash(state);
        self.previous_words.hash(state);
        self.parent.hash(state);
        self.head.hash(state);
        self.subcat.hash(state);
        self.verb_intervening.hash(state);
        self.side.hash(state);
    }
}

impl GenerationEvent for ModifierEvent {
    const NAME: &'static str = "mod";

    fn head_word(&self) -> Option<&Arc<Word>> {
        Some(&self.head_word)
    }

    fn mod_head_word(&self) -> Option<&Arc<Word>> {
        Some(&self.mod_head_word)
    }

    fn parent(&self) -> Option<Symbol> {
        Some(self.parent)
    }

    fn copy(&self) -> Self {
        ModifierEvent {
            mod_head_word: fresh(&self.mod_head_word),
            head_word: fresh(&self.head_word),
            prev_punc: self.prev_punc.as_ref().map(fresh),
            prev_conj: self.prev_conj.as_ref().map(fresh),
            ..self.clone()
        }
    }

    fn into_trainer_event(self) -> TrainerEvent {
        TrainerEvent::Modifier(self)
    }
}

impl SexpCodec for ModifierEvent {
    fn to_sexp(&self) -> Sexp {
        sexp_list![
            self.mod_head_word.to_sexp(),
            self.head_word.to_sexp(),
            self.modifier,
            Sexp::List(self.previous_mods.iter().map(|m| Sexp::Symbol(*m)).collect()),
            Sexp::List(self.previous_words.iter().map(Word::to_sexp).collect()),
            self.parent,
            self.head,
            self.subcat.to_sexp(),
            symbols::from_bool(self.verb_intervening),
            self.side.symbol(),
        ]
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        let items = sexp.expect_list(10, "modifier event")?;
        let previous_mods = items[3]
            .list()
            .ok_or_else(|| Error::malformed(0, "previous modifiers must be a list"))?
            .iter()
            .map(|m| m.expect_symbol("previous modifier"))
            .collect::<Result<Vec<_>>>()?;
        let previous_words = items[4]
            .list()
            .ok_or_else(|| Error::malformed(0, "previous words must be a list"))?
            .iter()
            .map(Word::from_sexp)
            .collect::<Result<Vec<_>>>()?;
        let verb = items[8].expect_symbol("verb-intervening flag")?;
        let verb_intervening = match verb.as_str() {
            "true" => true,
            "false" => false,
            other => return Err(Error::malformed(0, format!("expected true/false, found `{other}`"))),
        };
        let side = items[9].expect_symbol("side")?;
        let side = Side::from_symbol(side).ok_or_else(|| Error::malformed(0, format!("unknown side `{side}`")))?;
        Ok(ModifierEvent {
            mod_head_word: word_from(&items[0])?,
            head_word: word_from(&items[1])?,
            modifier: items[2].expect_symbol("modifier")?,
            previous_mods,
            previous_words,
            parent: items[5].expect_symbol("modifier event parent")?,
            head: items[6].expect_symbol("modifier event head")?,
            subcat: Subcat::from_sexp(&items[7])?,
            prev_punc: None,
            prev_conj: None,
            is_conj_p_conj: false,
            verb_intervening,
            head_adjacent: false,
            side,
        })
    }
}

impl_display_via_sexp!(HeadEvent, GapEvent, PriorEvent, ModifierEvent);

// --- Union --------------------------------------------------------------------

/// Any generation event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrainerEvent {
    Head(HeadEvent),
    Gap(GapEvent),
    Prior(PriorEvent),
    Modifier(ModifierEvent),
}

impl TrainerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TrainerEvent::Head(_) => HeadEvent::NAME,
            TrainerEvent::Gap(_) => GapEvent::NAME,
            TrainerEvent::Prior(_) => PriorEvent::NAME,
            TrainerEvent::Modifier(_) => ModifierEvent::NAME,
        }
    }

    pub fn head_word(&self) -> Option<&Arc<Word>> {
        match self {
            TrainerEvent::Head(e) => e.head_word(),
            TrainerEvent::Gap(e) => e.head_word(),
            TrainerEvent::Prior(e) => e.head_word(),
            TrainerEvent::Modifier(e) => e.head_word(),
        }
    }

    pub fn set_head_word(&mut self, word: Arc<Word>) {
        match self {
            TrainerEvent::Head(e) => e.head_word = word,
            TrainerEvent::Gap(e) => e.head_word = word,
            TrainerEvent::Prior(e) => e.head_word = word,
            TrainerEvent::Modifier(e) => e.head_word = word,
        }
    }

    pub fn mod_head_word(&self) -> Option<&Arc<Word>> {
        match self {
            TrainerEvent::Modifier(e) => e.mod_head_word(),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<Symbol> {
        match self {
            TrainerEvent::Head(e) => e.parent(),
            TrainerEvent::Gap(e) => e.parent(),
            TrainerEvent::Prior(e) => e.parent(),
            TrainerEvent::Modifier(e) => e.parent(),
        }
    }

    pub fn try_side(&self) -> Option<Side> {
        match self {
            TrainerEvent::Modifier(e) => Some(e.side),
            _ => None,
        }
    }

    /// Side of a modifier event.
    ///
    /// # Panics
    ///
    /// When called on any other kind of event.
    pub fn side(&self) -> Side {
        match self.try_side() {
            Some(side) => side,
            None => panic!("side() called on a {} event, which has no side", self.name()),
        }
    }

    pub fn copy(&self) -> TrainerEvent {
        match self {
            TrainerEvent::Head(e) => TrainerEvent::Head(e.copy()),
            TrainerEvent::Gap(e) => TrainerEvent::Gap(e.copy()),
            TrainerEvent::Prior(e) => TrainerEvent::Prior(e.copy()),
            TrainerEvent::Modifier(e) => TrainerEvent::Modifier(e.copy()),
        }
    }

    pub fn shallow_copy(&self) -> TrainerEvent {
        self.clone()
    }

    pub fn to_sexp(&self) -> Sexp {
        match self {
            TrainerEvent::Head(e) => e.to_sexp(),
            TrainerEvent::Gap(e) => e.to_sexp(),
            TrainerEvent::Prior(e) => e.to_sexp(),
            TrainerEvent::Modifier(e) => e.to_sexp(),
        }
    }

    /// Parse the body of an event named `name` (`head`, `gap`, `prior`, `mod`).
    pub fn from_named_sexp(name: Symbol, body: &Sexp) -> Result<TrainerEvent> {
        match name.as_str() {
            n if n == HeadEvent::NAME => HeadEvent::from_sexp(body).map(TrainerEvent::Head),
            n if n == GapEvent::NAME => GapEvent::from_sexp(body).map(TrainerEvent::Gap),
            n if n == PriorEvent::NAME => PriorEvent::from_sexp(body).map(TrainerEvent::Prior),
            n if n == ModifierEvent::NAME => ModifierEvent::from_sexp(body).map(TrainerEvent::Modifier),
            other => Err(Error::malformed(0, format!("unknown event name `{other}`"))),
        }
    }
}

impl fmt::Display for TrainerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.name(), self.to_sexp())
    }
}
