use super::ProbabilityStructure;
use crate::event::EventKey;
use crate::sexp::{Sexp, Symbol, symbols};
use crate::trainer_event::{HeadEvent, ModifierEvent, PriorEvent, Side};
use crate::treebank::{Language, NtMapper, Treebank};
use std::sync::Arc;

fn key() -> EventKey {
    EventKey::sexp()
}

fn prev_mods_sexp(event: &ModifierEvent) -> Sexp {
    Sexp::List(event.previous_mods.iter().map(|m| Sexp::Symbol(*m)).collect())
}

// --- Head ---------------------------------------------------------------------

/// `P(H | P, w, t)`, backing off to `(P, t)` and `(P)`.
pub struct HeadStructure {
    treebank: Arc<dyn Treebank>,
}

impl HeadStructure {
    pub fn new(language: &Language) -> Self {
        HeadStructure { treebank: Arc::clone(&language.treebank) }
    }
}

impl ProbabilityStructure for HeadStructure {
    type Event = HeadEvent;

    fn name(&self) -> &'static str {
        "head"
    }

    fn num_levels(&self) -> usize {
        3
    }

    fn history(&self, event: &HeadEvent, level: usize) -> EventKey {
        let parent = self.treebank.strip_gap(event.parent);
        let mut history = key();
        match level {
            0 => history.push(parent).push(event.head_word.word).push(event.head_word.tag),
            1 => history.push(parent).push(event.head_word.tag),
            _ => history.push(parent),
        };
        history
    }

    fn future(&self, event: &HeadEvent, _level: usize) -> EventKey {
        let mut future = key();
        future.push(event.head);
        future
    }
}

// --- Subcats ------------------------------------------------------------------

/// `P(subcat | H, P, w, t)` for one side, backing off to `(H, P, t)` and `(H, P)`.
pub struct SubcatStructure {
    side: Side,
    treebank: Arc<dyn Treebank>,
}

impl SubcatStructure {
    pub fn new(side: Side, language: &Language) -> Self {
        SubcatStructure { side, treebank: Arc::clone(&language.treebank) }
    }

    fn strip(&self, label: Symbol) -> Symbol {
        self.treebank.strip_arg(self.treebank.strip_gap(label))
    }
}

impl ProbabilityStructure for SubcatStructure {
    type Event = HeadEvent;

    fn name(&self) -> &'static str {
        match self.side {
            Side::Left => "left-subcat",
            Side::Right => "right-subcat",
        }
    }

    fn num_levels(&self) -> usize {
        3
    }

    fn history(&self, event: &HeadEvent, level: usize) -> EventKey {
        let head = self.strip(event.head);
        let parent = self.strip(event.parent);
        let mut history = key();
        match level {
            0 => history.push(head).push(parent).push(event.head_word.word).push(event.head_word.tag),
            1 => history.push(head).push(parent).push(event.head_word.tag),
            _ => history.push(head).push(parent),
        };
        history
    }

    fn future(&self, event: &HeadEvent, _level: usize) -> EventKey {
        let mut future = EventKey::with_subcat();
        future.push_subcat(event.subcat(self.side).clone());
        future
    }

    fn lambda_fudge(&self) -> f64 {
        0.0
    }

    fn lambda_fudge_term(&self) -> f64 {
        5.0
    }
}

// --- Modifiers ----------------------------------------------------------------

/// `P(M, t_M | P, H, w, t, verb, prevMods, side, subcat)`.
pub struct ModNonterminalStructure {
    treebank: Arc<dyn Treebank>,
    nt_mapper: Arc<dyn NtMapper>,
}

impl ModNonterminalStructure {
    pub fn new(language: &Language) -> Self {
        ModNonterminalStructure { treebank: Arc::clone(&language.treebank), nt_mapper: Arc::clone(&language.nt_mapper) }
    }
}

impl ProbabilityStructure for ModNonterminalStructure {
    type Event = ModifierEvent;

    fn name(&self) -> &'static str {
        "mod-nonterminal"
    }

    fn num_levels(&self) -> usize {
        3
    }

    fn history(&self, event: &ModifierEvent, level: usize) -> EventKey {
        let parent = self.treebank.strip_arg(event.parent);
        let verb = symbols::from_bool(event.verb_intervening);
        let last_mod = event.last_previous_mod();
        let mut history = key();
        history.push(parent).push(event.head);
        match level {
            0 => history.push(event.head_word.word).push(event.head_word.tag).push(verb).push(prev_mods_sexp(event)),
            1 => history.push(event.head_word.tag).push(verb).push(last_mod),
            _ => history.push(verb).push(self.nt_mapper.map(last_mod)),
        };
        history.push(event.side.symbol()).push_subcat(event.subcat.clone());
        history
    }

    fn future(&self, event: &ModifierEvent, _level: usize) -> EventKey {
        let mut future = key();
        future.push(event.modifier).push(event.mod_head_word.tag);
        future
    }
}

/// `P(w_M | M, t_M, P, H, w, t, verb, prevMods, side, subcat)`, backing off
/// to the modifier's tag alone.
pub struct ModWordStructure {
    treebank: Arc<dyn Treebank>,
    nt_mapper: Arc<dyn NtMapper>,
}

impl ModWordStructure {
    pub fn new(language: &Language) -> Self {
        ModWordStructure { treebank: Arc::clone(&language.treebank), nt_mapper: Arc::clone(&language.nt_mapper) }
    }
}

impl ProbabilityStructure for ModWordStructure {
    type Event = ModifierEvent;

    fn name(&self) -> &'static str {
        "mod-word"
    }

    fn num_levels(&self) -> usize {
        3
    }

    fn history(&self, event: &ModifierEvent, level: usize) -> EventKey {
        let mut history = key();
        history.push(event.modifier).push(event.mod_head_word.tag);
        if level >= 2 {
            return history;
        }
        let parent = self.treebank.strip_arg(event.parent);
        let verb = symbols::from_bool(event.verb_intervening);
        history.push(parent).push(event.head);
        if level == 0 {
            history.push(event.head_word.word).push(event.head_word.tag).push(verb).push(prev_mods_sexp(event));
        } else {
            history.push(event.head_word.tag).push(verb).push(self.nt_mapper.map(event.last_previous_mod()));
        }
        history.push(event.side.symbol()).push_subcat(event.subcat.clone());
        history
    }

    fn future(&self, event: &ModifierEvent, _level: usize) -> EventKey {
        let mut future = key();
        future.push(event.mod_head_word.word);
        future
    }
}

// --- Priors -------------------------------------------------------------------

/// Marginal `P(w, t)`.
#[derive(Debug, Default)]
pub struct LexPriorStructure;

impl ProbabilityStructure for LexPriorStructure {
    type Event = PriorEvent;

    fn name(&self) -> &'static str {
        "lex-prior"
    }

    fn num_levels(&self) -> usize {
        1
    }

    fn history(&self, _event: &PriorEvent, _level: usize) -> EventKey {
        let mut history = key();
        history.push(PriorEvent::history());
        history
    }

    fn future(&self, event: &PriorEvent, _level: usize) -> EventKey {
        let mut future = key();
        future.push(event.head_word.word).push(event.head_word.tag);
        future
    }
}

/// `P(label | w, t)`, backing off to `(t)`.
#[derive(Debug, Default)]
pub struct NonterminalPriorStructure;

impl ProbabilityStructure for NonterminalPriorStructure {
    type Event = PriorEvent;

    fn name(&self) -> &'static str {
        "nonterminal-prior"
    }

    fn num_levels(&self) -> usize {
        2
    }

    fn history(&self, event: &PriorEvent, level: usize) -> EventKey {
        let mut history = key();
        if level == 0 {
            history.push(event.head_word.word);
        }
        history.push(event.head_word.tag);
        history
    }

    fn future(&self, event: &PriorEvent, _level: usize) -> EventKey {
        let mut future = key();
        future.push(event.label);
        future
    }
}

// --- Top ----------------------------------------------------------------------

/// `P(H, t | +TOP+)` for the root constituent.
#[derive(Debug, Default)]
pub struct TopNonterminalStructure;

impl ProbabilityStructure for TopNonterminalStructure {
    type Event = HeadEvent;

    fn name(&self) -> &'static str {
        "top-nonterminal"
    }

    fn num_levels(&self) -> usize {
        1
    }

    fn history(&self, _event: &HeadEvent, _level: usize) -> EventKey {
        let mut history = key();
        history.push(symbols::top());
        history
    }

    fn future(&self, event: &HeadEvent, _level: usize) -> EventKey {
        let mut future = key();
        future.push(event.head).push(event.head_word.tag);
        future
    }
}

/// `P(w | H, t, +TOP+)`, backing off to `(t)`.
#[derive(Debug, Default)]
pub struct TopLexStructure;

impl ProbabilityStructure for TopLexStructure {
    type Event = HeadEvent;

    fn name(&self) -> &'static str {
        "top-lex"
    }

    fn num_levels(&self) -> usize {
        2
    }

    fn history(&self, event: &HeadEvent, level: usize) -> EventKey {
        let mut history = key();
        if level == 0 {
            history.push(event.head).push(event.head_word.tag).push(symbols::top());
        } else {
            history.push(event.head_word.tag);
        }
        history
    }

    fn future(&self, event: &HeadEvent, _level: usize) -> EventKey {
        let mut future = key();
        future.push(event.head_word.word);
        future
    }
}
