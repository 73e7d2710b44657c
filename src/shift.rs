//! Previous-modifier history policy.
//!
//! Modifier events condition on a fixed-width window of the most recently
//! generated modifiers (and their head words) on the same side. A [`Shift`]
//! implementation decides which modifiers enter that window:
//!
//! ```text
//! window [NP, +START+]   shift(ADVP)   ->  [ADVP, NP]
//! window [NP, +START+]   no shift(,)   ->  [NP, +START+]
//! ```
//!
//! The trainer calls `shift_*` while walking a constituent's children. The
//! decoder rebuilds the same window from an item's existing children and
//! asks [`Shift::skip`] for each one, so both sides must agree.

use crate::error::{Error, Result};
use crate::sexp::Symbol;
use crate::treebank::Treebank;
use crate::word::Word;
use std::sync::Arc;

/// Folding policy for the previous-modifier window.
pub trait Shift: Send + Sync {
    /// Whether `prev_mod`, just generated under `parent`, enters the window.
    fn shifts_mod(&self, parent: Symbol, prev_mod: Symbol) -> bool;

    /// Whether `prev_word`, the head word of a modifier just generated under
    /// `parent`, enters the word window.
    fn shifts_word(&self, parent: Symbol, prev_word: &Word) -> bool;

    /// Whether the decoder leaves the existing child `prev_mod` of an item
    /// labelled `item_label` out of the window it reconstructs.
    fn skip(&self, item_label: Symbol, prev_mod: Symbol) -> bool;

    /// Push `prev_mod` onto the front of `window` (dropping the oldest) when
    /// the policy allows it.
    fn shift_mod(&self, parent: Symbol, window: &mut [Symbol], prev_mod: Symbol) {
        if !window.is_empty() && self.shifts_mod(parent, prev_mod) {
            window.rotate_right(1);
            window[0] = prev_mod;
        }
    }

    fn shift_word(&self, parent: Symbol, window: &mut [Word], prev_word: &Word) {
        if !window.is_empty() && self.shifts_word(parent, prev_word) {
            window.rotate_right(1);
            window[0] = prev_word.clone();
        }
    }
}

/// Every modifier enters the window; nothing is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultShifter;

impl Shift for DefaultShifter {
    fn shifts_mod(&self, _parent: Symbol, _prev_mod: Symbol) -> bool {
        true
    }

    fn shifts_word(&self, _parent: Symbol, _prev_word: &Word) -> bool {
        true
    }

    fn skip(&self, _item_label: Symbol, _prev_mod: Symbol) -> bool {
        false
    }
}

/// Inside base noun phrases punctuation is invisible to the history.
pub struct BaseNpAwareShifter {
    treebank: Arc<dyn Treebank>,
}

impl BaseNpAwareShifter {
    pub fn new(treebank: Arc<dyn Treebank>) -> Self {
        BaseNpAwareShifter { treebank }
    }
}

impl Shift for BaseNpAwareShifter {
    fn shifts_mod(&self, parent: Symbol, prev_mod: Symbol) -> bool {
        !(self.treebank.is_base_np(parent) && self.treebank.is_punctuation(prev_mod))
    }

    fn shifts_word(&self, parent: Symbol, prev_word: &Word) -> bool {
        !(self.treebank.is_base_np(parent) && self.treebank.is_punctuation(prev_word.tag))
    }

    fn skip(&self, item_label: Symbol, prev_mod: Symbol) -> bool {
        self.treebank.is_base_np(item_label) && self.treebank.is_punctuation(prev_mod)
    }
}

/// Names accepted by the `parser.shifterClass` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShifterKind {
    #[default]
    Default,
    BaseNpAware,
}

impl ShifterKind {
    pub fn name(self) -> &'static str {
        match self {
            ShifterKind::Default => "default",
            ShifterKind::BaseNpAware => "baseNPAware",
        }
    }

    pub fn parse(name: &str) -> Result<ShifterKind> {
        match name {
            "default" => Ok(ShifterKind::Default),
            "baseNPAware" => Ok(ShifterKind::BaseNpAware),
            other => Err(Error::UnknownPolicy { kind: "shifter", name: other.to_string() }),
        }
    }

    /// Like [`ShifterKind::parse`], but an unknown name falls back to the
    /// default policy with a warning.
    pub fn from_name_or_default(name: &str) -> ShifterKind {
        ShifterKind::parse(name).unwrap_or_else(|err| {
            log::warn!("{err}; falling back to `{}`", ShifterKind::Default.name());
            ShifterKind::Default
        })
    }

    pub fn build(self, treebank: Arc<dyn Treebank>) -> Arc<dyn Shift> {
        match self {
            ShifterKind::Default => Arc::new(DefaultShifter),
            ShifterKind::BaseNpAware => Arc::new(BaseNpAwareShifter::new(treebank)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexp::symbols;
    use crate::treebank::PennTreebank;

    fn s(x: &str) -> Symbol {
        Symbol::new(x)
    }

    fn aware() -> BaseNpAwareShifter {
        BaseNpAwareShifter::new(Arc::new(PennTreebank))
    }

    #[test]
    fn base_np_aware_decisions() {
        let shifter = aware();
        // (shifts, parent, prev_mod)
        let cases: Vec<(bool, &str, &str)> = vec![
            (false, "NPB", ","),
            (true, "NPB", "JJ"),
            (true, "VP", ","),
            (true, "VP", "NP-A"),
        ];
        for (expected, parent, prev_mod) in cases {
            assert_eq!(shifter.shifts_mod(s(parent), s(prev_mod)), expected, "{parent} {prev_mod}");
            assert_eq!(shifter.skip(s(parent), s(prev_mod)), !expected, "{parent} {prev_mod}");
            let word = Word::new(s("x"), s(prev_mod));
            assert_eq!(shifter.shifts_word(s(parent), &word), expected, "{parent} {prev_mod}");
        }
    }

    #[test]
    fn default_always_shifts() {
        let shifter = DefaultShifter;
        for (parent, prev_mod) in [("NPB", ","), ("NPB", "JJ"), ("VP", ",")] {
            assert!(shifter.shifts_mod(s(parent), s(prev_mod)));
            assert!(!shifter.skip(s(parent), s(prev_mod)));
        }
    }

    #[test]
    fn window_shifts_and_drops_oldest() {
        let shifter = aware();
        let mut window = [symbols::start(), symbols::start()];
        shifter.shift_mod(s("NPB"), &mut window, s("JJ"));
        assert_eq!(window, [s("JJ"), symbols::start()]);
        shifter.shift_mod(s("NPB"), &mut window, s(","));
        assert_eq!(window, [s("JJ"), symbols::start()]);
        shifter.shift_mod(s("NPB"), &mut window, s("NN"));
        assert_eq!(window, [s("NN"), s("JJ")]);

        let mut empty: [Symbol; 0] = [];
        shifter.shift_mod(s("NPB"), &mut empty, s("NN"));
    }

    #[test]
    fn names() {
        assert_eq!(ShifterKind::parse("baseNPAware").unwrap(), ShifterKind::BaseNpAware);
        assert!(matches!(ShifterKind::parse("bogus"), Err(Error::UnknownPolicy { kind: "shifter", .. })));
        assert_eq!(ShifterKind::from_name_or_default("bogus"), ShifterKind::Default);
        for kind in [ShifterKind::Default, ShifterKind::BaseNpAware] {
            assert_eq!(ShifterKind::parse(kind.name()).unwrap(), kind);
        }
    }
}
