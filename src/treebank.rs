//! Grammar policy: everything that depends on the treebank's conventions.
//!
//! The parser core only ever asks questions of these traits, so a different
//! annotation scheme plugs in by implementing them:
//!
//! - [`Treebank`]: nonterminal and tag classification, augmentation handling.
//! - [`HeadFinder`]: which child of a production is its head.
//! - [`WordFeatures`]: which unknown-word class a rare or unseen word maps to.
//! - [`NtMapper`]: coarse equivalence class of a previous modifier.
//!
//! [`Language`] bundles one implementation of each. [`Language::penn`] wires
//! up the Penn Treebank defaults.
//!
//! Label augmentations follow the Penn/Collins convention:
//!
//! ```text
//! NP-SBJ-2     function tag SBJ, coindex 2     canonical: NP
//! NP-A         argument                         canonical: NP-A
//! S-A-g        argument carrying a gap          canonical: S-A-g
//! -NONE-       leading dash: never split
//! ```

#[path = "treebank/head_table.rs"]
mod head_table;
#[path = "treebank/nt_mapper.rs"]
mod nt_mapper;
#[path = "treebank/word_features.rs"]
mod word_features;

pub use head_table::{HeadTable, ScanDirection};
pub use nt_mapper::CollinsNtMapper;
pub use word_features::PennWordFeatures;

use crate::sexp::Symbol;
use std::fmt;
use std::sync::Arc;

// --- Policy traits ------------------------------------------------------------

/// Nonterminal and tag classification.
pub trait Treebank: Send + Sync {
    /// Base label without any augmentation (`NP-A-g` -> `NP`).
    fn strip_augmentation(&self, label: Symbol) -> Symbol;

    /// Label without function tags or coindices, keeping argument and gap marks.
    fn canonical_label(&self, label: Symbol) -> Symbol;

    /// Whether the raw label carries an adverbial function tag that keeps it
    /// from being an argument (`NP-TMP`, `S-ADV`, ...).
    fn has_adjunct_function_tag(&self, label: Symbol) -> bool;

    fn is_argument(&self, label: Symbol) -> bool;

    fn add_argument_mark(&self, label: Symbol) -> Symbol;

    fn strip_arg(&self, label: Symbol) -> Symbol;

    fn has_gap(&self, label: Symbol) -> bool;

    fn strip_gap(&self, label: Symbol) -> Symbol;

    fn np_label(&self) -> Symbol;

    fn base_np_label(&self) -> Symbol;

    fn is_np(&self, label: Symbol) -> bool {
        self.strip_augmentation(label) == self.np_label()
    }

    fn is_base_np(&self, label: Symbol) -> bool {
        self.strip_augmentation(label) == self.base_np_label()
    }

    fn is_punctuation(&self, label: Symbol) -> bool;

    fn is_conjunction(&self, label: Symbol) -> bool;

    fn is_verb_tag(&self, tag: Symbol) -> bool;

    fn is_possessive_tag(&self, tag: Symbol) -> bool;

    /// Tag of empty elements (traces, null complementizers).
    fn is_null_element(&self, tag: Symbol) -> bool;

    fn is_comma(&self, word: Symbol) -> bool;

    fn is_left_paren(&self, word: Symbol) -> bool;

    fn is_right_paren(&self, word: Symbol) -> bool;
}

/// Picks the head child of a production.
pub trait HeadFinder: Send + Sync {
    /// Index into `children` of the head. `parent` and `children` are base
    /// labels (no augmentation). `children` is never empty.
    fn find_head(&self, parent: Symbol, children: &[Symbol]) -> usize;
}

/// Maps rare and unseen words to unknown-word classes.
pub trait WordFeatures: Send + Sync {
    fn unknown_class(&self, word: &str, first_word: bool) -> Symbol;
}

/// Reduces a previous modifier to a small equivalence class.
pub trait NtMapper: Send + Sync {
    fn map(&self, prev_mod: Symbol) -> Symbol;
}

// --- Penn Treebank ------------------------------------------------------------

/// Penn Treebank conventions with Collins-style `NPB`, `-A` and `-g` marks.
#[derive(Debug, Default, Clone, Copy)]
pub struct PennTreebank;

const ADJUNCT_TAGS: &[&str] = &["ADV", "VOC", "BNF", "DIR", "EXT", "LOC", "MNR", "PRP", "TMP"];
const PUNCTUATION_TAGS: &[&str] = &[",", ":", "``", "''", "."];

/// `(base, augmentations)`; labels with a leading dash are never split.
fn split_label(label: &str) -> (&str, &str) {
    if label.starts_with('-') {
        return (label, "");
    }
    match label.find(['-', '=']) {
        Some(i) if i > 0 => (&label[..i], &label[i + 1..]),
        _ => (label, ""),
    }
}

fn join_label(base: &str, marks: &[&str]) -> Symbol {
    if marks.is_empty() {
        return Symbol::new(base);
    }
    let mut out = String::with_capacity(base.len() + marks.len() * 2);
    out.push_str(base);
    for mark in marks {
        out.push('-');
        out.push_str(mark);
    }
    Symbol::new(&out)
}

impl PennTreebank {
    fn marks(label: Symbol) -> (&'static str, Vec<&'static str>) {
        let (base, rest) = split_label(label.as_str());
        (base, rest.split(['-', '=']).filter(|p| !p.is_empty()).collect())
    }

    fn without_mark(label: Symbol, mark: &str) -> Symbol {
        let (base, marks) = Self::marks(label);
        if !marks.contains(&mark) {
            return label;
        }
        let kept: Vec<&str> = marks.into_iter().filter(|m| *m != mark).collect();
        join_label(base, &kept)
    }
}

impl Treebank for PennTreebank {
    fn strip_augmentation(&self, label: Symbol) -> Symbol {
        let (base, _) = split_label(label.as_str());
        if base.len() == label.as_str().len() { label } else { Symbol::new(base) }
    }

    fn canonical_label(&self, label: Symbol) -> Symbol {
        let (base, marks) = Self::marks(label);
        let kept: Vec<&str> = marks.into_iter().filter(|m| *m == "A" || *m == "g").collect();
        join_label(base, &kept)
    }

    fn has_adjunct_function_tag(&self, label: Symbol) -> bool {
        Self::marks(label).1.iter().any(|m| ADJUNCT_TAGS.contains(m))
    }

    fn is_argument(&self, label: Symbol) -> bool {
        Self::marks(label).1.contains(&"A")
    }

    fn add_argument_mark(&self, label: Symbol) -> Symbol {
        if self.is_argument(label) {
            return label;
        }
        let (base, mut marks) = Self::marks(label);
        marks.insert(0, "A");
        join_label(base, &marks)
    }

    fn strip_arg(&self, label: Symbol) -> Symbol {
        Self::without_mark(label, "A")
    }

    fn has_gap(&self, label: Symbol) -> bool {
        Self::marks(label).1.contains(&"g")
    }

    fn strip_gap(&self, label: Symbol) -> Symbol {
        Self::without_mark(label, "g")
    }

    fn np_label(&self) -> Symbol {
        sym!("NP")
    }

    fn base_np_label(&self) -> Symbol {
        sym!("NPB")
    }

    fn is_punctuation(&self, label: Symbol) -> bool {
        PUNCTUATION_TAGS.contains(&label.as_str())
    }

    fn is_conjunction(&self, label: Symbol) -> bool {
        matches!(self.strip_augmentation(label).as_str(), "CC" | "CONJP")
    }

    fn is_verb_tag(&self, tag: Symbol) -> bool {
        let tag = tag.as_str();
        tag.starts_with("VB") || tag == "MD"
    }

    fn is_possessive_tag(&self, tag: Symbol) -> bool {
        tag.as_str() == "POS"
    }

    fn is_null_element(&self, tag: Symbol) -> bool {
        tag.as_str() == "-NONE-"
    }

    fn is_comma(&self, word: Symbol) -> bool {
        word.as_str() == ","
    }

    fn is_left_paren(&self, word: Symbol) -> bool {
        matches!(word.as_str(), "(" | "-LRB-" | "-LCB-" | "{")
    }

    fn is_right_paren(&self, word: Symbol) -> bool {
        matches!(word.as_str(), ")" | "-RRB-" | "-RCB-" | "}")
    }
}

// --- Language bundle ----------------------------------------------------------

/// One implementation of every policy trait.
#[derive(Clone)]
pub struct Language {
    pub treebank: Arc<dyn Treebank>,
    pub head_finder: Arc<dyn HeadFinder>,
    pub word_features: Arc<dyn WordFeatures>,
    pub nt_mapper: Arc<dyn NtMapper>,
}

impl Language {
    pub fn penn() -> Self {
        let treebank: Arc<dyn Treebank> = Arc::new(PennTreebank);
        Language {
            head_finder: HeadTable::penn(),
            word_features: Arc::new(PennWordFeatures),
            nt_mapper: Arc::new(CollinsNtMapper::new(Arc::clone(&treebank))),
            treebank,
        }
    }

    pub fn with_head_finder(mut self, head_finder: Arc<dyn HeadFinder>) -> Self {
        self.head_finder = head_finder;
        self
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::penn()
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("treebank", &"<policy>")
            .field("head_finder", &"<policy>")
            .field("word_features", &"<policy>")
            .field("nt_mapper", &"<policy>")
            .finish()
    }
}
