use crate::error::Result;
use crate::sexp::{Sexp, SexpCodec, Symbol, symbols};
use bitflags::bitflags;
use std::fmt;

/// A lexical item: surface word, part-of-speech tag and optional features.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word {
    pub word: Symbol,
    pub tag: Symbol,
    pub features: Option<Symbol>,
}

impl Word {
    pub fn new(word: Symbol, tag: Symbol) -> Self {
        Word { word, tag, features: None }
    }

    pub fn with_features(word: Symbol, tag: Symbol, features: Symbol) -> Self {
        Word { word, tag, features: Some(features) }
    }

    /// Word and tag used to pad previous-word windows.
    pub fn start() -> Self {
        Word::new(symbols::start(), symbols::start())
    }

    /// Head word of the `+STOP+` pseudo-modifier.
    pub fn stop() -> Self {
        Word::new(symbols::stop(), symbols::stop())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sexp())
    }
}

impl SexpCodec for Word {
    fn to_sexp(&self) -> Sexp {
        match self.features {
            None => sexp_list![self.word, self.tag],
            Some(features) => sexp_list![self.word, self.tag, features],
        }
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        let items = match sexp.list() {
            Some(items) if items.len() == 3 => items,
            _ => sexp.expect_list(2, "word")?,
        };
        let word = items[0].expect_symbol("word")?;
        let tag = items[1].expect_symbol("tag")?;
        let features = items.get(2).map(|f| f.expect_symbol("word features")).transpose()?;
        Ok(Word { word, tag, features })
    }
}

// --- Word shape ---------------------------------------------------------------

bitflags! {
    /// Orthographic shape of a word, used to pick an unknown-word class.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WordShape: u8 {
        const CAPITALIZED = 1 << 0;
        const ALL_CAPS    = 1 << 1;
        const HAS_DIGIT   = 1 << 2;
        const HAS_HYPHEN  = 1 << 3;
        const FIRST_WORD  = 1 << 4;
        const NON_ALPHA   = 1 << 5;
    }
}

impl WordShape {
    pub fn of(word: &str, first_word: bool) -> WordShape {
        let mut shape = WordShape::empty();
        let mut letters = 0usize;
        let mut upper = 0usize;
        for c in word.chars() {
            if c.is_alphabetic() {
                letters += 1;
                if c.is_uppercase() {
                    upper += 1;
                }
            } else if c.is_ascii_digit() {
                shape |= WordShape::HAS_DIGIT;
            } else if c == '-' {
                shape |= WordShape::HAS_HYPHEN;
            } else {
                shape |= WordShape::NON_ALPHA;
            }
        }
        if word.chars().next().is_some_and(char::is_uppercase) {
            shape |= WordShape::CAPITALIZED;
        }
        if letters > 1 && upper == letters {
            shape |= WordShape::ALL_CAPS;
        }
        if first_word {
            shape |= WordShape::FIRST_WORD;
        }
        shape
    }

    /// Suffix appended to `+unknown` when naming the class, e.g. `+cap+digit`.
    pub fn suffix(self) -> String {
        let mut out = String::new();
        for (name, flag) in [
            ("cap", WordShape::CAPITALIZED),
            ("allcaps", WordShape::ALL_CAPS),
            ("digit", WordShape::HAS_DIGIT),
            ("hyphen", WordShape::HAS_HYPHEN),
            ("first", WordShape::FIRST_WORD),
            ("sym", WordShape::NON_ALPHA),
        ] {
            if self.contains(flag) {
                out.push('+');
                out.push_str(name);
            }
        }
        out
    }
}
