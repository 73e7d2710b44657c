//! Symbols and s-expressions.
//!
//! Every label, word and tag the parser touches is an interned [`Symbol`], so
//! equality and hashing are integer operations. Trees, events on disk and
//! counts files are all written as s-expressions:
//!
//! ```text
//! (S (NP-A (NPB (DT the) (NN dog))) (VP (VBD barked)))
//! (head ((barked VBD) S VP () ()) 3)
//! ```

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::fmt;
use std::sync::RwLock;

// --- Symbols ----------------------------------------------------------------

/// Interned string handle. Cheap to copy, compare and hash.
///
/// Ordering is lexicographic on the underlying text so that anything sorted by
/// symbol (subcat bags, persisted output) is stable across processes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

#[derive(Default)]
struct SymbolTable {
    str_to_id: FxHashMap<&'static str, Symbol>,
    id_to_str: Vec<&'static str>,
}

static SYMBOLS: Lazy<RwLock<SymbolTable>> = Lazy::new(|| RwLock::new(SymbolTable::default()));

impl Symbol {
    /// Intern `name`, returning the existing handle when it was seen before.
    pub fn new(name: &str) -> Symbol {
        if let Some(&sym) = SYMBOLS.read().unwrap_or_else(|e| e.into_inner()).str_to_id.get(name) {
            return sym;
        }
        let mut table = SYMBOLS.write().unwrap_or_else(|e| e.into_inner());
        if let Some(&sym) = table.str_to_id.get(name) {
            return sym;
        }
        // Interned text lives for the rest of the process.
        let text: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let sym = Symbol(table.id_to_str.len() as u32);
        table.id_to_str.push(text);
        table.str_to_id.insert(text, sym);
        sym
    }

    pub fn as_str(self) -> &'static str {
        SYMBOLS.read().unwrap_or_else(|e| e.into_inner()).id_to_str[self.0 as usize]
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 { Ordering::Equal } else { self.as_str().cmp(other.as_str()) }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::new(value)
    }
}

// --- Well-known symbols -----------------------------------------------------

/// Symbols with a fixed meaning in the generative model.
pub mod symbols {
    use super::Symbol;

    /// Fills the previous-modifier window before any modifier was generated.
    pub fn start() -> Symbol {
        sym!("+START+")
    }

    /// Label (and word) of the pseudo-modifier that ends a side.
    pub fn stop() -> Symbol {
        sym!("+STOP+")
    }

    /// Parent of the root constituent.
    pub fn top() -> Symbol {
        sym!("+TOP+")
    }

    pub fn unknown() -> Symbol {
        sym!("+unknown+")
    }

    pub fn true_sym() -> Symbol {
        sym!("true")
    }

    pub fn false_sym() -> Symbol {
        sym!("false")
    }

    pub fn from_bool(value: bool) -> Symbol {
        if value { true_sym() } else { false_sym() }
    }
}

/// Log-probability constants.
pub mod logprob {
    /// Log of an impossible event.
    pub const LOG_OF_ZERO: f64 = f64::NEG_INFINITY;
    /// Stand-in for a zero probability once constraints are relaxed.
    pub const LOG_PROB_SMALL: f64 = -19.0 * std::f64::consts::LN_10;
    pub const LOG_PROB_CERTAIN: f64 = 0.0;
}

// --- S-expressions ----------------------------------------------------------

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Sexp {
    Symbol(Symbol),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn symbol(&self) -> Option<Symbol> {
        match self {
            Sexp::Symbol(s) => Some(*s),
            Sexp::List(_) => None,
        }
    }

    pub fn list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            Sexp::Symbol(_) => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Sexp::Symbol(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Sexp::List(_))
    }

    /// Parse exactly one s-expression from `text`.
    pub fn parse(text: &str) -> Result<Sexp> {
        let mut reader = SexpReader::new(text);
        let first = reader.next().ok_or_else(|| Error::syntax(1, "empty input"))??;
        if let Some(extra) = reader.next() {
            extra?;
            return Err(Error::syntax(reader.line, "trailing input after s-expression"));
        }
        Ok(first)
    }

    /// Helper for codecs: `self` must be a list of exactly `arity` elements.
    pub(crate) fn expect_list(&self, arity: usize, what: &str) -> Result<&[Sexp]> {
        match self.list() {
            Some(items) if items.len() == arity => Ok(items),
            Some(items) => Err(Error::malformed(
                0,
                format!("{what} expects {arity} elements, found {}: {self}", items.len()),
            )),
            None => Err(Error::malformed(0, format!("{what} expects a list, found symbol {self}"))),
        }
    }

    pub(crate) fn expect_symbol(&self, what: &str) -> Result<Symbol> {
        self.symbol().ok_or_else(|| Error::malformed(0, format!("{what} expects a symbol, found {self}")))
    }
}

impl From<Symbol> for Sexp {
    fn from(value: Symbol) -> Self {
        Sexp::Symbol(value)
    }
}

impl From<&str> for Sexp {
    fn from(value: &str) -> Self {
        Sexp::Symbol(Symbol::new(value))
    }
}

impl From<Vec<Sexp>> for Sexp {
    fn from(value: Vec<Sexp>) -> Self {
        Sexp::List(value)
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Symbol(s) => f.write_str(s.as_str()),
            Sexp::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Streaming reader over a text holding any number of s-expressions.
///
/// Line numbers are tracked so malformed input can be reported precisely.
pub struct SexpReader<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> SexpReader<'a> {
    pub fn new(text: &'a str) -> Self {
        SexpReader { chars: text.chars().peekable(), line: 1 }
    }

    /// Line the reader is currently positioned on (1-based).
    pub fn line(&self) -> usize {
        self.line
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                self.line += 1;
            }
            if !c.is_whitespace() {
                break;
            }
            self.chars.next();
        }
    }

    fn read_atom(&mut self) -> Symbol {
        let mut atom = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            atom.push(c);
            self.chars.next();
        }
        Symbol::new(&atom)
    }

    fn read_sexp(&mut self) -> Result<Sexp> {
        // Explicit stack so deeply nested trees cannot overflow the call stack.
        let mut stack: Vec<(usize, Vec<Sexp>)> = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.peek().copied() {
                None => {
                    let open_line = stack.last().map(|(l, _)| *l).unwrap_or(self.line);
                    return Err(Error::syntax(self.line, format!("unbalanced '(' opened on line {open_line}")));
                }
                Some('(') => {
                    self.chars.next();
                    stack.push((self.line, Vec::new()));
                }
                Some(')') => {
                    self.chars.next();
                    let Some((_, items)) = stack.pop() else {
                        return Err(Error::syntax(self.line, "unexpected ')'"));
                    };
                    let done = Sexp::List(items);
                    match stack.last_mut() {
                        Some((_, parent)) => parent.push(done),
                        None => return Ok(done),
                    }
                }
                Some(_) => {
                    let atom = Sexp::Symbol(self.read_atom());
                    match stack.last_mut() {
                        Some((_, parent)) => parent.push(atom),
                        None => return Ok(atom),
                    }
                }
            }
        }
    }
}

impl Iterator for SexpReader<'_> {
    type Item = Result<Sexp>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        self.chars.peek()?;
        Some(self.read_sexp())
    }
}

// --- Codec ------------------------------------------------------------------

/// Conversion to and from the s-expression text form used on disk.
pub trait SexpCodec: Sized {
    fn to_sexp(&self) -> Sexp;
    fn from_sexp(sexp: &Sexp) -> Result<Self>;
}

impl SexpCodec for Symbol {
    fn to_sexp(&self) -> Sexp {
        Sexp::Symbol(*self)
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        sexp.expect_symbol("symbol key")
    }
}

impl SexpCodec for Sexp {
    fn to_sexp(&self) -> Sexp {
        self.clone()
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        Ok(sexp.clone())
    }
}
