use super::HeadFinder;
use crate::error::{Error, Result};
use crate::sexp::{Sexp, SexpReader, Symbol};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Direction a head rule scans the children in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Clone)]
struct HeadRule {
    direction: ScanDirection,
    priorities: Vec<Symbol>,
}

/// Table-driven head finder.
///
/// One entry per parent label, each a list of rules tried in order:
///
/// ```text
/// (PP (r IN TO VBG VBN RP FW) (r PP))
/// ```
///
/// For every rule, every priority label in turn is searched for among the
/// children in the rule's direction; the first hit is the head. When no rule
/// matches, the head is the first child in the direction of the first rule.
/// The `*` entry covers parents missing from the table.
#[derive(Debug, Clone, Default)]
pub struct HeadTable {
    rules: FxHashMap<Symbol, Vec<HeadRule>>,
    fallback: Vec<HeadRule>,
}

/// Collins (1999) head rules for the Penn Treebank, extended with `NPB`.
const PENN_HEAD_RULES: &str = "
(ADJP (l NNS QP NN $ ADVP JJ VBN VBG ADJP JJR NP JJS DT FW RBR RBS SBAR RB))
(ADVP (r RB RBR RBS FW ADVP TO CD JJR JJ IN NP JJS NN))
(CONJP (r CC RB IN))
(FRAG (r))
(INTJ (l))
(LST (r LS :))
(NAC (l NN NNS NNP NNPS NP NAC EX $ CD QP PRP VBG JJ JJS JJR ADJP FW))
(PP (r IN TO VBG VBN RP FW) (r PP))
(PRN (l))
(PRT (r RP))
(QP (l $ IN NNS NN JJ RB DT CD NCD QP JJR JJS))
(RRC (r VP NP ADVP ADJP PP))
(S (l TO IN VP S SBAR ADJP UCP NP))
(SBAR (l WHNP WHPP WHADVP WHADJP IN DT S SQ SINV SBAR FRAG))
(SBARQ (l SQ S SINV SBARQ FRAG))
(SINV (l VBZ VBD VBP VB MD VP S SINV ADJP NP))
(SQ (l VBZ VBD VBP VB MD VP SQ))
(UCP (r))
(VP (l TO VBD VBN MD VBZ VB VBG VBP VP ADJP NN NNS NP))
(WHADJP (l CC WRB JJ ADJP))
(WHADVP (r CC WRB))
(WHNP (l WDT WP WP$ WHADJP WHPP WHNP))
(WHPP (r IN TO FW))
(NX (r POS NN NNP NNPS NNS NX JJR) (l NP))
(X (r))
(NP (r POS NN NNP NNPS NNS NX JJR) (l NP) (r $ ADJP PRN) (r CD) (r JJ JJS RB QP))
(NPB (r POS NN NNP NNPS NNS NX JJR) (l NP) (r $ ADJP PRN) (r CD) (r JJ JJS RB QP))
(+TOP+ (l))
(* (l))
";

static PENN: Lazy<Arc<HeadTable>> =
    Lazy::new(|| Arc::new(HeadTable::parse(PENN_HEAD_RULES).expect("built-in head table parses")));

fn parse_rule(rule: &Sexp) -> Result<HeadRule> {
    let items = match rule.list() {
        Some(items) if !items.is_empty() => items,
        _ => return Err(Error::malformed(0, format!("head rule must be a non-empty list, found {rule}"))),
    };
    let direction = match items[0].expect_symbol("head rule direction")?.as_str() {
        "l" => ScanDirection::LeftToRight,
        "r" => ScanDirection::RightToLeft,
        other => return Err(Error::malformed(0, format!("head rule direction must be `l` or `r`, found `{other}`"))),
    };
    let priorities = items[1..].iter().map(|p| p.expect_symbol("head rule label")).collect::<Result<Vec<_>>>()?;
    Ok(HeadRule { direction, priorities })
}

impl HeadTable {
    /// Shared copy of the built-in Penn Treebank table.
    pub fn penn() -> Arc<HeadTable> {
        Arc::clone(&PENN)
    }

    /// Parse a table from its s-expression text form.
    pub fn parse(text: &str) -> Result<HeadTable> {
        let mut table = HeadTable::default();
        let mut reader = SexpReader::new(text);
        while let Some(entry) = reader.next() {
            let line = reader.line();
            let entry = entry?;
            let items = match entry.list() {
                Some(items) if items.len() >= 2 => items,
                _ => return Err(Error::malformed(line, format!("head table entry needs a parent and rules: {entry}"))),
            };
            let parent = items[0].expect_symbol("head table parent").map_err(|e| e.at_line(line))?;
            let rules =
                items[1..].iter().map(parse_rule).collect::<Result<Vec<_>>>().map_err(|e| e.at_line(line))?;
            if parent.as_str() == "*" {
                table.fallback = rules;
            } else {
                table.rules.insert(parent, rules);
            }
        }
        if table.fallback.is_empty() {
            table.fallback.push(HeadRule { direction: ScanDirection::LeftToRight, priorities: Vec::new() });
        }
        Ok(table)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<HeadTable> {
        let text = std::fs::read_to_string(path)?;
        HeadTable::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn scan(direction: ScanDirection, children: &[Symbol], wanted: Symbol) -> Option<usize> {
    match direction {
        ScanDirection::LeftToRight => children.iter().position(|c| *c == wanted),
        ScanDirection::RightToLeft => children.iter().rposition(|c| *c == wanted),
    }
}

impl HeadFinder for HeadTable {
    fn find_head(&self, parent: Symbol, children: &[Symbol]) -> usize {
        if children.len() <= 1 {
            return 0;
        }
        let rules = self.rules.get(&parent).unwrap_or(&self.fallback);
        for rule in rules {
            for wanted in &rule.priorities {
                if let Some(idx) = scan(rule.direction, children, *wanted) {
                    return idx;
                }
            }
        }
        match rules.first().map(|r| r.direction) {
            Some(ScanDirection::RightToLeft) => children.len() - 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(xs: &[&str]) -> Vec<Symbol> {
        xs.iter().map(|x| Symbol::new(x)).collect()
    }

    #[test]
    fn penn_heads() {
        let table = HeadTable::penn();
        let cases: Vec<(usize, &str, Vec<&str>)> = vec![
            (1, "S", vec!["NP", "VP", "."]),
            (0, "VP", vec!["VBD", "NP", "PP"]),
            (0, "PP", vec!["IN", "NP"]),
            (2, "NPB", vec!["DT", "JJ", "NN"]),
            (1, "NPB", vec!["NNP", "POS"]),
            (0, "NP", vec!["NP", "PP"]),
            (0, "SBAR", vec!["IN", "S"]),
            // unlisted parent: first child
            (0, "ZZZ", vec!["A", "B"]),
            // no priority matches, first rule scans right to left
            (1, "ADVP", vec!["DT", "XX"]),
        ];
        for (expected, parent, children) in cases {
            assert_eq!(
                table.find_head(Symbol::new(parent), &labels(&children)),
                expected,
                "{parent} -> {children:?}"
            );
        }
    }

    #[test]
    fn custom_table_with_fallback() {
        let table = HeadTable::parse("(X (r B))\n(* (r))").unwrap();
        assert_eq!(table.find_head(Symbol::new("X"), &labels(&["B", "A", "B", "C"])), 2);
        assert_eq!(table.find_head(Symbol::new("Y"), &labels(&["A", "B", "C"])), 2);
    }

    #[test]
    fn malformed_table_reports_line() {
        let err = HeadTable::parse("(X (l A))\n(Y (up A))").unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { line: 2, .. }), "{err:?}");
    }
}
