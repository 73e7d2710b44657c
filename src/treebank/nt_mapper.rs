use super::{NtMapper, Treebank};
use crate::sexp::{Symbol, symbols};
use std::sync::Arc;

/// Collapses previous modifiers to `+START+`, `CC`, `PUNC` or `OTHER`.
pub struct CollinsNtMapper {
    treebank: Arc<dyn Treebank>,
}

impl CollinsNtMapper {
    pub fn new(treebank: Arc<dyn Treebank>) -> Self {
        CollinsNtMapper { treebank }
    }
}

impl NtMapper for CollinsNtMapper {
    fn map(&self, prev_mod: Symbol) -> Symbol {
        if prev_mod == symbols::start() {
            prev_mod
        } else if self.treebank.is_conjunction(prev_mod) {
            sym!("CC")
        } else if self.treebank.is_punctuation(prev_mod) {
            sym!("PUNC")
        } else {
            sym!("OTHER")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::treebank::PennTreebank;

    #[test]
    fn classes() {
        let mapper = CollinsNtMapper::new(Arc::new(PennTreebank));
        let cases: Vec<(&str, &str)> =
            vec![("+START+", "+START+"), ("CC", "CC"), ("CC", "CONJP"), ("PUNC", ","), ("PUNC", ":"), ("OTHER", "NP-A")];
        for (expected, label) in cases {
            assert_eq!(mapper.map(Symbol::new(label)).as_str(), expected, "{label}");
        }
    }
}
