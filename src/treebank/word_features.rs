use super::WordFeatures;
use crate::sexp::Symbol;
use crate::sexp::symbols;
use crate::word::WordShape;

/// Endings that carry tag information for English unknown words, longest first.
const ENDINGS: &[&str] = &["ing", "ed", "ly", "es", "s"];

/// Unknown-word classes from orthographic shape plus a common inflectional
/// ending: `Running` at sentence start becomes `+unknown+cap+first+ing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PennWordFeatures;

impl WordFeatures for PennWordFeatures {
    fn unknown_class(&self, word: &str, first_word: bool) -> Symbol {
        let shape = WordShape::of(word, first_word);
        let lower = word.to_lowercase();
        let ending = ENDINGS.iter().find(|e| lower.len() > e.len() + 2 && lower.ends_with(*e));
        if shape.is_empty() && ending.is_none() {
            return symbols::unknown();
        }
        let mut class = String::from("+unknown");
        class.push_str(&shape.suffix());
        if let Some(ending) = ending {
            class.push('+');
            class.push_str(ending);
        }
        Symbol::new(&class)
    }
}
