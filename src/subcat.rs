use crate::error::Result;
use crate::sexp::{Sexp, SexpCodec, Symbol};
use std::fmt;

/// Subcategorization frame: the bag of argument labels a head still expects.
///
/// Stored sorted, so two bags holding the same labels compare and hash equal
/// whatever order the requirements were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subcat {
    labels: Vec<Symbol>,
}

impl Subcat {
    pub fn new() -> Self {
        Subcat::default()
    }

    pub fn from_labels(labels: impl IntoIterator<Item = Symbol>) -> Self {
        let mut labels: Vec<Symbol> = labels.into_iter().collect();
        labels.sort();
        Subcat { labels }
    }

    pub fn add(&mut self, label: Symbol) {
        let at = self.labels.partition_point(|l| *l <= label);
        self.labels.insert(at, label);
    }

    /// Discharge one occurrence of `label`; false when it was not required.
    pub fn remove(&mut self, label: Symbol) -> bool {
        match self.labels.iter().position(|l| *l == label) {
            Some(at) => {
                self.labels.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, label: Symbol) -> bool {
        self.labels.contains(&label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.labels.iter().copied()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

impl fmt::Display for Subcat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sexp())
    }
}

impl SexpCodec for Subcat {
    fn to_sexp(&self) -> Sexp {
        Sexp::List(self.labels.iter().map(|l| Sexp::Symbol(*l)).collect())
    }

    fn from_sexp(sexp: &Sexp) -> Result<Self> {
        let items = sexp.list().ok_or_else(|| crate::Error::malformed(0, format!("subcat expects a list: {sexp}")))?;
        let labels = items.iter().map(|s| s.expect_symbol("subcat label")).collect::<Result<Vec<_>>>()?;
        Ok(Subcat::from_labels(labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(x: &str) -> Symbol {
        Symbol::new(x)
    }

    #[test]
    fn bag_semantics() {
        let mut a = Subcat::new();
        a.add(s("NP-A"));
        a.add(s("S-A"));
        a.add(s("NP-A"));
        let b = Subcat::from_labels([s("S-A"), s("NP-A"), s("NP-A")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);

        assert!(a.remove(s("NP-A")));
        assert!(a.contains(s("NP-A")));
        assert!(a.remove(s("NP-A")));
        assert!(!a.contains(s("NP-A")));
        assert!(!a.remove(s("VP-A")));
        assert!(a.remove(s("S-A")));
        assert!(a.is_empty());
    }

    #[test]
    fn sexp_form_is_sorted() {
        let a = Subcat::from_labels([s("SBAR-A"), s("NP-A")]);
        assert_eq!(a.to_string(), "(NP-A SBAR-A)");
        assert_eq!(Subcat::from_sexp(&a.to_sexp()).unwrap(), a);
        assert!(Subcat::from_sexp(&Sexp::parse("NP-A").unwrap()).is_err());
    }
}
