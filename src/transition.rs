use crate::event::{CanonicalMap, Canonicalized, EventKey};
use std::fmt;
use std::sync::Arc;

/// A (history, future) pair: the key of one conditional probability.
///
/// Both sides are reference counted so that a counts table holding millions
/// of transitions can share the (few) distinct histories and futures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    history: Arc<EventKey>,
    future: Arc<EventKey>,
}

impl Transition {
    pub fn new(history: EventKey, future: EventKey) -> Self {
        Transition { history: Arc::new(history), future: Arc::new(future) }
    }

    pub fn from_shared(history: Arc<EventKey>, future: Arc<EventKey>) -> Self {
        Transition { history, future }
    }

    pub fn history(&self) -> &Arc<EventKey> {
        &self.history
    }

    pub fn future(&self) -> &Arc<EventKey> {
        &self.future
    }

    /// Swap both sides for their canonical instances. Futures and histories
    /// are kept in separate maps.
    pub fn canonicalize(
        &mut self,
        futures: &mut CanonicalMap<EventKey>,
        histories: &mut CanonicalMap<EventKey>,
    ) -> (Canonicalized, Canonicalized) {
        let (future, future_outcome) = futures.canonicalize(Arc::clone(&self.future));
        let (history, history_outcome) = histories.canonicalize(Arc::clone(&self.history));
        self.future = future;
        self.history = history;
        (future_outcome, history_outcome)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} | {})", self.future, self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexp::Symbol;

    fn key(parts: &[&str]) -> EventKey {
        let mut e = EventKey::sexp();
        for p in parts {
            e.push(Symbol::new(p));
        }
        e
    }

    #[test]
    fn structural_equality() {
        let a = Transition::new(key(&["S", "VBD"]), key(&["VP"]));
        let b = Transition::new(key(&["S", "VBD"]), key(&["VP"]));
        let c = Transition::new(key(&["VP"]), key(&["S", "VBD"]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "(VP | (S VBD))");
    }

    #[test]
    fn canonicalizes_sides_independently() {
        let mut futures = CanonicalMap::new();
        let mut histories = CanonicalMap::new();

        let mut a = Transition::new(key(&["S", "VBD"]), key(&["VP", "x"]));
        let mut b = Transition::new(key(&["S", "VBD"]), key(&["NP", "y"]));
        assert_eq!(a.canonicalize(&mut futures, &mut histories), (Canonicalized::Registered, Canonicalized::Registered));
        assert_eq!(b.canonicalize(&mut futures, &mut histories), (Canonicalized::Registered, Canonicalized::Shared));
        assert!(Arc::ptr_eq(a.history(), b.history()));
        assert_eq!(futures.len(), 2);
        assert_eq!(histories.len(), 1);

        // A single-symbol future is not worth sharing.
        let mut c = Transition::new(key(&["S", "VBD"]), key(&["VP"]));
        assert_eq!(c.canonicalize(&mut futures, &mut histories).0, Canonicalized::Ineligible);
    }
}
