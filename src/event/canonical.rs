use super::Event;
use rustc_hash::FxHashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Outcome of [`CanonicalMap::canonicalize`]. Callers must handle all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonicalized {
    /// An equal instance was already registered; the shared one is returned.
    Shared,
    /// First occurrence; the value itself is now the canonical instance.
    Registered,
    /// The event opts out of sharing and was returned untouched.
    Ineligible,
}

/// Identity map of canonical event instances.
#[derive(Debug)]
pub struct CanonicalMap<T> {
    set: FxHashSet<Arc<T>>,
}

impl<T> Default for CanonicalMap<T> {
    fn default() -> Self {
        CanonicalMap { set: FxHashSet::default() }
    }
}

impl<T: Event + Eq + Hash> CanonicalMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonicalize(&mut self, value: Arc<T>) -> (Arc<T>, Canonicalized) {
        if !value.is_canonicalizable() {
            return (value, Canonicalized::Ineligible);
        }
        if let Some(shared) = self.set.get(&*value) {
            return (Arc::clone(shared), Canonicalized::Shared);
        }
        self.set.insert(Arc::clone(&value));
        (value, Canonicalized::Registered)
    }

    pub fn get(&self, value: &T) -> Option<&Arc<T>> {
        self.set.get(value)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }
}
