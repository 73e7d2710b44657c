//! Typed events: the keys of every probability lookup and count.
//!
//! An event is an ordered collection of components, grouped by component
//! kind. Each concrete event declares the kinds it can hold; within one kind
//! components are positional, while the order in which kinds are declared is
//! irrelevant to equality:
//!
//! ```text
//! SexpSubcatEvent
//!   kinds:   [Sexp, Subcat]
//!   Sexp:    VP  VBD  told  left
//!   Subcat:  (NP-A SBAR-A)
//! ```
//!
//! Model structures build histories and futures as [`EventKey`]s, the closed
//! set of event variants this crate uses. Equality between two `EventKey`s is
//! the derived structural one; [`generic_equals`] is the slower kind-by-kind
//! comparison that also works across event implementations which declare
//! their kinds in a different order.
//!
//! Frequently repeated events can be deduplicated through a
//! [`CanonicalMap`], which hands back a shared `Arc` for every event equal to
//! one seen before.

#[path = "event/canonical.rs"]
mod canonical;
#[path = "event/sexp_event.rs"]
mod sexp_event;
#[cfg(test)]
#[path = "event/tests.rs"]
mod tests;

pub use canonical::{CanonicalMap, Canonicalized};
pub use sexp_event::{EventKey, SexpEvent, SexpSubcatEvent};

use crate::error::{Error, Result};
use crate::sexp::{Sexp, Symbol};
use crate::subcat::Subcat;

// --- Components ---------------------------------------------------------------

/// Kinds of component an event may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Sexp,
    Subcat,
}

impl ComponentKind {
    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Sexp => "s-expression",
            ComponentKind::Subcat => "subcat",
        }
    }
}

/// Borrowed view of one component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component<'a> {
    Sexp(&'a Sexp),
    Subcat(&'a Subcat),
}

impl Component<'_> {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Sexp(_) => ComponentKind::Sexp,
            Component::Subcat(_) => ComponentKind::Subcat,
        }
    }
}

/// Owned component, dispatched to the right slot by its runtime kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnedComponent {
    Sexp(Sexp),
    Subcat(Subcat),
}

impl OwnedComponent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            OwnedComponent::Sexp(_) => ComponentKind::Sexp,
            OwnedComponent::Subcat(_) => ComponentKind::Subcat,
        }
    }
}

impl From<Symbol> for OwnedComponent {
    fn from(value: Symbol) -> Self {
        OwnedComponent::Sexp(Sexp::Symbol(value))
    }
}

impl From<Sexp> for OwnedComponent {
    fn from(value: Sexp) -> Self {
        OwnedComponent::Sexp(value)
    }
}

impl From<Subcat> for OwnedComponent {
    fn from(value: Subcat) -> Self {
        OwnedComponent::Subcat(value)
    }
}

// --- Traits -----------------------------------------------------------------

pub trait Event {
    /// Component kinds this event declares, in its own type order.
    fn kinds(&self) -> &'static [ComponentKind];

    fn num_types(&self) -> usize {
        self.kinds().len()
    }

    /// Declared index of `kind`, or `None` when the kind is unsupported.
    fn type_index(&self, kind: ComponentKind) -> Option<usize> {
        self.kinds().iter().position(|k| *k == kind)
    }

    fn num_components(&self) -> usize;

    fn num_components_of(&self, kind: ComponentKind) -> usize;

    fn try_get(&self, kind: ComponentKind, index: usize) -> Option<Component<'_>>;

    /// Component `index` of `kind`.
    ///
    /// # Panics
    ///
    /// When `index` is outside the declared bounds for `kind`.
    fn get(&self, kind: ComponentKind, index: usize) -> Component<'_> {
        match self.try_get(kind, index) {
            Some(component) => component,
            None => panic!(
                "{} component index {index} out of range (event holds {})",
                kind.name(),
                self.num_components_of(kind)
            ),
        }
    }

    /// Whether sharing instances of this event through a [`CanonicalMap`]
    /// is worthwhile. Events made of a single interned symbol opt out.
    fn is_canonicalizable(&self) -> bool {
        true
    }
}

pub trait MutableEvent: Event {
    /// Append a component to the slot of its runtime kind.
    fn add_component(&mut self, component: OwnedComponent) -> Result<()>;

    fn add(&mut self, component: impl Into<OwnedComponent>) -> Result<()>
    where
        Self: Sized,
    {
        self.add_component(component.into())
    }

    /// Append a component to the slot at declared `type_index`.
    fn add_at_type(&mut self, type_index: usize, component: OwnedComponent) -> Result<()> {
        match self.kinds().get(type_index) {
            Some(kind) if *kind == component.kind() => self.add_component(component),
            _ => Err(Error::UnsupportedComponent(component.kind().name())),
        }
    }

    fn ensure_capacity(&mut self, additional: usize);

    fn clear(&mut self);
}

/// Kind-by-kind structural equality between two arbitrary events.
///
/// ```text
/// 1. same number of kinds and of components   (cheap reject)
/// 2. every kind of `a` is declared by `b`
/// 3. per kind: same arity, pairwise equal in order
/// ```
pub fn generic_equals(a: &dyn Event, b: &dyn Event) -> bool {
    if a.num_types() != b.num_types() || a.num_components() != b.num_components() {
        return false;
    }
    if a.kinds().iter().any(|kind| b.type_index(*kind).is_none()) {
        return false;
    }
    for &kind in a.kinds() {
        let n = a.num_components_of(kind);
        if n != b.num_components_of(kind) {
            return false;
        }
        if (0..n).any(|i| a.get(kind, i) != b.get(kind, i)) {
            return false;
        }
    }
    true
}
