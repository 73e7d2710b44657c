use super::{Component, ComponentKind, Event, MutableEvent, OwnedComponent};
use crate::error::{Error, Result};
use crate::sexp::Sexp;
use crate::subcat::Subcat;
use std::fmt;

// --- SexpEvent ----------------------------------------------------------------

/// Event holding only s-expression components.
///
/// A single symbol and a one-element list holding that symbol are the same
/// event: both have exactly one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SexpEvent {
    components: Vec<Sexp>,
}

impl SexpEvent {
    pub fn new() -> Self {
        SexpEvent::default()
    }

    /// Event whose components are the elements of `sexp` (or `sexp` itself
    /// when it is a symbol).
    pub fn from_sexp(sexp: Sexp) -> Self {
        match sexp {
            Sexp::List(components) => SexpEvent { components },
            symbol @ Sexp::Symbol(_) => SexpEvent { components: vec![symbol] },
        }
    }

    pub fn components(&self) -> &[Sexp] {
        &self.components
    }

    /// Collapses a lone symbol component back to the bare symbol.
    pub fn to_sexp(&self) -> Sexp {
        match self.components.as_slice() {
            [single @ Sexp::Symbol(_)] => single.clone(),
            many => Sexp::List(many.to_vec()),
        }
    }
}

const SEXP_KINDS: &[ComponentKind] = &[ComponentKind::Sexp];

impl Event for SexpEvent {
    fn kinds(&self) -> &'static [ComponentKind] {
        SEXP_KINDS
    }

    fn num_components(&self) -> usize {
        self.components.len()
    }

    fn num_components_of(&self, kind: ComponentKind) -> usize {
        match kind {
            ComponentKind::Sexp => self.components.len(),
            ComponentKind::Subcat => 0,
        }
    }

    fn try_get(&self, kind: ComponentKind, index: usize) -> Option<Component<'_>> {
        match kind {
            ComponentKind::Sexp => self.components.get(index).map(Component::Sexp),
            ComponentKind::Subcat => None,
        }
    }

    fn is_canonicalizable(&self) -> bool {
        !matches!(self.components.as_slice(), [Sexp::Symbol(_)])
    }
}

impl MutableEvent for SexpEvent {
    fn add_component(&mut self, component: OwnedComponent) -> Result<()> {
        match component {
            OwnedComponent::Sexp(sexp) => {
                self.components.push(sexp);
                Ok(())
            }
            OwnedComponent::Subcat(_) => Err(Error::UnsupportedComponent(ComponentKind::Subcat.name())),
        }
    }

    fn ensure_capacity(&mut self, additional: usize) {
        self.components.reserve(additional);
    }

    fn clear(&mut self) {
        self.components.clear();
    }
}

impl fmt::Display for SexpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sexp())
    }
}

// --- SexpSubcatEvent ----------------------------------------------------------

/// Event holding s-expression components plus subcat frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SexpSubcatEvent {
    sexps: Vec<Sexp>,
    subcats: Vec<Subcat>,
}

const SEXP_SUBCAT_KINDS: &[ComponentKind] = &[ComponentKind::Sexp, ComponentKind::Subcat];

impl SexpSubcatEvent {
    pub fn new() -> Self {
        SexpSubcatEvent::default()
    }

    pub fn sexps(&self) -> &[Sexp] {
        &self.sexps
    }

    pub fn subcats(&self) -> &[Subcat] {
        &self.subcats
    }
}

impl Event for SexpSubcatEvent {
    fn kinds(&self) -> &'static [ComponentKind] {
        SEXP_SUBCAT_KINDS
    }

    fn num_components(&self) -> usize {
        self.sexps.len() + self.subcats.len()
    }

    fn num_components_of(&self, kind: ComponentKind) -> usize {
        match kind {
            ComponentKind::Sexp => self.sexps.len(),
            ComponentKind::Subcat => self.subcats.len(),
        }
    }

    fn try_get(&self, kind: ComponentKind, index: usize) -> Option<Component<'_>> {
        match kind {
            ComponentKind::Sexp => self.sexps.get(index).map(Component::Sexp),
            ComponentKind::Subcat => self.subcats.get(index).map(Component::Subcat),
        }
    }
}

impl MutableEvent for SexpSubcatEvent {
    fn add_component(&mut self, component: OwnedComponent) -> Result<()> {
        match component {
            OwnedComponent::Subcat(subcat) => self.subcats.push(subcat),
            OwnedComponent::Sexp(sexp) => self.sexps.push(sexp),
        }
        Ok(())
    }

    fn ensure_capacity(&mut self, additional: usize) {
        self.sexps.reserve(additional);
    }

    fn clear(&mut self) {
        self.sexps.clear();
        self.subcats.clear();
    }
}

impl fmt::Display for SexpSubcatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, sexp) in self.sexps.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{sexp}")?;
        }
        for subcat in &self.subcats {
            write!(f, " {subcat}")?;
        }
        f.write_str(")")
    }
}

// --- EventKey -----------------------------------------------------------------

/// The event variants used as model histories and futures.
///
/// Variants never compare equal to each other, matching [`super::generic_equals`]
/// which rejects events declaring different numbers of kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    Sexp(SexpEvent),
    SexpSubcat(SexpSubcatEvent),
}

impl EventKey {
    pub fn sexp() -> Self {
        EventKey::Sexp(SexpEvent::new())
    }

    pub fn with_subcat() -> Self {
        EventKey::SexpSubcat(SexpSubcatEvent::new())
    }

    fn inner(&self) -> &dyn Event {
        match self {
            EventKey::Sexp(e) => e,
            EventKey::SexpSubcat(e) => e,
        }
    }

    /// Builder-style infallible push of an s-expression component.
    pub fn push(&mut self, sexp: impl Into<Sexp>) -> &mut Self {
        let sexp = sexp.into();
        match self {
            EventKey::Sexp(e) => e.components.push(sexp),
            EventKey::SexpSubcat(e) => e.sexps.push(sexp),
        }
        self
    }

    /// Builder-style push of a subcat; a plain s-expression key is promoted.
    pub fn push_subcat(&mut self, subcat: Subcat) -> &mut Self {
        if let EventKey::Sexp(e) = self {
            let sexps = std::mem::take(&mut e.components);
            *self = EventKey::SexpSubcat(SexpSubcatEvent { sexps, subcats: Vec::new() });
        }
        if let EventKey::SexpSubcat(e) = self {
            e.subcats.push(subcat);
        }
        self
    }
}

impl Event for EventKey {
    fn kinds(&self) -> &'static [ComponentKind] {
        self.inner().kinds()
    }

    fn num_components(&self) -> usize {
        self.inner().num_components()
    }

    fn num_components_of(&self, kind: ComponentKind) -> usize {
        self.inner().num_components_of(kind)
    }

    fn try_get(&self, kind: ComponentKind, index: usize) -> Option<Component<'_>> {
        match self {
            EventKey::Sexp(e) => e.try_get(kind, index),
            EventKey::SexpSubcat(e) => e.try_get(kind, index),
        }
    }

    fn is_canonicalizable(&self) -> bool {
        self.inner().is_canonicalizable()
    }
}

impl MutableEvent for EventKey {
    fn add_component(&mut self, component: OwnedComponent) -> Result<()> {
        match self {
            EventKey::Sexp(e) => e.add_component(component),
            EventKey::SexpSubcat(e) => e.add_component(component),
        }
    }

    fn ensure_capacity(&mut self, additional: usize) {
        match self {
            EventKey::Sexp(e) => e.ensure_capacity(additional),
            EventKey::SexpSubcat(e) => e.ensure_capacity(additional),
        }
    }

    fn clear(&mut self) {
        match self {
            EventKey::Sexp(e) => e.clear(),
            EventKey::SexpSubcat(e) => e.clear(),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Sexp(e) => write!(f, "{e}"),
            EventKey::SexpSubcat(e) => write!(f, "{e}"),
        }
    }
}
