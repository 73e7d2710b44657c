use super::*;
use crate::Error;
use proptest::prelude::*;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut h = FxHasher::default();
    value.hash(&mut h);
    h.finish()
}

/// Declares its kinds in the opposite order to `SexpSubcatEvent`.
struct SubcatFirst {
    subcats: Vec<Subcat>,
    sexps: Vec<Sexp>,
}

impl Event for SubcatFirst {
    fn kinds(&self) -> &'static [ComponentKind] {
        &[ComponentKind::Subcat, ComponentKind::Sexp]
    }

    fn num_components(&self) -> usize {
        self.subcats.len() + self.sexps.len()
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

#[test]
fn symbol_and_singleton_list_are_the_same_event() {
    let a = SexpEvent::from_sexp(Sexp::Symbol(sym("NP")));
    let b = SexpEvent::from_sexp(Sexp::parse("(NP)").unwrap());
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    assert_eq!(b.to_sexp(), Sexp::Symbol(sym("NP")));
}

#[test]
fn generic_equality_ignores_kind_declaration_order() {
    let subcat = Subcat::from_labels([sym("NP-A")]);
    let mut ours = SexpSubcatEvent::new();
    ours.add(sym("VP")).unwrap();
    ours.add(subcat.clone()).unwrap();
    ours.add(sym("left")).unwrap();

    let theirs = SubcatFirst { subcats: vec![subcat], sexps: vec![sym("VP").into(), sym("left").into()] };
    assert!(generic_equals(&ours, &theirs));

    let reordered = SubcatFirst { subcats: theirs.subcats.clone(), sexps: vec![sym("left").into(), sym("VP").into()] };
    assert!(!generic_equals(&ours, &reordered));
}

#[test]
fn generic_equality_rejects_different_kind_sets() {
    let mut plain = SexpEvent::new();
    plain.add(sym("a")).unwrap();
    let mut with_subcat = SexpSubcatEvent::new();
    with_subcat.add(sym("a")).unwrap();
    assert!(!generic_equals(&plain, &with_subcat));
    assert_ne!(EventKey::Sexp(plain), EventKey::SexpSubcat(with_subcat));
}

#[test]
fn typed_add_checks_declared_kind() {
    let mut e = SexpSubcatEvent::new();
    e.add_at_type(0, sym("a").into()).unwrap();
    e.add_at_type(1, Subcat::new().into()).unwrap();
    assert!(matches!(e.add_at_type(0, Subcat::new().into()), Err(Error::UnsupportedComponent(_))));
    assert!(matches!(e.add_at_type(2, sym("b").into()), Err(Error::UnsupportedComponent(_))));

    let mut plain = SexpEvent::new();
    assert!(plain.add(Subcat::new()).is_err());
    assert_eq!(plain.type_index(ComponentKind::Subcat), None);
    assert_eq!(e.type_index(ComponentKind::Subcat), Some(1));
}

#[test]
fn clear_allows_reuse() {
    let mut e = EventKey::with_subcat();
    e.push(sym("x")).push_subcat(Subcat::new());
    assert_eq!(e.num_components(), 2);
    e.clear();
    assert_eq!(e.num_components(), 0);
    e.ensure_capacity(4);
    e.add(sym("y")).unwrap();
    assert_eq!(e.get(ComponentKind::Sexp, 0), Component::Sexp(&Sexp::Symbol(sym("y"))));
}

#[test]
fn push_subcat_promotes_plain_key() {
    let mut e = EventKey::sexp();
    e.push(sym("VP")).push_subcat(Subcat::from_labels([sym("NP-A")]));
    assert!(matches!(e, EventKey::SexpSubcat(_)));
    assert_eq!(e.num_components_of(ComponentKind::Sexp), 1);
    assert_eq!(e.num_components_of(ComponentKind::Subcat), 1);
}

#[test]
#[should_panic(expected = "out of range")]
fn get_outside_bounds_panics() {
    let e = SexpEvent::from_sexp(Sexp::parse("(a b)").unwrap());
    let _ = e.get(ComponentKind::Sexp, 2);
}

#[test]
fn canonicalization_is_tri_state() {
    let mut map: CanonicalMap<EventKey> = CanonicalMap::new();
    let build = || {
        let mut e = EventKey::sexp();
        e.push(sym("NP")).push(sym("NN"));
        Arc::new(e)
    };

    let (first, outcome) = map.canonicalize(build());
    assert_eq!(outcome, Canonicalized::Registered);
    let (second, outcome) = map.canonicalize(build());
    assert_eq!(outcome, Canonicalized::Shared);
    assert!(Arc::ptr_eq(&first, &second));

    let lone = Arc::new(EventKey::Sexp(SexpEvent::from_sexp(Sexp::Symbol(sym("NP")))));
    let (back, outcome) = map.canonicalize(Arc::clone(&lone));
    assert_eq!(outcome, Canonicalized::Ineligible);
    assert!(Arc::ptr_eq(&back, &lone));
    assert_eq!(map.len(), 1);
}

// --- Properties ---------------------------------------------------------------

fn atom() -> impl Strategy<Value = Symbol> {
    prop::sample::select(vec!["NP", "VP", "S", "PP", "left", "right", "+START+"]).prop_map(Symbol::new)
}

fn subcat() -> impl Strategy<Value = Subcat> {
    prop::collection::vec(atom(), 0..3).prop_map(Subcat::from_labels)
}

proptest! {
    #[test]
    fn interleaving_of_kinds_does_not_matter(
        sexps in prop::collection::vec(atom(), 0..6),
        subcats in prop::collection::vec(subcat(), 0..3),
        picks in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        let mut a = SexpSubcatEvent::new();
        for s in &sexps {
            a.add(*s).unwrap();
        }
        for c in &subcats {
            a.add(c.clone()).unwrap();
        }

        // Same per-kind order, arbitrary interleaving between kinds.
        let mut b = SexpSubcatEvent::new();
        let (mut i, mut j) = (0, 0);
        let mut picks = picks.into_iter();
        while i < sexps.len() || j < subcats.len() {
            let take_sexp = j >= subcats.len() || (i < sexps.len() && picks.next().unwrap_or(true));
            if take_sexp {
                b.add(sexps[i]).unwrap();
                i += 1;
            } else {
                b.add(subcats[j].clone()).unwrap();
                j += 1;
            }
        }

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
        prop_assert!(generic_equals(&a, &b));
    }

    #[test]
    fn derived_equality_agrees_with_generic(
        xs in prop::collection::vec(atom(), 0..4),
        ys in prop::collection::vec(atom(), 0..4),
    ) {
        let a = SexpEvent::from_sexp(Sexp::List(xs.iter().map(|s| Sexp::Symbol(*s)).collect()));
        let b = SexpEvent::from_sexp(Sexp::List(ys.iter().map(|s| Sexp::Symbol(*s)).collect()));
        prop_assert_eq!(a == b, generic_equals(&a, &b));
    }
}
