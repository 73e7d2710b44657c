use super::*;
use crate::error::Error;
use crate::treebank::PennTreebank;
use crate::word::Word;
use proptest::prelude::*;

fn s(x: &str) -> Symbol {
    Symbol::new(x)
}

const F: f64 = 11.5;

fn chart(size: usize) -> Chart {
    let mut chart = Chart::new(1000, Arc::new(PennTreebank));
    chart.begin(size);
    chart.set_beam(BeamConfig { prune_factor: F, ..BeamConfig::default() });
    chart
}

fn preterminal(word: &str, tag: &str, position: usize, log_prior: f64) -> Item {
    Item::preterminal(Arc::new(Word::new(s(word), s(tag))), position, false, log_prior)
}

fn open(label: &str, word: &str, start: usize, end: usize, head: ItemId, log_prob: f64) -> Item {
    Item {
        label: s(label),
        head_label: s("VBD"),
        head_word: Arc::new(Word::new(s(word), s("VBD"))),
        start,
        end,
        head_child: Some(head),
        left: SideState::default(),
        right: SideState::default(),
        stop: false,
        contains_verb: false,
        log_tree_prob: log_prob,
        log_prior: 0.0,
        log_prob,
    }
}

/// Chart with one preterminal on (0, 0) to head the test items.
fn seeded(size: usize) -> (Chart, ItemId) {
    let mut chart = chart(size);
    let head = chart.add(preterminal("saw", "VBD", 0, -2.0)).unwrap().unwrap();
    (chart, head)
}

fn cell_probs(chart: &Chart, start: usize, end: usize) -> Vec<f64> {
    chart.items(start, end).iter().map(|id| chart.item(*id).log_prob).collect()
}

#[test]
fn beam_drops_items_far_below_the_top() {
    let orders: Vec<Vec<f64>> = vec![vec![-1.0, -5.0, -30.0], vec![-30.0, -5.0, -1.0], vec![-5.0, -30.0, -1.0]];
    for order in orders {
        let (mut chart, head) = seeded(3);
        for (i, p) in order.iter().enumerate() {
            chart.add(open("VP", &format!("w{i}"), 0, 2, head, *p)).unwrap();
        }
        chart.prune(0, 2);
        let mut kept = cell_probs(&chart, 0, 2);
        kept.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(kept, vec![-1.0, -5.0], "{order:?}");
        assert_eq!(chart.top_prob(0, 2), -1.0);
    }
}

#[test]
fn tiered_factors() {
    let (mut chart, head) = seeded(1);
    let np_with_child = |p: f64| {
        let mut item = open("NP", "dog", 0, 3, head, p);
        item.left.children.push(head);
        item
    };
    let stopped = |p: f64| Item { stop: true, ..open("VP", "saw", 0, 3, head, p) };

    // (outside, relaxed, item), top = 0
    let cases: Vec<(bool, bool, Item)> = vec![
        (false, false, preterminal("saw", "VBD", 0, -500.0)),
        (true, false, open("VP", "saw", 0, 3, head, -12.0)),
        (false, false, open("VP", "saw", 0, 3, head, -11.0)),
        (false, false, np_with_child(-14.0)),
        (true, false, np_with_child(-15.0)),
        (true, false, open("NP", "dog", 0, 3, head, -14.0)),
        (true, false, stopped(-100.0)),
        (false, true, stopped(-100.0)),
        (true, true, open("VP", "saw", 0, 3, head, -100.0)),
        (true, false, open("VP", "saw", 0, 121, head, -9.0)),
        (false, false, open("VP", "saw", 0, 121, head, -8.0)),
        (false, false, open("VP", "saw", 0, 120, head, -9.5)),
        (true, false, open("VP", "saw", 0, 101, head, -10.0)),
        (false, false, open("VP", "saw", 0, 101, head, -9.0)),
        (false, false, open("VP", "saw", 0, 100, head, -11.0)),
    ];
    for (expected, relax, item) in cases {
        chart.set_beam(BeamConfig { prune_factor: F, relax, ..BeamConfig::default() });
        assert_eq!(chart.outside_beam(&item, 0.0), expected, "{} span {} at {}", item.label, item.span(), item.log_prob);
    }
}

#[test]
fn long_span_clamps_have_floors() {
    let (mut chart, head) = seeded(1);
    chart.set_beam(BeamConfig { prune_factor: 2.5, ..BeamConfig::default() });
    // span > 120: max(1, -0.5) = 1
    assert!(chart.outside_beam(&open("VP", "saw", 0, 130, head, -1.5), 0.0));
    assert!(!chart.outside_beam(&open("VP", "saw", 0, 130, head, -0.9), 0.0));
    // span > 100: max(2, 0.5) = 2
    assert!(chart.outside_beam(&open("VP", "saw", 0, 110, head, -2.5), 0.0));
    assert!(!chart.outside_beam(&open("VP", "saw", 0, 110, head, -1.9), 0.0));
}

#[test]
fn np_hack_can_be_disabled() {
    let (mut chart, head) = seeded(1);
    let mut item = open("NP-A", "dog", 0, 3, head, -13.0);
    item.right.children.push(head);
    assert!(!chart.outside_beam(&item, 0.0));
    chart.set_beam(BeamConfig { prune_factor: F, np_prune_hack: false, ..BeamConfig::default() });
    assert!(chart.outside_beam(&item, 0.0));
}

#[test]
fn span_dependent_variant() {
    let (mut chart, head) = seeded(1);
    chart.set_beam(BeamConfig { prune_factor: F, variant: BeamVariant::SpanDependentStopped, ..BeamConfig::default() });
    let stopped = |end: usize, p: f64| Item { stop: true, ..open("VP", "saw", 0, end, head, p) };
    assert!(chart.outside_beam(&stopped(2, -4.5), 0.0));
    assert!(!chart.outside_beam(&stopped(2, -3.5), 0.0));
    // span 4 still gets 4.0; span 5 gets ln 10 * 3.4
    assert!(chart.outside_beam(&stopped(4, -4.5), 0.0));
    assert!(!chart.outside_beam(&stopped(5, -4.5), 0.0));
    // span 10: ln 10 * 3.0
    assert!(chart.outside_beam(&stopped(10, -7.0), 0.0));
    assert!(!chart.outside_beam(&stopped(10, -6.8), 0.0));
    // span 40: floor of ln 10 * 2
    assert!(!chart.outside_beam(&stopped(40, -4.5), 0.0));
    // open items keep the plain factor
    assert!(!chart.outside_beam(&open("VP", "saw", 0, 10, head, -11.0), 0.0));
}

#[test]
fn disabled_beam_keeps_everything() {
    let (mut chart, head) = seeded(3);
    chart.set_beam(BeamConfig { use_prune_factor: false, ..BeamConfig::default() });
    chart.add(open("VP", "a", 0, 2, head, -1.0)).unwrap();
    chart.add(open("VP", "b", 0, 2, head, -500.0)).unwrap();
    assert_eq!(chart.prune(0, 2), 0);
    assert_eq!(chart.items(0, 2).len(), 2);
}

#[test]
fn equivalent_items_keep_the_better_one() {
    let (mut chart, head) = seeded(3);
    let first = chart.add(open("VP", "saw", 0, 2, head, -4.0)).unwrap().unwrap();
    assert_eq!(chart.add(open("VP", "saw", 0, 2, head, -6.0)).unwrap(), None);
    let better = chart.add(open("VP", "saw", 0, 2, head, -3.0)).unwrap().unwrap();
    assert_eq!(chart.items(0, 2), &[better]);
    assert_eq!(chart.stats().replaced, 1);
    assert_eq!(chart.stats().rejected_equivalent, 1);

    chart.prune(0, 2);
    assert!(chart.pool().try_get(first).is_none());
    assert_eq!(chart.item(better).log_prob, -3.0);
}

#[test]
fn cell_limit_keeps_the_best() {
    let (mut chart, head) = seeded(3);
    chart.set_beam(BeamConfig { prune_factor: F, cell_limit: Some(2), ..BeamConfig::default() });
    for (i, p) in [-3.0, -1.0, -4.0, -2.0].into_iter().enumerate() {
        chart.add(open("VP", &format!("w{i}"), 0, 2, head, p)).unwrap();
    }
    assert_eq!(chart.prune(0, 2), 2);
    // insertion order survives among the kept items
    assert_eq!(cell_probs(&chart, 0, 2), vec![-1.0, -2.0]);
    assert_eq!(chart.stats().limited, 2);
}

#[test]
fn cell_limit_policy_is_pluggable() {
    struct OpenOnly;
    impl CellLimitPolicy for OpenOnly {
        fn applies(&self, item: &Item) -> bool {
            !item.stop
        }
    }
    let mut chart = Chart::new(100, Arc::new(PennTreebank)).with_limit_policy(Arc::new(OpenOnly));
    chart.begin(3);
    chart.set_beam(BeamConfig { prune_factor: F, cell_limit: Some(1), ..BeamConfig::default() });
    let head = chart.add(preterminal("saw", "VBD", 0, -2.0)).unwrap().unwrap();
    chart.add(open("VP", "a", 0, 2, head, -1.0)).unwrap();
    chart.add(open("VP", "b", 0, 2, head, -2.0)).unwrap();
    chart.add(Item { stop: true, ..open("VP", "c", 0, 2, head, -3.0) }).unwrap();
    chart.prune(0, 2);
    assert_eq!(cell_probs(&chart, 0, 2), vec![-1.0, -3.0]);
}

#[test]
fn referenced_items_outlive_their_cell() {
    let (mut chart, head) = seeded(3);
    chart.set_beam(BeamConfig { use_prune_factor: false, ..BeamConfig::default() });
    let inner = chart.add(open("VP", "saw", 0, 2, head, -30.0)).unwrap().unwrap();
    let outer = chart.add(open("S", "saw", 0, 2, inner, -1.0)).unwrap().unwrap();
    chart.set_beam(BeamConfig { prune_factor: F, ..BeamConfig::default() });
    chart.prune(0, 2);
    assert_eq!(chart.items(0, 2), &[outer]);
    assert_eq!(chart.item(inner).label, s("VP"));

    chart.clear_non_preterminals();
    assert!(chart.pool().try_get(inner).is_none());
    assert!(chart.pool().try_get(outer).is_none());
}

#[test]
fn clear_non_preterminals_resets_tops() {
    let mut chart = chart(2);
    let the = chart.add(preterminal("the", "DT", 0, -1.0)).unwrap().unwrap();
    let dog = chart.add(preterminal("dog", "NN", 1, -2.0)).unwrap().unwrap();
    let unary = chart.add(Item { log_prob: 0.5, ..open("NPB", "the", 0, 0, the, 0.5) }).unwrap().unwrap();
    chart.add(open("NPB", "dog", 0, 1, dog, -1.0)).unwrap();
    assert_eq!(chart.top_item(0, 0), Some(unary));

    chart.clear_non_preterminals();
    assert_eq!(chart.items(0, 0), &[the]);
    assert_eq!(chart.items(1, 1), &[dog]);
    assert_eq!(chart.top_prob(0, 0), -1.0);
    assert_eq!(chart.top_item(0, 0), Some(the));
    assert!(chart.items(0, 1).is_empty());
    assert_eq!(chart.top_prob(0, 1), f64::NEG_INFINITY);
    assert!(chart.pool().try_get(unary).is_none());

    // A stale top of -1 would have rejected this.
    assert!(chart.add(open("NPB", "dog", 0, 1, dog, -30.0)).unwrap().is_some());
}

#[test]
fn pool_exhaustion_is_an_error() {
    let mut chart = Chart::new(2, Arc::new(PennTreebank));
    chart.begin(3);
    chart.add(preterminal("a", "DT", 0, -1.0)).unwrap();
    chart.add(preterminal("b", "NN", 1, -1.0)).unwrap();
    let err = chart.add(preterminal("c", "VB", 2, -1.0)).unwrap_err();
    assert!(matches!(err, Error::PoolExhausted { capacity: 2 }));

    // teardown hands every slot back
    chart.begin(1);
    assert!(chart.add(preterminal("a", "DT", 0, -1.0)).is_ok());
    assert_eq!(chart.pool().live(), 1);
}

#[test]
#[should_panic(expected = "used after release")]
fn stale_handles_panic() {
    let mut pool = ItemPool::with_capacity(4);
    let id = pool.alloc(preterminal("a", "DT", 0, -1.0)).unwrap();
    assert!(pool.release(id));
    assert!(!pool.release(id));
    let reused = pool.alloc(preterminal("b", "DT", 0, -1.0)).unwrap();
    assert_ne!(id, reused);
    pool.get(id);
}

#[test]
fn best_parse_picks_the_top_label() {
    let mut chart = chart(1);
    let dog = chart.add(preterminal("dog", "NN", 0, -1.0)).unwrap().unwrap();
    assert_eq!(chart.best_parse(), None);
    let top = chart.add(Item { stop: true, ..open("+TOP+", "dog", 0, 0, dog, -3.0) }).unwrap().unwrap();
    assert_eq!(chart.best_parse(), Some(top));
}

proptest! {
    #[test]
    fn pruned_cells_respect_the_beam(probs in proptest::collection::vec(-60.0f64..0.0, 1..20)) {
        let (mut chart, head) = seeded(3);
        chart.set_beam(BeamConfig { use_prune_factor: false, ..BeamConfig::default() });
        for (i, p) in probs.iter().enumerate() {
            chart.add(open("VP", &format!("w{i}"), 0, 2, head, *p)).unwrap();
        }
        chart.set_beam(BeamConfig { prune_factor: F, ..BeamConfig::default() });
        chart.prune(0, 2);
        let top = probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(chart.top_prob(0, 2), top);
        let kept = cell_probs(&chart, 0, 2);
        prop_assert_eq!(kept.len(), probs.iter().filter(|p| **p >= top - F).count());
        prop_assert!(kept.iter().all(|p| *p >= top - F));
    }
}
