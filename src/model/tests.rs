use super::*;
use crate::sexp::logprob::LOG_OF_ZERO;
use crate::sexp::{Symbol, symbols};
use crate::settings::TrainerSettings;
use crate::subcat::Subcat;
use crate::trainer_event::{HeadEvent, Side};
use crate::training::Trainer;
use crate::treebank::Language;
use crate::word::Word;
use std::sync::Arc;

fn s(x: &str) -> Symbol {
    Symbol::new(x)
}

fn head_event(word: &str, parent: &str, head: &str) -> HeadEvent {
    HeadEvent::new(Arc::new(Word::new(s(word), s("NN"))), s(parent), s(head), Subcat::new(), Subcat::new())
}

fn head_model() -> Model<HeadStructure> {
    let mut model = Model::new(HeadStructure::new(&Language::penn()));
    model.add_event(&head_event("dog", "NPB", "NN"), 2.0);
    model.add_event(&head_event("dog", "NPB", "JJ"), 1.0);
    model.add_event(&head_event("cat", "NPB", "NN"), 1.0);
    model
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn counts_and_diversity() {
    let model = head_model();
    let event = head_event("dog", "NPB", "NN");
    let trio = model.level(0);
    let history = model.structure().history(&event, 0);
    assert_eq!(trio.history().count(&history, CountsTrio::HIST), 3.0);
    assert_eq!(trio.history().count(&history, CountsTrio::DIVERSITY), 2.0);
    assert_eq!(model.level(2).history().count(&model.structure().history(&event, 2), CountsTrio::HIST), 4.0);
    assert_eq!(model.sizes(), vec![3, 2, 2]);
}

#[test]
fn history_counts_share_canonical_histories() {
    let model = head_model();
    for level in 0..3 {
        let trio = model.level(level);
        for (transition, _) in trio.transition().iter() {
            let (stored, _) = trio.history().iter().find(|(h, _)| **h == *transition.history()).unwrap();
            assert!(Arc::ptr_eq(stored, transition.history()), "level {level}: {transition}");
        }
    }
}

#[test]
fn deleted_interpolation() {
    let model = head_model();
    // λ0 = 3/13, λ1 = 4/14; levels estimate 2/3, 3/4, 3/4.
    let expected: f64 = 3.0 / 13.0 * (2.0 / 3.0) + 10.0 / 13.0 * (4.0 / 14.0 * 0.75 + 10.0 / 14.0 * 0.75);
    assert!(close(model.estimate_log_prob(&head_event("dog", "NPB", "NN")), expected.ln()));

    // Unseen word: the most specific level carries no weight.
    assert!(close(model.estimate_log_prob(&head_event("fish", "NPB", "NN")), 0.75f64.ln()));

    assert_eq!(model.estimate_log_prob(&head_event("dog", "VP", "NN")), LOG_OF_ZERO);
}

#[test]
fn level_lookup_is_unsmoothed() {
    let model = head_model();
    let event = head_event("dog", "NPB", "NN");
    let transition = model.structure().transition(&event, 0);
    assert!(close(model.level_log_prob(&transition, 0), (2.0f64 / 3.0).ln()));
    let unseen = model.structure().transition(&head_event("dog", "NPB", "DT"), 0);
    assert_eq!(model.level_log_prob(&unseen, 0), LOG_OF_ZERO);
}

#[test]
fn cache_memoises() {
    let model = head_model();
    let mut cache = LogProbCache::new();
    let event = head_event("dog", "NPB", "NN");
    let first = model.cached_log_prob(&mut cache, &event);
    let second = model.cached_log_prob(&mut cache, &event);
    assert_eq!(first, second);
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn subcat_structure_uses_term_smoothing() {
    let structure = SubcatStructure::new(Side::Left, &Language::penn());
    assert_eq!(structure.lambda_fudge(), 0.0);
    assert_eq!(structure.lambda_fudge_term(), 5.0);
    let event = HeadEvent::new(
        Arc::new(Word::new(s("saw"), s("VBD"))),
        s("S-A"),
        s("VP"),
        Subcat::from_labels([s("NP-A")]),
        Subcat::new(),
    );
    assert_eq!(structure.history(&event, 2).to_string(), "(VP S)");
    assert_eq!(structure.future(&event, 0).to_string(), "( (NP-A))");
}

#[test]
fn derived_maps() {
    let settings = TrainerSettings { unknown_word_threshold: 0, ..TrainerSettings::default() };
    let trainer = Trainer::new(Language::penn(), settings);
    let events = trainer.train("(S (NP (DT the) (NN dog)) (VP (VBD barked)))\n(S (NP (NN dogs)) (VP (VBD ran)))").unwrap();
    let models = ModelCollection::derive(&events, trainer.language());

    assert_eq!(models.tags_for(s("dog")), &[s("NN")]);
    assert!(models.vocabulary.contains(&s("barked")));
    assert_eq!(models.parents_of(s("NN")), &[s("NPB")]);
    assert_eq!(models.parents_of(s("VP")), &[s("S")]);
    assert_eq!(models.subcats(Side::Left, s("VP"), s("S")), &[Subcat::from_labels([s("NP-A")])]);
    assert_eq!(models.subcats(Side::Right, s("VP"), s("S")), &[Subcat::new()]);
    assert!(models.parents_of(s("ZZZ")).is_empty());
    assert_eq!((models.num_prev_mods, models.num_prev_words), (1, 1));

    let top = HeadEvent::new(
        Arc::new(Word::new(s("barked"), s("VBD"))),
        symbols::top(),
        s("S"),
        Subcat::new(),
        Subcat::new(),
    );
    assert!(models.top_nonterminal.estimate_log_prob(&top) > LOG_OF_ZERO);
    assert!(models.top_lex.estimate_log_prob(&top) > LOG_OF_ZERO);
}
