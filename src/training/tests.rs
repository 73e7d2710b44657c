use super::*;
use crate::sexp::Sexp;
use crate::shift::ShifterKind;

fn s(x: &str) -> Symbol {
    Symbol::new(x)
}

fn trainer(settings: TrainerSettings) -> Trainer {
    Trainer::new(Language::penn(), settings)
}

fn all_known() -> TrainerSettings {
    TrainerSettings { unknown_word_threshold: 0, ..TrainerSettings::default() }
}

fn preprocessed(text: &str) -> String {
    let sexp = Sexp::parse(text).unwrap();
    preprocess(&sexp, &Language::penn()).unwrap().unwrap().to_sexp().to_string()
}

#[test]
fn preprocessing() {
    let cases: Vec<(&str, &str)> = vec![
        (
            "(S (NP-A (NPB (DT The) (NN dog))) (VP (VBD barked) (NP (NPB (NN today)))) (. .))",
            "( (S (NP-SBJ (DT The) (NN dog)) (VP (VBD barked) (NP-TMP (NN today))) (. .)) )",
        ),
        ("(S (VP (VBD ran)))", "(S (NP-SBJ (-NONE- *)) (VP (VBD ran)))"),
        (
            "(NP (NPB (DT the) (NN dog)) (PP (IN in) (NP-A (NPB (DT the) (NN park)))))",
            "(NP (NP (DT the) (NN dog)) (PP (IN in) (NP (DT the) (NN park))))",
        ),
        // coordinated clauses are not arguments of each other
        ("(S (S (VP (VBD ran))) (CC and) (S (VP (VBD hid))))", "(S (S (VP (VBD ran))) (CC and) (S (VP (VBD hid))))"),
    ];
    for (expected, input) in cases {
        assert_eq!(preprocessed(input), expected, "{input}");
    }
}

#[test]
fn empty_trees_are_dropped() {
    let sexp = Sexp::parse("(S (NP-SBJ (-NONE- *)))").unwrap();
    assert!(preprocess(&sexp, &Language::penn()).unwrap().is_none());
    assert!(matches!(trainer(all_known()).train("(S (-NONE- *))"), Err(Error::EmptyTreebank)));
    assert!(matches!(trainer(all_known()).train(""), Err(Error::EmptyTreebank)));
}

#[test]
fn malformed_treebank_text_is_an_error() {
    assert!(matches!(trainer(all_known()).train("(S (NP (NN dog))"), Err(Error::Syntax { .. })));
}

#[test]
fn decomposes_a_simple_sentence() {
    let events = trainer(all_known()).train("(S (NP (DT the) (NN dog)) (VP (VBD barked)))").unwrap();
    assert_eq!(events.heads.len(), 8);
    assert_eq!(events.priors.len(), 7);
    assert_eq!(events.modifiers.len(), 10);
    assert!(events.gaps.is_empty());

    let barked = Arc::new(Word::new(s("barked"), s("VBD")));
    let dog = Arc::new(Word::new(s("dog"), s("NN")));
    let top = HeadEvent::new(Arc::clone(&barked), symbols::top(), s("S"), Subcat::new(), Subcat::new());
    assert_eq!(events.heads.count(&top), 1.0);
    let clause = HeadEvent::new(Arc::clone(&barked), s("S"), s("VP"), Subcat::from_labels([s("NP-A")]), Subcat::new());
    assert_eq!(events.heads.count(&clause), 1.0);

    let subject = ModifierEvent {
        mod_head_word: Arc::clone(&dog),
        head_word: Arc::clone(&barked),
        modifier: s("NP-A"),
        previous_mods: vec![symbols::start()],
        previous_words: vec![Word::start()],
        parent: s("S"),
        head: s("VP"),
        subcat: Subcat::from_labels([s("NP-A")]),
        prev_punc: None,
        prev_conj: None,
        is_conj_p_conj: false,
        verb_intervening: false,
        head_adjacent: true,
        side: Side::Left,
    };
    assert_eq!(events.modifiers.count(&subject), 1.0);

    let left_stop = ModifierEvent {
        mod_head_word: Arc::new(Word::stop()),
        modifier: symbols::stop(),
        previous_mods: vec![s("NP-A")],
        previous_words: vec![Word::clone(&dog)],
        subcat: Subcat::new(),
        head_adjacent: false,
        ..subject
    };
    assert_eq!(events.modifiers.count(&left_stop), 1.0);
}

#[test]
fn verbs_intervene_after_a_verbal_modifier() {
    let events =
        trainer(all_known()).train("(VP (VB eat) (NP (NN food)) (S (VP (VBG running))) (ADVP (RB now)))").unwrap();
    let find = |label: &str| {
        events.modifiers.keys().find(|e| e.modifier == s(label)).cloned().unwrap_or_else(|| panic!("no {label} event"))
    };
    let object = find("NP-A");
    assert!(!object.verb_intervening);
    assert_eq!(object.subcat, Subcat::from_labels([s("NP-A"), s("S-A")]));
    let adverb = find("ADVP");
    assert!(adverb.verb_intervening);
    assert!(adverb.subcat.is_empty());
}

#[test]
fn rare_words_become_unknown_classes() {
    let events = trainer(TrainerSettings::default()).train("(S (NP (NN dog)) (VP (VBD barked)))").unwrap();
    let unknown_verb = PriorEvent::new(Arc::new(Word::new(s("+unknown+ed"), s("VBD"))), s("VBD"));
    assert_eq!(events.priors.count(&unknown_verb), 1.0);
    assert!(events.priors.keys().all(|p| p.head_word.word.as_str().starts_with("+unknown")));
}

#[test]
fn base_np_punctuation_stays_out_of_the_window() {
    let tree = "(NP (DT the) (JJ big) (, ,) (JJ red) (NN ball))";
    // (shifter, window seen by `big`)
    let cases: Vec<(ShifterKind, &str)> = vec![(ShifterKind::BaseNpAware, "JJ"), (ShifterKind::Default, ",")];
    for (kind, expected) in cases {
        let events = trainer(TrainerSettings { shifter: kind, ..all_known() }).train(tree).unwrap();
        let big = events
            .modifiers
            .keys()
            .find(|e| e.mod_head_word.word == s("big"))
            .cloned()
            .unwrap_or_else(|| panic!("no event for `big`"));
        assert_eq!(big.previous_mods, vec![s(expected)], "{kind:?}");
    }
}

#[test]
fn count_threshold_prunes() {
    let text = "(S (NP (NN dogs)) (VP (VBP bark)))\n(S (NP (NN dogs)) (VP (VBP bark)))\n(S (NP (NN cats)) (VP (VBP sleep)))";
    let settings = TrainerSettings { count_threshold: 2.0, ..all_known() };
    let events = trainer(settings).train(text).unwrap();
    assert!(events.heads.iter().all(|(_, c)| c >= 2.0));
    let cats = PriorEvent::new(Arc::new(Word::new(s("cats"), s("NN"))), s("NN"));
    assert_eq!(events.priors.count(&cats), 0.0);
}
