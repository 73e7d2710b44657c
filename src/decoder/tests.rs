use super::*;
use crate::settings::{Settings, TrainerSettings, keys};
use crate::shift::ShifterKind;
use crate::training::Trainer;

const TREEBANK: &str = "
(S (NP (DT the) (NN dog)) (VP (VBD barked)))
(S (NP (DT the) (NN cat)) (VP (VBD saw) (NP (DT the) (NN dog))))
(S (NP (DT a) (NN cat)) (VP (VBD barked)))
";

fn s(x: &str) -> Symbol {
    Symbol::new(x)
}

fn models() -> Arc<ModelCollection> {
    let trainer = Trainer::new(Language::penn(), TrainerSettings { unknown_word_threshold: 0, ..TrainerSettings::default() });
    let events = trainer.train(TREEBANK).unwrap();
    Arc::new(ModelCollection::derive(&events, trainer.language()))
}

fn decoder(settings: DecoderSettings) -> Decoder {
    Decoder::new(models(), Language::penn(), settings)
}

fn sentence(text: &str) -> Vec<InputWord> {
    read_sentence(&Sexp::parse(text).unwrap()).unwrap()
}

fn parse(decoder: &mut Decoder, text: &str) -> Option<Parse> {
    decoder.parse(&sentence(text)).unwrap()
}

#[test]
fn reads_sentences() {
    let cases: Vec<(Vec<InputWord>, &str)> = vec![
        (vec![InputWord::new(s("the")), InputWord::new(s("dog"))], "(the dog)"),
        (vec![InputWord::tagged(s("dog"), [s("NN")])], "((dog NN))"),
        (vec![InputWord::tagged(s("saw"), [s("VBD"), s("NN")])], "((saw (VBD NN)))"),
        (vec![], "()"),
    ];
    for (expected, text) in cases {
        assert_eq!(read_sentence(&Sexp::parse(text).unwrap()).unwrap(), expected, "{text}");
    }
    for bad in ["dog", "((dog NN extra))", "(((dog) NN))"] {
        assert!(matches!(read_sentence(&Sexp::parse(bad).unwrap()), Err(Error::MalformedEntry { .. })), "{bad}");
    }
}

#[test]
fn parses_training_sentences() {
    let mut decoder = decoder(DecoderSettings::default());
    let cases: Vec<(&str, &str)> = vec![
        ("(S (NP (DT the) (NN dog)) (VP (VBD barked)))", "(the dog barked)"),
        ("(S (NP (DT the) (NN cat)) (VP (VBD saw) (NP (DT the) (NN dog))))", "(the cat saw the dog)"),
        // a new combination of known words
        ("(S (NP (DT the) (NN dog)) (VP (VBD saw) (NP (DT the) (NN cat))))", "(the dog saw the cat)"),
    ];
    for (expected, text) in cases {
        let found = parse(&mut decoder, text).unwrap();
        assert_eq!(found.tree.to_string(), expected, "{text}");
        assert!(!found.relaxed, "{text}");
        assert!(found.log_prob <= 0.0 && found.log_prob.is_finite(), "{text}: {}", found.log_prob);
        assert_eq!(found.prune_factor, decoder.settings().prune_factor);
    }
    assert!(decoder.last_stats().added > 0);
    assert_eq!(decoder.chart.pool().live(), 0);
}

#[test]
fn unknown_words_need_relaxed_constraints() {
    let mut relaxing = decoder(DecoderSettings::default());
    let found = parse(&mut relaxing, "(the dog (zorped VBD))").unwrap();
    assert_eq!(found.tree.to_string(), "(S (NP (DT the) (NN dog)) (VP (VBD zorped)))");
    assert!(found.relaxed);
    assert!((found.prune_factor - relaxing.settings().max_prune_factor).abs() < 1e-9);

    let mut strict = decoder(DecoderSettings { relax_constraints: false, ..DecoderSettings::default() });
    assert_eq!(parse(&mut strict, "(the dog (zorped VBD))"), None);
}

#[test]
fn supplied_tags_restrict_the_search() {
    let mut decoder = decoder(DecoderSettings { relax_constraints: false, ..DecoderSettings::default() });
    let tagged = parse(&mut decoder, "((the DT) (dog NN) (barked VBD))").unwrap();
    let untagged = parse(&mut decoder, "(the dog barked)").unwrap();
    assert_eq!(tagged.tree, untagged.tree);
    assert_eq!(parse(&mut decoder, "(the dog (barked DT))"), None);
}

#[test]
fn empty_sentence_has_no_parse() {
    let mut decoder = decoder(DecoderSettings::default());
    assert_eq!(decoder.parse(&[]).unwrap(), None);
}

#[test]
fn long_sentences_are_refused() {
    let mut decoder = decoder(DecoderSettings { max_sentence_length: 2, ..DecoderSettings::default() });
    let err = decoder.parse(&sentence("(the dog barked)")).unwrap_err();
    assert!(matches!(err, Error::SentenceTooLong { length: 3, max: 2 }));
    assert!(decoder.parse(&sentence("(dog barked)")).is_ok());
}

#[test]
fn pool_exhaustion_is_per_sentence() {
    let mut decoder = decoder(DecoderSettings { item_pool_size: 3, ..DecoderSettings::default() });
    let err = decoder.parse(&sentence("(the dog barked)")).unwrap_err();
    assert!(matches!(err, Error::PoolExhausted { capacity: 3 }));
    assert_eq!(decoder.chart.pool().live(), 0);
}

#[test]
fn attempts_widen_then_relax() {
    let ln10 = std::f64::consts::LN_10;
    let decoder = decoder(DecoderSettings::default());
    let attempts: Vec<(f64, bool)> =
        decoder.attempts().into_iter().map(|(f, relaxed)| ((f / ln10 * 1e9).round() / 1e9, relaxed)).collect();
    assert_eq!(attempts, vec![(4.0, false), (5.0, false), (6.0, false), (6.0, true)]);

    let no_beam = self::decoder(DecoderSettings { use_prune_factor: false, relax_constraints: false, ..DecoderSettings::default() });
    assert_eq!(no_beam.attempts().len(), 1);
}

#[test]
fn commas_inside_parentheses_do_not_count() {
    let mut decoder = decoder(DecoderSettings::default());
    decoder.prepare(&sentence("(a , -LRB- b , c -RRB- d)"));
    assert_eq!(decoder.comma, vec![false, true, false, false, false, false, false, false]);
}

#[test]
fn settings_handle_changes_apply_to_the_next_sentence() {
    let handle = SettingsHandle::new(Settings::new());
    let mut decoder = Decoder::with_settings_handle(models(), Language::penn(), handle.clone()).unwrap();
    assert!(parse(&mut decoder, "(the dog barked)").is_some());

    let mut shorter = Settings::new();
    shorter.set(keys::MAX_SENTENCE_LENGTH, 2);
    handle.replace(shorter).unwrap();
    assert!(matches!(decoder.parse(&sentence("(the dog barked)")), Err(Error::SentenceTooLong { .. })));
    assert_eq!(decoder.settings().max_sentence_length, 2);
}

#[test]
fn history_windows_skip_base_np_punctuation() {
    let mut decoder = decoder(DecoderSettings { shifter: ShifterKind::BaseNpAware, ..DecoderSettings::default() });
    decoder.chart.begin(3);
    let add = |decoder: &mut Decoder, word: &str, tag: &str, position: usize| {
        let word = Arc::new(Word::new(s(word), s(tag)));
        decoder.chart.add(Item::preterminal(word, position, false, -1.0)).unwrap().unwrap()
    };
    let dog = add(&mut decoder, "dog", "NN", 0);
    let comma = add(&mut decoder, ",", ",", 1);

    let (mods, words) = decoder.history_windows(s("NPB"), &[dog, comma]);
    assert_eq!(mods, vec![s("NN")]);
    assert_eq!(words, vec![Word::new(s("dog"), s("NN"))]);

    let (mods, _) = decoder.history_windows(s("VP"), &[dog, comma]);
    assert_eq!(mods, vec![s(",")]);

    let (mods, words) = decoder.history_windows(s("VP"), &[]);
    assert_eq!((mods, words), (vec![symbols::start()], vec![Word::start()]));
}
