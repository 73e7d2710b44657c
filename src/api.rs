use crate::chart::ChartStats;
use crate::decoder::{Decoder, InputWord, read_sentence};
use crate::error::Result;
use crate::model::ModelCollection;
use crate::settings::{Settings, SettingsHandle, TrainerSettings};
use crate::sexp::Sexp;
use crate::training::{ObservedEvents, Trainer};
use crate::treebank::{HeadTable, Language};
use std::io::BufRead;
use std::sync::Arc;

/// Result of [`Parser::parse_sentence`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// Best tree over the original words, `None` when every attempt failed.
    pub tree: Option<Sexp>,
    pub log_prob: Option<f64>,
    /// Beam width (log10 units) of the attempt that produced the tree.
    pub prune_factor: Option<f64>,
    /// Whether the tree needed the relaxed final attempt.
    pub relaxed: bool,
    /// Chart counters and wall time of the whole sentence.
    pub stats: ChartStats,
}

/// Trained models plus a decoder.
///
/// # Example
/// ```
/// use hdparse::{Parser, Settings, Sexp};
///
/// let mut settings = Settings::new();
/// settings.set("parser.trainer.unknownWordThreshold", 0);
/// let mut parser = Parser::train("(S (NP (DT the) (NN dog)) (VP (VBD barked)))", &settings).unwrap();
///
/// let outcome = parser.parse_sentence(&Sexp::parse("(the dog barked)").unwrap()).unwrap();
/// assert_eq!(outcome.tree.unwrap().to_string(), "(S (NP (DT the) (NN dog)) (VP (VBD barked)))");
/// ```
pub struct Parser {
    models: Arc<ModelCollection>,
    language: Language,
    settings: SettingsHandle,
    decoder: Decoder,
}

/// Penn Treebank policies, with the head table replaced when
/// `parser.headTableFile` names one.
pub fn language_for(settings: &TrainerSettings) -> Result<Language> {
    let language = Language::penn();
    match &settings.head_table_file {
        Some(path) => {
            let table = HeadTable::load(path)?;
            log::info!("loaded {} head rules from {}", table.len(), path.display());
            Ok(language.with_head_finder(Arc::new(table)))
        }
        None => Ok(language),
    }
}

/// Count the events of `treebank_text` under `settings`.
pub fn train_events(treebank_text: &str, settings: &Settings) -> Result<ObservedEvents> {
    settings.validate()?;
    let trainer_settings = settings.trainer()?;
    let trainer = Trainer::new(language_for(&trainer_settings)?, trainer_settings);
    trainer.train(treebank_text)
}

impl Parser {
    /// Train on a treebank and get ready to parse.
    pub fn train(treebank_text: &str, settings: &Settings) -> Result<Parser> {
        let events = train_events(treebank_text, settings)?;
        Parser::from_observed(&events, settings)
    }

    /// Load an observed-events file written by [`ObservedEvents::write`].
    pub fn from_events<R: BufRead>(reader: R, settings: &Settings) -> Result<Parser> {
        let events = ObservedEvents::read(reader)?;
        Parser::from_observed(&events, settings)
    }

    pub fn from_observed(events: &ObservedEvents, settings: &Settings) -> Result<Parser> {
        settings.validate()?;
        let language = language_for(&settings.trainer()?)?;
        let models = Arc::new(ModelCollection::derive(events, &language));
        let handle = SettingsHandle::new(settings.clone());
        let decoder = Decoder::with_settings_handle(Arc::clone(&models), language.clone(), handle.clone())?;
        Ok(Parser { models, language, settings: handle, decoder })
    }

    pub fn models(&self) -> &Arc<ModelCollection> {
        &self.models
    }

    /// Handle whose [`SettingsHandle::replace`] retunes this parser from the
    /// next sentence on.
    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// A second decoder over the same models, for another thread.
    pub fn decoder(&self) -> Result<Decoder> {
        Decoder::with_settings_handle(Arc::clone(&self.models), self.language.clone(), self.settings.clone())
    }

    /// Parse a sentence given as `(word ...)`, each word optionally
    /// `(word tag)` or `(word (tag ...))`.
    pub fn parse_sentence(&mut self, sentence: &Sexp) -> Result<ParseOutcome> {
        let words = read_sentence(sentence)?;
        self.parse_words(&words)
    }

    pub fn parse_words(&mut self, words: &[InputWord]) -> Result<ParseOutcome> {
        let parse = self.decoder.parse(words)?;
        let stats = self.decoder.last_stats().clone();
        Ok(match parse {
            Some(parse) => ParseOutcome {
                tree: Some(parse.tree),
                log_prob: Some(parse.log_prob),
                prune_factor: Some(parse.prune_factor / std::f64::consts::LN_10),
                relaxed: parse.relaxed,
                stats,
            },
            None => ParseOutcome { tree: None, log_prob: None, prune_factor: None, relaxed: false, stats },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::settings::keys;

    const TREEBANK: &str = "
        (S (NP (DT the) (NN dog)) (VP (VBD barked)))
        (S (NP (DT the) (NN cat)) (VP (VBD saw) (NP (DT the) (NN dog))))
    ";

    fn settings() -> Settings {
        let mut settings = Settings::new();
        settings.set(keys::UNKNOWN_WORD_THRESHOLD, 0);
        settings
    }

    fn sexp(text: &str) -> Sexp {
        Sexp::parse(text).unwrap()
    }

    #[test]
    fn train_then_parse() {
        let mut parser = Parser::train(TREEBANK, &settings()).unwrap();
        let outcome = parser.parse_sentence(&sexp("(the cat saw the dog)")).unwrap();
        assert_eq!(
            outcome.tree.map(|t| t.to_string()).as_deref(),
            Some("(S (NP (DT the) (NN cat)) (VP (VBD saw) (NP (DT the) (NN dog))))")
        );
        assert_eq!(outcome.prune_factor.map(f64::round), Some(4.0));
        assert!(!outcome.relaxed);
        assert!(outcome.stats.added > 0);
    }

    #[test]
    fn events_file_round_trip() {
        let events = train_events(TREEBANK, &settings()).unwrap();
        let mut written = Vec::new();
        events.write(&mut written).unwrap();

        let mut from_file = Parser::from_events(written.as_slice(), &settings()).unwrap();
        let mut trained = Parser::train(TREEBANK, &settings()).unwrap();
        let sentence = sexp("(the dog barked)");
        assert_eq!(from_file.parse_sentence(&sentence).unwrap().tree, trained.parse_sentence(&sentence).unwrap().tree);
    }

    #[test]
    fn failures() {
        let mut parser = Parser::train(TREEBANK, &settings()).unwrap();
        let outcome = parser.parse_sentence(&sexp("(barked barked barked)")).unwrap();
        assert!(outcome.tree.is_none() || outcome.relaxed);

        assert!(matches!(parser.parse_sentence(&sexp("dog")), Err(Error::MalformedEntry { .. })));
        assert!(matches!(Parser::train("", &settings()), Err(Error::EmptyTreebank)));

        let mut missing = settings();
        missing.set(keys::HEAD_TABLE_FILE, "/nonexistent/head-rules");
        assert!(matches!(Parser::train(TREEBANK, &missing), Err(Error::Io(_))));

        let mut bad = settings();
        bad.set(keys::PRUNE_FACTOR, "wide");
        assert!(matches!(Parser::train(TREEBANK, &bad), Err(Error::Config { .. })));
    }

    #[test]
    fn settings_reload_reaches_the_decoder() {
        let mut parser = Parser::train(TREEBANK, &settings()).unwrap();
        let mut short = settings();
        short.set(keys::MAX_SENTENCE_LENGTH, 2);
        parser.settings().replace(short).unwrap();
        assert!(matches!(parser.parse_sentence(&sexp("(the dog barked)")), Err(Error::SentenceTooLong { .. })));

        let mut second = parser.decoder().unwrap();
        assert_eq!(second.settings().max_sentence_length, 2);
        assert!(second.parse(&[InputWord::new(crate::sexp::Symbol::new("dog"))]).is_ok());
    }
}
