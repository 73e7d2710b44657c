//! Head-driven lexicalized statistical parsing.
//!
//! ```text
//! treebank ──Trainer──> ObservedEvents ──ModelCollection::derive──> models
//!                                                                      │
//! sentence ──Decoder (CKY chart, beam, pooled items)───────────────────┴──> tree
//! ```
//!
//! [`Parser`] wires the two halves together; the modules below are public
//! for callers that want to drive training, counting or decoding directly.

#[macro_use]
mod macros;
mod api;
pub mod chart;
pub mod counts;
pub mod decoder;
mod error;
pub mod event;
pub mod model;
pub mod settings;
pub mod sexp;
pub mod shift;
pub mod subcat;
pub mod trainer_event;
pub mod training;
pub mod transition;
pub mod treebank;
pub mod word;

pub use api::{ParseOutcome, Parser, language_for, train_events};
pub use chart::ChartStats;
pub use decoder::{Decoder, InputWord, Parse, read_sentence};
pub use error::{Error, Result};
pub use settings::{DecoderSettings, Settings, SettingsHandle, TrainerSettings};
pub use sexp::{Sexp, SexpCodec, SexpReader, Symbol};
pub use training::ObservedEvents;
pub use treebank::Language;
pub use word::Word;
