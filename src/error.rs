//! Error types for hdparse.
//!
//! Only recoverable conditions live here. Programming errors (asking a
//! non-modifier event for its side, reading an event component outside its
//! declared bounds, touching a chart item after it went back to the pool)
//! panic at the call site instead.

use thiserror::Error;

/// Result type for hdparse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hdparse operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A tuning value could not be parsed or is out of range.
    #[error("invalid value for setting `{key}`: {message}")]
    Config { key: String, message: String },

    /// A configured policy name does not resolve to a known implementation.
    #[error("unknown {kind} `{name}`")]
    UnknownPolicy { kind: &'static str, name: String },

    /// Malformed s-expression text.
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A persisted counts or event entry has the wrong shape.
    #[error("malformed entry on line {line}: {message}")]
    MalformedEntry { line: usize, message: String },

    /// Typed add of a component kind the event does not declare.
    #[error("event does not support {0} components")]
    UnsupportedComponent(&'static str),

    /// The chart item pool ran out of slots while parsing one sentence.
    #[error("chart item pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    /// Sentence longer than `parser.decoder.maxSentenceLength`.
    #[error("sentence of length {length} exceeds the maximum of {max}")]
    SentenceTooLong { length: usize, max: usize },

    /// Training input produced no usable trees.
    #[error("treebank contained no trainable trees")]
    EmptyTreebank,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error for `key`.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config { key: key.into(), message: message.into() }
    }

    /// Create a syntax error at `line`.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Error::Syntax { line, message: message.into() }
    }

    /// Create a malformed-entry error at `line`.
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Error::MalformedEntry { line, message: message.into() }
    }

    /// Re-anchor a malformed entry reported without position to `line`.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            Error::MalformedEntry { line: 0, message } => Error::MalformedEntry { line, message },
            Error::Syntax { line: 0, message } => Error::Syntax { line, message },
            other => other,
        }
    }
}
