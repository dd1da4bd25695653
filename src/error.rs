//! Error types for the codec.
//!
//! Every failure is reported at the component that first sees the broken
//! precondition. Nothing is retried: the caller fixes the input and starts over.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The tree builder was handed a frequency table with no symbols.
    #[error("invalid input: cannot build a tree from an empty frequency table")]
    InvalidInput,

    /// The encoder met a symbol that has no code in the table.
    #[error("unknown symbol at position {position}: no code in the table")]
    UnknownSymbol { position: usize },

    /// The bit stream, tree or code table cannot be decoded.
    #[error("malformed stream: {reason}")]
    MalformedStream { reason: String },

    /// The decoded text did not match the input (driver verification only).
    #[error("round-trip mismatch: expected {expected} symbols, decoded {actual}")]
    Verification { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("artifact decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedStream {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
