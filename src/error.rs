//! Error taxonomy for the PLC log codec.
//!
//! A structured enum rather than `anyhow`: callers re-embedding a chain (an on-chain
//! indexer, say) need to tell a corrupt edit script apart from a stream that simply isn't
//! CBOR, and react differently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed CBOR: {0}")]
    MalformedCbor(String),

    #[error("index {index} is out of range for the previous document")]
    IndexOutOfRange { index: u64 },

    #[error("index {index} addresses a {found}, which cannot be used as {expected}")]
    WrongContainerKind {
        index: u64,
        expected: String,
        found: String,
    },

    #[error("tag {tag} payload is invalid: {reason}")]
    TagPayloadInvalid { tag: u64, reason: String },

    #[error("tag {tag} is not a known key tag (expected 10..=19)")]
    UnknownKeyTag { tag: u64 },

    #[error("malformed edit script: {0}")]
    MalformedEdit(String),

    #[error("document {index} in the chain failed to decode: {source}")]
    Chained {
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps this error with the index of the document in the chain that failed.
    pub fn at_document(self, index: usize) -> Error {
        Error::Chained {
            index,
            source: Box::new(self),
        }
    }
}
