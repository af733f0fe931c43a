//! Error types shared across the willow-store crates.
//!
//! `Error` is the single unified error type threaded through the key-value
//! backend, the skip list, the three-dimensional index, and the ingestion
//! engine. Most of its variants name a taxonomy from the ingestion
//! admission algorithm (`InvalidEntry`, `ObsoleteFromSameSubspace`,
//! `NewerPrefixFound`, `NoEntry`, `DataMismatch`); the remainder
//! (`Storage`, `Validation`, `Codec`, `Io`, `Willow`) carry failures
//! propagated up from collaborators.

use std::io;
use thiserror::Error;

/// Result type alias used throughout willow-store.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for willow-store operations.
#[derive(Debug, Error)]
pub enum Error {
    // NOTE: `Clone` is implemented manually below because `io::Error` isn't
    // `Clone`; the `Io` variant is reconstructed from its kind and message.
    /// Entry fails the namespace check, a path-scheme constraint, or
    /// authorisation.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// Superseded at ingestion time by an existing newer entry at the same
    /// `(subspace, path)`.
    #[error("obsolete: a newer entry already exists at this subspace/path")]
    ObsoleteFromSameSubspace,

    /// A newer entry whose path is a prefix of the candidate makes this
    /// ingestion a no-op.
    #[error("obsolete: a newer entry exists at a prefix of this path")]
    NewerPrefixFound,

    /// `ingest_payload` referenced a key with no matching entry.
    #[error("no entry exists for this payload key")]
    NoEntry,

    /// The computed payload digest differs from the entry's recorded digest.
    #[error("payload digest mismatch")]
    DataMismatch,

    /// Propagated from the key-value backend.
    #[error("storage error: {0}")]
    Storage(String),

    /// Propagated from the payload driver.
    #[error("validation error: {0}")]
    Validation(String),

    /// Propagated from the key codec or entry/index byte encodings.
    #[error("codec error: {0}")]
    Codec(String),

    /// I/O error from a persistent backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Catch-all invariant violation. Should be unreachable; emitted as a
    /// hard error that terminates the current operation.
    #[error("willow invariant violation: {0}")]
    Willow(String),
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::InvalidEntry(s) => Error::InvalidEntry(s.clone()),
            Error::ObsoleteFromSameSubspace => Error::ObsoleteFromSameSubspace,
            Error::NewerPrefixFound => Error::NewerPrefixFound,
            Error::NoEntry => Error::NoEntry,
            Error::DataMismatch => Error::DataMismatch,
            Error::Storage(s) => Error::Storage(s.clone()),
            Error::Validation(s) => Error::Validation(s.clone()),
            Error::Codec(s) => Error::Codec(s.clone()),
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), e.to_string())),
            Error::Willow(s) => Error::Willow(s.clone()),
        }
    }
}

impl Error {
    /// True for the admission-time outcomes that the ingestion engine
    /// reports as structured `NoOp` results rather than propagating.
    pub fn is_admission_noop(&self) -> bool {
        matches!(
            self,
            Error::ObsoleteFromSameSubspace | Error::NewerPrefixFound
        )
    }

    /// True for outcomes reported as structured `Failure` results rather
    /// than propagated as hard errors.
    pub fn is_admission_failure(&self) -> bool {
        matches!(
            self,
            Error::InvalidEntry(_) | Error::NoEntry | Error::DataMismatch
        )
    }
}
