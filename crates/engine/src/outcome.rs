//! The three-way admission outcome (§4.8): `Success`, `NoOp`, `Failure`.
//!
//! `willow_core::Error` already classifies itself via
//! `is_admission_noop`/`is_admission_failure`; this module is just the
//! typed wrapper the engine returns instead of a bare `Result`, so callers
//! can match on an outcome without having to know which `Error` variants
//! are noops versus hard failures. Errors that are neither a recognised
//! noop nor a recognised failure (storage/codec/willow) are not an
//! admission outcome at all and propagate as `Err`.

use willow_core::{Digest, Entry, Error, NamespaceId, Result, SubspaceId};

/// The outcome of an ingestion admission attempt.
#[derive(Debug, Clone)]
pub enum IngestOutcome<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> {
    /// The entry was admitted, pruning `removed`.
    Success {
        /// The admitted entry.
        entry: Entry<N, S, PD, AD>,
        /// Entries pruned as a result.
        removed: Vec<Entry<N, S, PD, AD>>,
    },
    /// The entry was rejected for a reason that isn't an error: it was
    /// already obsolete by the time it was considered.
    NoOp {
        /// Why no admission took place.
        reason: Error,
    },
    /// The entry was rejected outright: malformed, unauthorised, or
    /// otherwise invalid.
    Failure {
        /// Why admission failed.
        reason: Error,
    },
}

/// Classify a raw admission `Result` into the three-way outcome shape,
/// given the entry that would have been admitted on success. A hard error
/// (anything other than the named admission noop/failure variants)
/// propagates rather than being folded into `Failure`.
pub fn classify<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>(
    result: Result<Vec<Entry<N, S, PD, AD>>>,
    entry: Entry<N, S, PD, AD>,
) -> Result<IngestOutcome<N, S, PD, AD>> {
    match result {
        Ok(removed) => Ok(IngestOutcome::Success { entry, removed }),
        Err(err) if err.is_admission_noop() => Ok(IngestOutcome::NoOp { reason: err }),
        Err(err) if err.is_admission_failure() => Ok(IngestOutcome::Failure { reason: err }),
        Err(err) => Err(err),
    }
}

impl<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> IngestOutcome<N, S, PD, AD> {
    /// True iff the entry was admitted.
    pub fn is_success(&self) -> bool {
        matches!(self, IngestOutcome::Success { .. })
    }
}

/// The outcome of an explicit `remove_entry` call.
#[derive(Debug, Clone)]
pub enum RemoveOutcome<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> {
    /// An entry was present at the given `(subspace, path)` and was removed.
    Success {
        /// The removed entry.
        entry: Entry<N, S, PD, AD>,
    },
    /// No entry was present at the given `(subspace, path)`.
    NoOp,
}

/// The outcome of an `ingest_payload` call.
#[derive(Debug, Clone)]
pub enum PayloadOutcome<PD: Digest> {
    /// The payload was received, validated, and stored.
    Success {
        /// Digest of the received payload.
        digest: PD,
        /// Length in bytes of the received payload.
        length: u64,
    },
    /// The payload was already fully held; nothing changed.
    NoOp,
    /// The payload was rejected: no matching entry, or a digest mismatch.
    Failure {
        /// Why ingestion failed.
        reason: Error,
    },
}
