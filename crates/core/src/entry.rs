//! `Entry`: an authenticated record identified by `(subspace, path,
//! timestamp)` within a namespace (§3).

use crate::digest::Digest;
use crate::ids::{NamespaceId, SubspaceId};
use crate::path::Path;
use std::cmp::Ordering;

/// An authenticated record.
///
/// Generic over the namespace id, subspace id, payload digest, and
/// authorisation-token digest schemes, so that a store can be instantiated
/// over whatever concrete cryptographic scheme a deployment supplies
/// without this crate depending on any of them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> {
    /// Constant per store instance.
    pub namespace_id: N,
    /// Opaque, totally ordered subspace identifier.
    pub subspace_id: S,
    /// Ordered sequence of byte components, bounded by a path scheme.
    pub path: Path,
    /// Microsecond timestamp, compared numerically.
    pub timestamp: u64,
    /// Digest of the referenced payload.
    pub payload_digest: PD,
    /// Length in bytes of the referenced payload.
    pub payload_length: u64,
    /// Digest of the external authorisation token that authorised this
    /// entry.
    pub authorisation_token_digest: AD,
}

impl<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> Entry<N, S, PD, AD> {
    /// The newness relation of §4.8: `self` is newer than `other` iff
    /// `self.timestamp > other.timestamp`, or timestamps are equal and
    /// `self.payload_digest > other.payload_digest`, or timestamps and
    /// digests are equal and `self.payload_length > other.payload_length`.
    ///
    /// Undefined (and not meaningful to call) across different
    /// `(namespace, subspace, path)` triples; newness only orders entries
    /// that could occupy the same slot.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        match self.timestamp.cmp(&other.timestamp) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match self.payload_digest.cmp(&other.payload_digest) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => self.payload_length > other.payload_length,
            },
        }
    }

    /// True iff neither entry is newer than the other under
    /// `is_newer_than` (identical timestamp, digest, and length).
    pub fn is_same_age_as(&self, other: &Self) -> bool {
        !self.is_newer_than(other) && !other.is_newer_than(self)
    }
}
