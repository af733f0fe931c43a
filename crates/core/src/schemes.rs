//! Dependency-injected schemes: authorisation and fingerprinting (§6.1).
//!
//! These traits are the seam between this crate's mechanism (ordering,
//! pruning, summarisation) and a deployment's choice of cryptography. They
//! are intentionally narrow — the core never inspects a token or
//! fingerprint beyond what these methods hand back.

use crate::digest::Digest;
use crate::entry::Entry;
use crate::ids::{NamespaceId, SubspaceId};

/// Authorises writes and issues authorisation tokens for entries.
///
/// A token proves that whoever holds it was permitted to write the entry
/// it accompanies; only its digest (`AD`) is stored alongside the entry.
pub trait AuthorisationScheme<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>:
    Send + Sync
{
    /// The token type produced by `authorise` and checked by
    /// `is_authorised_write`.
    type Token: Send + Sync;
    /// Caller-supplied parameters for `authorise` (e.g. a signing key).
    type AuthoriseOpts;

    /// True iff `token` authorises writing `entry`.
    fn is_authorised_write(&self, entry: &Entry<N, S, PD, AD>, token: &Self::Token) -> bool;

    /// Produce a token authorising `entry`, given deployment-specific
    /// options (e.g. a signing credential).
    fn authorise(&self, entry: &Entry<N, S, PD, AD>, opts: &Self::AuthoriseOpts) -> Self::Token;

    /// Compute the digest of a token, as stored alongside the entry.
    fn token_digest(&self, token: &Self::Token) -> AD;
}

/// The payload reference's encoded length contract (§6.1): a payload
/// scheme encodes/decodes digests and can hash a byte stream into one.
pub trait PayloadScheme<PD: Digest>: Send + Sync {
    /// Compute the digest of a complete byte stream.
    fn digest_bytes(&self, bytes: &[u8]) -> PD;
}
