//! The write-ahead flag (§4.8, §6.3): a pair of idempotent kv rows that
//! let a crash between "decided" and "committed" be detected and replayed
//! on the next startup, the same role the teacher's segmented WAL plays —
//! scaled down to a single flag, since §6.3 defines the WAF as plain rows
//! rather than an append log.

use std::sync::Arc;

use willow_core::{Digest, Entry, NamespaceId, Result, SubspaceId};
use willow_core::{KeyPart, TupleKey};
use willow_kv::KvBackend;

use crate::entry_codec::{decode_partial_entry, encode_entry, encode_partial_entry, PartialEntry};

fn insert_key() -> TupleKey {
    vec![KeyPart::text("insert")]
}

fn insert_auth_digest_key() -> TupleKey {
    vec![KeyPart::text("insert"), KeyPart::text("authTokenHash")]
}

fn remove_key() -> TupleKey {
    vec![KeyPart::text("remove")]
}

/// What the write-ahead flag says happened last, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WafState<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> {
    /// An insertion was underway: the entry being admitted, plus the
    /// digest of the token that authorised it.
    Insert(Entry<N, S, PD, AD>),
    /// A removal was underway.
    Remove(PartialEntry<N, S, PD>),
}

/// The write-ahead flag, backed by a `["waf"]`-scoped region.
pub struct WriteAheadFlag {
    backend: Arc<dyn KvBackend>,
}

impl WriteAheadFlag {
    /// Build a write-ahead flag over `backend` (expected to already be
    /// scoped to the `["waf"]` region).
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        WriteAheadFlag { backend }
    }

    /// Record that `entry` (authorised by a token whose digest is
    /// `entry.authorisation_token_digest`) is about to be inserted.
    pub async fn set_insert<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>(
        &self,
        entry: &Entry<N, S, PD, AD>,
    ) -> Result<()> {
        tracing::debug!("write-ahead flag: insert decided");
        self.backend.set(insert_key(), encode_entry(entry)).await?;
        self.backend
            .set(insert_auth_digest_key(), entry.authorisation_token_digest.encode())
            .await
    }

    /// Record that `entry` is about to be removed.
    pub async fn set_remove<N: NamespaceId, S: SubspaceId, PD: Digest>(&self, entry: &PartialEntry<N, S, PD>) -> Result<()> {
        tracing::debug!("write-ahead flag: remove decided");
        self.backend.set(remove_key(), encode_partial_entry(entry)).await
    }

    /// Clear whichever flag is set. Idempotent: clearing an already-clear
    /// flag is a no-op.
    pub async fn clear(&self) -> Result<()> {
        self.backend.delete(&insert_key()).await?;
        self.backend.delete(&insert_auth_digest_key()).await?;
        self.backend.delete(&remove_key()).await?;
        tracing::debug!("write-ahead flag: cleared");
        Ok(())
    }

    /// Read the current flag state, if any.
    ///
    /// `set_insert` writes its entry row before its digest row; a crash
    /// between the two leaves the entry row present with no digest row.
    /// That partial state is indistinguishable from "no insert was ever
    /// decided" as far as recovery is concerned (step 7, the batch commit
    /// that makes the insertion observable, could not yet have run), so
    /// it is treated as no flag being set rather than an error.
    pub async fn read<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>(
        &self,
    ) -> Result<Option<WafState<N, S, PD, AD>>> {
        if let Some(entry_bytes) = self.backend.get(&insert_key()).await? {
            if let Some(digest_bytes) = self.backend.get(&insert_auth_digest_key()).await? {
                let (authorisation_token_digest, _) = AD::decode(&digest_bytes)?;
                let partial: PartialEntry<N, S, PD> = decode_partial_entry(&entry_bytes)?;
                return Ok(Some(WafState::Insert(
                    partial.with_authorisation_token_digest(authorisation_token_digest),
                )));
            }
            return Ok(None);
        }
        if let Some(entry_bytes) = self.backend.get(&remove_key()).await? {
            let partial: PartialEntry<N, S, PD> = decode_partial_entry(&entry_bytes)?;
            return Ok(Some(WafState::Remove(partial)));
        }
        Ok(None)
    }
}

impl std::fmt::Debug for WriteAheadFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadFlag").finish_non_exhaustive()
    }
}
