//! The ingestion / write-ahead-flag engine (§4.8): admits, supersedes, and
//! removes entries while maintaining invariants I1-I7, driving the 3D
//! index, the per-subspace prefix iterator, and the payload reference
//! counter through the write-ahead flag.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use willow_core::{
    AreaOfInterest, AuthorisationScheme, Digest, Entry, Error, Limits, LiftingMonoid, NamespaceId,
    Path, Result, SubspaceId, Summary,
};
use willow_durability::{PartialEntry, PayloadRefCounter, RecoveryConfig, StoreLayout, WriteAheadFlag};
use willow_index::{EntryIndex, IndexedEntry, QueryOrder};
use willow_kv::KvBackend;
use willow_prefix::{PrefixIndex, ScanPrefixIndex};

use crate::events::{Event, EventSink, TracingEventSink};
use crate::outcome::{self, IngestOutcome, PayloadOutcome, RemoveOutcome};
use crate::payload_driver::PayloadDriver;

/// The attributes of an entry that a caller of `set` supplies directly;
/// the payload digest/length come from the payload driver and the
/// authorisation-token digest from the authorisation scheme.
#[derive(Debug, Clone)]
pub struct EntryAttrs<S: SubspaceId> {
    /// The entry's subspace.
    pub subspace_id: S,
    /// The entry's path.
    pub path: Path,
    /// The entry's timestamp.
    pub timestamp: u64,
}

/// The ingestion engine. Generic over the namespace/subspace/digest
/// schemes, the authorisation scheme, and the fingerprinting monoid that
/// backs the three-dimensional index's summaries.
pub struct StoreEngine<N, S, PD, AD, Auth, M>
where
    N: NamespaceId,
    S: SubspaceId,
    PD: Digest,
    AD: Digest,
    Auth: AuthorisationScheme<N, S, PD, AD>,
    M: LiftingMonoid<[u8], [u8]> + Clone,
    M::Output: Serialize + DeserializeOwned,
{
    namespace_id: N,
    index: EntryIndex<S, PD, AD, M>,
    layout: StoreLayout,
    pub(crate) waf: WriteAheadFlag,
    ref_counter: PayloadRefCounter,
    payload_driver: Arc<dyn PayloadDriver<PD>>,
    auth_scheme: Auth,
    pub(crate) event_sink: Arc<dyn EventSink<N, S, PD, AD>>,
    ingest_lock: tokio::sync::Mutex<()>,
    limits: Limits,
    recovery_config: RecoveryConfig,
}

impl<N, S, PD, AD, Auth, M> StoreEngine<N, S, PD, AD, Auth, M>
where
    N: NamespaceId,
    S: SubspaceId,
    PD: Digest,
    AD: Digest,
    Auth: AuthorisationScheme<N, S, PD, AD>,
    M: LiftingMonoid<[u8], [u8]> + Clone,
    M::Output: Serialize + DeserializeOwned,
{
    /// Open a store over `backend`, running recovery before returning.
    pub async fn open(
        namespace_id: N,
        backend: Arc<dyn KvBackend>,
        monoid: M,
        auth_scheme: Auth,
        payload_driver: Arc<dyn PayloadDriver<PD>>,
        limits: Limits,
    ) -> Result<Self> {
        Self::open_with(
            namespace_id,
            backend,
            monoid,
            auth_scheme,
            payload_driver,
            Arc::new(TracingEventSink),
            limits,
            RecoveryConfig::default(),
        )
        .await
    }

    /// Open a store, supplying an explicit event sink and recovery config.
    pub async fn open_with(
        namespace_id: N,
        backend: Arc<dyn KvBackend>,
        monoid: M,
        auth_scheme: Auth,
        payload_driver: Arc<dyn PayloadDriver<PD>>,
        event_sink: Arc<dyn EventSink<N, S, PD, AD>>,
        limits: Limits,
        recovery_config: RecoveryConfig,
    ) -> Result<Self> {
        let layout = StoreLayout::new(backend.clone());
        let index = EntryIndex::new(backend, monoid);
        let waf = WriteAheadFlag::new(layout.waf.clone());
        let ref_counter = PayloadRefCounter::new(layout.payload_ref_count.clone());

        let engine = StoreEngine {
            namespace_id,
            index,
            layout,
            waf,
            ref_counter,
            payload_driver,
            auth_scheme,
            event_sink,
            ingest_lock: tokio::sync::Mutex::new(()),
            limits,
            recovery_config,
        };
        crate::recovery::Recovery::run(&engine).await?;
        Ok(engine)
    }

    /// The namespace this store was opened against.
    pub fn namespace_id(&self) -> &N {
        &self.namespace_id
    }

    /// The durability mode this store was opened with.
    pub fn recovery_config(&self) -> RecoveryConfig {
        self.recovery_config
    }

    /// Admission algorithm for `ingest_entry(e, t)` (§4.8).
    pub async fn ingest_entry(&self, entry: Entry<N, S, PD, AD>, token: Auth::Token) -> Result<IngestOutcome<N, S, PD, AD>> {
        let _guard = self.ingest_lock.lock().await;
        let result = self.admit(&entry, &token).await;
        let removed_for_event = result.as_ref().ok().cloned();
        if let Some(removed) = removed_for_event {
            self.event_sink.publish(Event::EntryIngest { entry: entry.clone(), removed });
        }
        outcome::classify(result, entry)
    }

    /// Stream `bytes` into the payload driver for the entry at
    /// `(subspace, path)`.
    pub async fn ingest_payload(&self, subspace: &S, path: &Path, bytes: Vec<u8>) -> Result<PayloadOutcome<PD>> {
        let _guard = self.ingest_lock.lock().await;

        let indexed = match self.index.get(subspace, path).await? {
            Some(indexed) => indexed,
            None => return Ok(PayloadOutcome::Failure { reason: Error::NoEntry }),
        };

        if let Some(held_length) = self.payload_driver.length(&indexed.payload_digest).await? {
            if held_length == indexed.payload_length {
                return Ok(PayloadOutcome::NoOp);
            }
        }

        let received = match self
            .payload_driver
            .receive(bytes, Some(indexed.payload_length), Some(indexed.payload_digest.clone()))
            .await
        {
            Ok(received) => received,
            Err(Error::DataMismatch) => return Ok(PayloadOutcome::Failure { reason: Error::DataMismatch }),
            Err(err) => return Err(err),
        };

        let entry = self.to_entry(indexed);
        self.event_sink.publish(Event::EntryPayloadSet { entry });
        self.event_sink.publish(Event::PayloadIngest { digest: received.digest.clone() });
        Ok(PayloadOutcome::Success { digest: received.digest, length: received.length })
    }

    /// Convenience: build an entry from `attrs` and `bytes`, authorise it,
    /// ingest it, then ingest its payload.
    pub async fn set(
        &self,
        attrs: EntryAttrs<S>,
        bytes: Vec<u8>,
        authorise_opts: &Auth::AuthoriseOpts,
    ) -> Result<IngestOutcome<N, S, PD, AD>>
    where
        AD: Default,
    {
        let received = self.payload_driver.set(bytes.clone()).await?;
        let mut entry = Entry {
            namespace_id: self.namespace_id.clone(),
            subspace_id: attrs.subspace_id,
            path: attrs.path,
            timestamp: attrs.timestamp,
            payload_digest: received.digest,
            payload_length: received.length,
            authorisation_token_digest: AD::default(),
        };
        let token = self.auth_scheme.authorise(&entry, authorise_opts);
        entry.authorisation_token_digest = self.auth_scheme.token_digest(&token);

        let outcome = self.ingest_entry(entry.clone(), token).await?;
        if outcome.is_success() {
            self.ingest_payload(&entry.subspace_id, &entry.path, bytes).await?;
        }
        Ok(outcome)
    }

    /// Remove the entry at `(subspace, path)`, if any, outside of prefix
    /// pruning.
    pub async fn remove_entry(&self, subspace: &S, path: &Path) -> Result<RemoveOutcome<N, S, PD, AD>> {
        let _guard = self.ingest_lock.lock().await;

        let existing = match self.index.get(subspace, path).await? {
            Some(indexed) => self.to_entry(indexed),
            None => return Ok(RemoveOutcome::NoOp),
        };

        let partial = partial_entry_of(&existing);
        self.waf.set_remove(&partial).await?;
        self.commit_remove(&partial).await?;
        self.waf.clear().await?;

        self.event_sink.publish(Event::EntryRemove { entry: existing.clone() });
        Ok(RemoveOutcome::Success { entry: existing })
    }

    /// Scan the index ordered by `order`, honoring `aoi`'s caps (§4.7).
    pub async fn query(&self, aoi: &AreaOfInterest<S>, order: QueryOrder, reverse: bool) -> Result<Vec<IndexedEntry<S, PD, AD>>> {
        self.index.query(aoi, order, reverse).await
    }

    /// Summarise the entries matching `aoi` (§4.7).
    pub async fn summarise(&self, aoi: &AreaOfInterest<S>) -> Result<Summary<M::Output>> {
        self.index.summarise(aoi).await
    }

    async fn admit(&self, entry: &Entry<N, S, PD, AD>, token: &Auth::Token) -> Result<Vec<Entry<N, S, PD, AD>>> {
        if entry.namespace_id != self.namespace_id {
            return Err(Error::InvalidEntry("entry namespace does not match this store".into()));
        }
        self.validate_path(&entry.path)?;
        if !self.auth_scheme.is_authorised_write(entry, token) {
            return Err(Error::InvalidEntry("token does not authorise this entry".into()));
        }
        self.commit_steps_3_to_8(entry).await
    }

    /// Steps 3-8 of the admission algorithm, re-entrant so that recovery
    /// can replay them from a stored write-ahead entry without the
    /// original token (steps 1-2 already passed before the flag was
    /// written, and step 2's token itself isn't retained, only its
    /// digest).
    pub(crate) async fn commit_steps_3_to_8(&self, entry: &Entry<N, S, PD, AD>) -> Result<Vec<Entry<N, S, PD, AD>>> {
        // Step 3.
        let existing = self.index.get(&entry.subspace_id, &entry.path).await?;
        if let Some(indexed) = &existing {
            if self.to_entry(indexed.clone()).is_newer_than(entry) {
                return Err(Error::ObsoleteFromSameSubspace);
            }
        }

        let prefix_backend = self.layout.prefix_region_for_subspace(entry.subspace_id.encode());
        let prefix_index = ScanPrefixIndex::new(prefix_backend);

        // Step 4: strict prefixes of entry.path.
        for (path, _) in prefix_index.prefixes_of(&entry.path).await? {
            if path == entry.path {
                continue;
            }
            if let Some(indexed) = self.index.get(&entry.subspace_id, &path).await? {
                if self.to_entry(indexed).is_newer_than(entry) {
                    return Err(Error::NewerPrefixFound);
                }
            }
        }

        // Step 5: paths strictly extending entry.path, pruned if not newer.
        let mut to_prune = Vec::new();
        for (path, _) in prefix_index.prefixed_by(&entry.path).await? {
            if path == entry.path {
                continue;
            }
            if let Some(indexed) = self.index.get(&entry.subspace_id, &path).await? {
                let candidate = self.to_entry(indexed);
                if !candidate.is_newer_than(entry) {
                    to_prune.push(candidate);
                }
            }
        }

        // Step 6.
        self.waf.set_insert(entry).await?;

        // Step 7.
        let mut removed = Vec::new();
        if let Some(indexed) = existing {
            let existing_entry = self.to_entry(indexed);
            self.index
                .remove(&existing_entry.subspace_id, &existing_entry.path, existing_entry.timestamp)
                .await?;
            self.ref_counter.decrement(&existing_entry.payload_digest).await?;
            removed.push(existing_entry);
        }
        for pruned in &to_prune {
            self.index.remove(&pruned.subspace_id, &pruned.path, pruned.timestamp).await?;
            prefix_index.remove(&pruned.path).await?;
            self.ref_counter.decrement(&pruned.payload_digest).await?;
        }
        removed.extend(to_prune);

        self.index
            .insert(&IndexedEntry {
                subspace_id: entry.subspace_id.clone(),
                path: entry.path.clone(),
                timestamp: entry.timestamp,
                payload_length: entry.payload_length,
                payload_digest: entry.payload_digest.clone(),
                authorisation_token_digest: entry.authorisation_token_digest.clone(),
            })
            .await?;
        prefix_index.insert(entry.path.clone(), Vec::new()).await?;
        self.ref_counter.increment(&entry.payload_digest).await?;

        // Step 8.
        self.waf.clear().await?;

        Ok(removed)
    }

    pub(crate) async fn commit_remove(&self, partial: &PartialEntry<N, S, PD>) -> Result<()> {
        self.index.remove(&partial.subspace_id, &partial.path, partial.timestamp).await?;
        let prefix_backend = self.layout.prefix_region_for_subspace(partial.subspace_id.encode());
        ScanPrefixIndex::new(prefix_backend).remove(&partial.path).await?;
        self.ref_counter.decrement(&partial.payload_digest).await?;
        Ok(())
    }

    fn to_entry(&self, indexed: IndexedEntry<S, PD, AD>) -> Entry<N, S, PD, AD> {
        Entry {
            namespace_id: self.namespace_id.clone(),
            subspace_id: indexed.subspace_id,
            path: indexed.path,
            timestamp: indexed.timestamp,
            payload_digest: indexed.payload_digest,
            payload_length: indexed.payload_length,
            authorisation_token_digest: indexed.authorisation_token_digest,
        }
    }

    fn validate_path(&self, path: &Path) -> Result<()> {
        if path.len() > self.limits.max_component_count {
            return Err(Error::InvalidEntry("path exceeds max component count".into()));
        }
        if path.total_len() > self.limits.max_path_length {
            return Err(Error::InvalidEntry("path exceeds max total length".into()));
        }
        if path.components().iter().any(|c| c.len() > self.limits.max_component_length) {
            return Err(Error::InvalidEntry("path component exceeds max length".into()));
        }
        Ok(())
    }
}

fn partial_entry_of<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>(
    entry: &Entry<N, S, PD, AD>,
) -> PartialEntry<N, S, PD> {
    PartialEntry {
        namespace_id: entry.namespace_id.clone(),
        subspace_id: entry.subspace_id.clone(),
        path: entry.path.clone(),
        timestamp: entry.timestamp,
        payload_digest: entry.payload_digest.clone(),
        payload_length: entry.payload_length,
    }
}
