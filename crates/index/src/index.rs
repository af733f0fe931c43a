//! The three-dimensional entry index (§4.7): one summarisable skip list per
//! ordering (SPT/PTS/TSP), sharing one underlying backend through
//! `willow-kv::prefixed` scoping, the way the teacher's `ShardedStore`
//! layers per-branch shards over one `DashMap`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use willow_core::{
    AreaOfInterest, Digest, KeyPart, LiftingMonoid, Path, Result, SubspaceId, SubspaceSpec, Summary,
    TimeRangeEnd,
};
use willow_kv::{KvBackend, ListOpts, PrefixedBackend};
use willow_skiplist::SkipList;

use crate::encoding::{
    decode_key, encode_key, exact_dimension_bound, numeric_dimension_bound, prefix_dimension_bound,
    Order,
};
use crate::row::RowValue;

/// One entry's worth of attributes, as stored by the three-dimensional
/// index (namespace is constant per store instance and lives above this
/// crate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry<S: SubspaceId, PD: Digest, AD: Digest> {
    /// The entry's subspace.
    pub subspace_id: S,
    /// The entry's path.
    pub path: Path,
    /// The entry's timestamp.
    pub timestamp: u64,
    /// Length in bytes of the referenced payload.
    pub payload_length: u64,
    /// Digest of the referenced payload.
    pub payload_digest: PD,
    /// Digest of the authorisation token that admitted this entry.
    pub authorisation_token_digest: AD,
}

/// Which dimension a `query` call orders its results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrder {
    /// Subspace, then path, then timestamp (the SPT skip list).
    Subspace,
    /// Path, then timestamp, then subspace (the PTS skip list).
    Path,
    /// Timestamp, then subspace, then path (the TSP skip list).
    Timestamp,
}

/// The three-dimensional entry index. Generic over a lifting monoid `M`
/// whose `lift` **must** depend only on the row value, not the physical
/// key, since the same logical entry is stored under three different
/// physical keys (one per ordering) with byte-identical values; a `lift`
/// that inspected the key would give SPT, PTS, and TSP different
/// fingerprints for the same entry.
pub struct EntryIndex<S: SubspaceId, PD: Digest, AD: Digest, M: LiftingMonoid<[u8], [u8]>> {
    spt: SkipList<M>,
    pts: SkipList<M>,
    tsp: SkipList<M>,
    _marker: std::marker::PhantomData<(S, PD, AD)>,
}

impl<S, PD, AD, M> EntryIndex<S, PD, AD, M>
where
    S: SubspaceId,
    PD: Digest,
    AD: Digest,
    M: LiftingMonoid<[u8], [u8]> + Clone,
    M::Output: Serialize + DeserializeOwned,
{
    /// Build an index over the three `["entries", ordering]` sub-stores of
    /// `backend` (§6.3).
    pub fn new(backend: Arc<dyn KvBackend>, monoid: M) -> Self {
        let spt_backend: Arc<dyn KvBackend> = Arc::new(PrefixedBackend::new(
            backend.clone(),
            vec![KeyPart::text("entries"), KeyPart::text("spt")],
        ));
        let pts_backend: Arc<dyn KvBackend> = Arc::new(PrefixedBackend::new(
            backend.clone(),
            vec![KeyPart::text("entries"), KeyPart::text("pts")],
        ));
        let tsp_backend: Arc<dyn KvBackend> = Arc::new(PrefixedBackend::new(
            backend,
            vec![KeyPart::text("entries"), KeyPart::text("tsp")],
        ));
        EntryIndex {
            spt: SkipList::new(spt_backend, monoid.clone()),
            pts: SkipList::new(pts_backend, monoid.clone()),
            tsp: SkipList::new(tsp_backend, monoid),
            _marker: std::marker::PhantomData,
        }
    }

    /// Look up the entry at `(subspace, path)`, if any.
    pub async fn get(&self, subspace: &S, path: &Path) -> Result<Option<IndexedEntry<S, PD, AD>>> {
        let (lower, upper) = exact_match_subspace_path_bound(subspace, path);
        let mut rows = self.spt.entries(lower, upper, ListOpts { limit: Some(1), ..Default::default() });
        match rows.next() {
            Some(row) => {
                let (key, value) = row?;
                let (decoded_subspace, decoded_path, timestamp) = decode_key::<S>(Order::Spt, &key)?;
                let row_value = RowValue::<PD, AD>::decode(&value)?;
                Ok(Some(IndexedEntry {
                    subspace_id: decoded_subspace,
                    path: decoded_path,
                    timestamp,
                    payload_length: row_value.payload_length,
                    payload_digest: row_value.payload_digest,
                    authorisation_token_digest: row_value.authorisation_token_digest,
                }))
            }
            None => Ok(None),
        }
    }

    /// Write all three physical rows for `entry`.
    pub async fn insert(&self, entry: &IndexedEntry<S, PD, AD>) -> Result<()> {
        let row_value = RowValue {
            payload_length: entry.payload_length,
            payload_digest: entry.payload_digest.clone(),
            authorisation_token_digest: entry.authorisation_token_digest.clone(),
        }
        .encode();

        let spt_key = encode_key(Order::Spt, &entry.subspace_id, &entry.path, entry.timestamp);
        let pts_key = encode_key(Order::Pts, &entry.subspace_id, &entry.path, entry.timestamp);
        let tsp_key = encode_key(Order::Tsp, &entry.subspace_id, &entry.path, entry.timestamp);

        self.spt.insert(spt_key, row_value.clone()).await?;
        self.pts.insert(pts_key, row_value.clone()).await?;
        self.tsp.insert(tsp_key, row_value).await?;
        Ok(())
    }

    /// Delete all three physical rows for the entry at `(subspace, path,
    /// timestamp)`.
    pub async fn remove(&self, subspace: &S, path: &Path, timestamp: u64) -> Result<bool> {
        let spt_key = encode_key(Order::Spt, subspace, path, timestamp);
        let pts_key = encode_key(Order::Pts, subspace, path, timestamp);
        let tsp_key = encode_key(Order::Tsp, subspace, path, timestamp);

        let removed = self.spt.remove(&spt_key).await?;
        self.pts.remove(&pts_key).await?;
        self.tsp.remove(&tsp_key).await?;
        if removed {
            tracing::debug!(timestamp, "entry removed from all three orderings");
        }
        Ok(removed)
    }

    /// Summarise the entries matching `aoi`, honoring its caps (§4.7).
    pub async fn summarise(&self, aoi: &AreaOfInterest<S>) -> Result<Summary<M::Output>> {
        let (range_start, range_end) = subspace_bound(&aoi.area.subspace);

        let mut acc = Summary::<M::Output>::neutral();
        let mut count: u64 = 0;
        let mut size: u64 = 0;
        let mut run_start: Option<Vec<u8>> = None;

        let mut rows = self.spt.entries(range_start.clone(), range_end.clone(), ListOpts::default());
        while let Some(row) = rows.next() {
            let (key, value) = row?;
            let (_, path, timestamp) = decode_key::<S>(Order::Spt, &key)?;
            let included = aoi.area.path_prefix.is_prefix_of(&path) && aoi.area.time_range.contains(timestamp);

            if !included {
                if let Some(start) = run_start.take() {
                    acc = acc.combine(&self.spt.summarise(Some(start.as_slice()), Some(key.as_slice())).await?);
                }
                continue;
            }

            let row_value = RowValue::<PD, AD>::decode(&value)?;
            if aoi.exceeds_count_cap(count) || aoi.exceeds_size_cap(size, row_value.payload_length) {
                if let Some(start) = run_start.take() {
                    acc = acc.combine(&self.spt.summarise(Some(start.as_slice()), Some(key.as_slice())).await?);
                }
                return Ok(acc);
            }
            count += 1;
            size += row_value.payload_length;
            if run_start.is_none() {
                run_start = Some(key.clone());
            }
        }

        if let Some(start) = run_start {
            acc = acc.combine(&self.spt.summarise(Some(start.as_slice()), range_end.as_deref()).await?);
        }
        Ok(acc)
    }

    /// Scan the index ordered by `order`, filtering by the other two
    /// dimensions and honoring `aoi`'s caps (§4.7).
    pub async fn query(
        &self,
        aoi: &AreaOfInterest<S>,
        order: QueryOrder,
        reverse: bool,
    ) -> Result<Vec<IndexedEntry<S, PD, AD>>> {
        let area = &aoi.area;
        let (list, physical_order, range_start, range_end) = match order {
            QueryOrder::Subspace => {
                let (start, end) = subspace_bound(&area.subspace);
                (&self.spt, Order::Spt, start, end)
            }
            QueryOrder::Path => {
                let (start, end) = prefix_dimension_bound(&willow_prefix::encode_path_component(&area.path_prefix));
                (&self.pts, Order::Pts, start, end)
            }
            QueryOrder::Timestamp => {
                let end = match area.time_range.end {
                    TimeRangeEnd::Open => None,
                    TimeRangeEnd::Bounded(end) => Some(end),
                };
                let (start, end) = numeric_dimension_bound(area.time_range.start, end);
                (&self.tsp, Order::Tsp, start, end)
            }
        };

        let opts = ListOpts { reverse, ..Default::default() };
        let mut rows = list.entries(range_start, range_end, opts);
        let mut found = Vec::new();
        let mut count: u64 = 0;
        let mut size: u64 = 0;

        while let Some(row) = rows.next() {
            let (key, value) = row?;
            let (subspace, path, timestamp) = decode_key::<S>(physical_order, &key)?;

            let subspace_ok = match &area.subspace {
                SubspaceSpec::Any => true,
                SubspaceSpec::Id(s) => s == &subspace,
            };
            if !subspace_ok || !area.path_prefix.is_prefix_of(&path) || !area.time_range.contains(timestamp) {
                continue;
            }

            let row_value = RowValue::<PD, AD>::decode(&value)?;
            if aoi.exceeds_count_cap(count) || aoi.exceeds_size_cap(size, row_value.payload_length) {
                break;
            }
            count += 1;
            size += row_value.payload_length;

            found.push(IndexedEntry {
                subspace_id: subspace,
                path,
                timestamp,
                payload_length: row_value.payload_length,
                payload_digest: row_value.payload_digest,
                authorisation_token_digest: row_value.authorisation_token_digest,
            });
        }
        Ok(found)
    }
}

fn subspace_bound<S: SubspaceId>(spec: &SubspaceSpec<S>) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    match spec {
        SubspaceSpec::Any => (None, None),
        SubspaceSpec::Id(s) => exact_dimension_bound(&s.encode()),
    }
}

/// Bounds selecting exactly the SPT rows whose `(subspace, path)` dimensions
/// equal the given pair, regardless of timestamp. Chains two
/// `exact_match_prefix`-style escapes, one per fixed dimension, the same way
/// `exact_dimension_bound` chains one.
fn exact_match_subspace_path_bound<S: SubspaceId>(subspace: &S, path: &Path) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    let mut prefix = Vec::new();
    for &b in &subspace.encode() {
        if b == 0x00 {
            prefix.push(0x00);
            prefix.push(0xFF);
        } else {
            prefix.push(b);
        }
    }
    prefix.push(0x00);
    prefix.push(0x00);
    for &b in &willow_prefix::encode_path_component(path) {
        if b == 0x00 {
            prefix.push(0x00);
            prefix.push(0xFF);
        } else {
            prefix.push(b);
        }
    }
    prefix.push(0x00);
    prefix.push(0x00);
    let upper = willow_prefix::increment_bytes(&prefix);
    (Some(prefix), upper)
}
