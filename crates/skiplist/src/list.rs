//! The summarisable skip list itself (§4.4): `get`/`insert`/`remove`/
//! `summarise`/`entries` over a `KvBackend`, generic over a lifting monoid
//! so the hot summarisation path is monomorphized rather than boxed.

use std::sync::Arc;

use rand::thread_rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use willow_core::{KeyPart, LiftingMonoid, Monoid, Result, Summary, TupleKey};
use willow_kv::{KvBackend, ListIter, ListOpts, Selector};

use crate::height::{draw_height, LAYER_LIMIT};
use crate::node::PhysicalNode;

fn layer_key(layer: u8, logical_key: &[u8]) -> TupleKey {
    vec![KeyPart::Int(layer as i128), KeyPart::bytes(logical_key.to_vec())]
}

fn logical_key_of(physical_key: &TupleKey) -> Vec<u8> {
    match &physical_key[1] {
        KeyPart::Bytes(b) => b.clone(),
        other => unreachable!("skip list physical key's second part must be Bytes, got {other:?}"),
    }
}

/// A summarisable skip list backed by a [`KvBackend`] region.
///
/// Logical keys and values are opaque byte strings; callers that need
/// richer key/value types encode them before calling in (the
/// three-dimensional index does this with its escape-joined dimension
/// encoding).
pub struct SkipList<M: LiftingMonoid<[u8], [u8]>> {
    backend: Arc<dyn KvBackend>,
    monoid: M,
}

impl<M> SkipList<M>
where
    M: LiftingMonoid<[u8], [u8]>,
    M::Output: Serialize + DeserializeOwned,
{
    /// Build a skip list over `backend` (expected to already be scoped to
    /// this list's own region, e.g. via `PrefixedBackend`).
    pub fn new(backend: Arc<dyn KvBackend>, monoid: M) -> Self {
        SkipList { backend, monoid }
    }

    async fn get_node_at_layer(&self, layer: u8, key: &[u8]) -> Result<Option<PhysicalNode<M::Output>>> {
        match self.backend.get(&layer_key(layer, key)).await? {
            Some(bytes) => Ok(Some(PhysicalNode::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn rows_in_layer(&self, layer: u8, start: Option<&[u8]>, end: Option<&[u8]>, limit: usize, reverse: bool) -> ListIter {
        let selector = Selector {
            prefix: Some(vec![KeyPart::Int(layer as i128)]),
            start: start.map(|s| layer_key(layer, s)),
            end: end.map(|e| layer_key(layer, e)),
        };
        let opts = ListOpts {
            reverse,
            limit: Some(limit),
            ..Default::default()
        };
        self.backend.list(selector, opts)
    }

    async fn next_key_at_layer(&self, layer: u8, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut rows = self.rows_in_layer(layer, Some(key), None, 2, false);
        for row in rows.by_ref() {
            let (physical_key, _) = row?;
            let candidate = logical_key_of(&physical_key);
            if candidate.as_slice() > key {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn predecessor_at_layer(&self, layer: u8, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut rows = self.rows_in_layer(layer, None, Some(key), 1, true);
        match rows.next() {
            Some(row) => {
                let (physical_key, _) = row?;
                Ok(Some(logical_key_of(&physical_key)))
            }
            None => Ok(None),
        }
    }

    async fn first_key_in_layer(&self, layer: u8, start: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        let mut rows = self.rows_in_layer(layer, start, None, 1, false);
        match rows.next() {
            Some(row) => {
                let (physical_key, _) = row?;
                Ok(Some(logical_key_of(&physical_key)))
            }
            None => Ok(None),
        }
    }

    async fn highest_occupied_layer(&self) -> Result<Option<u8>> {
        for layer in (0..=LAYER_LIMIT).rev() {
            if self.first_key_in_layer(layer, None).await?.is_some() {
                return Ok(Some(layer));
            }
        }
        Ok(None)
    }

    /// Recompute `(fingerprint, count)` for the node at `(layer, key)` from
    /// scratch, by climbing the layer below it from `key` up to (but not
    /// including) the next key present at `layer`. At layer zero this is
    /// just lifting the stored value directly.
    async fn recompute_summary_at_layer(&self, layer: u8, key: &[u8]) -> Result<(M::Output, u64)> {
        if layer == 0 {
            let node = self
                .get_node_at_layer(0, key)
                .await?
                .expect("layer-zero node must exist to recompute its summary");
            let value = node
                .logical_value
                .expect("layer-zero node must carry a logical value");
            return Ok((self.monoid.lift(key, &value), 1));
        }
        let boundary = self.next_key_at_layer(layer, key).await?;
        let mut acc = M::Output::neutral();
        let mut count = 0u64;
        let mut cursor = Some(key.to_vec());
        while let Some(current) = cursor {
            if let Some(boundary_key) = &boundary {
                if current.as_slice() >= boundary_key.as_slice() {
                    break;
                }
            }
            let node = self
                .get_node_at_layer(layer - 1, &current)
                .await?
                .expect("every key in this node's span has an entry one layer down");
            acc = self.monoid.combine(&acc, &node.fingerprint);
            count += node.count;
            cursor = self.next_key_at_layer(layer - 1, &current).await?;
        }
        Ok((acc, count))
    }

    /// Read the current value stored for `key`, if any.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .get_node_at_layer(0, key)
            .await?
            .and_then(|n| n.logical_value))
    }

    /// Insert or update `key` with `value`. A no-op if `key` already maps
    /// to a byte-identical value.
    pub async fn insert(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let existing = self.get_node_at_layer(0, &key).await?;
        if let Some(node) = &existing {
            if node.logical_value.as_deref() == Some(value.as_slice()) {
                return Ok(());
            }
        }
        let height = match &existing {
            Some(node) => node.max_layer,
            None => draw_height(&mut thread_rng()),
        };
        let old_max = existing.as_ref().map(|n| n.max_layer).unwrap_or(0);
        let combined_max = old_max.max(height);

        // Phase 1: write the layer-zero value (and placeholder upper-layer
        // rows) so the recompute phase below can read a consistent view of
        // the new structure, including this key's own rows.
        let mut stage = self.backend.batch();
        for layer in 0..=height {
            let placeholder = PhysicalNode {
                logical_value: if layer == 0 { Some(value.clone()) } else { None },
                max_layer: height,
                fingerprint: M::Output::neutral(),
                count: 0,
            };
            stage.set(layer_key(layer, &key), placeholder.encode()?);
        }
        stage.commit().await?;

        // Phase 2: recompute this node's and its left neighbours' summaries
        // at every layer up to the maximum of the old and new heights.
        // Summaries are a derived cache; a crash between phase 1 and phase
        // 2 leaves logical data intact with stale (but recoverable) caches
        // above layer zero — recovery resummarises on the next touch.
        let mut fixup = self.backend.batch();
        for layer in 0..=combined_max {
            if layer <= height {
                let (fingerprint, count) = self.recompute_summary_at_layer(layer, &key).await?;
                let node = PhysicalNode {
                    logical_value: if layer == 0 { Some(value.clone()) } else { None },
                    max_layer: height,
                    fingerprint,
                    count,
                };
                fixup.set(layer_key(layer, &key), node.encode()?);
            }
            if let Some(predecessor) = self.predecessor_at_layer(layer, &key).await? {
                let (fingerprint, count) = self.recompute_summary_at_layer(layer, &predecessor).await?;
                let mut predecessor_node = self
                    .get_node_at_layer(layer, &predecessor)
                    .await?
                    .expect("predecessor must have a node at its own layer");
                predecessor_node.fingerprint = fingerprint;
                predecessor_node.count = count;
                fixup.set(layer_key(layer, &predecessor), predecessor_node.encode()?);
            }
        }
        fixup.commit().await
    }

    /// Remove `key`. Returns whether it was present.
    pub async fn remove(&self, key: &[u8]) -> Result<bool> {
        let Some(existing) = self.get_node_at_layer(0, key).await? else {
            return Ok(false);
        };
        let max_layer = existing.max_layer;

        let mut stage = self.backend.batch();
        for layer in 0..=max_layer {
            stage.delete(layer_key(layer, key));
        }
        stage.commit().await?;

        let mut fixup = self.backend.batch();
        for layer in 0..=max_layer {
            if let Some(predecessor) = self.predecessor_at_layer(layer, key).await? {
                let (fingerprint, count) = self.recompute_summary_at_layer(layer, &predecessor).await?;
                let mut predecessor_node = self
                    .get_node_at_layer(layer, &predecessor)
                    .await?
                    .expect("predecessor must have a node at its own layer");
                predecessor_node.fingerprint = fingerprint;
                predecessor_node.count = count;
                fixup.set(layer_key(layer, &predecessor), predecessor_node.encode()?);
            }
        }
        fixup.commit().await?;
        Ok(true)
    }

    /// Sum the monoid over `[start, end)`. `start == end` is treated as the
    /// full range; `start > end` summarises the wrap-around range
    /// `(-inf, end) U [start, +inf)`.
    pub async fn summarise(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<Summary<M::Output>> {
        match (start, end) {
            (Some(s), Some(e)) if s > e => {
                let left = self.summarise_bounded(None, Some(e.to_vec())).await?;
                let right = self.summarise_bounded(Some(s.to_vec()), None).await?;
                Ok(left.combine(&right))
            }
            (Some(s), Some(e)) if s == e => self.summarise_bounded(None, None).await,
            _ => {
                self.summarise_bounded(start.map(|s| s.to_vec()), end.map(|e| e.to_vec()))
                    .await
            }
        }
    }

    /// Locate the first key at or after `start` (or the very first key
    /// overall when `start` is `None`), together with the highest layer
    /// it is stored at. Narrows layer by layer from the top the same way
    /// `summarise_bounded`'s own loop narrows toward `end`, rather than
    /// jumping straight to the first key at the globally highest
    /// occupied layer — that shortcut misses keys that only exist at
    /// lower layers between `start` and whatever key happens to occupy
    /// the top layer.
    async fn locate_start(&self, start: Option<&[u8]>) -> Result<Option<(u8, Vec<u8>)>> {
        let Some(mut layer) = self.highest_occupied_layer().await? else {
            return Ok(None);
        };
        let mut predecessor: Option<Vec<u8>> = None;
        loop {
            loop {
                let next = match &predecessor {
                    Some(key) => self.next_key_at_layer(layer, key).await?,
                    None => self.first_key_in_layer(layer, None).await?,
                };
                match (&next, start) {
                    (Some(candidate), Some(s)) if candidate.as_slice() < s => {
                        predecessor = Some(candidate.clone());
                    }
                    _ => break,
                }
            }
            if layer == 0 {
                break;
            }
            layer -= 1;
        }

        let first = match &predecessor {
            Some(key) => self.next_key_at_layer(0, key).await?,
            None => self.first_key_in_layer(0, None).await?,
        };
        let Some(first) = first else {
            return Ok(None);
        };
        let node = self
            .get_node_at_layer(0, &first)
            .await?
            .expect("located key must have a layer-zero node");
        Ok(Some((node.max_layer, first)))
    }

    async fn summarise_bounded(&self, start: Option<Vec<u8>>, end: Option<Vec<u8>>) -> Result<Summary<M::Output>> {
        let Some((mut layer, first)) = self.locate_start(start.as_deref()).await? else {
            return Ok(Summary::neutral());
        };
        let mut cursor = Some(first);
        let mut acc = Summary::<M::Output>::neutral();

        loop {
            let Some(key) = cursor.clone() else {
                break;
            };
            if let Some(e) = &end {
                if key.as_slice() >= e.as_slice() {
                    break;
                }
            }
            let next = self.next_key_at_layer(layer, &key).await?;
            let within_end = match (&next, &end) {
                (Some(n), Some(e)) => n.as_slice() <= e.as_slice(),
                (None, _) => layer == 0,
                (Some(_), None) => true,
            };
            if within_end || layer == 0 {
                let node = self
                    .get_node_at_layer(layer, &key)
                    .await?
                    .expect("cursor must point at an existing node");
                acc = acc.combine(&Summary {
                    fingerprint: node.fingerprint,
                    count: node.count,
                });
                cursor = next;
            } else {
                layer -= 1;
            }
        }
        Ok(acc)
    }

    /// A lazy sequence of `(key, value)` pairs over layer zero, honoring
    /// `start`/`end`/`reverse`/`limit`.
    pub fn entries(&self, start: Option<Vec<u8>>, end: Option<Vec<u8>>, opts: ListOpts) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + Send> {
        let selector = Selector {
            prefix: Some(vec![KeyPart::Int(0)]),
            start: start.map(|s| layer_key(0, &s)),
            end: end.map(|e| layer_key(0, &e)),
        };
        let rows = self.backend.list(selector, opts);
        Box::new(rows.map(|res| {
            res.and_then(|(physical_key, value)| {
                let node = PhysicalNode::<M::Output>::decode(&value)?;
                let key = logical_key_of(&physical_key);
                Ok((
                    key,
                    node.logical_value
                        .expect("layer-zero row must carry a logical value"),
                ))
            })
        }))
    }
}
