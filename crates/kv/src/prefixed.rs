//! `PrefixedBackend`: scopes a shared `KvBackend` under a fixed prefix
//! (§4.3), the way the teacher's `DatabasePaths` carves one on-disk root
//! into named regions without every caller tracking the full path by hand.

use std::sync::Arc;

use async_trait::async_trait;
use willow_core::{Result, TupleKey};

use crate::backend::{Batch, KvBackend, ListIter};
use crate::selector::{ListOpts, Selector};

/// A view of `backend` scoped to keys prefixed by a fixed `prefix`.
///
/// Every read/write transparently prepends `prefix`; every result
/// transparently strips it back off, so callers see an ordinary
/// zero-prefixed key space.
#[derive(Clone)]
pub struct PrefixedBackend {
    backend: Arc<dyn KvBackend>,
    prefix: TupleKey,
}

impl PrefixedBackend {
    /// Scope `backend` under `prefix`.
    pub fn new(backend: Arc<dyn KvBackend>, prefix: TupleKey) -> Self {
        PrefixedBackend { backend, prefix }
    }

    /// A fresh view of the same backend under `prefix` extended with
    /// `suffix` — for carving a scoped region into further sub-regions.
    pub fn scope(&self, suffix: impl IntoIterator<Item = willow_core::KeyPart>) -> Self {
        let mut prefix = self.prefix.clone();
        prefix.extend(suffix);
        PrefixedBackend {
            backend: self.backend.clone(),
            prefix,
        }
    }

    fn full_key(&self, key: &TupleKey) -> TupleKey {
        let mut full = self.prefix.clone();
        full.extend(key.iter().cloned());
        full
    }

    fn full_selector(&self, selector: Selector) -> Selector {
        let scope_to_full = |k: Option<TupleKey>| {
            k.map(|k| {
                let mut full = self.prefix.clone();
                full.extend(k);
                full
            })
        };
        let prefix = {
            let mut full = self.prefix.clone();
            full.extend(selector.prefix.unwrap_or_default());
            full
        };
        Selector {
            start: scope_to_full(selector.start),
            end: scope_to_full(selector.end),
            prefix: Some(prefix),
        }
    }

    fn strip(&self, key: TupleKey) -> TupleKey {
        key[self.prefix.len()..].to_vec()
    }
}

#[async_trait]
impl KvBackend for PrefixedBackend {
    async fn get(&self, key: &TupleKey) -> Result<Option<Vec<u8>>> {
        self.backend.get(&self.full_key(key)).await
    }

    async fn set(&self, key: TupleKey, value: Vec<u8>) -> Result<()> {
        self.backend.set(self.full_key(&key), value).await
    }

    async fn delete(&self, key: &TupleKey) -> Result<bool> {
        self.backend.delete(&self.full_key(key)).await
    }

    fn list(&self, selector: Selector, opts: ListOpts) -> ListIter {
        let prefix_len = self.prefix.len();
        let inner = self.backend.list(self.full_selector(selector), opts);
        Box::new(inner.map(move |res| res.map(|(k, v)| (k[prefix_len..].to_vec(), v))))
    }

    async fn clear(&self, selector: Option<Selector>) -> Result<()> {
        let selector = selector.unwrap_or_default();
        self.backend.clear(Some(self.full_selector(selector))).await
    }

    fn batch(&self) -> Box<dyn Batch> {
        Box::new(PrefixedBatch {
            inner: self.backend.batch(),
            prefix: self.prefix.clone(),
        })
    }
}

struct PrefixedBatch {
    inner: Box<dyn Batch>,
    prefix: TupleKey,
}

impl PrefixedBatch {
    fn full_key(&self, key: TupleKey) -> TupleKey {
        let mut full = self.prefix.clone();
        full.extend(key);
        full
    }
}

#[async_trait]
impl Batch for PrefixedBatch {
    fn set(&mut self, key: TupleKey, value: Vec<u8>) {
        let full = self.full_key(key);
        self.inner.set(full, value);
    }

    fn delete(&mut self, key: TupleKey) {
        let full = self.full_key(key);
        self.inner.delete(full);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }
}
