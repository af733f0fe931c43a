//! `MemoryBackend`: an in-process `KvBackend` over a `BTreeMap`, guarded the
//! way the teacher's `UnifiedStore` guards its primary map — a single
//! `parking_lot::RwLock` around one ordered map, with no secondary index
//! since every `list` call derives its scan directly from the key order.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use willow_core::{Result, TupleKey};

use crate::backend::{Batch, BatchOp, KvBackend, ListIter};
use crate::selector::{effective_bounds, matches, ListOpts, Selector};

/// An in-memory, process-local `KvBackend`. Cheap to construct, cloneable
/// via `Arc` sharing, and suitable as the default backend for tests and for
/// embeddings that don't need durability across restarts.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    map: Arc<RwLock<BTreeMap<TupleKey, Vec<u8>>>>,
}

impl MemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        MemoryBackend {
            map: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn scan(&self, selector: &Selector) -> Vec<(TupleKey, Vec<u8>)> {
        let Some((lower, upper)) = effective_bounds(selector) else {
            return Vec::new();
        };
        let guard = self.map.read();
        let iter = guard.range((
            lower
                .map(std::ops::Bound::Included)
                .unwrap_or(std::ops::Bound::Unbounded),
            upper
                .map(std::ops::Bound::Excluded)
                .unwrap_or(std::ops::Bound::Unbounded),
        ));
        let mut out = Vec::new();
        for (key, value) in iter {
            if selector.prefix.is_some() && !matches(key, selector) {
                // Contiguity of the prefix range (§4.1) means once we've
                // passed it going forward there's nothing left to find.
                if key > selector.prefix.as_ref().unwrap() {
                    break;
                }
                continue;
            }
            out.push((key.clone(), value.clone()));
        }
        out
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &TupleKey) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    async fn set(&self, key: TupleKey, value: Vec<u8>) -> Result<()> {
        self.map.write().insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: &TupleKey) -> Result<bool> {
        Ok(self.map.write().remove(key).is_some())
    }

    fn list(&self, selector: Selector, opts: ListOpts) -> ListIter {
        let mut rows = self.scan(&selector);
        if opts.reverse {
            rows.reverse();
        }
        if let Some(limit) = opts.limit {
            rows.truncate(limit);
        }
        Box::new(rows.into_iter().map(Ok))
    }

    async fn clear(&self, selector: Option<Selector>) -> Result<()> {
        match selector {
            None => {
                self.map.write().clear();
            }
            Some(sel) => {
                let keys: Vec<TupleKey> = self.scan(&sel).into_iter().map(|(k, _)| k).collect();
                let mut guard = self.map.write();
                for key in keys {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn batch(&self) -> Box<dyn Batch> {
        Box::new(MemoryBatch {
            backend: self.clone(),
            ops: Vec::new(),
        })
    }
}

struct MemoryBatch {
    backend: MemoryBackend,
    ops: Vec<BatchOp>,
}

#[async_trait]
impl Batch for MemoryBatch {
    fn set(&mut self, key: TupleKey, value: Vec<u8>) {
        self.ops.push(BatchOp::Set(key, value));
    }

    fn delete(&mut self, key: TupleKey) {
        self.ops.push(BatchOp::Delete(key));
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut guard = self.backend.map.write();
        for op in self.ops {
            match op {
                BatchOp::Set(key, value) => {
                    guard.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }
}
