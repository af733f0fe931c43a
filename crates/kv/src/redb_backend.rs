//! `RedbBackend`: a persistent, transactional `KvBackend` built on `redb`.
//!
//! Physical keys/values are plain byte strings produced by
//! [`crate::codec`]; `redb` only ever sees `&[u8]`. Calls are synchronous
//! under the hood (`redb` is a local mmap-backed engine, not network I/O)
//! but exposed through the same `async` contract as every other backend —
//! consistent with this engine's single-threaded-cooperative concurrency
//! model (§5), where there is never more than one ingestion in flight to
//! block on.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, TableDefinition};
use willow_core::{Error, Result, TupleKey};

use crate::backend::{Batch, BatchOp, KvBackend, ListIter};
use crate::codec::{decode_key, encode_key};
use crate::selector::{effective_bounds, matches, ListOpts, Selector};

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("willow_kv");

fn storage_err(e: impl std::fmt::Display) -> Error {
    Error::Storage(e.to_string())
}

/// A `redb`-backed persistent `KvBackend`.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open (creating if absent) a `redb` database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(storage_err)?;
        let txn = db.begin_write().map_err(storage_err)?;
        txn.open_table(TABLE).map_err(storage_err)?;
        txn.commit().map_err(storage_err)?;
        tracing::debug!(path = %path.display(), "opened redb backend");
        Ok(RedbBackend { db: Arc::new(db) })
    }

    fn scan(&self, selector: &Selector) -> Result<Vec<(TupleKey, Vec<u8>)>> {
        let Some((lower, upper)) = effective_bounds(selector) else {
            return Ok(Vec::new());
        };
        let lower_bytes = lower.as_ref().map(|k| encode_key(k)).transpose()?;
        let upper_bytes = upper.as_ref().map(|k| encode_key(k)).transpose()?;

        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(TABLE).map_err(storage_err)?;
        let range = match (&lower_bytes, &upper_bytes) {
            (Some(l), Some(u)) => table.range(l.as_slice()..u.as_slice()),
            (Some(l), None) => table.range(l.as_slice()..),
            (None, Some(u)) => table.range(..u.as_slice()),
            (None, None) => table.range::<&[u8]>(..),
        }
        .map_err(storage_err)?;

        let mut out = Vec::new();
        for item in range {
            let (k, v) = item.map_err(storage_err)?;
            let key = decode_key(k.value())?;
            if selector.prefix.is_some() && !matches(&key, selector) {
                if key > *selector.prefix.as_ref().unwrap() {
                    break;
                }
                continue;
            }
            out.push((key, v.value().to_vec()));
        }
        Ok(out)
    }
}

#[async_trait]
impl KvBackend for RedbBackend {
    async fn get(&self, key: &TupleKey) -> Result<Option<Vec<u8>>> {
        let encoded = encode_key(key)?;
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(TABLE).map_err(storage_err)?;
        Ok(table
            .get(encoded.as_slice())
            .map_err(storage_err)?
            .map(|v| v.value().to_vec()))
    }

    async fn set(&self, key: TupleKey, value: Vec<u8>) -> Result<()> {
        let encoded = encode_key(&key)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(TABLE).map_err(storage_err)?;
            table
                .insert(encoded.as_slice(), value.as_slice())
                .map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    async fn delete(&self, key: &TupleKey) -> Result<bool> {
        let encoded = encode_key(key)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        let existed = {
            let mut table = txn.open_table(TABLE).map_err(storage_err)?;
            let removed = table.remove(encoded.as_slice()).map_err(storage_err)?;
            removed.is_some()
        };
        txn.commit().map_err(storage_err)?;
        Ok(existed)
    }

    fn list(&self, selector: Selector, opts: ListOpts) -> ListIter {
        match self.scan(&selector) {
            Ok(mut rows) => {
                if opts.reverse {
                    rows.reverse();
                }
                if let Some(limit) = opts.limit {
                    rows.truncate(limit);
                }
                Box::new(rows.into_iter().map(Ok))
            }
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    async fn clear(&self, selector: Option<Selector>) -> Result<()> {
        let sel = selector.unwrap_or_default();
        let keys = self.scan(&sel)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(TABLE).map_err(storage_err)?;
            for (key, _) in keys {
                let encoded = encode_key(&key)?;
                table.remove(encoded.as_slice()).map_err(storage_err)?;
            }
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn batch(&self) -> Box<dyn Batch> {
        Box::new(RedbBatch {
            ops: Vec::new(),
            db: self.db.clone(),
        })
    }
}

struct RedbBatch {
    ops: Vec<BatchOp>,
    db: Arc<Database>,
}

#[async_trait]
impl Batch for RedbBatch {
    fn set(&mut self, key: TupleKey, value: Vec<u8>) {
        self.ops.push(BatchOp::Set(key, value));
    }

    fn delete(&mut self, key: TupleKey) {
        self.ops.push(BatchOp::Delete(key));
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(TABLE).map_err(storage_err)?;
            for op in self.ops {
                match op {
                    BatchOp::Set(key, value) => {
                        let encoded = encode_key(&key)?;
                        table
                            .insert(encoded.as_slice(), value.as_slice())
                            .map_err(storage_err)?;
                    }
                    BatchOp::Delete(key) => {
                        let encoded = encode_key(&key)?;
                        table.remove(encoded.as_slice()).map_err(storage_err)?;
                    }
                }
            }
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }
}
