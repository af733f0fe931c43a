//! `KvBackend`: the ordered key-value contract every storage layer above
//! this crate is built against (§4.1).

use async_trait::async_trait;
use willow_core::{Result, TupleKey};

use crate::selector::{ListOpts, Selector};

/// A lazily-evaluated, restartable sequence of `(key, value)` pairs.
///
/// A fresh iterator is produced on every `list` call; nothing is cached
/// across calls, so a long-lived backend handle never pins a result set in
/// memory.
pub type ListIter = Box<dyn Iterator<Item = Result<(TupleKey, Vec<u8>)>> + Send>;

/// An ordered mapping from tuple keys to opaque byte values.
///
/// Implementations are responsible only for storage and range iteration;
/// key encoding (`willow-kv::codec`) and prefix isolation
/// (`willow-kv::prefixed`) are layered on top, not inside, a backend.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Point lookup.
    async fn get(&self, key: &TupleKey) -> Result<Option<Vec<u8>>>;

    /// Upsert.
    async fn set(&self, key: TupleKey, value: Vec<u8>) -> Result<()>;

    /// Removal; reports whether the key was present.
    async fn delete(&self, key: &TupleKey) -> Result<bool>;

    /// Range scan honoring `selector`/`opts`. See [`crate::selector`] for
    /// the combination semantics.
    fn list(&self, selector: Selector, opts: ListOpts) -> ListIter;

    /// Delete every entry matching `selector`, or every entry if `None`.
    async fn clear(&self, selector: Option<Selector>) -> Result<()>;

    /// Begin an atomic batch of writes.
    fn batch(&self) -> Box<dyn Batch>;
}

/// One write operation queued in a [`Batch`].
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Upsert `key` to `value`.
    Set(TupleKey, Vec<u8>),
    /// Remove `key`, if present.
    Delete(TupleKey),
}

/// Accumulates `set`/`delete` operations for atomic commit.
///
/// A batch with no operations commits as a no-op. Operations are applied
/// in the order queued; a later `set`/`delete` on the same key shadows an
/// earlier one in the same batch.
#[async_trait]
pub trait Batch: Send {
    /// Queue an upsert.
    fn set(&mut self, key: TupleKey, value: Vec<u8>);

    /// Queue a removal.
    fn delete(&mut self, key: TupleKey);

    /// Apply every queued operation atomically: either all of them are
    /// visible afterwards, or none are (on error, or on a crash mid-commit).
    async fn commit(self: Box<Self>) -> Result<()>;
}
