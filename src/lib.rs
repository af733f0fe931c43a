//! # willow-store
//!
//! A summarisable, range-reconcilable entry store for a peer-to-peer data
//! replica: a three-dimensional index over `(subspace, path, timestamp)`,
//! backed by any [`KvBackend`], with write-ahead-flag-protected ingestion
//! and a lifting-monoid summary usable for range-based set reconciliation.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use willow_core::testing::{AllowAllAuthScheme, TestAuthDigest, TestNamespace, TestPayloadDigest, TestSubspace};
//! use willow_core::{Limits, LiftingMonoid, Monoid, Path};
//! use willow_store::{EntryAttrs, MemoryPayloadDriver, Store};
//!
//! #[derive(Clone)]
//! struct CountingMonoid;
//!
//! #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
//! struct Count(u64);
//!
//! impl Monoid for Count {
//!     fn neutral() -> Self { Count(0) }
//!     fn combine(&self, other: &Self) -> Self { Count(self.0 + other.0) }
//! }
//!
//! impl LiftingMonoid<[u8], [u8]> for CountingMonoid {
//!     type Output = Count;
//!     fn lift(&self, _key: &[u8], _value: &[u8]) -> Count { Count(1) }
//! }
//!
//! struct RawDigest;
//! impl willow_core::PayloadScheme<TestPayloadDigest> for RawDigest {
//!     fn digest_bytes(&self, bytes: &[u8]) -> TestPayloadDigest {
//!         TestPayloadDigest(bytes.to_vec())
//!     }
//! }
//!
//! # async fn run() -> willow_core::Result<()> {
//! let store: Store<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest, AllowAllAuthScheme, CountingMonoid> =
//!     willow_store::open_in_memory(
//!         TestNamespace(0),
//!         CountingMonoid,
//!         AllowAllAuthScheme,
//!         MemoryPayloadDriver::new(RawDigest),
//!     )
//!     .await?;
//!
//! let attrs = EntryAttrs { subspace_id: TestSubspace(0), path: Path::from_components([b"a".to_vec()]), timestamp: 1 };
//! store.set(attrs, b"hello".to_vec(), &()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! | Crate | Responsibility |
//! |-------|----------------|
//! | `willow-kv` | The generic key-value backend abstraction, plus an in-memory and a redb-backed implementation |
//! | `willow-skiplist` | A summarisable, persisted probabilistic skip list over a lifting monoid |
//! | `willow-prefix` | Order-preserving path encoding and the prefix/extension query used by admission |
//! | `willow-index` | The three-dimensional (subspace, path, timestamp) entry index built from three skip lists |
//! | `willow-durability` | The persistent layout, write-ahead flag, and payload reference counter |
//! | `willow-engine` | [`StoreEngine`], the ingestion state machine that ties the above together |
//!
//! This crate re-exports the pieces most callers need and adds
//! [`open_in_memory`], a convenience constructor over [`MemoryBackend`].
//! Callers who need a persistent backend, a custom event sink, or explicit
//! recovery configuration should construct a [`StoreEngine`] directly via
//! [`StoreEngine::open_with`].

use std::sync::Arc;

pub use willow_core::{Error, Result};
pub use willow_durability::{DurabilityMode, RecoveryConfig};
pub use willow_engine::{
    EntryAttrs, Event, EventSink, IngestOutcome, MemoryPayloadDriver, PayloadDriver, PayloadOutcome, Received,
    RemoveOutcome, StoreEngine, TracingEventSink,
};
pub use willow_index::{IndexedEntry, QueryOrder};
pub use willow_kv::{KvBackend, MemoryBackend};

use willow_core::{AuthorisationScheme, Digest, Limits, LiftingMonoid, NamespaceId, SubspaceId};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The top-level store type. An alias for [`StoreEngine`]; construct one
/// with [`StoreEngine::open`], [`StoreEngine::open_with`], or
/// [`open_in_memory`].
pub type Store<N, S, PD, AD, Auth, M> = StoreEngine<N, S, PD, AD, Auth, M>;

/// Open a store backed by a fresh [`MemoryBackend`], using the default
/// [`Limits`] and a [`TracingEventSink`].
///
/// Intended for tests, examples, and ephemeral replicas; the resulting
/// store holds nothing once dropped.
pub async fn open_in_memory<N, S, PD, AD, Auth, M>(
    namespace_id: N,
    monoid: M,
    auth_scheme: Auth,
    payload_driver: Arc<dyn PayloadDriver<PD>>,
) -> Result<Store<N, S, PD, AD, Auth, M>>
where
    N: NamespaceId,
    S: SubspaceId,
    PD: Digest,
    AD: Digest,
    Auth: AuthorisationScheme<N, S, PD, AD>,
    M: LiftingMonoid<[u8], [u8]> + Clone,
    M::Output: Serialize + DeserializeOwned,
{
    StoreEngine::open(
        namespace_id,
        Arc::new(MemoryBackend::new()),
        monoid,
        auth_scheme,
        payload_driver,
        Limits::default(),
    )
    .await
}
