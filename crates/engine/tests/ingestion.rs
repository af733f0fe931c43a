use std::sync::Arc;

use willow_core::testing::{AllowAllAuthScheme, TestAuthDigest, TestNamespace, TestPayloadDigest, TestSubspace};
use willow_core::{
    Area, AreaOfInterest, Entry, Error, LiftingMonoid, Limits, Monoid, Path, PayloadScheme, SubspaceSpec,
};
use willow_durability::{StoreLayout, WriteAheadFlag};
use willow_engine::{EntryAttrs, IngestOutcome, MemoryPayloadDriver, PayloadOutcome, RemoveOutcome, StoreEngine};
use willow_index::QueryOrder;
use willow_kv::{KvBackend, MemoryBackend};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct XorFingerprint(u64);

impl Monoid for XorFingerprint {
    fn neutral() -> Self {
        XorFingerprint(0)
    }
    fn combine(&self, other: &Self) -> Self {
        XorFingerprint(self.0 ^ other.0)
    }
}

#[derive(Clone, Copy)]
struct ValueLift;

impl LiftingMonoid<[u8], [u8]> for ValueLift {
    type Output = XorFingerprint;

    fn lift(&self, _key: &[u8], value: &[u8]) -> XorFingerprint {
        XorFingerprint(value.iter().fold(0u64, |acc, &b| acc ^ b as u64))
    }
}

struct RawBytesScheme;

impl PayloadScheme<TestPayloadDigest> for RawBytesScheme {
    fn digest_bytes(&self, bytes: &[u8]) -> TestPayloadDigest {
        TestPayloadDigest(bytes.to_vec())
    }
}

type TestEngine = StoreEngine<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest, AllowAllAuthScheme, ValueLift>;

async fn open_engine(backend: Arc<dyn KvBackend>) -> TestEngine {
    StoreEngine::open(
        TestNamespace(1),
        backend,
        ValueLift,
        AllowAllAuthScheme,
        MemoryPayloadDriver::new(RawBytesScheme),
        Limits::for_testing(),
    )
    .await
    .unwrap()
}

fn path(components: &[&[u8]]) -> Path {
    Path::from_components(components.iter().map(|c| c.to_vec()))
}

fn entry(subspace: u64, p: &[&[u8]], timestamp: u64, bytes: &[u8]) -> Entry<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest> {
    Entry {
        namespace_id: TestNamespace(1),
        subspace_id: TestSubspace(subspace),
        path: path(p),
        timestamp,
        payload_digest: TestPayloadDigest(bytes.to_vec()),
        payload_length: bytes.len() as u64,
        authorisation_token_digest: TestAuthDigest(vec![]),
    }
}

fn token() -> Vec<u8> {
    vec![1]
}

#[tokio::test]
async fn admits_a_new_entry() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    let e = entry(1, &[b"a"], 10, b"hello");
    let outcome = engine.ingest_entry(e.clone(), token()).await.unwrap();
    assert!(outcome.is_success());

    let rows = engine.query(&AreaOfInterest::full(), QueryOrder::Subspace, false).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp, 10);
}

#[tokio::test]
async fn older_entry_at_same_path_is_a_noop() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    engine.ingest_entry(entry(1, &[b"a"], 10, b"newer"), token()).await.unwrap();
    let outcome = engine.ingest_entry(entry(1, &[b"a"], 5, b"older"), token()).await.unwrap();

    match outcome {
        IngestOutcome::NoOp { reason } => assert!(matches!(reason, Error::ObsoleteFromSameSubspace)),
        other => panic!("expected NoOp, got {other:?}"),
    }
}

#[tokio::test]
async fn newer_entry_at_same_path_supersedes_the_older_one() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    engine.ingest_entry(entry(1, &[b"a"], 5, b"older"), token()).await.unwrap();
    let outcome = engine.ingest_entry(entry(1, &[b"a"], 10, b"newer"), token()).await.unwrap();

    match outcome {
        IngestOutcome::Success { entry, removed } => {
            assert_eq!(entry.timestamp, 10);
            assert_eq!(removed.len(), 1);
            assert_eq!(removed[0].timestamp, 5);
        }
        other => panic!("expected Success, got {other:?}"),
    }
}

#[tokio::test]
async fn newer_prefix_blocks_ingestion_of_an_extension_path() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    engine.ingest_entry(entry(1, &[b"a"], 10, b"parent"), token()).await.unwrap();
    let outcome = engine.ingest_entry(entry(1, &[b"a", b"b"], 5, b"child"), token()).await.unwrap();

    match outcome {
        IngestOutcome::NoOp { reason } => assert!(matches!(reason, Error::NewerPrefixFound)),
        other => panic!("expected NoOp, got {other:?}"),
    }
}

#[tokio::test]
async fn older_extension_paths_are_pruned_on_ingest() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    engine.ingest_entry(entry(1, &[b"a", b"b"], 5, b"child"), token()).await.unwrap();
    let outcome = engine.ingest_entry(entry(1, &[b"a"], 10, b"parent"), token()).await.unwrap();

    match outcome {
        IngestOutcome::Success { removed, .. } => {
            assert_eq!(removed.len(), 1);
            assert_eq!(removed[0].path, path(&[b"a", b"b"]));
        }
        other => panic!("expected Success, got {other:?}"),
    }

    let aoi = AreaOfInterest {
        area: Area {
            subspace: SubspaceSpec::Id(TestSubspace(1)),
            path_prefix: Path::empty(),
            time_range: willow_core::TimeRange::full(),
        },
        max_count: 0,
        max_size: 0,
    };
    let rows = engine.query(&aoi, QueryOrder::Subspace, false).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, path(&[b"a"]));
}

#[tokio::test]
async fn unauthorised_token_fails_admission() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    let outcome = engine.ingest_entry(entry(1, &[b"a"], 10, b"hello"), vec![]).await.unwrap();
    match outcome {
        IngestOutcome::Failure { reason } => assert!(matches!(reason, Error::InvalidEntry(_))),
        other => panic!("expected Failure, got {other:?}"),
    }
}

#[tokio::test]
async fn ingest_payload_round_trips_then_noops_when_already_held() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    let e = entry(1, &[b"a"], 10, b"hello");
    engine.ingest_entry(e.clone(), token()).await.unwrap();

    let first = engine.ingest_payload(&e.subspace_id, &e.path, b"hello".to_vec()).await.unwrap();
    assert!(matches!(first, PayloadOutcome::Success { .. }));

    let second = engine.ingest_payload(&e.subspace_id, &e.path, b"hello".to_vec()).await.unwrap();
    assert!(matches!(second, PayloadOutcome::NoOp));
}

#[tokio::test]
async fn ingest_payload_rejects_a_digest_mismatch() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    let e = entry(1, &[b"a"], 10, b"hello");
    engine.ingest_entry(e.clone(), token()).await.unwrap();

    let outcome = engine.ingest_payload(&e.subspace_id, &e.path, b"wrong".to_vec()).await.unwrap();
    match outcome {
        PayloadOutcome::Failure { reason } => assert!(matches!(reason, Error::DataMismatch)),
        other => panic!("expected Failure, got {other:?}"),
    }
}

#[tokio::test]
async fn ingest_payload_without_a_matching_entry_fails() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    let outcome = engine.ingest_payload(&TestSubspace(1), &path(&[b"missing"]), b"hello".to_vec()).await.unwrap();
    match outcome {
        PayloadOutcome::Failure { reason } => assert!(matches!(reason, Error::NoEntry)),
        other => panic!("expected Failure, got {other:?}"),
    }
}

#[tokio::test]
async fn set_builds_authorises_and_ingests_an_entry() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    let attrs = EntryAttrs { subspace_id: TestSubspace(1), path: path(&[b"a"]), timestamp: 1 };
    let outcome = engine.set(attrs, b"payload-bytes".to_vec(), &()).await.unwrap();
    assert!(outcome.is_success());

    let payload_outcome = engine
        .ingest_payload(&TestSubspace(1), &path(&[b"a"]), b"payload-bytes".to_vec())
        .await
        .unwrap();
    assert!(matches!(payload_outcome, PayloadOutcome::NoOp), "set already delivered the payload");
}

#[tokio::test]
async fn remove_entry_deletes_an_existing_entry() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let engine = open_engine(backend).await;

    let e = entry(1, &[b"a"], 10, b"hello");
    engine.ingest_entry(e.clone(), token()).await.unwrap();

    let outcome = engine.remove_entry(&e.subspace_id, &e.path).await.unwrap();
    assert!(matches!(outcome, RemoveOutcome::Success { .. }));

    let again = engine.remove_entry(&e.subspace_id, &e.path).await.unwrap();
    assert!(matches!(again, RemoveOutcome::NoOp));
}

#[tokio::test]
async fn recovery_replays_an_interrupted_insert_flag() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());

    let layout = StoreLayout::new(backend.clone());
    let waf = WriteAheadFlag::new(layout.waf.clone());
    let e = entry(1, &[b"a"], 10, b"hello");
    waf.set_insert(&e).await.unwrap();

    let engine = open_engine(backend.clone()).await;

    let aoi = AreaOfInterest {
        area: Area {
            subspace: SubspaceSpec::Id(TestSubspace(1)),
            path_prefix: Path::empty(),
            time_range: willow_core::TimeRange::full(),
        },
        max_count: 0,
        max_size: 0,
    };
    let rows = engine.query(&aoi, QueryOrder::Subspace, false).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp, 10);

    let flag_after = WriteAheadFlag::new(layout.waf.clone())
        .read::<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest>()
        .await
        .unwrap();
    assert!(flag_after.is_none());
}

#[tokio::test]
async fn recovery_is_idempotent_when_reopened_twice() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());

    let layout = StoreLayout::new(backend.clone());
    let waf = WriteAheadFlag::new(layout.waf.clone());
    let e = entry(1, &[b"a"], 10, b"hello");
    waf.set_insert(&e).await.unwrap();

    open_engine(backend.clone()).await;
    let engine = open_engine(backend.clone()).await;

    let aoi = AreaOfInterest {
        area: Area {
            subspace: SubspaceSpec::Id(TestSubspace(1)),
            path_prefix: Path::empty(),
            time_range: willow_core::TimeRange::full(),
        },
        max_count: 0,
        max_size: 0,
    };
    let rows = engine.query(&aoi, QueryOrder::Subspace, false).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn recovery_replays_an_interrupted_remove_flag() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
    let e = entry(1, &[b"a"], 10, b"hello");

    {
        let engine = open_engine(backend.clone()).await;
        engine.ingest_entry(e.clone(), token()).await.unwrap();
    }

    let layout = StoreLayout::new(backend.clone());
    let waf = WriteAheadFlag::new(layout.waf.clone());
    let partial = willow_durability::PartialEntry {
        namespace_id: e.namespace_id,
        subspace_id: e.subspace_id,
        path: e.path.clone(),
        timestamp: e.timestamp,
        payload_digest: e.payload_digest.clone(),
        payload_length: e.payload_length,
    };
    waf.set_remove(&partial).await.unwrap();

    let engine = open_engine(backend.clone()).await;
    let outcome = engine.remove_entry(&e.subspace_id, &e.path).await.unwrap();
    assert!(matches!(outcome, RemoveOutcome::NoOp), "recovery should already have removed the entry");
}
