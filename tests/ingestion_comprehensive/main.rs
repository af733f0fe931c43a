//! End-to-end coverage of the public facade: multiple subspaces and
//! namespacesworth of entries flowing through `set`/`query`/`summarise`,
//! and a crash-recovery scenario driven purely through `willow_store`'s
//! public surface.

use std::sync::Arc;

use willow_core::testing::{AllowAllAuthScheme, TestAuthDigest, TestNamespace, TestPayloadDigest, TestSubspace};
use willow_core::{Area, AreaOfInterest, Limits, LiftingMonoid, Monoid, Path, PayloadScheme, SubspaceSpec};
use willow_store::{EntryAttrs, MemoryBackend, MemoryPayloadDriver, QueryOrder, Store, StoreEngine};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct CountFingerprint(u64);

impl Monoid for CountFingerprint {
    fn neutral() -> Self {
        CountFingerprint(0)
    }
    fn combine(&self, other: &Self) -> Self {
        CountFingerprint(self.0 + other.0)
    }
}

#[derive(Clone, Copy)]
struct CountingMonoid;

impl LiftingMonoid<[u8], [u8]> for CountingMonoid {
    type Output = CountFingerprint;

    fn lift(&self, _key: &[u8], _value: &[u8]) -> CountFingerprint {
        CountFingerprint(1)
    }
}

struct RawBytesScheme;

impl PayloadScheme<TestPayloadDigest> for RawBytesScheme {
    fn digest_bytes(&self, bytes: &[u8]) -> TestPayloadDigest {
        TestPayloadDigest(bytes.to_vec())
    }
}

type TestStore = Store<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest, AllowAllAuthScheme, CountingMonoid>;

fn path(components: &[&[u8]]) -> Path {
    Path::from_components(components.iter().map(|c| c.to_vec()))
}

#[tokio::test]
async fn set_across_subspaces_and_paths_then_query_and_summarise_agree() {
    let store: TestStore = willow_store::open_in_memory(
        TestNamespace(1),
        CountingMonoid,
        AllowAllAuthScheme,
        MemoryPayloadDriver::new(RawBytesScheme),
    )
    .await
    .unwrap();

    for subspace in 0..3u64 {
        for (i, component) in [b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()].into_iter().enumerate() {
            let attrs = EntryAttrs {
                subspace_id: TestSubspace(subspace),
                path: path(&[&component]),
                timestamp: i as u64 + 1,
            };
            let outcome = store.set(attrs, format!("payload-{subspace}-{i}").into_bytes(), &()).await.unwrap();
            assert!(outcome.is_success());
        }
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
    let rows = store.query(&aoi, QueryOrder::Subspace, false).await.unwrap();
    assert_eq!(rows.len(), 3);

    let summary = store.summarise(&aoi).await.unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.fingerprint, CountFingerprint(3));
}

#[tokio::test]
async fn prefix_pruning_holds_across_namespace_wide_queries() {
    let store: TestStore = willow_store::open_in_memory(
        TestNamespace(1),
        CountingMonoid,
        AllowAllAuthScheme,
        MemoryPayloadDriver::new(RawBytesScheme),
    )
    .await
    .unwrap();

    let leaf = EntryAttrs { subspace_id: TestSubspace(0), path: path(&[b"docs", b"draft"]), timestamp: 1 };
    store.set(leaf, b"draft-bytes".to_vec(), &()).await.unwrap();

    let root = EntryAttrs { subspace_id: TestSubspace(0), path: path(&[b"docs"]), timestamp: 2 };
    let outcome = store.set(root, b"final-bytes".to_vec(), &()).await.unwrap();
    let removed = match outcome {
        willow_store::IngestOutcome::Success { removed, .. } => removed,
        other => panic!("expected Success, got {other:?}"),
    };
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].path, path(&[b"docs", b"draft"]));

    let rows = store.query(&AreaOfInterest::full(), QueryOrder::Path, false).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, path(&[b"docs"]));
}

#[tokio::test]
async fn reopening_after_an_interrupted_insert_makes_the_entry_visible() {
    let backend: Arc<dyn willow_store::KvBackend> = Arc::new(MemoryBackend::new());

    let layout = willow_durability::StoreLayout::new(backend.clone());
    let waf = willow_durability::WriteAheadFlag::new(layout.waf.clone());
    let entry = willow_core::Entry {
        namespace_id: TestNamespace(1),
        subspace_id: TestSubspace(0),
        path: path(&[b"recovered"]),
        timestamp: 7,
        payload_digest: TestPayloadDigest(b"payload".to_vec()),
        payload_length: 7,
        authorisation_token_digest: TestAuthDigest(vec![1]),
    };
    waf.set_insert(&entry).await.unwrap();

    let store: TestStore = StoreEngine::open(
        TestNamespace(1),
        backend,
        CountingMonoid,
        AllowAllAuthScheme,
        MemoryPayloadDriver::new(RawBytesScheme),
        Limits::default(),
    )
    .await
    .unwrap();

    let rows = store.query(&AreaOfInterest::full(), QueryOrder::Subspace, false).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, path(&[b"recovered"]));
}
