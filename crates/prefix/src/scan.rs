//! Kv-backend-scan implementation of the prefix iterator (§4.6b): stores
//! each path under its flat [`crate::encoding`] byte encoding directly as a
//! backend key, so that a lexicographic key scan is a path-order scan.

use std::sync::Arc;

use async_trait::async_trait;
use willow_core::{KeyPart, Path, Result};
use willow_kv::{KvBackend, ListOpts, Selector};

use crate::encoding::{decode_path_component, encode_path_component, increment_bytes};
use crate::PrefixIndex;

fn key_for(path: &Path) -> willow_core::TupleKey {
    vec![KeyPart::bytes(encode_path_component(path))]
}

/// A prefix iterator backed by a kv-backend scan over the encoded-path
/// ordering.
pub struct ScanPrefixIndex {
    backend: Arc<dyn KvBackend>,
}

impl ScanPrefixIndex {
    /// Build an index over `backend`. Callers typically hand this a
    /// `PrefixedBackend` scoped to the store's `["prefix"]` region (§6.3).
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        ScanPrefixIndex { backend }
    }
}

#[async_trait]
impl PrefixIndex for ScanPrefixIndex {
    async fn insert(&self, path: Path, value: Vec<u8>) -> Result<()> {
        self.backend.set(key_for(&path), value).await
    }

    async fn remove(&self, path: &Path) -> Result<bool> {
        self.backend.delete(&key_for(path)).await
    }

    async fn prefixes_of(&self, path: &Path) -> Result<Vec<(Path, Vec<u8>)>> {
        let mut found = Vec::new();
        for i in 0..=path.components().len() {
            let candidate = Path::new(path.components()[..i].to_vec());
            if let Some(value) = self.backend.get(&key_for(&candidate)).await? {
                found.push((candidate, value));
            }
        }
        Ok(found)
    }

    async fn prefixed_by(&self, path: &Path) -> Result<Vec<(Path, Vec<u8>)>> {
        // The whole path is packed into a single `KeyPart::Bytes`, so a
        // byte-level prefix scan has to be done as an explicit `[start,
        // end)` range rather than `Selector`'s tuple-element prefix field
        // (which only matches whole key parts). A single-component path
        // with no trailing separator can also share a raw byte prefix with
        // an unrelated longer component (e.g. "a" is a byte-prefix of
        // "ax"), so every candidate is re-checked against `Path::is_prefix_of`.
        let prefix_bytes = encode_path_component(path);
        let start = Some(vec![KeyPart::bytes(prefix_bytes.clone())]);
        let end = increment_bytes(&prefix_bytes).map(|b| vec![KeyPart::bytes(b)]);
        let selector = Selector::range(start, end);
        let rows = self.backend.list(selector, ListOpts::default());
        let mut found = Vec::new();
        for row in rows {
            let (key, value) = row?;
            let encoded = match key.first() {
                Some(KeyPart::Bytes(b)) => b.clone(),
                _ => continue,
            };
            let candidate = decode_path_component(&encoded)?;
            if path.is_prefix_of(&candidate) {
                found.push((candidate, value));
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use willow_kv::MemoryBackend;

    fn path(components: &[&[u8]]) -> Path {
        Path::from_components(components.iter().map(|c| c.to_vec()))
    }

    fn index() -> ScanPrefixIndex {
        ScanPrefixIndex::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn insert_then_get_prefixes_of_itself() {
        let index = index();
        index.insert(path(&[b"a"]), vec![1]).await.unwrap();
        let found = index.prefixes_of(&path(&[b"a"])).await.unwrap();
        assert_eq!(found, vec![(path(&[b"a"]), vec![1])]);
    }

    #[tokio::test]
    async fn prefixes_of_returns_ascending_length_order() {
        let index = index();
        index.insert(Path::empty(), vec![0]).await.unwrap();
        index.insert(path(&[b"a"]), vec![1]).await.unwrap();
        index.insert(path(&[b"a", b"b"]), vec![2]).await.unwrap();
        let found = index.prefixes_of(&path(&[b"a", b"b", b"c"])).await.unwrap();
        assert_eq!(
            found,
            vec![
                (Path::empty(), vec![0]),
                (path(&[b"a"]), vec![1]),
                (path(&[b"a", b"b"]), vec![2]),
            ]
        );
    }

    #[tokio::test]
    async fn prefixed_by_enumerates_descendants_lexicographically() {
        let index = index();
        index.insert(path(&[b"a"]), vec![0]).await.unwrap();
        index.insert(path(&[b"a", b"x"]), vec![1]).await.unwrap();
        index.insert(path(&[b"a", b"y"]), vec![2]).await.unwrap();
        index.insert(path(&[b"b"]), vec![3]).await.unwrap();
        let found = index.prefixed_by(&path(&[b"a"])).await.unwrap();
        assert_eq!(
            found,
            vec![
                (path(&[b"a"]), vec![0]),
                (path(&[b"a", b"x"]), vec![1]),
                (path(&[b"a", b"y"]), vec![2]),
            ]
        );
    }

    #[tokio::test]
    async fn remove_reports_existence() {
        let index = index();
        index.insert(path(&[b"a"]), vec![1]).await.unwrap();
        assert!(index.remove(&path(&[b"a"])).await.unwrap());
        assert!(!index.remove(&path(&[b"a"])).await.unwrap());
    }
}
