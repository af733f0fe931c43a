//! In-memory radix/patricia implementation of the prefix iterator: a trie
//! branching on path components, each node's own value (if set) marking a
//! stored path that terminates there.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use willow_core::{Path, Result};

use crate::PrefixIndex;

#[derive(Default)]
struct Node {
    value: Option<Vec<u8>>,
    children: BTreeMap<Vec<u8>, Node>,
}

/// A prefix iterator backed by an in-memory component trie.
#[derive(Default)]
pub struct RadixPrefixIndex {
    root: Mutex<Node>,
}

impl RadixPrefixIndex {
    /// An empty index.
    pub fn new() -> Self {
        RadixPrefixIndex::default()
    }
}

#[async_trait]
impl PrefixIndex for RadixPrefixIndex {
    async fn insert(&self, path: Path, value: Vec<u8>) -> Result<()> {
        let mut node = self.root.lock();
        let mut current = &mut *node;
        for component in path.components() {
            current = current.children.entry(component.clone()).or_default();
        }
        current.value = Some(value);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<bool> {
        let mut node = self.root.lock();
        let mut current = &mut *node;
        for component in path.components() {
            match current.children.get_mut(component) {
                Some(child) => current = child,
                None => return Ok(false),
            }
        }
        Ok(current.value.take().is_some())
    }

    async fn prefixes_of(&self, path: &Path) -> Result<Vec<(Path, Vec<u8>)>> {
        let node = self.root.lock();
        let mut current = &*node;
        let mut found = Vec::new();
        let mut so_far = Vec::new();
        if let Some(value) = &current.value {
            found.push((Path::new(so_far.clone()), value.clone()));
        }
        for component in path.components() {
            match current.children.get(component) {
                Some(child) => {
                    current = child;
                    so_far.push(component.clone());
                    if let Some(value) = &current.value {
                        found.push((Path::new(so_far.clone()), value.clone()));
                    }
                }
                None => break,
            }
        }
        Ok(found)
    }

    async fn prefixed_by(&self, path: &Path) -> Result<Vec<(Path, Vec<u8>)>> {
        let node = self.root.lock();
        let mut current = &*node;
        for component in path.components() {
            match current.children.get(component) {
                Some(child) => current = child,
                None => return Ok(Vec::new()),
            }
        }
        let mut found = Vec::new();
        collect(current, path.components().to_vec(), &mut found);
        Ok(found)
    }
}

fn collect(node: &Node, prefix: Vec<Vec<u8>>, out: &mut Vec<(Path, Vec<u8>)>) {
    if let Some(value) = &node.value {
        out.push((Path::new(prefix.clone()), value.clone()));
    }
    for (component, child) in &node.children {
        let mut extended = prefix.clone();
        extended.push(component.clone());
        collect(child, extended, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(components: &[&[u8]]) -> Path {
        Path::from_components(components.iter().map(|c| c.to_vec()))
    }

    #[tokio::test]
    async fn insert_then_get_prefixes_of_itself() {
        let index = RadixPrefixIndex::new();
        index.insert(path(&[b"a"]), vec![1]).await.unwrap();
        let found = index.prefixes_of(&path(&[b"a"])).await.unwrap();
        assert_eq!(found, vec![(path(&[b"a"]), vec![1])]);
    }

    #[tokio::test]
    async fn prefixes_of_returns_ascending_length_order() {
        let index = RadixPrefixIndex::new();
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
        let index = RadixPrefixIndex::new();
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
        let index = RadixPrefixIndex::new();
        index.insert(path(&[b"a"]), vec![1]).await.unwrap();
        assert!(index.remove(&path(&[b"a"])).await.unwrap());
        assert!(!index.remove(&path(&[b"a"])).await.unwrap());
        assert!(index.prefixes_of(&path(&[b"a"])).await.unwrap().is_empty());
    }
}
