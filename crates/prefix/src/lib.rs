//! The prefix iterator (§4.6): stores `(path, value)` pairs and answers
//! two queries — which stored paths are prefixes of a given path, and
//! which stored paths are prefixed by it. Two conforming implementations
//! ship here, a radix/patricia tree and a kv-backend scan, required to
//! produce identical result sequences for the same operation log (see
//! `tests/conformance.rs`).

#![warn(missing_docs)]

pub mod encoding;
pub mod radix;
pub mod scan;

pub use encoding::{decode_path_component, encode_path_component, increment_bytes};
pub use radix::RadixPrefixIndex;
pub use scan::ScanPrefixIndex;

use async_trait::async_trait;
use willow_core::{Path, Result};

/// The prefix iterator contract (§4.6).
#[async_trait]
pub trait PrefixIndex: Send + Sync {
    /// Insert or replace the value stored at `path`.
    async fn insert(&self, path: Path, value: Vec<u8>) -> Result<()>;

    /// Remove `path`. Returns whether it was present.
    async fn remove(&self, path: &Path) -> Result<bool>;

    /// All stored paths that are a (non-strict) prefix of `path`, in
    /// ascending prefix-length order.
    async fn prefixes_of(&self, path: &Path) -> Result<Vec<(Path, Vec<u8>)>>;

    /// All stored paths (non-strictly) prefixed by `path`, in lexicographic
    /// path order.
    async fn prefixed_by(&self, path: &Path) -> Result<Vec<(Path, Vec<u8>)>>;
}
