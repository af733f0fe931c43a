//! The payload reference counter (§5, §6.3): tracks how many live entries
//! reference each payload digest, backed by the `["payloadRefCount"]`
//! region. Increment, decrement, and count are serialised by the
//! ingestion mutex at the engine layer; this type itself does no locking.

use std::sync::Arc;

use willow_core::{Digest, Error, KeyPart, Result};
use willow_kv::KvBackend;

fn key_for<D: Digest>(digest: &D) -> willow_core::TupleKey {
    vec![KeyPart::bytes(digest.encode())]
}

fn decode_count(bytes: &[u8]) -> Result<u64> {
    let buf: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::Codec("payload ref count: expected 8-byte counter".into()))?;
    Ok(u64::from_be_bytes(buf))
}

/// A per-digest reference counter.
pub struct PayloadRefCounter {
    backend: Arc<dyn KvBackend>,
}

impl PayloadRefCounter {
    /// Build a counter over `backend` (expected to already be scoped to
    /// the `["payloadRefCount"]` region).
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        PayloadRefCounter { backend }
    }

    /// The current reference count for `digest`, zero if never referenced.
    pub async fn count<D: Digest>(&self, digest: &D) -> Result<u64> {
        match self.backend.get(&key_for(digest)).await? {
            Some(bytes) => decode_count(&bytes),
            None => Ok(0),
        }
    }

    /// Increment the reference count for `digest`, returning the new count.
    pub async fn increment<D: Digest>(&self, digest: &D) -> Result<u64> {
        let count = self.count(digest).await? + 1;
        self.backend.set(key_for(digest), count.to_be_bytes().to_vec()).await?;
        Ok(count)
    }

    /// Decrement the reference count for `digest`, returning the new count.
    /// Removes the row entirely once the count reaches zero. Decrementing
    /// an already-zero counter saturates at zero rather than underflowing.
    pub async fn decrement<D: Digest>(&self, digest: &D) -> Result<u64> {
        let count = self.count(digest).await?.saturating_sub(1);
        if count == 0 {
            tracing::debug!("payload ref count reached zero, dropping row");
            self.backend.delete(&key_for(digest)).await?;
        } else {
            self.backend.set(key_for(digest), count.to_be_bytes().to_vec()).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use willow_core::testing::TestPayloadDigest;
    use willow_kv::MemoryBackend;

    #[tokio::test]
    async fn unreferenced_digest_counts_zero() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let counter = PayloadRefCounter::new(backend);
        assert_eq!(counter.count(&TestPayloadDigest(vec![1])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn increment_then_decrement_round_trips() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let counter = PayloadRefCounter::new(backend);
        let digest = TestPayloadDigest(vec![1]);

        assert_eq!(counter.increment(&digest).await.unwrap(), 1);
        assert_eq!(counter.increment(&digest).await.unwrap(), 2);
        assert_eq!(counter.decrement(&digest).await.unwrap(), 1);
        assert_eq!(counter.count(&digest).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn decrement_to_zero_removes_the_row() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let counter = PayloadRefCounter::new(backend);
        let digest = TestPayloadDigest(vec![1]);

        counter.increment(&digest).await.unwrap();
        assert_eq!(counter.decrement(&digest).await.unwrap(), 0);
        assert_eq!(counter.count(&digest).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn decrement_below_zero_saturates() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let counter = PayloadRefCounter::new(backend);
        let digest = TestPayloadDigest(vec![1]);

        assert_eq!(counter.decrement(&digest).await.unwrap(), 0);
    }
}
