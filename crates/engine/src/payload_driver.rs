//! The payload driver contract (§6.2): the narrow interface this core
//! consumes the filesystem-backed blob store through. Only a test double
//! ships here; the real driver is named out of scope (§1).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use willow_core::{Digest, Error, PayloadScheme, Result};

/// What a successful `set`/`receive` call reports back.
#[derive(Debug, Clone)]
pub struct Received<PD: Digest> {
    /// Digest of the received bytes.
    pub digest: PD,
    /// Length in bytes of the received payload.
    pub length: u64,
}

/// The payload driver contract (§6.2).
#[async_trait]
pub trait PayloadDriver<PD: Digest>: Send + Sync {
    /// Fetch the complete payload for `digest`, if held.
    async fn get(&self, digest: &PD) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` as a new payload, computing its digest.
    async fn set(&self, bytes: Vec<u8>) -> Result<Received<PD>>;

    /// Receive `bytes` for a payload expected to match `known_digest`
    /// and/or `known_length`, if given. Rejects on mismatch.
    async fn receive(&self, bytes: Vec<u8>, known_length: Option<u64>, known_digest: Option<PD>) -> Result<Received<PD>>;

    /// The length in bytes of the payload for `digest`, if held.
    async fn length(&self, digest: &PD) -> Result<Option<u64>>;

    /// Erase the stored payload for `digest`.
    async fn erase(&self, digest: &PD) -> Result<()>;
}

/// An in-memory payload driver, for tests and examples.
pub struct MemoryPayloadDriver<PD: Digest, S: PayloadScheme<PD>> {
    scheme: S,
    payloads: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    _marker: std::marker::PhantomData<PD>,
}

impl<PD: Digest, S: PayloadScheme<PD>> MemoryPayloadDriver<PD, S> {
    /// Build an empty in-memory payload driver using `scheme` to digest
    /// incoming bytes.
    pub fn new(scheme: S) -> Arc<Self> {
        Arc::new(MemoryPayloadDriver {
            scheme,
            payloads: Mutex::new(HashMap::new()),
            _marker: std::marker::PhantomData,
        })
    }
}

#[async_trait]
impl<PD: Digest, S: PayloadScheme<PD>> PayloadDriver<PD> for MemoryPayloadDriver<PD, S> {
    async fn get(&self, digest: &PD) -> Result<Option<Vec<u8>>> {
        Ok(self.payloads.lock().get(&digest.encode()).cloned())
    }

    async fn set(&self, bytes: Vec<u8>) -> Result<Received<PD>> {
        let digest = self.scheme.digest_bytes(&bytes);
        let length = bytes.len() as u64;
        self.payloads.lock().insert(digest.encode(), bytes);
        Ok(Received { digest, length })
    }

    async fn receive(&self, bytes: Vec<u8>, known_length: Option<u64>, known_digest: Option<PD>) -> Result<Received<PD>> {
        let digest = self.scheme.digest_bytes(&bytes);
        let length = bytes.len() as u64;
        if let Some(expected) = &known_digest {
            if expected != &digest {
                return Err(Error::DataMismatch);
            }
        }
        if let Some(expected) = known_length {
            if expected != length {
                return Err(Error::DataMismatch);
            }
        }
        self.payloads.lock().insert(digest.encode(), bytes);
        Ok(Received { digest, length })
    }

    async fn length(&self, digest: &PD) -> Result<Option<u64>> {
        Ok(self.payloads.lock().get(&digest.encode()).map(|b| b.len() as u64))
    }

    async fn erase(&self, digest: &PD) -> Result<()> {
        self.payloads.lock().remove(&digest.encode());
        Ok(())
    }
}
