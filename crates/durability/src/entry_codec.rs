//! On-disk and write-ahead-flag entry encoding (§6.4):
//! `encode(namespace) || encode(subspace) || encode(path) ||
//! big_endian_u64(timestamp) || big_endian_u64(payload_length) ||
//! encode(payload_digest)`.
//!
//! The authorisation-token digest is deliberately not part of this
//! encoding — §6.3 stores it under its own `waf/insert/authTokenHash` row,
//! separate from the entry row it accompanies, and the removal flag has no
//! need of it at all.

use willow_core::{Digest, Entry, Error, NamespaceId, Path, Result, SubspaceId};
use willow_prefix::{decode_path_component, encode_path_component};

/// Every field of an [`Entry`] except its authorisation-token digest —
/// exactly what §6.4's encoding carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialEntry<N: NamespaceId, S: SubspaceId, PD: Digest> {
    /// Constant per store instance.
    pub namespace_id: N,
    /// Opaque, totally ordered subspace identifier.
    pub subspace_id: S,
    /// Ordered sequence of byte components.
    pub path: Path,
    /// Microsecond timestamp.
    pub timestamp: u64,
    /// Digest of the referenced payload.
    pub payload_digest: PD,
    /// Length in bytes of the referenced payload.
    pub payload_length: u64,
}

impl<N: NamespaceId, S: SubspaceId, PD: Digest> PartialEntry<N, S, PD> {
    /// Attach an authorisation-token digest to recover a full [`Entry`].
    pub fn with_authorisation_token_digest<AD: Digest>(self, authorisation_token_digest: AD) -> Entry<N, S, PD, AD> {
        Entry {
            namespace_id: self.namespace_id,
            subspace_id: self.subspace_id,
            path: self.path,
            timestamp: self.timestamp,
            payload_digest: self.payload_digest,
            payload_length: self.payload_length,
            authorisation_token_digest,
        }
    }
}

fn encode_path_framed(path: &Path) -> Vec<u8> {
    let inner = encode_path_component(path);
    let mut out = Vec::with_capacity(4 + inner.len());
    out.extend_from_slice(&(inner.len() as u32).to_be_bytes());
    out.extend_from_slice(&inner);
    out
}

fn decode_path_framed(bytes: &[u8]) -> Result<(Path, usize)> {
    if bytes.len() < 4 {
        return Err(Error::Codec("entry encoding: path length header truncated".into()));
    }
    let mut len_buf = [0u8; 4];
    len_buf.copy_from_slice(&bytes[..4]);
    let len = u32::from_be_bytes(len_buf) as usize;
    if bytes.len() < 4 + len {
        return Err(Error::Codec("entry encoding: path bytes truncated".into()));
    }
    let path = decode_path_component(&bytes[4..4 + len])?;
    Ok((path, 4 + len))
}

/// Encode `entry` per §6.4, excluding its authorisation-token digest.
pub fn encode_entry<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>(entry: &Entry<N, S, PD, AD>) -> Vec<u8> {
    encode_partial_entry(&PartialEntry {
        namespace_id: entry.namespace_id.clone(),
        subspace_id: entry.subspace_id.clone(),
        path: entry.path.clone(),
        timestamp: entry.timestamp,
        payload_digest: entry.payload_digest.clone(),
        payload_length: entry.payload_length,
    })
}

/// Encode a [`PartialEntry`] per §6.4.
pub fn encode_partial_entry<N: NamespaceId, S: SubspaceId, PD: Digest>(entry: &PartialEntry<N, S, PD>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&entry.namespace_id.encode());
    out.extend_from_slice(&entry.subspace_id.encode());
    out.extend_from_slice(&encode_path_framed(&entry.path));
    out.extend_from_slice(&entry.timestamp.to_be_bytes());
    out.extend_from_slice(&entry.payload_length.to_be_bytes());
    out.extend_from_slice(&entry.payload_digest.encode());
    out
}

/// Decode a [`PartialEntry`] previously produced by [`encode_entry`] or
/// [`encode_partial_entry`].
pub fn decode_partial_entry<N: NamespaceId, S: SubspaceId, PD: Digest>(bytes: &[u8]) -> Result<PartialEntry<N, S, PD>> {
    let (namespace_id, consumed) = N::decode(bytes)?;
    let bytes = &bytes[consumed..];

    let (subspace_id, consumed) = S::decode(bytes)?;
    let bytes = &bytes[consumed..];

    let (path, consumed) = decode_path_framed(bytes)?;
    let bytes = &bytes[consumed..];

    if bytes.len() < 16 {
        return Err(Error::Codec("entry encoding: timestamp/length header truncated".into()));
    }
    let mut ts_buf = [0u8; 8];
    ts_buf.copy_from_slice(&bytes[..8]);
    let timestamp = u64::from_be_bytes(ts_buf);

    let mut len_buf = [0u8; 8];
    len_buf.copy_from_slice(&bytes[8..16]);
    let payload_length = u64::from_be_bytes(len_buf);

    let (payload_digest, _) = PD::decode(&bytes[16..])?;

    Ok(PartialEntry {
        namespace_id,
        subspace_id,
        path,
        timestamp,
        payload_digest,
        payload_length,
    })
}

/// Decode an entry previously produced by [`encode_entry`]. The
/// authorisation-token digest is supplied by the caller (read from its own
/// write-ahead-flag row) rather than recovered from `bytes`.
pub fn decode_entry<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>(
    bytes: &[u8],
    authorisation_token_digest: AD,
) -> Result<Entry<N, S, PD, AD>> {
    Ok(decode_partial_entry::<N, S, PD>(bytes)?.with_authorisation_token_digest(authorisation_token_digest))
}
