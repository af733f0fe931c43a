//! The physical row value shared by all three orderings (§4.7): identical
//! bytes are written under the SPT, PTS, and TSP keys for one entry.

use willow_core::{Digest, Error, Result};

/// `payload_length || encode(payload_digest) || encode(authorisation_token_digest)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowValue<PD: Digest, AD: Digest> {
    /// Length in bytes of the referenced payload.
    pub payload_length: u64,
    /// Digest of the referenced payload.
    pub payload_digest: PD,
    /// Digest of the authorisation token that admitted this entry.
    pub authorisation_token_digest: AD,
}

impl<PD: Digest, AD: Digest> RowValue<PD, AD> {
    /// Encode to the on-disk row representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.payload_length.to_be_bytes());
        out.extend_from_slice(&self.payload_digest.encode());
        out.extend_from_slice(&self.authorisation_token_digest.encode());
        out
    }

    /// Decode a row value previously produced by [`RowValue::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(Error::Codec("row value: short buffer".into()));
        }
        let mut len_buf = [0u8; 8];
        len_buf.copy_from_slice(&bytes[..8]);
        let payload_length = u64::from_be_bytes(len_buf);

        let (payload_digest, consumed) = PD::decode(&bytes[8..])?;
        let rest = &bytes[8 + consumed..];
        let (authorisation_token_digest, _) = AD::decode(rest)?;

        Ok(RowValue {
            payload_length,
            payload_digest,
            authorisation_token_digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use willow_core::testing::{TestAuthDigest, TestPayloadDigest};

    #[test]
    fn round_trips() {
        let row = RowValue {
            payload_length: 1234,
            payload_digest: TestPayloadDigest(vec![1, 2, 3]),
            authorisation_token_digest: TestAuthDigest(vec![9]),
        };
        let encoded = row.encode();
        let decoded = RowValue::<TestPayloadDigest, TestAuthDigest>::decode(&encoded).unwrap();
        assert_eq!(decoded, row);
    }
}
