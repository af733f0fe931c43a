//! Opaque, totally-ordered, encodable digests.
//!
//! Both `payload_digest` and `authorisation_token_digest` are digests in
//! this sense (§3). The actual hash function is out of scope (§1: "the
//! core consumes these through narrow interfaces") — this trait is that
//! interface.

use crate::error::Result;
use std::fmt::Debug;

/// An opaque digest: totally ordered, cloneable, and self-delimiting when
/// encoded to bytes.
pub trait Digest: Clone + Ord + Debug + Send + Sync + 'static {
    /// Encode to a self-delimiting byte representation.
    fn encode(&self) -> Vec<u8>;

    /// Decode a value previously produced by `encode`, returning the
    /// decoded value and the number of bytes consumed.
    fn decode(bytes: &[u8]) -> Result<(Self, usize)>
    where
        Self: Sized;

    /// The number of bytes `encode` would produce for this value.
    fn encoded_length(&self) -> usize {
        self.encode().len()
    }
}
