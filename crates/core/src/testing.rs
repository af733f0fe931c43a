//! Concrete scheme implementations shared by this crate's own tests and by
//! every downstream crate's test suite.
//!
//! Not `#[cfg(test)]`: like the teacher's `storage::testing` module, this
//! is a normal public module so that `willow-kv`, `willow-skiplist`,
//! `willow-index`, `willow-durability`, and `willow-engine` tests can all
//! instantiate the same generic types without each crate reinventing a
//! toy namespace/subspace/digest scheme.

use crate::digest::Digest;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::ids::{NamespaceId, SubspaceId};
use crate::schemes::AuthorisationScheme;

/// A trivial namespace id: a `u64` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestNamespace(pub u64);

impl NamespaceId for TestNamespace {
    fn encode(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 8 {
            return Err(Error::Codec("TestNamespace: short buffer".into()));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        Ok((TestNamespace(u64::from_be_bytes(buf)), 8))
    }
}

/// A trivial, totally-ordered, successor-bearing subspace id: a `u64` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestSubspace(pub u64);

impl SubspaceId for TestSubspace {
    fn encode(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 8 {
            return Err(Error::Codec("TestSubspace: short buffer".into()));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        Ok((TestSubspace(u64::from_be_bytes(buf)), 8))
    }

    fn minimal() -> Self {
        TestSubspace(0)
    }

    fn successor(&self) -> Option<Self> {
        self.0.checked_add(1).map(TestSubspace)
    }
}

fn encode_length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
    out
}

fn decode_length_prefixed(bytes: &[u8]) -> Result<(Vec<u8>, usize)> {
    if bytes.len() < 4 {
        return Err(Error::Codec("length-prefixed digest: short buffer".into()));
    }
    let mut len_buf = [0u8; 4];
    len_buf.copy_from_slice(&bytes[..4]);
    let len = u32::from_be_bytes(len_buf) as usize;
    if bytes.len() < 4 + len {
        return Err(Error::Codec("length-prefixed digest: truncated".into()));
    }
    Ok((bytes[4..4 + len].to_vec(), 4 + len))
}

/// A trivial payload digest: raw bytes, compared lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestPayloadDigest(pub Vec<u8>);

impl Digest for TestPayloadDigest {
    fn encode(&self) -> Vec<u8> {
        encode_length_prefixed(&self.0)
    }

    fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        let (raw, consumed) = decode_length_prefixed(bytes)?;
        Ok((TestPayloadDigest(raw), consumed))
    }
}

/// A trivial authorisation-token digest, structurally identical to
/// `TestPayloadDigest` but kept as a distinct type so call sites can't
/// confuse the two digests.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestAuthDigest(pub Vec<u8>);

impl Digest for TestAuthDigest {
    fn encode(&self) -> Vec<u8> {
        encode_length_prefixed(&self.0)
    }

    fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        let (raw, consumed) = decode_length_prefixed(bytes)?;
        Ok((TestAuthDigest(raw), consumed))
    }
}

/// A convenience alias for an `Entry` built from the test schemes.
pub type TestEntry = Entry<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest>;

/// A deliberately permissive authorisation scheme for tests: any token
/// whose bytes are non-empty authorises any entry. Not suitable for
/// anything but tests and examples.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllAuthScheme;

impl AuthorisationScheme<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest>
    for AllowAllAuthScheme
{
    type Token = Vec<u8>;
    type AuthoriseOpts = ();

    fn is_authorised_write(&self, _entry: &TestEntry, token: &Self::Token) -> bool {
        !token.is_empty()
    }

    fn authorise(&self, _entry: &TestEntry, _opts: &Self::AuthoriseOpts) -> Self::Token {
        vec![1]
    }

    fn token_digest(&self, token: &Self::Token) -> TestAuthDigest {
        TestAuthDigest(token.clone())
    }
}
