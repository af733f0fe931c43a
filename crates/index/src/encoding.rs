//! The composite SPT/PTS/TSP key encoding (§4.7): each of subspace, path,
//! and timestamp is escaped to be free of the zero byte, then the three
//! escaped dimensions are joined with a `0x00 0x00` separator in whichever
//! order the index in question scans by.

use willow_core::{Error, Path, Result, SubspaceId};
use willow_prefix::{decode_path_component, encode_path_component, increment_bytes};

/// Which of the three index orderings a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Subspace, then path, then timestamp.
    Spt,
    /// Path, then timestamp, then subspace.
    Pts,
    /// Timestamp, then subspace, then path.
    Tsp,
}

fn escape_zero_free(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xFF);
        } else {
            out.push(b);
        }
    }
    out
}

fn join_escaped(dims: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, dim) in dims.iter().enumerate() {
        if i > 0 {
            out.push(0x00);
            out.push(0x00);
        }
        out.extend_from_slice(&escape_zero_free(dim));
    }
    out
}

fn split_escaped(bytes: &[u8], expected: usize) -> Result<Vec<Vec<u8>>> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0x00 {
            match bytes.get(i + 1) {
                Some(0x00) => {
                    parts.push(std::mem::take(&mut current));
                    i += 2;
                }
                Some(0xFF) => {
                    current.push(0x00);
                    i += 2;
                }
                _ => return Err(Error::Codec("malformed index key escape sequence".into())),
            }
        } else {
            current.push(bytes[i]);
            i += 1;
        }
    }
    parts.push(current);
    if parts.len() != expected {
        return Err(Error::Codec(format!(
            "expected {expected} escaped dimensions, found {}",
            parts.len()
        )));
    }
    Ok(parts)
}

/// A prefix on a single dimension that sorts exactly between entries
/// sharing that dimension's value and any entry whose same dimension only
/// shares a raw byte prefix with it (see `encoding.rs` tests).
fn exact_match_prefix(dim_bytes: &[u8]) -> Vec<u8> {
    let mut out = escape_zero_free(dim_bytes);
    out.push(0x00);
    out.push(0x00);
    out
}

/// `[lower, upper)` byte bounds selecting exactly the physical keys whose
/// dimension-0 value equals `dim_bytes`, for orderings where dimension 0
/// is matched by exact equality (the subspace dimension of SPT).
pub fn exact_dimension_bound(dim_bytes: &[u8]) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    let prefix = exact_match_prefix(dim_bytes);
    let upper = increment_bytes(&prefix);
    (Some(prefix), upper)
}

/// `[lower, upper)` byte bounds selecting physical keys whose dimension-0
/// value has `prefix_bytes` as a raw byte prefix, for orderings where
/// dimension 0 is matched by prefix (the path dimension of PTS). Candidates
/// in this coarse range still need verification against the real path
/// relation, since a short unterminated component can share a raw byte
/// prefix with an unrelated longer one.
pub fn prefix_dimension_bound(prefix_bytes: &[u8]) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    let lower = escape_zero_free(prefix_bytes);
    let upper = increment_bytes(&lower);
    (Some(lower), upper)
}

/// `[lower, upper)` byte bounds selecting physical keys whose dimension-0
/// value is a timestamp numerically within `[start, end)` (the timestamp
/// dimension of TSP). `end = None` means unbounded above.
pub fn numeric_dimension_bound(start: u64, end: Option<u64>) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    let lower = escape_zero_free(&start.to_be_bytes());
    let upper = end.map(|e| escape_zero_free(&e.to_be_bytes()));
    (Some(lower), upper)
}

/// Encode the physical key for `order` from the three logical dimensions.
pub fn encode_key<S: SubspaceId>(order: Order, subspace: &S, path: &Path, timestamp: u64) -> Vec<u8> {
    let subspace_bytes = subspace.encode();
    let path_bytes = encode_path_component(path);
    let timestamp_bytes = timestamp.to_be_bytes().to_vec();
    let dims = match order {
        Order::Spt => vec![subspace_bytes, path_bytes, timestamp_bytes],
        Order::Pts => vec![path_bytes, timestamp_bytes, subspace_bytes],
        Order::Tsp => vec![timestamp_bytes, subspace_bytes, path_bytes],
    };
    join_escaped(&dims)
}

/// Decode a physical key previously produced by [`encode_key`] with the
/// same `order`, recovering the logical `(subspace, path, timestamp)`.
pub fn decode_key<S: SubspaceId>(order: Order, bytes: &[u8]) -> Result<(S, Path, u64)> {
    let parts = split_escaped(bytes, 3)?;
    let (subspace_bytes, path_bytes, timestamp_bytes) = match order {
        Order::Spt => (&parts[0], &parts[1], &parts[2]),
        Order::Pts => (&parts[2], &parts[0], &parts[1]),
        Order::Tsp => (&parts[1], &parts[2], &parts[0]),
    };
    let (subspace, _) = S::decode(subspace_bytes)?;
    let path = decode_path_component(path_bytes)?;
    let timestamp_array: [u8; 8] = timestamp_bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::Codec("timestamp dimension is not 8 bytes".into()))?;
    let timestamp = u64::from_be_bytes(timestamp_array);
    Ok((subspace, path, timestamp))
}
