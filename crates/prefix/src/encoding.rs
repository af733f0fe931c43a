//! Order-preserving flat byte encoding for `Path` (§4.7): a zero within a
//! component becomes `0x00 0x02`; a component boundary becomes `0x00 0x01`.
//! Plain byte comparison of the result equals `Path`'s own ordering, which
//! is what lets [`crate::scan::ScanPrefixIndex`] use it directly as a
//! backend key.

use willow_core::{Error, Path, Result};

const ESCAPED_ZERO: u8 = 0x02;
const COMPONENT_BOUNDARY: u8 = 0x01;

/// Flatten `path` into an order-preserving, self-delimiting byte string.
pub fn encode_path_component(path: &Path) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, component) in path.components().iter().enumerate() {
        if i > 0 {
            out.push(0x00);
            out.push(COMPONENT_BOUNDARY);
        }
        for &b in component {
            if b == 0x00 {
                out.push(0x00);
                out.push(ESCAPED_ZERO);
            } else {
                out.push(b);
            }
        }
    }
    out
}

/// Recover the `Path` previously produced by [`encode_path_component`].
///
/// The empty path and a path holding a single empty component both encode
/// to zero bytes; this decodes that case back to the empty path, which is
/// the only ambiguity in the scheme.
pub fn decode_path_component(bytes: &[u8]) -> Result<Path> {
    if bytes.is_empty() {
        return Ok(Path::empty());
    }
    let mut components = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0x00 {
            let marker = *bytes.get(i + 1).ok_or_else(|| {
                Error::Codec("truncated path encoding: dangling escape byte".into())
            })?;
            match marker {
                COMPONENT_BOUNDARY => {
                    components.push(std::mem::take(&mut current));
                }
                ESCAPED_ZERO => current.push(0x00),
                other => {
                    return Err(Error::Codec(format!(
                        "invalid path escape marker byte {other:#04x}"
                    )))
                }
            }
            i += 2;
        } else {
            current.push(bytes[i]);
            i += 1;
        }
    }
    components.push(current);
    Ok(Path::new(components))
}

/// The smallest byte string that is not itself prefixed by `bytes` but
/// sorts immediately above every string that is; `None` if no such string
/// exists (every byte is `0xFF`).
pub fn increment_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut out = bytes.to_vec();
    while let Some(&last) = out.last() {
        if last < 0xFF {
            *out.last_mut().unwrap() += 1;
            return Some(out);
        }
        out.pop();
    }
    None
}
