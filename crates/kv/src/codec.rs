//! Order-preserving key codec (§4.2): turns a `TupleKey` into a byte string
//! such that lexicographic byte comparison agrees with the tuple's logical
//! order, and back.
//!
//! Every `encode_key` call builds its output into a local `Vec<u8>` — never
//! a module-level buffer — so concurrent callers never contend on a shared
//! accumulator.

use willow_core::{Error, KeyPart, Result, TupleKey};

const TAG_NULL: u8 = 0x00;
const TAG_BYTES: u8 = 0x01;
const TAG_TEXT: u8 = 0x02;
const TAG_NEG_BASE: u8 = 0x0B; // tag = TAG_NEG_BASE + (9 - byte_len), byte_len in 1..=9
const TAG_ZERO: u8 = 0x14;
const TAG_POS_BASE: u8 = 0x15; // tag = TAG_POS_BASE + (byte_len - 1), byte_len in 1..=9
const TAG_DOUBLE: u8 = 0x21;
const TAG_FALSE: u8 = 0x26;
const TAG_TRUE: u8 = 0x27;

/// The largest magnitude byte length this codec's tag space can address.
/// `KeyPart::Int` is `i128`, but the encoding table (§4.2) reserves only
/// nine tags per side of zero; magnitudes needing more than nine bytes
/// (outside roughly +/-2^72) are rejected rather than silently truncated.
const MAX_INT_BYTE_LEN: usize = 9;

/// Encode a full tuple key into its order-preserving byte representation.
pub fn encode_key(key: &TupleKey) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for part in key {
        encode_part(part, &mut out)?;
    }
    Ok(out)
}

/// Decode a byte string produced by [`encode_key`] back into a tuple key.
pub fn decode_key(mut bytes: &[u8]) -> Result<TupleKey> {
    let mut parts = Vec::new();
    while !bytes.is_empty() {
        let (part, consumed) = decode_part(bytes)?;
        parts.push(part);
        bytes = &bytes[consumed..];
    }
    Ok(parts)
}

fn encode_part(part: &KeyPart, out: &mut Vec<u8>) -> Result<()> {
    match part {
        KeyPart::Null => out.push(TAG_NULL),
        KeyPart::Bytes(b) => encode_escaped(TAG_BYTES, b, out),
        KeyPart::Text(s) => encode_escaped(TAG_TEXT, s.as_bytes(), out),
        KeyPart::Int(n) => encode_int(*n, out)?,
        KeyPart::Double(d) => encode_double(*d, out),
        KeyPart::Bool(b) => out.push(if *b { TAG_TRUE } else { TAG_FALSE }),
    }
    Ok(())
}

fn decode_part(bytes: &[u8]) -> Result<(KeyPart, usize)> {
    let tag = *bytes
        .first()
        .ok_or_else(|| Error::Codec("empty key part".into()))?;
    match tag {
        TAG_NULL => Ok((KeyPart::Null, 1)),
        TAG_BYTES => {
            let (raw, consumed) = decode_escaped(&bytes[1..])?;
            Ok((KeyPart::Bytes(raw), 1 + consumed))
        }
        TAG_TEXT => {
            let (raw, consumed) = decode_escaped(&bytes[1..])?;
            let text = String::from_utf8(raw)
                .map_err(|e| Error::Codec(format!("invalid utf-8 in text key part: {e}")))?;
            Ok((KeyPart::Text(text), 1 + consumed))
        }
        TAG_ZERO => Ok((KeyPart::Int(0), 1)),
        TAG_DOUBLE => {
            if bytes.len() < 9 {
                return Err(Error::Codec("truncated double key part".into()));
            }
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[1..9]);
            Ok((KeyPart::Double(decode_double(buf)), 9))
        }
        TAG_FALSE => Ok((KeyPart::Bool(false), 1)),
        TAG_TRUE => Ok((KeyPart::Bool(true), 1)),
        t if (TAG_NEG_BASE..TAG_ZERO).contains(&t) => decode_negative(t, bytes),
        t if (TAG_POS_BASE..=TAG_POS_BASE + (MAX_INT_BYTE_LEN as u8 - 1)).contains(&t) => {
            decode_positive(t, bytes)
        }
        other => Err(Error::Codec(format!("unknown key part tag 0x{other:02x}"))),
    }
}

fn encode_escaped(tag: u8, raw: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    for &b in raw {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xFF);
        } else {
            out.push(b);
        }
    }
    out.push(0x00);
}

/// Decodes an escaped, zero-terminated run starting just past the tag byte.
/// Returns the unescaped bytes and the number of input bytes consumed
/// (including the terminator).
fn decode_escaped(bytes: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        match bytes.get(i) {
            None => return Err(Error::Codec("unterminated escaped key part".into())),
            Some(0x00) => match bytes.get(i + 1) {
                Some(0xFF) => {
                    out.push(0x00);
                    i += 2;
                }
                _ => return Ok((out, i + 1)),
            },
            Some(&b) => {
                out.push(b);
                i += 1;
            }
        }
    }
}

fn magnitude_byte_len(mut magnitude: u128) -> usize {
    if magnitude == 0 {
        return 1;
    }
    let mut len = 0;
    while magnitude > 0 {
        len += 1;
        magnitude >>= 8;
    }
    len
}

fn magnitude_to_be_bytes(magnitude: u128, byte_len: usize) -> Vec<u8> {
    let full = magnitude.to_be_bytes();
    full[full.len() - byte_len..].to_vec()
}

fn encode_int(n: i128, out: &mut Vec<u8>) -> Result<()> {
    if n == 0 {
        out.push(TAG_ZERO);
        return Ok(());
    }
    if n > 0 {
        let magnitude = n as u128;
        let byte_len = magnitude_byte_len(magnitude);
        if byte_len > MAX_INT_BYTE_LEN {
            return Err(Error::Codec(format!(
                "integer {n} exceeds codec's {MAX_INT_BYTE_LEN}-byte magnitude limit"
            )));
        }
        out.push(TAG_POS_BASE + (byte_len as u8 - 1));
        out.extend(magnitude_to_be_bytes(magnitude, byte_len));
    } else {
        // `i128::MIN.unsigned_abs()` is the one magnitude that doesn't fit
        // in a plain negation; `unsigned_abs` handles it correctly.
        let magnitude = n.unsigned_abs();
        let byte_len = magnitude_byte_len(magnitude);
        if byte_len > MAX_INT_BYTE_LEN {
            return Err(Error::Codec(format!(
                "integer {n} exceeds codec's {MAX_INT_BYTE_LEN}-byte magnitude limit"
            )));
        }
        // Larger magnitude (more negative) must sort first, so the tag
        // decreases as byte_len grows.
        out.push(TAG_ZERO - byte_len as u8);
        let raw = magnitude_to_be_bytes(magnitude, byte_len);
        out.extend(raw.into_iter().map(|b| !b));
    }
    Ok(())
}

fn decode_positive(tag: u8, bytes: &[u8]) -> Result<(KeyPart, usize)> {
    let byte_len = (tag - TAG_POS_BASE + 1) as usize;
    if bytes.len() < 1 + byte_len {
        return Err(Error::Codec("truncated positive integer key part".into()));
    }
    let mut magnitude: u128 = 0;
    for &b in &bytes[1..1 + byte_len] {
        magnitude = (magnitude << 8) | b as u128;
    }
    Ok((KeyPart::Int(magnitude as i128), 1 + byte_len))
}

fn decode_negative(tag: u8, bytes: &[u8]) -> Result<(KeyPart, usize)> {
    let byte_len = (TAG_ZERO - tag) as usize;
    if bytes.len() < 1 + byte_len {
        return Err(Error::Codec("truncated negative integer key part".into()));
    }
    let mut magnitude: u128 = 0;
    for &b in &bytes[1..1 + byte_len] {
        magnitude = (magnitude << 8) | (!b) as u128;
    }
    Ok((KeyPart::Int(-(magnitude as i128)), 1 + byte_len))
}

fn encode_double(d: f64, out: &mut Vec<u8>) {
    out.push(TAG_DOUBLE);
    let bits = d.to_bits();
    let mapped = if bits & (1u64 << 63) != 0 {
        !bits
    } else {
        bits | (1u64 << 63)
    };
    out.extend_from_slice(&mapped.to_be_bytes());
}

fn decode_double(bytes: [u8; 8]) -> f64 {
    let mapped = u64::from_be_bytes(bytes);
    let bits = if mapped & (1u64 << 63) != 0 {
        mapped & !(1u64 << 63)
    } else {
        !mapped
    };
    f64::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(key: TupleKey) {
        let encoded = encode_key(&key).unwrap();
        let decoded = decode_key(&encoded).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn round_trips_every_variant() {
        round_trip(vec![
            KeyPart::Null,
            KeyPart::bytes(vec![1, 0, 2]),
            KeyPart::text("hello\0world"),
            KeyPart::Int(-12345),
            KeyPart::Int(0),
            KeyPart::Int(999_999),
            KeyPart::Double(-3.25),
            KeyPart::Bool(true),
            KeyPart::Bool(false),
        ]);
    }

    #[test]
    fn nan_round_trips_to_a_nan() {
        let key = vec![KeyPart::Double(f64::NAN)];
        let encoded = encode_key(&key).unwrap();
        let decoded = decode_key(&encoded).unwrap();
        match &decoded[0] {
            KeyPart::Double(d) => assert!(d.is_nan()),
            _ => panic!("expected a double"),
        }
    }

    #[test]
    fn byte_order_matches_logical_order_for_integers() {
        // Ascending by construction; the encoded bytes must sort the same way.
        let values = [
            -(1i128 << 70),
            -1_000_000,
            -1,
            0,
            1,
            1_000_000,
            1i128 << 70,
        ];
        let encoded: Vec<Vec<u8>> = values
            .iter()
            .map(|&v| encode_key(&vec![KeyPart::Int(v)]).unwrap())
            .collect();
        let mut sorted_by_bytes = encoded.clone();
        sorted_by_bytes.sort();
        assert_eq!(encoded, sorted_by_bytes);
    }

    #[test]
    fn byte_order_matches_logical_order_for_doubles() {
        let values = [-1e300, -1.5, -0.0, 0.0, 1.5, 1e300];
        let mut pairs: Vec<(f64, Vec<u8>)> = values
            .iter()
            .map(|&v| (v, encode_key(&vec![KeyPart::Double(v)]).unwrap()))
            .collect();
        let mut by_value = pairs.clone();
        by_value.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        pairs.sort_by(|a, b| a.1.cmp(&b.1));
        let order_by_value: Vec<f64> = by_value.iter().map(|(v, _)| *v).collect();
        let order_by_bytes: Vec<f64> = pairs.iter().map(|(v, _)| *v).collect();
        assert_eq!(order_by_value, order_by_bytes);
    }

    #[test]
    fn byte_string_escaping_preserves_order() {
        let a = encode_key(&vec![KeyPart::bytes(vec![1])]).unwrap();
        let b = encode_key(&vec![KeyPart::bytes(vec![1, 0])]).unwrap();
        let c = encode_key(&vec![KeyPart::bytes(vec![1, 1])]).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn null_sorts_before_every_other_tag() {
        let null = encode_key(&vec![KeyPart::Null]).unwrap();
        let bytes = encode_key(&vec![KeyPart::bytes(vec![])]).unwrap();
        let int = encode_key(&vec![KeyPart::Int(i128::MIN / 2)]).unwrap();
        assert!(null < bytes);
        assert!(null < int);
    }

    #[test]
    fn integer_exceeding_magnitude_limit_is_rejected() {
        let huge = i128::MAX; // far beyond the 9-byte tag budget
        let err = encode_key(&vec![KeyPart::Int(huge)]).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
