//! Deterministic 64-bit hashing of attribute values.
//!
//! The hash produced here seeds the reproducible node selection in
//! [`crate::routing::plan`], and peer clients in other languages derive the
//! same seed for the same partition-key value. That makes this a bit-level
//! compatibility contract: the encoding rules and the mixing function must
//! never change, and the documented collisions below are part of the
//! contract rather than defects.
//!
//! # Encoding rules
//!
//! Each value reduces to a byte sequence, then the whole sequence is mixed:
//!
//! - `S` → UTF-8 bytes, `N` → decimal text bytes, `B` → raw bytes
//! - `Bool` → one byte (1/0), `Null` → one tag byte (0)
//! - sets → element encodings sorted byte-wise, then concatenated
//! - lists → child encodings concatenated in order
//! - maps → entries sorted by key bytes, each entry as key bytes + value
//!
//! # Known collisions (contract, do not "fix")
//!
//! - Different declared types with equal byte encodings collide:
//!   `S("12345")` and `N(12345)` hash identically.
//! - Child encodings carry no length framing, so `L[S("a"), S("bc")]` and
//!   `L[S("ab"), S("c")]` collide (both reduce to `"abc"`).
//! - Every empty collection, the empty string, and an absent value hash to 0.

use bytes::{BufMut, BytesMut};

use crate::value::AttrValue;

/// Encoding tag for `Null`.
const NULL_TAG: u8 = 0;

/// Hash an attribute value to a signed 64-bit routing seed.
///
/// Pure and total: never fails, and `None` hashes to 0. Structurally equal
/// values always produce the same hash, across calls, processes, and
/// implementations.
pub fn hash_attr(value: Option<&AttrValue>) -> i64 {
    match value {
        None => 0,
        Some(v) => {
            let mut buf = BytesMut::new();
            encode_value(v, &mut buf);
            mix64(&buf)
        }
    }
}

/// Append the canonical encoding of `value` to `buf`.
fn encode_value(value: &AttrValue, buf: &mut BytesMut) {
    match value {
        AttrValue::S(s) => buf.put_slice(s.as_bytes()),
        AttrValue::N(n) => buf.put_slice(n.as_str().as_bytes()),
        AttrValue::B(b) => buf.put_slice(b),
        AttrValue::Bool(b) => buf.put_u8(*b as u8),
        AttrValue::Null => buf.put_u8(NULL_TAG),
        AttrValue::Ss(set) => {
            let mut elems: Vec<&[u8]> = set.iter().map(|s| s.as_bytes()).collect();
            elems.sort_unstable();
            for e in elems {
                buf.put_slice(e);
            }
        }
        AttrValue::Ns(set) => {
            let mut elems: Vec<&[u8]> = set.iter().map(|n| n.as_str().as_bytes()).collect();
            elems.sort_unstable();
            for e in elems {
                buf.put_slice(e);
            }
        }
        AttrValue::Bs(set) => {
            let mut elems: Vec<&[u8]> = set.iter().map(|b| b.as_slice()).collect();
            elems.sort_unstable();
            for e in elems {
                buf.put_slice(e);
            }
        }
        AttrValue::L(list) => {
            for v in list {
                encode_value(v, buf);
            }
        }
        AttrValue::M(map) => {
            let mut entries: Vec<(&[u8], &AttrValue)> =
                map.iter().map(|(k, v)| (k.as_bytes(), v)).collect();
            entries.sort_unstable_by_key(|(k, _)| *k);
            for (k, v) in entries {
                buf.put_slice(k);
                encode_value(v, buf);
            }
        }
    }
}

// Murmur3 x64-128 first lane, seed 0 (canonical little-endian reference).
// Only the constants below and the exact operation order make the output
// match peer implementations; treat every line as part of the wire contract.

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

#[inline]
fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut v = 0u64;
    for (i, b) in bytes.iter().take(8).enumerate() {
        v |= (*b as u64) << (8 * i);
    }
    v
}

#[inline]
fn shuffle_k1(mut k1: u64) -> u64 {
    k1 = k1.wrapping_mul(C1);
    k1 = k1.rotate_left(31);
    k1.wrapping_mul(C2)
}

#[inline]
fn shuffle_k2(mut k2: u64) -> u64 {
    k2 = k2.wrapping_mul(C2);
    k2 = k2.rotate_left(33);
    k2.wrapping_mul(C1)
}

#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Mix an encoded byte sequence down to the 64-bit seed.
///
/// The empty sequence mixes to exactly 0, which is where the "empty string,
/// empty collections, and absent values all hash to 0" contract comes from.
fn mix64(data: &[u8]) -> i64 {
    let len = data.len();
    let mut h1: u64 = 0;
    let mut h2: u64 = 0;

    let mut blocks = data.chunks_exact(16);
    for block in &mut blocks {
        let k1 = read_u64_le(&block[..8]);
        let k2 = read_u64_le(&block[8..]);

        h1 ^= shuffle_k1(k1);
        h1 = h1.rotate_left(27).wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

        h2 ^= shuffle_k2(k2);
        h2 = h2.rotate_left(31).wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
    }

    let tail = blocks.remainder();
    if tail.len() > 8 {
        let mut k2 = 0u64;
        for i in (8..tail.len()).rev() {
            k2 ^= (tail[i] as u64) << (8 * (i - 8));
        }
        h2 ^= shuffle_k2(k2);
    }
    if !tail.is_empty() {
        let mut k1 = 0u64;
        for i in (0..tail.len().min(8)).rev() {
            k1 ^= (tail[i] as u64) << (8 * i);
        }
        h1 ^= shuffle_k1(k1);
    }

    h1 ^= len as u64;
    h2 ^= len as u64;
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    h1 = fmix64(h1);
    h2 = fmix64(h2);
    h1.wrapping_add(h2) as i64
}
