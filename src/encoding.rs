//! Deterministic byte encoding and cache-key derivation.
//!
//! `to_bytes` produces an order-normalized encoding of a value, used only for
//! key derivation. Sequences keep their order; maps and sets are sorted so
//! that value-equal collections encode identically regardless of how they
//! were built. Persistence of results uses serde_json separately and is not
//! affected by anything in this module.

use crate::callable::{Args, CallSite};
use crate::error::{EndowError, RuntimeResult};
use crate::values::Value;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Arrays longer than this are encoded from a subsample instead of their
/// full payload, bounding the hashing cost on huge inputs.
pub const ARRAY_SUBSAMPLE_LEN: usize = 1000;

/// Fixed seed so the subsample is the same in every process and on every
/// call; the encoding must be a pure function of the value.
const ARRAY_SUBSAMPLE_SEED: u64 = 0x5eed;

/// Recursively encode a value into deterministic bytes.
pub fn to_bytes(value: &Value) -> RuntimeResult<Vec<u8>> {
    match value {
        Value::Boolean(b) => Ok(b.to_string().into_bytes()),
        Value::Integer(i) => Ok(i.to_string().into_bytes()),
        Value::Float(f) => Ok(f.to_string().into_bytes()),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Bytes(b) => Ok(b.clone()),
        Value::Vector(items) => {
            let parts = items.iter().map(to_bytes).collect::<RuntimeResult<Vec<_>>>()?;
            Ok(join_encoded(b'[', b']', &parts))
        }
        Value::Map(entries) => {
            // BTreeMap iterates sorted by key, which is exactly the
            // normalization the encoding requires.
            let mut parts = Vec::with_capacity(entries.len());
            for (key, val) in entries {
                let mut pair = key.as_bytes().to_vec();
                pair.push(b':');
                pair.extend_from_slice(&to_bytes(val)?);
                parts.push(pair);
            }
            Ok(join_encoded(b'{', b'}', &parts))
        }
        Value::Set(items) => {
            let mut parts = items.iter().map(to_bytes).collect::<RuntimeResult<Vec<_>>>()?;
            // Elements are sorted after encoding, so insertion order is
            // never observable in the key.
            parts.sort();
            Ok(join_encoded(b'{', b'}', &parts))
        }
        Value::NumericArray(xs) => Ok(numeric_array_bytes(xs)),
        // Everything without a textual form goes through the generic binary
        // codec under its fixed default protocol.
        Value::Nil => bincode::serialize(value).map_err(|e| EndowError::Encoding(e.to_string())),
    }
}

/// Encode the full argument set of a call: positional values in order plus
/// the named mapping, combined under stable labels.
pub fn args_to_bytes(args: &Args) -> RuntimeResult<Vec<u8>> {
    let combined = Value::map([
        ("args", Value::Vector(args.positional.clone())),
        ("kwargs", Value::Map(args.named.clone())),
    ]);
    to_bytes(&combined)
}

fn join_encoded(open: u8, close: u8, parts: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![open];
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(part);
    }
    out.push(close);
    out
}

/// Flattened little-endian bytes of a numeric array; arrays beyond
/// [`ARRAY_SUBSAMPLE_LEN`] contribute a fixed-seed pseudo-random subsample
/// instead. A vanishing collision risk is traded for bounded hashing cost.
fn numeric_array_bytes(xs: &[f64]) -> Vec<u8> {
    if xs.len() <= ARRAY_SUBSAMPLE_LEN {
        let mut out = Vec::with_capacity(xs.len() * 8);
        for x in xs {
            out.extend_from_slice(&x.to_le_bytes());
        }
        return out;
    }

    let mut rng = StdRng::seed_from_u64(ARRAY_SUBSAMPLE_SEED);
    let mut out = Vec::with_capacity(ARRAY_SUBSAMPLE_LEN * 8);
    for _ in 0..ARRAY_SUBSAMPLE_LEN {
        let index = rng.gen_range(0..xs.len());
        out.extend_from_slice(&xs[index].to_le_bytes());
    }
    out
}

/// Cache key generation utilities.
pub mod keygen {
    use super::*;
    use sha2::{Digest, Sha256};

    /// Hex characters kept from each digest segment.
    pub const SEGMENT_HEX_LEN: usize = 6;

    /// SHA-256 digest truncated to [`SEGMENT_HEX_LEN`] hex chars.
    pub fn short_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = format!("{:x}", hasher.finalize());
        digest[..SEGMENT_HEX_LEN].to_string()
    }

    /// Derive a cache key from the caller's file, the callable identity and
    /// the encoded argument set.
    ///
    /// The three segments are truncated independently and concatenated, not
    /// re-hashed together: each segment can be matched back to its source
    /// (site, callable, arguments) when inspecting a cache directory. The
    /// price is a shorter effective digest per component, so keys are more
    /// collision-prone than a single full-width hash would be.
    pub fn derive_key(site: &CallSite, identity: &str, args: &Args) -> RuntimeResult<String> {
        let args_bytes = args_to_bytes(args)?;
        Ok(format!(
            "{}{}{}",
            short_hash(site.absolute_file().as_bytes()),
            short_hash(identity.as_bytes()),
            short_hash(&args_bytes),
        ))
    }
}
