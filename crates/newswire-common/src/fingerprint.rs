//! Stable fingerprints for logical queries
//!
//! A fingerprint identifies a query for caching and incremental bookkeeping.
//! It is computed over the *sorted* (key, value) pairs of the query
//! parameters, so two semantically identical queries produce the same
//! fingerprint regardless of how their fields were assembled.

use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA-256 fingerprint of a parameter set.
///
/// Keys are sorted before hashing; pair boundaries are delimited so that
/// adjacent keys and values cannot alias each other.
pub fn fingerprint(pairs: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = pairs.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let mut hasher = Sha256::new();
    for (key, value) in sorted {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\x1f");
    }

    hex::encode(hasher.finalize())
}
