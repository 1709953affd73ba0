//! Record fingerprints
//!
//! SHA-256 over the record fields in a fixed order: index, timestamp,
//! measurement, predecessor hash. Integers are rendered as base-10 ASCII and
//! every field is terminated by `\n`, so `(1, "23")` and `(12, "3")` never
//! produce the same preimage.

use sha2::{Digest, Sha256};

/// Field terminator inside the digest preimage
const FIELD_TERMINATOR: &[u8] = b"\n";

/// Compute the lowercase hex fingerprint of a record's fields
pub fn fingerprint(index: u64, timestamp: &str, measurement: i64, predecessor_hash: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(index.to_string().as_bytes());
    hasher.update(FIELD_TERMINATOR);
    hasher.update(timestamp.as_bytes());
    hasher.update(FIELD_TERMINATOR);
    hasher.update(measurement.to_string().as_bytes());
    hasher.update(FIELD_TERMINATOR);
    hasher.update(predecessor_hash.as_bytes());
    hasher.update(FIELD_TERMINATOR);

    format!("{:x}", hasher.finalize())
}
