//! Chain record model and its validity rules

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::hash::fingerprint;
use super::ValidationError;

/// One entry in the chain.
///
/// Serialized with the field names existing clients of the service read:
/// `Index`, `Timestamp`, `BPM`, `Hash`, `PrevHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    /// Position in the chain, genesis is 0
    #[serde(rename = "Index")]
    pub index: u64,

    /// Creation time (RFC 3339, UTC), assigned once
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// Measurement payload (heart-rate sample)
    #[serde(rename = "BPM")]
    pub measurement: i64,

    /// Fingerprint of this record's fields and linkage
    #[serde(rename = "Hash")]
    pub hash: String,

    /// Hash of the preceding record, empty for genesis
    #[serde(rename = "PrevHash")]
    pub predecessor_hash: String,
}

/// Current time in the format stored on records
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl ChainRecord {
    /// Build the genesis record stamped with the current time
    pub fn genesis() -> Self {
        Self::genesis_at(now_timestamp())
    }

    /// Build the genesis record with an explicit timestamp
    pub fn genesis_at(timestamp: impl Into<String>) -> Self {
        Self::sealed(0, timestamp.into(), 0, String::new())
    }

    /// Build the candidate that follows `self`, stamped with the current time
    pub fn successor(&self, measurement: i64) -> Self {
        self.successor_at(measurement, now_timestamp())
    }

    /// Build the candidate that follows `self` with an explicit timestamp
    pub fn successor_at(&self, measurement: i64, timestamp: impl Into<String>) -> Self {
        Self::sealed(self.index + 1, timestamp.into(), measurement, self.hash.clone())
    }

    fn sealed(index: u64, timestamp: String, measurement: i64, predecessor_hash: String) -> Self {
        let hash = fingerprint(index, &timestamp, measurement, &predecessor_hash);
        Self {
            index,
            timestamp,
            measurement,
            hash,
            predecessor_hash,
        }
    }

    /// Recompute the fingerprint from the stored fields
    pub fn compute_hash(&self) -> String {
        fingerprint(self.index, &self.timestamp, self.measurement, &self.predecessor_hash)
    }

    /// Whether this record has the shape of a genesis record
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.predecessor_hash.is_empty() && self.compute_hash() == self.hash
    }

    /// Check this record against the record it claims to follow.
    ///
    /// All three rules are evaluated; the first failing one is reported.
    pub fn validate_against(&self, predecessor: &ChainRecord) -> Result<(), ValidationError> {
        let index_ok = predecessor.index.checked_add(1) == Some(self.index);
        let link_ok = self.predecessor_hash == predecessor.hash;
        let computed = self.compute_hash();
        let hash_ok = computed == self.hash;

        if !index_ok {
            return Err(ValidationError::IndexGap {
                expected: predecessor.index.saturating_add(1),
                actual: self.index,
            });
        }
        if !link_ok {
            return Err(ValidationError::PredecessorMismatch {
                index: self.index,
                expected: predecessor.hash.clone(),
                actual: self.predecessor_hash.clone(),
            });
        }
        if !hash_ok {
            return Err(ValidationError::HashMismatch {
                index: self.index,
                stored: self.hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn is_valid_successor_of(&self, predecessor: &ChainRecord) -> bool {
        self.validate_against(predecessor).is_ok()
    }
}

/// Whether `candidate` may be appended after `predecessor`
pub fn is_valid(candidate: &ChainRecord, predecessor: &ChainRecord) -> bool {
    candidate.is_valid_successor_of(predecessor)
}
