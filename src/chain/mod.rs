//! Chain integrity engine
//!
//! Handles:
//! - Record fingerprints (SHA-256 over index, timestamp, measurement, predecessor)
//! - Successor validation against a predecessor
//! - Shared, mutex-guarded chain state with append-if-valid and
//!   replace-if-longer

pub mod hash;
pub mod record;
pub mod store;

// Re-exports
pub use hash::fingerprint;
pub use record::{is_valid, ChainRecord};
pub use store::ChainStore;

/// Why a candidate record cannot follow its predecessor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Index gap: expected {expected}, got {actual}")]
    IndexGap { expected: u64, actual: u64 },

    #[error("Record {index} links to {actual:?}, predecessor hash is {expected:?}")]
    PredecessorMismatch {
        index: u64,
        expected: String,
        actual: String,
    },

    #[error("Record {index} hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },

    #[error("First record is not a valid genesis record")]
    InvalidGenesis,
}

/// Chain store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Chain is empty, genesis has not been installed")]
    EmptyChain,

    #[error("Genesis record already installed")]
    GenesisAlreadyInstalled,

    #[error("Record is not a valid genesis record")]
    InvalidGenesis,

    #[error("Candidate rejected: {0}")]
    Rejected(#[from] ValidationError),
}

/// Validate a whole sequence: genesis shape plus every adjacent pair.
///
/// An empty sequence is valid.
pub fn verify_chain(records: &[ChainRecord]) -> Result<(), ValidationError> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    if !first.is_genesis() {
        return Err(ValidationError::InvalidGenesis);
    }

    for pair in records.windows(2) {
        pair[1].validate_against(&pair[0])?;
    }
    Ok(())
}
