//! Shared chain state
//!
//! `ChainStore` owns the record sequence behind a single mutex. Every read
//! hands out a copy; every mutation goes through `try_append`/`append` or
//! `replace_if_longer`. The lock is only held for the copy, the revalidation
//! and the push, never across I/O.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::record::ChainRecord;
use super::ChainError;

/// Cloneable handle to the in-memory chain
#[derive(Clone, Default)]
pub struct ChainStore {
    records: Arc<Mutex<Vec<ChainRecord>>>,
}

impl ChainStore {
    /// Create an empty store. Install genesis before handing it to producers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `genesis`
    pub fn with_genesis(genesis: ChainRecord) -> Self {
        Self {
            records: Arc::new(Mutex::new(vec![genesis])),
        }
    }

    /// Install the genesis record into an empty store
    pub async fn install_genesis(&self, genesis: ChainRecord) -> Result<(), ChainError> {
        let mut records = self.records.lock().await;
        if !records.is_empty() {
            return Err(ChainError::GenesisAlreadyInstalled);
        }
        if !genesis.is_genesis() {
            return Err(ChainError::InvalidGenesis);
        }

        info!(hash = %genesis.hash, timestamp = %genesis.timestamp, "Genesis record installed");
        records.push(genesis);
        Ok(())
    }

    /// Point-in-time copy of the full chain
    pub async fn snapshot(&self) -> Vec<ChainRecord> {
        self.records.lock().await.clone()
    }

    /// Copy of the most recently committed record
    pub async fn tail(&self) -> Result<ChainRecord, ChainError> {
        self.records
            .lock()
            .await
            .last()
            .cloned()
            .ok_or(ChainError::EmptyChain)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Append `candidate` if it is a valid successor of the tail as seen
    /// under the lock. Returns whether it was committed.
    pub async fn try_append(&self, candidate: ChainRecord) -> bool {
        self.append(candidate).await.is_ok()
    }

    /// Same critical section as `try_append`, reporting why a candidate was
    /// discarded.
    pub async fn append(&self, candidate: ChainRecord) -> Result<ChainRecord, ChainError> {
        let mut records = self.records.lock().await;

        // Revalidate against the tail as it is now, not as the caller saw it.
        let tail = records.last().ok_or(ChainError::EmptyChain)?;
        if let Err(e) = candidate.validate_against(tail) {
            warn!(
                index = candidate.index,
                tail_index = tail.index,
                reason = %e,
                "Discarded candidate record"
            );
            return Err(ChainError::Rejected(e));
        }

        records.push(candidate.clone());
        debug!(length = records.len(), "Chain extended");
        Ok(candidate)
    }

    /// Replace the whole chain when `candidate` is strictly longer.
    ///
    /// The candidate is not validated here; callers hand in chains they have
    /// already checked. The service itself has no caller: local writes commit
    /// through `try_append`/`append`, and there is no peer chain to adopt.
    pub async fn replace_if_longer(&self, candidate: Vec<ChainRecord>) -> bool {
        let mut records = self.records.lock().await;
        if candidate.len() <= records.len() {
            debug!(
                current = records.len(),
                candidate = candidate.len(),
                "Replacement chain not longer, keeping current"
            );
            return false;
        }

        info!(from = records.len(), to = candidate.len(), "Chain replaced");
        *records = candidate;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{verify_chain, ValidationError};

    const TS: &str = "2024-05-01T12:00:00.000000000Z";

    fn seeded() -> (ChainStore, ChainRecord) {
        let genesis = ChainRecord::genesis_at(TS);
        (ChainStore::with_genesis(genesis.clone()), genesis)
    }

    #[tokio::test]
    async fn test_empty_store_has_no_tail() {
        let store = ChainStore::new();
        assert!(store.is_empty().await);
        assert!(matches!(store.tail().await, Err(ChainError::EmptyChain)));
        assert!(!store.try_append(ChainRecord::genesis_at(TS)).await);
    }

    #[tokio::test]
    async fn test_install_genesis_once() {
        let store = ChainStore::new();
        store.install_genesis(ChainRecord::genesis_at(TS)).await.unwrap();

        let again = store.install_genesis(ChainRecord::genesis_at(TS)).await;
        assert!(matches!(again, Err(ChainError::GenesisAlreadyInstalled)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_install_genesis_rejects_non_genesis() {
        let store = ChainStore::new();
        let genesis = ChainRecord::genesis_at(TS);
        let not_genesis = genesis.successor_at(70, TS);

        let result = store.install_genesis(not_genesis).await;
        assert!(matches!(result, Err(ChainError::InvalidGenesis)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_append_valid_successor() {
        let (store, genesis) = seeded();
        let next = genesis.successor_at(75, TS);

        assert!(store.try_append(next.clone()).await);
        assert_eq!(store.tail().await.unwrap(), next);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_stale_candidate_is_discarded() {
        let (store, genesis) = seeded();
        let first = genesis.successor_at(70, "2024-05-01T12:00:01Z");
        let second = genesis.successor_at(71, "2024-05-01T12:00:02Z");

        assert!(store.try_append(first).await);
        let result = store.append(second).await;

        assert!(matches!(
            result,
            Err(ChainError::Rejected(ValidationError::IndexGap { expected: 2, actual: 1 }))
        ));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let (store, genesis) = seeded();
        let mut snapshot = store.snapshot().await;
        snapshot.push(genesis.successor_at(80, TS));

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_replace_if_longer() {
        let (store, genesis) = seeded();
        let one = genesis.successor_at(70, TS);
        let two = one.successor_at(71, TS);

        assert!(!store.replace_if_longer(vec![genesis.clone()]).await);
        assert!(!store.replace_if_longer(Vec::new()).await);
        assert_eq!(store.snapshot().await, vec![genesis.clone()]);

        let longer = vec![genesis, one, two];
        assert!(store.replace_if_longer(longer.clone()).await);
        assert_eq!(store.snapshot().await, longer);
        assert!(verify_chain(&store.snapshot().await).is_ok());
    }
}
