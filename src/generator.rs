//! Background record generator
//!
//! On every tick, draws a measurement from the configured range, builds the
//! successor of the current tail and submits it to the store. A tick that
//! loses a race to a concurrent writer is abandoned; the next tick starts
//! over from the new tail.

use rand::Rng;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::chain::{ChainError, ChainRecord, ChainStore};
use crate::config::GeneratorConfig;

pub struct Generator {
    store: ChainStore,
    config: GeneratorConfig,
    shutdown_tx: watch::Sender<bool>,
}

impl Generator {
    pub fn new(store: ChainStore, config: GeneratorConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            config,
            shutdown_tx,
        }
    }

    /// Signal the run loop to stop. Sticky: a `run` started afterwards
    /// returns immediately.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Run until `shutdown` is called
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow_and_update() {
            info!("Generator shut down before start");
            return;
        }

        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the first record is due one
        // interval after start.
        ticker.tick().await;

        info!(
            interval_ms = self.config.interval_ms,
            min = self.config.min_measurement,
            max = self.config.max_measurement,
            "Generator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown_rx.changed() => {}
            }

            if *shutdown_rx.borrow_and_update() {
                info!("Generator shutting down");
                break;
            }
        }
    }

    /// One generation step. Returns the committed record, if any.
    pub async fn tick(&self) -> Option<ChainRecord> {
        let measurement = self.sample();

        let tail = match self.store.tail().await {
            Ok(tail) => tail,
            Err(ChainError::EmptyChain) => {
                debug!("Chain empty, skipping tick");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read tail");
                return None;
            }
        };

        let candidate = tail.successor(measurement);
        match self.store.append(candidate).await {
            Ok(record) => {
                info!(
                    index = record.index,
                    bpm = record.measurement,
                    hash = %record.hash,
                    "New record generated"
                );
                Some(record)
            }
            Err(e) => {
                warn!(error = %e, "Generated record not committed");
                None
            }
        }
    }

    fn sample(&self) -> i64 {
        rand::thread_rng().gen_range(self.config.min_measurement..=self.config.max_measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::verify_chain;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(interval_ms: u64) -> GeneratorConfig {
        GeneratorConfig {
            enabled: true,
            interval_ms,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tick_appends_in_range() {
        let store = ChainStore::with_genesis(ChainRecord::genesis());
        let generator = Generator::new(store.clone(), config(2000));

        for expected_index in 1..=20 {
            let record = generator.tick().await.expect("tick should commit");
            assert_eq!(record.index, expected_index);
            assert!((60..=100).contains(&record.measurement));
        }

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 21);
        assert!(verify_chain(&snapshot).is_ok());
    }

    #[tokio::test]
    async fn test_tick_on_empty_store_is_skipped() {
        let store = ChainStore::new();
        let generator = Generator::new(store.clone(), config(2000));

        assert!(generator.tick().await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_fixed_range() {
        let store = ChainStore::with_genesis(ChainRecord::genesis());
        let generator = Generator::new(
            store,
            GeneratorConfig {
                min_measurement: 72,
                max_measurement: 72,
                ..config(2000)
            },
        );

        assert_eq!(generator.tick().await.unwrap().measurement, 72);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = ChainStore::with_genesis(ChainRecord::genesis());
        let generator = Arc::new(Generator::new(store.clone(), config(10)));

        let handle = {
            let generator = generator.clone();
            tokio::spawn(async move { generator.run().await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        generator.shutdown();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("generator should stop")
            .unwrap();

        let length = store.len().await;
        assert!(length > 1, "generator should have produced records");
        assert!(verify_chain(&store.snapshot().await).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_honored() {
        let store = ChainStore::with_genesis(ChainRecord::genesis());
        let generator = Generator::new(store.clone(), config(10));

        generator.shutdown();
        assert!(generator.is_shut_down());

        tokio::time::timeout(Duration::from_millis(500), generator.run())
            .await
            .expect("run should return when shutdown was already requested");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_during_first_interval() {
        let store = ChainStore::with_genesis(ChainRecord::genesis());
        let generator = Arc::new(Generator::new(store.clone(), config(60_000)));

        let handle = {
            let generator = generator.clone();
            tokio::spawn(async move { generator.run().await })
        };
        generator.shutdown();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("generator should stop without waiting for a tick")
            .unwrap();
        assert_eq!(store.len().await, 1);
    }
}
