//! pulse-chain: in-memory hash-linked measurement chain
//!
//! - `chain`: fingerprints, record validity and the shared chain store
//! - `generator`: periodic synthesis of new records
//! - `api`: HTTP read, write and live-stream endpoints
//! - `config`: TOML + environment configuration

pub mod api;
pub mod chain;
pub mod config;
pub mod generator;
