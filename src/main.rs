//! pulse-chain: hash-linked measurement chain over HTTP
//!
//! Keeps an append-only chain of heart-rate records in memory, synthesizes a
//! new record every few seconds and serves the chain over HTTP:
//! - `GET /` full chain, `POST /` append a measurement
//! - `GET /stream` live Server-Sent Events feed
//! - `GET /view` live viewer page

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pulse_chain::api::{create_router, AppState};
use pulse_chain::chain::{ChainRecord, ChainStore};
use pulse_chain::config::Config;
use pulse_chain::generator::Generator;

#[derive(Parser)]
#[command(name = "pulse-chain")]
#[command(about = "Hash-linked measurement chain served over HTTP")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pulse-chain.toml")]
    config: String,

    /// HTTP port (overrides config file)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Generator interval in milliseconds (overrides config file)
    #[arg(long, env = "PULSE_GENERATOR_INTERVAL_MS")]
    generator_interval_ms: Option<u64>,

    /// Disable the background generator
    #[arg(long)]
    no_generator: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pulse_chain=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    info!("Starting pulse-chain");
    info!("Config file: {}", cli.config);

    let mut config = Config::load(&cli.config)?;

    // Apply CLI overrides
    if let Some(port) = cli.port {
        config.api.http_port = Some(port);
    }
    if let Some(interval_ms) = cli.generator_interval_ms {
        config.generator.interval_ms = interval_ms;
    }
    if cli.no_generator {
        config.generator.enabled = false;
    }

    config.validate().context("invalid configuration")?;
    let port = config.http_port()?;

    // Genesis goes in before anything else can touch the store
    let store = ChainStore::new();
    store.install_genesis(ChainRecord::genesis()).await?;

    let generator = Arc::new(Generator::new(store.clone(), config.generator.clone()));
    if config.generator.enabled {
        let generator = generator.clone();
        tokio::spawn(async move { generator.run().await });
    } else {
        info!("Generator is disabled");
    }

    let state = AppState::new(store)
        .with_stream_interval(config.stream.interval())
        .with_static_dir(&config.api.static_dir);
    let app = create_router(state.clone());

    let ip = config
        .api
        .bind_address
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("invalid bind address {}", config.api.bind_address))?;
    let addr = SocketAddr::new(ip, port);
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            state.close_streams();
        })
        .await?;

    generator.shutdown();
    Ok(())
}
