//! Bingo Hall server binary

use bingo_hall::{
    api::ApiServer,
    config::StorageBackend,
    draw::{DrawSource, ShuffledDraw},
    metrics::EngineMetrics,
    CardCatalog, ConfigLoader, Ledger, LobbyContext, LobbyRegistry, MemoryStore, RocksStore,
    RoundStore,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bingo-hall")]
#[command(about = "Multi-stake bingo lobby server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,

    /// Keep players and rounds in memory instead of RocksDB
    #[arg(long)]
    in_memory: bool,

    /// Write a sample configuration to this path and exit
    #[arg(long)]
    write_sample_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = args.write_sample_config {
        bingo_hall::common::config::generate_sample_config(&path)?;
        println!("📝 Sample configuration written to {}", path);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.in_memory {
        config.storage.backend = StorageBackend::Memory;
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.monitoring.log_filter)),
        )
        .init();

    info!("🎱 Starting Bingo Hall v{}", env!("CARGO_PKG_VERSION"));

    let catalog = Arc::new(CardCatalog::load(&config.storage.cards_path)?);

    let (ledger, rounds): (Arc<dyn Ledger>, Arc<dyn RoundStore>) = match config.storage.backend {
        StorageBackend::RocksDb => {
            info!("📂 Opening database: {}", config.storage.data_directory);
            let store = Arc::new(RocksStore::open(&config.storage.data_directory)?);
            let ledger: Arc<dyn Ledger> = store.clone();
            let rounds: Arc<dyn RoundStore> = store;
            (ledger, rounds)
        }
        StorageBackend::Memory => {
            warn!("⚠️  In-memory storage: players and rounds are lost on exit");
            let store = Arc::new(MemoryStore::new());
            let ledger: Arc<dyn Ledger> = store.clone();
            let rounds: Arc<dyn RoundStore> = store;
            (ledger, rounds)
        }
    };

    let draw: Arc<dyn DrawSource> = match config.lobby.draw_seed {
        Some(seed) => {
            warn!(seed, "Using a fixed draw seed");
            Arc::new(ShuffledDraw::with_seed(seed))
        }
        None => Arc::new(ShuffledDraw::new()),
    };

    let metrics = Arc::new(EngineMetrics::new());
    let registry = Arc::new(LobbyRegistry::new(LobbyContext {
        config: Arc::new(config.lobby.clone()),
        catalog,
        ledger: ledger.clone(),
        rounds,
        draw,
        metrics: metrics.clone(),
    }));
    let orchestrators = registry.start();

    let server = ApiServer::new(config.server.clone(), registry, ledger, metrics);
    let result = server.run().await;

    for handle in orchestrators {
        handle.abort();
    }
    result
}
