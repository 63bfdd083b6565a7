//! Worker process bootstrap: CLI parsing, `tracing` init, config loading,
//! construction of the concrete Redis-backed adapters, and the worker loop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sieve_core::assign::MappingTable;
use sieve_core::blob::RedisBlobStore;
use sieve_core::config::Config;
use sieve_core::dispatcher::{DispatchLimits, Dispatcher};
use sieve_core::queue::RedisQueue;
use sieve_core::registry::ScannerRegistry;
use sieve_core::scanners::{Base64Extract, Strings};
use sieve_core::sink::RedisEventSink;
use sieve_core::taster::Taster;
use sieve_core::worker::{self, WorkerLimits};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI overrides, following the pattern `ferrex-server`'s `Args` uses: a
/// config file supplies defaults, individual flags/env vars override them.
#[derive(Parser, Debug)]
#[command(name = "sieve-worker", about = "Recursive file-scanning dispatch engine worker")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "SIEVE_CONFIG", default_value = "sieve.toml")]
    config: PathBuf,

    /// Overrides `limits.distribution`. Accepts humantime durations (`5s`).
    #[arg(long, env = "SIEVE_DISTRIBUTION")]
    distribution: Option<humantime::Duration>,

    /// Overrides `limits.scanner`.
    #[arg(long, env = "SIEVE_SCANNER_TIMEOUT")]
    scanner_timeout: Option<humantime::Duration>,

    /// Overrides `limits.time_to_live`.
    #[arg(long, env = "SIEVE_TIME_TO_LIVE")]
    time_to_live: Option<humantime::Duration>,

    /// Overrides `redis.url`.
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,
}

fn mapping_table_from_config(config: &Config) -> MappingTable {
    config.scanners.clone()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sieve_worker=info,sieve_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load(&args.config)?;
    if let Some(d) = args.distribution {
        config.limits.distribution = d.as_secs_f64();
    }
    if let Some(d) = args.scanner_timeout {
        config.limits.scanner = d.as_secs();
    }
    if let Some(d) = args.time_to_live {
        config.limits.time_to_live = d.as_secs();
    }
    if let Some(url) = args.redis_url {
        config.redis.url = url;
    }

    info!(config = %args.config.display(), "configuration loaded");

    let client = redis::Client::open(config.redis.url.clone())?;
    let blob = Arc::new(RedisBlobStore::new(client.clone()));
    let queue = Arc::new(RedisQueue::new(client.clone(), "sieve:tasks".to_string()));
    let sink = Arc::new(RedisEventSink::new(client));

    let taster = Arc::new(Taster::open(
        config.tasting.content_type_db.as_deref(),
        config.tasting.rules.as_deref(),
    )?);

    let mut registry = ScannerRegistry::new();
    registry.register(Arc::new(Strings)).await?;
    registry.register(Arc::new(Base64Extract)).await?;

    let mapping_table = mapping_table_from_config(&config);

    let dispatcher = Arc::new(Dispatcher::new(
        blob,
        sink.clone(),
        taster,
        registry,
        mapping_table,
        DispatchLimits {
            distribution_secs: config.limits.distribution,
            default_scanner_timeout_secs: config.limits.scanner,
            max_depth: config.limits.max_depth,
        },
    ));

    let limits = WorkerLimits {
        time_to_live: config.limits.time_to_live,
        max_files: config.limits.max_files,
        poll_interval: config.worker.poll_interval,
    };

    info!("worker starting");
    if let Err(err) = worker::run(queue, sink, dispatcher, limits).await {
        warn!(error = %err, "worker loop exited with an error");
        return Err(err.into());
    }
    info!("worker stopped");

    Ok(())
}
