//! mudsim - tick-driven host for a persistent multiplayer text game
//!
//! Loads the world from the data directory (or the starter content), runs the
//! world tick and message bus until Ctrl-C or the tick limit, then saves.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{ServerConfig, DEFAULT_CONFIG_PATH};
use mudsim_server::Server;
use mudsim_world::FileStore;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the mudsim world server", long_about = None)]
struct Args {
    /// Server configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Directory holding world and character saves
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Milliseconds between world ticks
    #[arg(long)]
    tick_interval_ms: Option<u64>,
    /// Save the world every N ticks
    #[arg(long)]
    save_every_ticks: Option<u64>,
    /// Seed for reproducible combat
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Write the effective configuration to --config and exit
    #[arg(long)]
    write_config: bool,
}

impl Args {
    fn apply(&self, cfg: &mut ServerConfig) {
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = dir.clone();
        }
        if let Some(ms) = self.tick_interval_ms {
            cfg.tick_interval_ms = ms;
        }
        if let Some(every) = self.save_every_ticks {
            cfg.save_every_ticks = every;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if self.max_ticks.is_some() {
            cfg.max_ticks = self.max_ticks;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with INFO level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting mudsim v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut cfg = ServerConfig::load_from_path(&args.config);
    args.apply(&mut cfg);

    if args.write_config {
        cfg.save_to_path(&args.config)
            .with_context(|| format!("Failed to write {}", args.config.display()))?;
        info!("Wrote configuration to {}", args.config.display());
        return Ok(());
    }

    let store = FileStore::new(&cfg.data_dir)
        .with_context(|| format!("Failed to open data directory {}", cfg.data_dir.display()))?;
    let server = Server::load(cfg.server_settings(), Arc::new(store))?;
    server.start()?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Ctrl-C received, shutting down");
        }
        _ = server.finished() => {}
    }

    server.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_file() {
        let args = Args::parse_from(["mudsim", "--seed", "9", "--max-ticks", "3", "--data-dir", "/tmp/w"]);
        let mut cfg = ServerConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(cfg.max_ticks, Some(3));
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/w"));
        assert_eq!(cfg.tick_interval_ms, 3000);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }
}
