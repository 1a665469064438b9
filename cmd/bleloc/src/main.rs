//! bleloc - BLE fingerprint indoor localization.

mod commands;
mod config;
mod server;

use std::path::PathBuf;

use bleloc_locator::Strategy;
use bleloc_similarity::Metric;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CollectCommand, ProfileCommand, QueryArgs};

/// BLE fingerprint indoor localization.
///
/// Collects labeled beacon fingerprints, predicts regions by k-NN or by
/// similarity to per-visit median profiles, and serves the same operations
/// over HTTP.
///
/// Configuration is stored in ~/.bleloc/config.yaml.
#[derive(Parser)]
#[command(name = "bleloc")]
#[command(about = "BLE fingerprint indoor localization")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.bleloc/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fingerprint table (CSV), overrides the config
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,

    /// Profile document (JSON), overrides the config
    #[arg(long, global = true)]
    pub profiles: Option<PathBuf>,

    /// Neighbors for k-NN
    #[arg(short = 'k', long, global = true)]
    pub k: Option<usize>,

    /// Engine used by `locate` and the server: knn or profile
    #[arg(long, global = true)]
    pub strategy: Option<Strategy>,

    /// Default profile metric
    #[arg(long, global = true)]
    pub metric: Option<Metric>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store one labeled fingerprint sample
    Collect(CollectCommand),
    /// Predict the region with k-NN
    Predict(QueryArgs),
    /// Predict the region with the configured strategy
    Locate(QueryArgs),
    /// Reload the fingerprint table and print its size
    Reload,
    /// Print the fingerprint table size
    Health,
    /// Manage median profiles
    Profile(ProfileCommand),
    /// Serve the HTTP API
    Serve {
        /// Listen address, e.g. :8080 (default from config)
        #[arg(short, long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Collect(cmd) => cmd.run(&cli),
        Commands::Predict(q) => q.predict(&cli),
        Commands::Locate(q) => q.locate(&cli),
        Commands::Reload => {
            let locator = commands::open_locator(&commands::get_config(&cli)?);
            let health = locator.reload()?;
            commands::output_result(&serde_json::json!({
                "ok": true,
                "beaconCols": health.beacon_cols,
                "samples": health.samples,
            }))
        }
        Commands::Health => {
            let locator = commands::open_locator(&commands::get_config(&cli)?);
            commands::output_result(&locator.health())
        }
        Commands::Profile(cmd) => cmd.run(&cli),
        Commands::Serve { listen } => {
            let cfg = commands::get_config(&cli)?;
            let addr = listen.clone().unwrap_or_else(|| cfg.listen.clone());
            tracing::info!("using config {}", cfg.path().display());
            server::start_server(&addr, commands::open_locator(&cfg)).await
        }
    }
}
