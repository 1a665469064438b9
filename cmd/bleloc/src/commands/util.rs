//! Utility functions for CLI commands.

use std::path::Path;

use anyhow::Context as _;
use bleloc_fingerprint::BeaconReading;
use bleloc_locator::Locator;
use serde::de::DeserializeOwned;

use crate::Cli;
use crate::config::{Config, load_config};

/// Loads the config file and applies command-line overrides.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(p) = &cli.dataset {
        cfg.dataset = p.clone();
    }
    if let Some(p) = &cli.profiles {
        cfg.profiles = p.clone();
    }
    if let Some(k) = cli.k {
        cfg.k = k;
    }
    if let Some(s) = cli.strategy {
        cfg.strategy = s;
    }
    if let Some(m) = cli.metric {
        cfg.metric = m;
    }
    Ok(cfg)
}

/// Opens the file-backed locator described by the configuration.
pub fn open_locator(cfg: &Config) -> Locator {
    Locator::open(&cfg.dataset_path(), &cfg.profiles_path(), cfg.locator_config())
}

/// Loads a request from a YAML or JSON file.
pub fn load_request<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");

    let result = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    Ok(result)
}

/// Parses `UUID:MAJOR:MINOR:RSSI`.
pub fn parse_reading(s: &str) -> anyhow::Result<BeaconReading> {
    let mut parts = s.rsplitn(4, ':');
    let (Some(rssi), Some(minor), Some(major), Some(uuid)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("reading {s:?} is not UUID:MAJOR:MINOR:RSSI");
    };
    Ok(BeaconReading::new(
        uuid,
        major.trim().parse().with_context(|| format!("major in {s:?}"))?,
        minor.trim().parse().with_context(|| format!("minor in {s:?}"))?,
        rssi.trim().parse().with_context(|| format!("rssi in {s:?}"))?,
    ))
}

/// Collects readings from positional arguments and an optional file.
pub fn readings(args: &[String], file: Option<&Path>) -> anyhow::Result<Vec<BeaconReading>> {
    let mut out = match file {
        Some(path) => load_request::<Vec<BeaconReading>>(path)?,
        None => Vec::new(),
    };
    for a in args {
        out.push(parse_reading(a)?);
    }
    if out.is_empty() {
        anyhow::bail!("no beacon readings given, pass UUID:MAJOR:MINOR:RSSI or -f FILE");
    }
    Ok(out)
}

/// Prints a result as pretty JSON.
pub fn output_result<T: serde::Serialize>(result: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
