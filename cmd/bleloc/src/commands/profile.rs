//! Median profile commands.

use std::path::PathBuf;

use bleloc_fingerprint::BeaconReading;
use bleloc_similarity::Metric;
use clap::{Args, Subcommand};
use serde_json::json;

use super::{get_config, load_request, open_locator, output_result, readings};
use crate::Cli;

/// Build, inspect and match per-visit median profiles.
#[derive(Args)]
pub struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand)]
enum ProfileSubcommand {
    /// Ingest one visit from a file of frames (list of reading lists)
    Ingest {
        /// Region label
        #[arg(short, long)]
        region: String,

        /// Frames file (YAML or JSON)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
    /// Print one stored profile
    Get { key: String },
    /// Print every stored profile
    List,
    /// Delete a stored profile
    Delete { key: String },
    /// Rank regions against stored profiles
    Match {
        /// Metric to rank with (default from config)
        #[arg(short, long)]
        metric: Option<Metric>,

        /// Show every metric for each stored profile
        #[arg(long)]
        report: bool,

        /// Readings file (YAML or JSON list of {uuid, major, minor, rssi})
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,

        /// Readings as UUID:MAJOR:MINOR:RSSI
        readings: Vec<String>,
    },
}

impl ProfileCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let locator = open_locator(&cfg);

        match &self.command {
            ProfileSubcommand::Ingest { region, file } => {
                let frames: Vec<Vec<BeaconReading>> = load_request(file)?;
                if frames.len() != cfg.batch_size as usize {
                    anyhow::bail!(
                        "visit has {} frames, expected {}",
                        frames.len(),
                        cfg.batch_size
                    );
                }
                let mut stored = None;
                for (i, frame) in frames.into_iter().enumerate() {
                    stored = locator.add_profile_frame(i as u32 + 1, region, frame)?;
                }
                let out = stored.ok_or_else(|| anyhow::anyhow!("visit did not complete"))?;
                output_result(&json!({
                    "key": out.key,
                    "persisted": out.persisted,
                    "profile": out.profile,
                }))
            }
            ProfileSubcommand::Get { key } => match locator.profile(key) {
                Some(p) => output_result(&p),
                None => anyhow::bail!("profile '{key}' not found"),
            },
            ProfileSubcommand::List => output_result(&locator.profiles()),
            ProfileSubcommand::Delete { key } => {
                if !locator.delete_profile(key)? {
                    anyhow::bail!("profile '{key}' not found");
                }
                output_result(&json!({ "ok": true, "deleted": key }))
            }
            ProfileSubcommand::Match {
                metric,
                report,
                file,
                readings: args,
            } => {
                let query = readings(args, file.as_deref())?;
                if *report {
                    let q = bleloc_fingerprint::signal_map(&query);
                    let reports: serde_json::Map<String, serde_json::Value> = locator
                        .profiles()
                        .iter()
                        .filter_map(|(key, p)| {
                            let r = bleloc_similarity::compare(&q, p)?;
                            Some((key.clone(), serde_json::to_value(r).ok()?))
                        })
                        .collect();
                    return output_result(&reports);
                }
                output_result(&locator.match_profiles(&query, *metric)?)
            }
        }
    }
}
