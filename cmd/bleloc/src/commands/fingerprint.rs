//! Fingerprint collection and prediction commands.

use std::path::PathBuf;

use bleloc_fingerprint::SampleMeta;
use clap::Args;
use serde_json::json;

use super::{get_config, open_locator, output_result, readings};
use crate::Cli;

/// Store one labeled fingerprint sample.
#[derive(Args)]
pub struct CollectCommand {
    /// Region id of the sample
    #[arg(short, long)]
    region: i64,

    #[arg(long)]
    x: Option<f64>,

    #[arg(long)]
    y: Option<f64>,

    #[arg(long)]
    device: Option<String>,

    #[arg(long)]
    time_slot: Option<String>,

    #[arg(long)]
    heading: Option<String>,

    /// Readings file (YAML or JSON list of {uuid, major, minor, rssi})
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Readings as UUID:MAJOR:MINOR:RSSI
    readings: Vec<String>,
}

impl CollectCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let locator = open_locator(&get_config(cli)?);
        let meta = SampleMeta {
            region_id: Some(self.region),
            x: self.x,
            y: self.y,
            device: self.device.clone(),
            time_slot: self.time_slot.clone(),
            heading: self.heading.clone(),
        };
        let out = locator.collect(meta, &readings(&self.readings, self.file.as_deref())?)?;
        output_result(&json!({
            "ok": true,
            "saved": 1,
            "beaconCols": out.column_count,
            "newCols": out.new_columns,
            "samples": out.sample_count,
        }))
    }
}

/// Readings to locate.
#[derive(Args)]
pub struct QueryArgs {
    /// Readings file (YAML or JSON list of {uuid, major, minor, rssi})
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Readings as UUID:MAJOR:MINOR:RSSI
    readings: Vec<String>,
}

impl QueryArgs {
    /// k-NN prediction.
    pub fn predict(&self, cli: &Cli) -> anyhow::Result<()> {
        let locator = open_locator(&get_config(cli)?);
        let p = locator.predict(&readings(&self.readings, self.file.as_deref())?)?;
        output_result(&p)
    }

    /// Prediction by the configured strategy.
    pub fn locate(&self, cli: &Cli) -> anyhow::Result<()> {
        let locator = open_locator(&get_config(cli)?);
        let r = locator.locate(&readings(&self.readings, self.file.as_deref())?)?;
        output_result(&r)
    }
}
