use serde::{Deserialize, Serialize};

/// Region label attached to each fingerprint sample.
pub type RegionId = i64;

/// Per-sample metadata. Only `region_id` is required when appending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleMeta {
    #[serde(default)]
    pub region_id: Option<RegionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
}

impl SampleMeta {
    /// Metadata carrying only a region id.
    pub fn region(region_id: RegionId) -> Self {
        Self {
            region_id: Some(region_id),
            ..Default::default()
        }
    }
}

/// A labeled sample as persisted: metadata plus one RSSI per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub meta: SampleMeta,
    pub rssi: Vec<f64>,
}
