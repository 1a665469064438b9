use std::path::Path;
use std::sync::Arc;

use bleloc_fingerprint::{
    AppendOutcome, BeaconReading, CsvTable, FingerprintStore, SampleMeta, rssi_map,
};
use bleloc_knn::{KnnClassifier, KnnConfig, Prediction};
use bleloc_profile::{
    BatchAccumulator, IngestOutcome, JsonFileBackend, MedianProfile, MedianProfileStore,
    ProfileDocument, ProfileMatcher, ProfileRanking,
};
use bleloc_similarity::Metric;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::LocatorError;
use crate::strategy::{KnnStrategy, Locate, ProfileStrategy, Ranking, Strategy};

/// Tunables for a [`Locator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Neighbors for k-NN. 0 means the default.
    pub k: usize,
    pub strategy: Strategy,
    /// Metric used by the profile strategy and by `match_profiles` when the
    /// caller names none.
    pub metric: Metric,
    /// Frames per profile visit. 0 means the default.
    pub batch_size: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            k: bleloc_knn::DEFAULT_K,
            strategy: Strategy::default(),
            metric: Metric::default(),
            batch_size: bleloc_profile::BATCH_SIZE,
        }
    }
}

/// Fingerprint table size, as reported by `health` and `reload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub beacon_cols: usize,
    pub samples: usize,
}

/// Facade over the fingerprint store, the profile store and the engines
/// that read them.
pub struct Locator {
    cfg: LocatorConfig,
    fingerprints: Arc<FingerprintStore>,
    profiles: Arc<MedianProfileStore>,
    batches: BatchAccumulator,
    knn: KnnClassifier,
    engine: Box<dyn Locate>,
}

impl Locator {
    pub fn new(
        fingerprints: Arc<FingerprintStore>,
        profiles: Arc<MedianProfileStore>,
        cfg: LocatorConfig,
    ) -> Self {
        let knn = KnnClassifier::new(fingerprints.clone(), KnnConfig { k: cfg.k });
        let engine: Box<dyn Locate> = match cfg.strategy {
            Strategy::Knn => Box::new(KnnStrategy::new(KnnClassifier::new(
                fingerprints.clone(),
                knn.config(),
            ))),
            Strategy::Profile => Box::new(ProfileStrategy::new(
                profiles.clone(),
                ProfileMatcher::new(cfg.metric),
            )),
        };
        info!(
            "locator: strategy {}, k {}, metric {}",
            cfg.strategy,
            knn.config().k,
            cfg.metric
        );
        Self {
            batches: BatchAccumulator::new(cfg.batch_size),
            cfg,
            fingerprints,
            profiles,
            knn,
            engine,
        }
    }

    /// Opens a locator over a CSV fingerprint table and a JSON profile file.
    pub fn open(dataset: &Path, profiles: &Path, cfg: LocatorConfig) -> Self {
        Self::new(
            Arc::new(FingerprintStore::new(Box::new(CsvTable::new(dataset)))),
            Arc::new(MedianProfileStore::new(Box::new(JsonFileBackend::new(profiles)))),
            cfg,
        )
    }

    /// A locator with nothing persisted.
    pub fn in_memory(cfg: LocatorConfig) -> Self {
        Self::new(
            Arc::new(FingerprintStore::with_memory_table()),
            Arc::new(MedianProfileStore::with_memory_backend()),
            cfg,
        )
    }

    pub fn config(&self) -> LocatorConfig {
        self.cfg
    }

    /// Stores one labeled fingerprint sample.
    pub fn collect(
        &self,
        meta: SampleMeta,
        readings: &[BeaconReading],
    ) -> Result<AppendOutcome, LocatorError> {
        if meta.region_id.is_none() {
            return Err(LocatorError::Validation("region_id is required".into()));
        }
        if readings.is_empty() {
            return Err(LocatorError::Validation("beacons must not be empty".into()));
        }
        Ok(self.fingerprints.append(meta, &rssi_map(readings))?)
    }

    /// k-NN prediction for a live reading.
    pub fn predict(&self, readings: &[BeaconReading]) -> Result<Prediction, LocatorError> {
        if readings.is_empty() {
            return Err(LocatorError::Validation("beacons must not be empty".into()));
        }
        Ok(self.knn.predict(&rssi_map(readings)))
    }

    /// Prediction by the configured strategy.
    pub fn locate(&self, readings: &[BeaconReading]) -> Result<Ranking, LocatorError> {
        if readings.is_empty() {
            return Err(LocatorError::Validation("beacons must not be empty".into()));
        }
        Ok(self.engine.locate(readings))
    }

    /// Reloads the fingerprint table from durable storage.
    pub fn reload(&self) -> Result<Health, LocatorError> {
        self.fingerprints.reload()?;
        Ok(self.health())
    }

    pub fn health(&self) -> Health {
        Health {
            beacon_cols: self.fingerprints.column_count(),
            samples: self.fingerprints.sample_count(),
        }
    }

    /// Buffers frame `seq` of a profile visit for `region`. When the frame
    /// completes the batch, the visit is aggregated and stored.
    pub fn add_profile_frame(
        &self,
        seq: u32,
        region: &str,
        readings: Vec<BeaconReading>,
    ) -> Result<Option<IngestOutcome>, LocatorError> {
        let Some(batch) = self.batches.push(region, seq, readings)? else {
            return Ok(None);
        };
        let out = self.profiles.ingest(&batch, region)?;
        if !out.persisted {
            warn!("locator: profile {} kept in memory only", out.key);
        }
        Ok(Some(out))
    }

    /// Stored profile for `key`. Empty profiles count as absent.
    pub fn profile(&self, key: &str) -> Option<MedianProfile> {
        self.profiles.retrieve(key).filter(|p| !p.is_empty())
    }

    pub fn profiles(&self) -> ProfileDocument {
        self.profiles.retrieve_all()
    }

    /// Deletes a stored profile. Returns whether it existed.
    pub fn delete_profile(&self, key: &str) -> Result<bool, LocatorError> {
        Ok(self.profiles.delete(key)?)
    }

    /// Ranks stored profiles against `readings`, using `metric` or the
    /// configured default.
    pub fn match_profiles(
        &self,
        readings: &[BeaconReading],
        metric: Option<Metric>,
    ) -> Result<ProfileRanking, LocatorError> {
        if readings.is_empty() {
            return Err(LocatorError::Validation("beacons must not be empty".into()));
        }
        let matcher = ProfileMatcher::new(metric.unwrap_or(self.cfg.metric));
        Ok(matcher.rank(&self.profiles.retrieve_all(), &rssi_map(readings)))
    }
}
