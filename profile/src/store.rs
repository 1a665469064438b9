use std::collections::HashMap;

use bleloc_fingerprint::BeaconReading;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::backend::{MemoryBackend, ProfileBackend, ProfileDocument};
use crate::error::ProfileError;
use crate::median::{MedianProfile, aggregate};

/// Result of a completed [`MedianProfileStore::ingest`].
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// Storage key, `{region}_{visit}`.
    pub key: String,
    pub profile: MedianProfile,
    /// False if the durable write failed; the error has been logged.
    pub persisted: bool,
}

/// Builds the storage key for a region's n-th visit.
pub fn profile_key(region: &str, visit: u64) -> String {
    format!("{region}_{visit}")
}

/// Splits a key into region and visit number. Keys that do not end in
/// `_<number>` are returned whole with no visit number.
pub fn split_key(key: &str) -> (&str, Option<u64>) {
    match key.rsplit_once('_') {
        Some((region, n)) => match n.parse() {
            Ok(visit) => (region, Some(visit)),
            Err(_) => (key, None),
        },
        None => (key, None),
    }
}

/// Persists one median profile per completed site visit.
///
/// Visit counters are seeded from the keys already stored, so a restart
/// continues numbering instead of overwriting earlier visits. Writes are
/// serialized under one lock; reads go straight to the backend.
pub struct MedianProfileStore {
    backend: Box<dyn ProfileBackend>,
    visits: Mutex<HashMap<String, u64>>,
}

impl MedianProfileStore {
    pub fn new(backend: Box<dyn ProfileBackend>) -> Self {
        let store = Self {
            backend,
            visits: Mutex::new(HashMap::new()),
        };
        let mut visits = HashMap::new();
        for key in store.retrieve_all().keys() {
            if let (region, Some(n)) = split_key(key) {
                let v = visits.entry(region.to_string()).or_insert(0);
                *v = (*v).max(n);
            }
        }
        *store.visits.lock() = visits;
        store
    }

    pub fn with_memory_backend() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Aggregates a complete batch of frames for `region` and stores the
    /// profile under the region's next visit key.
    pub fn ingest(&self, frames: &[Vec<BeaconReading>], region: &str) -> Result<IngestOutcome, ProfileError> {
        let region = region.trim();
        if region.is_empty() {
            return Err(ProfileError::Validation("region label is required".into()));
        }

        let profile = aggregate(frames);

        let mut visits = self.visits.lock();
        let visit = visits.entry(region.to_string()).or_insert(0);
        *visit += 1;
        let key = profile_key(region, *visit);

        let persisted = match self.write(|doc| {
            doc.insert(key.clone(), profile.clone());
        }) {
            Ok(()) => true,
            Err(e) => {
                error!("{e}; profile {key} not persisted");
                false
            }
        };
        drop(visits);

        info!(
            "profile: stored {key} with {} beacons from {} frames",
            profile.len(),
            frames.len()
        );
        Ok(IngestOutcome {
            key,
            profile,
            persisted,
        })
    }

    /// Returns the profile stored under `key`.
    pub fn retrieve(&self, key: &str) -> Option<MedianProfile> {
        self.retrieve_all().remove(key)
    }

    /// Returns every stored profile; empty when nothing is stored or the
    /// document cannot be read.
    pub fn retrieve_all(&self) -> ProfileDocument {
        match self.backend.load() {
            Ok(doc) => doc.unwrap_or_default(),
            Err(e) => {
                error!("{e}; treating profile store as empty");
                ProfileDocument::new()
            }
        }
    }

    /// Stored keys in ascending order.
    pub fn keys(&self) -> Vec<String> {
        self.retrieve_all().into_keys().collect()
    }

    /// Replaces the profile stored under `key`.
    pub fn save(&self, key: &str, profile: MedianProfile) -> Result<(), ProfileError> {
        let _guard = self.visits.lock();
        self.write(|doc| {
            doc.insert(key.to_string(), profile);
        })
    }

    /// Deletes `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, ProfileError> {
        let _guard = self.visits.lock();
        let mut existed = false;
        self.write(|doc| existed = doc.remove(key).is_some())?;
        if existed {
            info!("profile: deleted {key}");
        } else {
            warn!("profile: delete of unknown key {key}");
        }
        Ok(existed)
    }

    /// Read-modify-write of the document. Caller holds the visits lock.
    ///
    /// A document that exists but cannot be read is never overwritten.
    fn write(&self, f: impl FnOnce(&mut ProfileDocument)) -> Result<(), ProfileError> {
        let mut doc = self.backend.load()?.unwrap_or_default();
        f(&mut doc);
        self.backend.store(&doc)
    }
}
