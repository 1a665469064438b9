use std::collections::{BTreeMap, HashMap};

use bleloc_fingerprint::{BeaconReading, is_signal};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ProfileError;
use crate::median::BATCH_SIZE;

/// Collects raw frames per region until a batch completes.
///
/// Callers number frames `1..=batch_size`. The frame numbered `batch_size`
/// completes the batch: the region's buffer is drained under the lock and
/// returned in sequence order. A second completing frame with nothing
/// buffered is treated as a duplicate and ignored, so one visit never
/// produces two profiles. Re-sending a sequence number replaces that frame.
pub struct BatchAccumulator {
    batch_size: u32,
    pending: Mutex<HashMap<String, BTreeMap<u32, Vec<BeaconReading>>>>,
}

impl Default for BatchAccumulator {
    fn default() -> Self {
        Self::new(BATCH_SIZE)
    }
}

impl BatchAccumulator {
    /// Creates an accumulator. A `batch_size` of 0 falls back to [`BATCH_SIZE`].
    pub fn new(batch_size: u32) -> Self {
        Self {
            batch_size: if batch_size == 0 { BATCH_SIZE } else { batch_size },
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Buffers one frame. Returns the complete batch when `seq` is the last
    /// sequence number.
    pub fn push(
        &self,
        region: &str,
        seq: u32,
        readings: Vec<BeaconReading>,
    ) -> Result<Option<Vec<Vec<BeaconReading>>>, ProfileError> {
        if region.trim().is_empty() {
            return Err(ProfileError::Validation("region label is required".into()));
        }
        if seq == 0 || seq > self.batch_size {
            return Err(ProfileError::Validation(format!(
                "sequence {seq} outside 1..={}",
                self.batch_size
            )));
        }

        let frame: Vec<BeaconReading> = readings
            .into_iter()
            .filter(|r| r.rssi.is_some_and(is_signal))
            .collect();

        let mut pending = self.pending.lock();
        if seq < self.batch_size {
            let buf = pending.entry(region.trim().to_string()).or_default();
            buf.insert(seq, frame);
            debug!("profile: buffered frame {seq} for {region} ({} pending)", buf.len());
            return Ok(None);
        }

        let mut buf = pending.remove(region.trim()).unwrap_or_default();
        if buf.is_empty() && self.batch_size > 1 {
            warn!("profile: completing frame for {region} with nothing buffered, ignored");
            return Ok(None);
        }
        buf.insert(seq, frame);
        if buf.len() < self.batch_size as usize {
            warn!(
                "profile: batch for {region} completed with {} of {} frames",
                buf.len(),
                self.batch_size
            );
        }
        Ok(Some(buf.into_values().collect()))
    }

    /// Number of frames buffered for `region`.
    pub fn pending(&self, region: &str) -> usize {
        self.pending.lock().get(region.trim()).map_or(0, |b| b.len())
    }

    /// Drops everything buffered for `region`.
    pub fn discard(&self, region: &str) {
        self.pending.lock().remove(region.trim());
    }
}
