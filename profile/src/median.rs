use std::collections::BTreeMap;

use bleloc_fingerprint::{BeaconId, BeaconReading, is_signal};

/// Beacon token → median RSSI for one site visit.
pub type MedianProfile = BTreeMap<BeaconId, f64>;

/// Number of raw frames that make up one visit.
pub const BATCH_SIZE: u32 = 20;

/// A beacon must be seen more than this many times in a batch to be kept.
pub const SUPPORT_THRESHOLD: usize = 5;

/// Median of `values`, sorting them in place. Even-length input yields the
/// mean of the two middle values. `None` for an empty slice.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        Some(values[n / 2])
    } else {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    }
}

/// Reduces a batch of frames to a median profile.
///
/// Readings outside (-85, 0) and incomplete readings are dropped. Beacons
/// seen at most [`SUPPORT_THRESHOLD`] times across the whole batch are
/// omitted, not zero-filled.
pub fn aggregate(frames: &[Vec<BeaconReading>]) -> MedianProfile {
    let mut observed: BTreeMap<BeaconId, Vec<f64>> = BTreeMap::new();
    for reading in frames.iter().flatten() {
        if let Some((id, rssi)) = reading.parts() {
            if is_signal(rssi) {
                observed.entry(id).or_default().push(rssi);
            }
        }
    }
    observed
        .into_iter()
        .filter(|(_, values)| values.len() > SUPPORT_THRESHOLD)
        .filter_map(|(id, mut values)| median(&mut values).map(|m| (id, m)))
        .collect()
}
