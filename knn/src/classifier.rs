use std::sync::Arc;

use bleloc_fingerprint::{FingerprintStore, RegionId, RssiMap, Snapshot, is_signal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::KnnError;

/// Default number of neighbors.
pub const DEFAULT_K: usize = 5;

/// Guards the inverse-distance weight against exact matches.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Number of regions returned in [`Prediction::top3`].
pub const TOP_N: usize = 3;

/// Controls classifier behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnnConfig {
    /// Number of neighbors that vote. Default: 5.
    pub k: usize,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self { k: DEFAULT_K }
    }
}

impl KnnConfig {
    fn with_defaults(mut self) -> Self {
        if self.k == 0 {
            self.k = DEFAULT_K;
        }
        self
    }
}

/// A region with its summed inverse-distance weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionScore {
    pub region_id: RegionId,
    pub score: f64,
}

/// Ranked region prediction.
///
/// An absent prediction (`top1 == None`, empty `top3`) means no answer is
/// available: the training set is empty or the prediction degraded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub region_top1: Option<RegionId>,
    pub region_top3: Vec<RegionScore>,
}

impl Prediction {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.region_top1.is_none()
    }
}

/// One training row near the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f64,
    pub region_id: RegionId,
}

/// Predicts regions by brute-force k-NN over a [`FingerprintStore`].
///
/// Thread-safe: each call works on its own snapshot of the store.
pub struct KnnClassifier {
    store: Arc<FingerprintStore>,
    cfg: KnnConfig,
}

impl KnnClassifier {
    pub fn new(store: Arc<FingerprintStore>, cfg: KnnConfig) -> Self {
        Self {
            store,
            cfg: cfg.with_defaults(),
        }
    }

    pub fn config(&self) -> KnnConfig {
        self.cfg
    }

    /// Predicts the region for a live reading.
    ///
    /// Readings outside (-85, 0) are dropped first. Never fails: an empty
    /// store or an internal inconsistency both yield [`Prediction::absent`].
    pub fn predict(&self, query: &RssiMap) -> Prediction {
        let filtered: RssiMap = query
            .iter()
            .filter(|(_, rssi)| is_signal(**rssi))
            .map(|(id, rssi)| (id.clone(), *rssi))
            .collect();

        let snapshot = self.store.snapshot();
        match classify(&snapshot, &filtered, self.cfg.k) {
            Ok(p) => {
                debug!(
                    "knn: predicted {:?} from {} beacons over {} samples",
                    p.region_top1,
                    filtered.len(),
                    snapshot.labels.len()
                );
                p
            }
            Err(e) => {
                warn!("{e}; returning no prediction");
                Prediction::absent()
            }
        }
    }
}

/// Classifies `query` against `snapshot` using the `k` nearest rows.
///
/// Returns an absent prediction for an empty snapshot and an error if the
/// snapshot violates its width or label invariants.
pub fn classify(snapshot: &Snapshot, query: &RssiMap, k: usize) -> Result<Prediction, KnnError> {
    if snapshot.rows.len() != snapshot.labels.len() {
        return Err(KnnError::LabelMismatch {
            rows: snapshot.rows.len(),
            labels: snapshot.labels.len(),
        });
    }
    if snapshot.is_empty() {
        return Ok(Prediction::absent());
    }

    let input = snapshot.project(query);
    if let Some((row, r)) = snapshot
        .rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != input.len())
    {
        return Err(KnnError::SchemaMismatch {
            row,
            got: r.len(),
            want: input.len(),
        });
    }

    let neighbors = nearest(snapshot, &input, k);
    Ok(Prediction {
        region_top1: vote(&neighbors),
        region_top3: weighted_top(&neighbors, TOP_N),
    })
}

/// Euclidean distance between two equal-length vectors.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// The `k` rows closest to `input`, closest first. Equal distances keep
/// row order.
pub fn nearest(snapshot: &Snapshot, input: &[f64], k: usize) -> Vec<Neighbor> {
    let mut all: Vec<Neighbor> = snapshot
        .rows
        .iter()
        .zip(&snapshot.labels)
        .map(|(row, &region_id)| Neighbor {
            distance: euclidean(input, row),
            region_id,
        })
        .collect();
    // sort_by is stable.
    all.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    all.truncate(k);
    all
}

/// Majority vote. Ties go to the region seen first in `neighbors`.
pub fn vote(neighbors: &[Neighbor]) -> Option<RegionId> {
    let mut counts: Vec<(RegionId, usize)> = Vec::new();
    for n in neighbors {
        match counts.iter_mut().find(|(r, _)| *r == n.region_id) {
            Some((_, c)) => *c += 1,
            None => counts.push((n.region_id, 1)),
        }
    }
    let mut best: Option<(RegionId, usize)> = None;
    for (region, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((region, count));
        }
    }
    best.map(|(r, _)| r)
}

/// Sums `1/(distance + ε)` per region and returns the `n` heaviest regions.
/// Equal weights keep first-seen order.
pub fn weighted_top(neighbors: &[Neighbor], n: usize) -> Vec<RegionScore> {
    let mut scores: Vec<RegionScore> = Vec::new();
    for nb in neighbors {
        let w = 1.0 / (nb.distance + WEIGHT_EPSILON);
        match scores.iter_mut().find(|s| s.region_id == nb.region_id) {
            Some(s) => s.score += w,
            None => scores.push(RegionScore {
                region_id: nb.region_id,
                score: w,
            }),
        }
    }
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores.truncate(n);
    scores
}
