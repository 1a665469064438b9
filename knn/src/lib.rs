//! K-nearest-neighbor region classifier for BLE fingerprints.
//!
//! [`KnnClassifier::predict`] projects a live reading onto the store's
//! current beacon columns, scans every stored sample, and ranks regions by:
//!
//! - top-1: majority vote over the `k` nearest samples;
//! - top-3: summed inverse distance `1/(d + 1e-6)` per region.
//!
//! Prediction never fails. "No data" and internal inconsistencies both come
//! back as an absent [`Prediction`].

mod classifier;
mod error;

pub use classifier::{
    DEFAULT_K, KnnClassifier, KnnConfig, Neighbor, Prediction, RegionScore, TOP_N, WEIGHT_EPSILON,
    classify, euclidean, nearest, vote, weighted_top,
};
pub use error::KnnError;
