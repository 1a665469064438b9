use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bleloc_fingerprint::{BeaconReading, rssi_map};
use bleloc_knn::{KnnClassifier, Prediction};
use bleloc_profile::{MedianProfileStore, ProfileMatcher, ProfileRanking};
use serde::{Deserialize, Serialize};

use crate::error::LocatorError;

/// Which engine answers [`Locator::locate`](crate::Locator::locate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// k-NN over the fingerprint table.
    #[default]
    Knn,
    /// Similarity against stored median profiles.
    Profile,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Knn => "knn",
            Strategy::Profile => "profile",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "knn" => Ok(Strategy::Knn),
            "profile" => Ok(Strategy::Profile),
            _ => Err(LocatorError::Validation(format!("unknown strategy {s:?}"))),
        }
    }
}

/// One ranked region. Regions are rendered as strings so both engines share
/// a shape: numeric ids from the fingerprint table, labels from profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRegion {
    pub region: String,
    pub score: f64,
}

/// Engine-independent answer to "where is this receiver?".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub strategy: Strategy,
    pub top1: Option<String>,
    pub top3: Vec<RankedRegion>,
}

impl Ranking {
    fn from_prediction(p: Prediction) -> Self {
        Self {
            strategy: Strategy::Knn,
            top1: p.region_top1.map(|r| r.to_string()),
            top3: p
                .region_top3
                .into_iter()
                .map(|s| RankedRegion {
                    region: s.region_id.to_string(),
                    score: s.score,
                })
                .collect(),
        }
    }

    fn from_profiles(r: ProfileRanking) -> Self {
        Self {
            strategy: Strategy::Profile,
            top1: r.top1,
            top3: r
                .top3
                .into_iter()
                .map(|s| RankedRegion {
                    region: s.region,
                    score: s.score,
                })
                .collect(),
        }
    }
}

/// A localization engine.
///
/// Implementations never fail: lack of data is an empty [`Ranking`].
pub trait Locate: Send + Sync {
    fn locate(&self, readings: &[BeaconReading]) -> Ranking;
}

/// [`Locate`] backed by the k-NN classifier.
pub struct KnnStrategy {
    classifier: KnnClassifier,
}

impl KnnStrategy {
    pub fn new(classifier: KnnClassifier) -> Self {
        Self { classifier }
    }
}

impl Locate for KnnStrategy {
    fn locate(&self, readings: &[BeaconReading]) -> Ranking {
        Ranking::from_prediction(self.classifier.predict(&rssi_map(readings)))
    }
}

/// [`Locate`] backed by stored median profiles.
pub struct ProfileStrategy {
    store: Arc<MedianProfileStore>,
    matcher: ProfileMatcher,
}

impl ProfileStrategy {
    pub fn new(store: Arc<MedianProfileStore>, matcher: ProfileMatcher) -> Self {
        Self { store, matcher }
    }
}

impl Locate for ProfileStrategy {
    fn locate(&self, readings: &[BeaconReading]) -> Ranking {
        let profiles = self.store.retrieve_all();
        Ranking::from_profiles(self.matcher.rank(&profiles, &rssi_map(readings)))
    }
}
