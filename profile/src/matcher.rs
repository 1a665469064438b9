use bleloc_fingerprint::{RssiMap, is_signal};
use bleloc_similarity::Metric;
use serde::{Deserialize, Serialize};

use crate::backend::ProfileDocument;
use crate::store::split_key;

/// Best-matching profile for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileScore {
    pub region: String,
    /// Key of the region's best-scoring profile.
    pub key: String,
    pub score: f64,
    /// Beacons shared by the query and that profile.
    pub common: usize,
}

/// Regions ranked by similarity to a query, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRanking {
    pub metric: Metric,
    pub top1: Option<String>,
    pub top3: Vec<ProfileScore>,
}

/// Ranks stored profiles against live readings with a chosen [`Metric`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileMatcher {
    metric: Metric,
}

impl ProfileMatcher {
    pub fn new(metric: Metric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Scores every profile against `query` and keeps each region's best.
    ///
    /// Query readings outside (-85, 0) are dropped first. Profiles that share
    /// no beacon with the query are skipped. Regions are ordered by score
    /// (descending for similarities, ascending for distances); ties keep key
    /// order.
    pub fn rank(&self, profiles: &ProfileDocument, query: &RssiMap) -> ProfileRanking {
        let query: RssiMap = query
            .iter()
            .filter(|(_, rssi)| is_signal(**rssi))
            .map(|(id, rssi)| (id.clone(), *rssi))
            .collect();

        let mut best: Vec<ProfileScore> = Vec::new();
        for (key, profile) in profiles {
            let Some(aligned) = bleloc_similarity::align(&query, profile) else {
                continue;
            };
            let Some(score) = self.metric.score(&query, profile) else {
                continue;
            };
            let (region, _) = split_key(key);
            match best.iter_mut().find(|s| s.region == region) {
                Some(s) if self.metric.better(score, s.score) => {
                    s.key = key.clone();
                    s.score = score;
                    s.common = aligned.len();
                }
                Some(_) => {}
                None => best.push(ProfileScore {
                    region: region.to_string(),
                    key: key.clone(),
                    score,
                    common: aligned.len(),
                }),
            }
        }

        if self.metric.higher_is_better() {
            best.sort_by(|a, b| b.score.total_cmp(&a.score));
        } else {
            best.sort_by(|a, b| a.score.total_cmp(&b.score));
        }
        best.truncate(3);

        ProfileRanking {
            metric: self.metric,
            top1: best.first().map(|s| s.region.clone()),
            top3: best,
        }
    }
}

#[cfg(test)]
mod tests {
    use bleloc_fingerprint::BeaconId;

    use super::*;
    use crate::median::MedianProfile;

    fn id(t: &str) -> BeaconId {
        BeaconId::from_token(t)
    }

    fn profile(entries: &[(&str, f64)]) -> MedianProfile {
        entries.iter().map(|(k, v)| (id(k), *v)).collect()
    }

    fn doc() -> ProfileDocument {
        let mut d = ProfileDocument::new();
        d.insert("lobby_1".into(), profile(&[("a", -55.0), ("b", -70.0), ("c", -80.0)]));
        d.insert("lobby_2".into(), profile(&[("a", -57.0), ("b", -69.0), ("c", -79.0)]));
        d.insert("hall_1".into(), profile(&[("a", -80.0), ("b", -72.0), ("c", -56.0)]));
        d.insert("roof_1".into(), profile(&[("z", -60.0)]));
        d
    }

    #[test]
    fn ranks_by_similarity() {
        let q = profile(&[("a", -56.0), ("b", -70.0), ("c", -79.0)]);
        for metric in [Metric::Pearson, Metric::Spearman, Metric::Euclidean, Metric::Mae] {
            let r = ProfileMatcher::new(metric).rank(&doc(), &q);
            assert_eq!(r.top1.as_deref(), Some("lobby"), "metric {metric}");
            assert_eq!(r.top3.len(), 2, "roof shares no beacon");
            assert_eq!(r.top3[1].region, "hall");
            assert_eq!(r.top3[0].common, 3);
        }
    }

    #[test]
    fn keeps_best_profile_per_region() {
        let q = profile(&[("a", -57.0), ("b", -69.0), ("c", -79.0)]);
        let r = ProfileMatcher::new(Metric::Euclidean).rank(&doc(), &q);
        assert_eq!(r.top3[0].key, "lobby_2");
        assert_eq!(r.top3[0].score, 0.0);
    }

    #[test]
    fn noise_only_query_is_empty() {
        let q = profile(&[("a", -90.0), ("b", 0.0)]);
        let r = ProfileMatcher::default().rank(&doc(), &q);
        assert_eq!(r.top1, None);
        assert!(r.top3.is_empty());
        assert!(ProfileMatcher::default().rank(&ProfileDocument::new(), &q).top3.is_empty());
    }
}
