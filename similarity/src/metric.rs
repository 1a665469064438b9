use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::align::align;
use crate::error::SimilarityError;

/// A named similarity or distance function over keyed RSSI maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    #[default]
    Cosine,
    CenteredCosine,
    Pearson,
    Spearman,
    /// Cosine after converting dBm to linear power.
    CosineMw,
    Euclidean,
    Manhattan,
    Mae,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Cosine,
        Metric::CenteredCosine,
        Metric::Pearson,
        Metric::Spearman,
        Metric::CosineMw,
        Metric::Euclidean,
        Metric::Manhattan,
        Metric::Mae,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::CenteredCosine => "centered-cosine",
            Metric::Pearson => "pearson",
            Metric::Spearman => "spearman",
            Metric::CosineMw => "cosine-mw",
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Mae => "mae",
        }
    }

    /// True for similarities, false for distances.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::Euclidean | Metric::Manhattan | Metric::Mae)
    }

    /// Scores two maps over their common keys.
    ///
    /// Returns `None` when the maps share no key. Similarity callers that
    /// want the "no information" value should use `unwrap_or(0.0)`.
    pub fn score<K: Ord + Clone>(&self, a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Option<f64> {
        let v = align(a, b)?;
        Some(match self {
            Metric::Cosine => v.cosine(),
            Metric::CenteredCosine => v.centered_cosine(),
            Metric::Pearson => v.pearson(),
            Metric::Spearman => v.spearman(),
            Metric::CosineMw => v.cosine_milliwatt(),
            Metric::Euclidean => v.euclidean(),
            Metric::Manhattan => v.manhattan(),
            Metric::Mae => v.mae(),
        })
    }

    /// Returns true if score `a` ranks strictly ahead of score `b`.
    pub fn better(&self, a: f64, b: f64) -> bool {
        if self.higher_is_better() { a > b } else { a < b }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = SimilarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| SimilarityError::UnknownMetric(s.to_string()))
    }
}

/// Every metric computed over the same aligned pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub common: usize,
    pub cosine: f64,
    pub centered_cosine: f64,
    pub pearson: f64,
    pub spearman: f64,
    pub cosine_mw: f64,
    pub euclidean: f64,
    pub manhattan: f64,
    pub mae: f64,
}

/// Computes a [`Report`] for two maps, or `None` when they share no key.
pub fn compare<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Option<Report> {
    let v = align(a, b)?;
    Some(Report {
        common: v.len(),
        cosine: v.cosine(),
        centered_cosine: v.centered_cosine(),
        pearson: v.pearson(),
        spearman: v.spearman(),
        cosine_mw: v.cosine_milliwatt(),
        euclidean: v.euclidean(),
        manhattan: v.manhattan(),
        mae: v.mae(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn parse_names() {
        for m in Metric::ALL {
            assert_eq!(m.as_str().parse::<Metric>().unwrap(), m);
        }
        assert_eq!("Centered_Cosine".parse::<Metric>().unwrap(), Metric::CenteredCosine);
        assert!("hamming".parse::<Metric>().is_err());
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Metric::CosineMw).unwrap(), "\"cosine-mw\"");
        let m: Metric = serde_json::from_str("\"spearman\"").unwrap();
        assert_eq!(m, Metric::Spearman);
    }

    #[test]
    fn direction() {
        assert!(Metric::Cosine.better(0.9, 0.5));
        assert!(Metric::Euclidean.better(1.0, 2.0));
        assert!(!Metric::Mae.better(2.0, 1.0));
    }

    #[test]
    fn score_disjoint() {
        let a = map(&[("a", -60.0)]);
        let b = map(&[("b", -60.0)]);
        for m in Metric::ALL {
            assert_eq!(m.score(&a, &b), None);
        }
        assert!(compare(&a, &b).is_none());
    }

    #[test]
    fn report_consistent() {
        let a = map(&[("a", -60.0), ("b", -70.0), ("c", -75.0)]);
        let b = map(&[("a", -62.0), ("b", -69.0), ("c", -80.0)]);
        let r = compare(&a, &b).unwrap();
        assert_eq!(r.common, 3);
        assert_eq!(r.pearson, r.centered_cosine);
        assert_eq!(Some(r.cosine), Metric::Cosine.score(&a, &b));
        assert_eq!(Some(r.mae), Metric::Mae.score(&a, &b));
        assert!((r.mae * 3.0 - r.manhattan).abs() < 1e-12);
    }
}
