use std::collections::BTreeMap;

use crate::vector::{
    centered_cosine_unchecked, cosine_unchecked, dbm_to_milliwatt, euclidean_unchecked,
    mae_unchecked, manhattan_unchecked, spearman_unchecked,
};

/// Two keyed vectors restricted to their common keys, in ascending key order.
///
/// Both sides always have the same length, so the metric methods here cannot
/// fail with a dimension mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Aligned<K> {
    keys: Vec<K>,
    a: Vec<f64>,
    b: Vec<f64>,
}

/// Aligns two keyed maps on the intersection of their keys.
///
/// Keys are visited in the map's ascending order, so the resulting vectors do
/// not depend on insertion order. Returns `None` when the maps share no key.
pub fn align<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Option<Aligned<K>> {
    let mut keys = Vec::new();
    let mut va = Vec::new();
    let mut vb = Vec::new();
    for (k, &x) in a {
        if let Some(&y) = b.get(k) {
            keys.push(k.clone());
            va.push(x);
            vb.push(y);
        }
    }
    if keys.is_empty() {
        return None;
    }
    Some(Aligned { keys, a: va, b: vb })
}

impl<K> Aligned<K> {
    /// Common keys, sorted.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn left(&self) -> &[f64] {
        &self.a
    }

    pub fn right(&self) -> &[f64] {
        &self.b
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn cosine(&self) -> f64 {
        cosine_unchecked(&self.a, &self.b)
    }

    pub fn centered_cosine(&self) -> f64 {
        centered_cosine_unchecked(&self.a, &self.b)
    }

    pub fn pearson(&self) -> f64 {
        self.centered_cosine()
    }

    pub fn spearman(&self) -> f64 {
        spearman_unchecked(&self.a, &self.b)
    }

    /// Cosine over linear power (mW) instead of dBm.
    pub fn cosine_milliwatt(&self) -> f64 {
        cosine_unchecked(&dbm_to_milliwatt(&self.a), &dbm_to_milliwatt(&self.b))
    }

    pub fn euclidean(&self) -> f64 {
        euclidean_unchecked(&self.a, &self.b)
    }

    pub fn manhattan(&self) -> f64 {
        manhattan_unchecked(&self.a, &self.b)
    }

    pub fn mae(&self) -> f64 {
        mae_unchecked(&self.a, &self.b)
    }
}

/// Cosine similarity over common keys; 0 when there are none.
pub fn cosine<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> f64 {
    align(a, b).map_or(0.0, |v| v.cosine())
}

/// Mean-centered cosine over common keys; 0 when there are none.
pub fn centered_cosine<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> f64 {
    align(a, b).map_or(0.0, |v| v.centered_cosine())
}

/// Pearson correlation over common keys; 0 when there are none.
pub fn pearson<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> f64 {
    align(a, b).map_or(0.0, |v| v.pearson())
}

/// Spearman correlation over common keys; 0 when there are none.
pub fn spearman<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> f64 {
    align(a, b).map_or(0.0, |v| v.spearman())
}

/// Cosine over linear power; 0 when there are no common keys.
pub fn cosine_milliwatt<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> f64 {
    align(a, b).map_or(0.0, |v| v.cosine_milliwatt())
}

/// L2 distance over common keys; `None` when there are none.
pub fn euclidean<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Option<f64> {
    align(a, b).map(|v| v.euclidean())
}

/// L1 distance over common keys; `None` when there are none.
pub fn manhattan<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Option<f64> {
    align(a, b).map(|v| v.manhattan())
}

/// Mean absolute error over common keys; `None` when there are none.
pub fn mae<K: Ord + Clone>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Option<f64> {
    align(a, b).map(|v| v.mae())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn align_intersection_sorted() {
        let a = map(&[("c", -70.0), ("a", -60.0), ("b", -65.0), ("x", -80.0)]);
        let b = map(&[("b", -66.0), ("a", -61.0), ("c", -71.0), ("y", -50.0)]);
        let v = align(&a, &b).unwrap();
        assert_eq!(v.keys(), &["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(v.left(), &[-60.0, -65.0, -70.0]);
        assert_eq!(v.right(), &[-61.0, -66.0, -71.0]);
    }

    #[test]
    fn disjoint_keys() {
        let a = map(&[("a", -60.0)]);
        let b = map(&[("b", -60.0)]);
        assert!(align(&a, &b).is_none());
        assert_eq!(cosine(&a, &b), 0.0);
        assert_eq!(pearson(&a, &b), 0.0);
        assert_eq!(spearman(&a, &b), 0.0);
        assert_eq!(cosine_milliwatt(&a, &b), 0.0);
        assert_eq!(euclidean(&a, &b), None);
        assert_eq!(manhattan(&a, &b), None);
        assert_eq!(mae(&a, &b), None);
    }

    #[test]
    fn keyed_self_similarity() {
        let a = map(&[("a", -60.0), ("b", -72.0), ("c", -81.0)]);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-9);
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-9);
        assert!((spearman(&a, &a) - 1.0).abs() < 1e-9);
        assert!((cosine_milliwatt(&a, &a) - 1.0).abs() < 1e-9);
        assert_eq!(euclidean(&a, &a), Some(0.0));
    }

    #[test]
    fn keyed_pearson_matches_centered() {
        let a = map(&[
            ("1012", -63.0),
            ("1063", -68.0),
            ("1100", -73.0),
            ("1045", -62.0),
            ("1094", -60.5),
            ("1050", -67.5),
            ("1040", -68.0),
        ]);
        let b = map(&[
            ("1063", -67.0),
            ("1012", -68.0),
            ("1100", -70.0),
            ("1045", -74.0),
            ("1094", -78.0),
            ("1050", -68.0),
            ("1040", -56.0),
        ]);
        assert!((pearson(&a, &b) - centered_cosine(&a, &b)).abs() < 1e-12);
    }

    #[test]
    fn keyed_distances_ignore_extra_keys() {
        let a = map(&[("a", -60.0), ("b", -70.0), ("only_a", -10.0)]);
        let b = map(&[("a", -63.0), ("b", -66.0), ("only_b", -99.0)]);
        assert_eq!(euclidean(&a, &b), Some(5.0));
        assert_eq!(manhattan(&a, &b), Some(7.0));
        assert_eq!(mae(&a, &b), Some(3.5));
    }
}
