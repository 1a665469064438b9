//! Metrics over two already-aligned dense vectors.
//!
//! Every public function checks that both inputs have the same length and
//! returns [`SimilarityError::DimensionMismatch`] otherwise. Callers that go
//! through [`crate::align`] never hit that error because alignment always
//! yields equal-length vectors.

use crate::error::SimilarityError;

fn check_len(a: &[f64], b: &[f64]) -> Result<(), SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            got: b.len(),
            want: a.len(),
        });
    }
    Ok(())
}

/// Cosine similarity in `[-1, 1]`. Returns 0 when either vector has zero norm.
pub fn cosine(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    check_len(a, b)?;
    Ok(cosine_unchecked(a, b))
}

/// Cosine similarity after subtracting each vector's own mean.
pub fn centered_cosine(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    check_len(a, b)?;
    Ok(centered_cosine_unchecked(a, b))
}

/// Pearson correlation. Numerically identical to [`centered_cosine`].
pub fn pearson(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    centered_cosine(a, b)
}

/// Spearman rank correlation: Pearson over average ranks.
pub fn spearman(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    check_len(a, b)?;
    Ok(spearman_unchecked(a, b))
}

/// L2 distance.
pub fn euclidean(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    check_len(a, b)?;
    Ok(euclidean_unchecked(a, b))
}

/// L1 distance.
pub fn manhattan(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    check_len(a, b)?;
    Ok(manhattan_unchecked(a, b))
}

/// Mean absolute error: Manhattan distance divided by the vector length.
/// Zero for empty vectors.
pub fn mae(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    check_len(a, b)?;
    Ok(mae_unchecked(a, b))
}

/// Converts dBm readings to linear power: `mW = 10^(dBm/10)`.
pub fn dbm_to_milliwatt(dbm: &[f64]) -> Vec<f64> {
    dbm.iter().map(|&d| 10f64.powf(d / 10.0)).collect()
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// 1-based ranks with ties averaged.
///
/// A block of `m` equal values occupying sorted positions `[i, i+m)` gets
/// rank `(i+1 + i+m) / 2`, so `[5, 10, 10, 20]` ranks as `[1, 2.5, 2.5, 4]`.
pub fn average_ranks(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    let mut idx: Vec<usize> = (0..n).collect();
    idx.sort_by(|&i, &j| v[i].total_cmp(&v[j]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && v[idx[j]] == v[idx[i]] {
            j += 1;
        }
        let rank = ((i + 1) + j) as f64 / 2.0;
        for &k in &idx[i..j] {
            ranks[k] = rank;
        }
        i = j;
    }
    ranks
}

pub(crate) fn cosine_unchecked(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    // Clamp to [-1, 1] to absorb rounding.
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

pub(crate) fn centered_cosine_unchecked(a: &[f64], b: &[f64]) -> f64 {
    let ma = mean(a);
    let mb = mean(b);
    let ca: Vec<f64> = a.iter().map(|x| x - ma).collect();
    let cb: Vec<f64> = b.iter().map(|y| y - mb).collect();
    cosine_unchecked(&ca, &cb)
}

pub(crate) fn spearman_unchecked(a: &[f64], b: &[f64]) -> f64 {
    centered_cosine_unchecked(&average_ranks(a), &average_ranks(b))
}

pub(crate) fn euclidean_unchecked(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

pub(crate) fn manhattan_unchecked(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

pub(crate) fn mae_unchecked(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    manhattan_unchecked(a, b) / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn cosine_identical() {
        let a = [-63.0, -68.0, -73.0];
        let s = cosine(&a, &a).unwrap();
        assert!((s - 1.0).abs() < EPS, "identical: got {s}");
    }

    #[test]
    fn cosine_orthogonal_and_opposite() {
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < EPS);
        let s = cosine(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((s + 1.0).abs() < EPS, "opposite: got {s}");
    }

    #[test]
    fn cosine_zero_vector() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn cosine_in_range() {
        let pairs: [(&[f64], &[f64]); 3] = [
            (&[-60.0, -70.0, -80.0], &[-62.0, -71.0, -79.0]),
            (&[3.0, -1.0, 2.0], &[-4.0, 0.5, 9.0]),
            (&[1e-3, 7.0, -2.0], &[5.0, -5.0, 5.0]),
        ];
        for (a, b) in pairs {
            let s = cosine(a, b).unwrap();
            assert!((-1.0..=1.0).contains(&s), "out of range: {s}");
        }
    }

    #[test]
    fn pearson_equals_centered_cosine() {
        let a = [-63.0, -68.0, -73.0, -62.0, -60.5, -67.5, -68.0];
        let b = [-68.0, -67.0, -70.0, -74.0, -78.0, -68.0, -56.0];
        let p = pearson(&a, &b).unwrap();
        let c = centered_cosine(&a, &b).unwrap();
        assert!((p - c).abs() < EPS);
        assert!((-1.0..=1.0).contains(&p));
    }

    #[test]
    fn pearson_perfect_linear() {
        let p = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((p - 1.0).abs() < EPS);
    }

    #[test]
    fn ranks_with_ties() {
        assert_eq!(average_ranks(&[5.0, 10.0, 10.0, 20.0]), vec![1.0, 2.5, 2.5, 4.0]);
        assert_eq!(average_ranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
        assert_eq!(average_ranks(&[7.0, 7.0, 7.0]), vec![2.0, 2.0, 2.0]);
        assert!(average_ranks(&[]).is_empty());
    }

    #[test]
    fn ranks_order_nan_last() {
        assert_eq!(average_ranks(&[f64::NAN, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
        let nans: Vec<f64> = (0..64).map(|i| if i % 3 == 0 { f64::NAN } else { i as f64 }).collect();
        let ranks = average_ranks(&nans);
        assert!(ranks.iter().all(|r| r.is_finite()));
        assert!(spearman(&nans, &nans).unwrap().is_finite());
    }

    #[test]
    fn spearman_monotonic() {
        // Monotonic but non-linear: Spearman is exactly 1.
        let s = spearman(&[1.0, 2.0, 3.0, 4.0], &[1.0, 4.0, 9.0, 100.0]).unwrap();
        assert!((s - 1.0).abs() < EPS);
        let s = spearman(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((s + 1.0).abs() < EPS);
    }

    #[test]
    fn distances() {
        let a = [0.0, 0.0];
        let b = [3.0, -4.0];
        assert!((euclidean(&a, &b).unwrap() - 5.0).abs() < EPS);
        assert!((manhattan(&a, &b).unwrap() - 7.0).abs() < EPS);
        assert!((mae(&a, &b).unwrap() - 3.5).abs() < EPS);
        assert_eq!(mae(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn dbm_conversion() {
        let mw = dbm_to_milliwatt(&[0.0, -10.0, -20.0]);
        assert!((mw[0] - 1.0).abs() < EPS);
        assert!((mw[1] - 0.1).abs() < EPS);
        assert!((mw[2] - 0.01).abs() < EPS);
    }

    #[test]
    fn dimension_mismatch() {
        let err = cosine(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, SimilarityError::DimensionMismatch { got: 1, want: 2 });
        assert!(euclidean(&[1.0], &[]).is_err());
        assert!(spearman(&[], &[1.0]).is_err());
        assert!(mae(&[1.0], &[1.0, 2.0]).is_err());
    }
}
