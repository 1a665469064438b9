//! Stateless similarity and distance metrics for RSSI fingerprints.
//!
//! Keyed functions compare two maps over the intersection of their keys,
//! sorted ascending. Maps with no common key carry no information: similarity
//! functions return 0 and distance functions return `None`.
//!
//! ```
//! use std::collections::BTreeMap;
//! use bleloc_similarity::{cosine, euclidean, Metric};
//!
//! let a: BTreeMap<&str, f64> = [("a", -60.0), ("b", -70.0)].into();
//! let b: BTreeMap<&str, f64> = [("a", -61.0), ("b", -72.0), ("c", -80.0)].into();
//!
//! assert!(cosine(&a, &b) > 0.99);
//! assert!(euclidean(&a, &b).is_some());
//! assert_eq!(Metric::Cosine.score(&a, &b), Some(cosine(&a, &b)));
//! ```

pub mod align;
pub mod error;
pub mod metric;
pub mod vector;

pub use align::{
    Aligned, align, centered_cosine, cosine, cosine_milliwatt, euclidean, mae, manhattan, pearson,
    spearman,
};
pub use error::SimilarityError;
pub use metric::{Metric, Report, compare};
