use thiserror::Error;

/// Errors raised inside a prediction. [`crate::KnnClassifier::predict`]
/// never returns them; it logs and degrades to an absent prediction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KnnError {
    #[error("knn: schema mismatch at row {row}: row has {got} values, query has {want}")]
    SchemaMismatch { row: usize, got: usize, want: usize },

    #[error("knn: label count {labels} does not match row count {rows}")]
    LabelMismatch { rows: usize, labels: usize },
}
