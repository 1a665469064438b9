use thiserror::Error;

/// Errors returned by fingerprint store operations.
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("fingerprint: validation: {0}")]
    Validation(String),

    #[error("fingerprint: storage read: {0}")]
    StorageRead(String),

    #[error("fingerprint: storage write: {0}")]
    StorageWrite(String),
}
