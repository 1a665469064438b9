use thiserror::Error;

/// Errors that can occur in profile operations.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("profile: validation: {0}")]
    Validation(String),

    #[error("profile: storage read: {0}")]
    StorageRead(String),

    #[error("profile: storage write: {0}")]
    StorageWrite(String),
}
