use bleloc_fingerprint::FingerprintError;
use bleloc_profile::ProfileError;
use thiserror::Error;

/// Errors returned by [`Locator`](crate::Locator) operations.
#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("locator: validation: {0}")]
    Validation(String),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl LocatorError {
    /// True if the request itself was rejected, as opposed to a storage
    /// failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LocatorError::Validation(_)
                | LocatorError::Fingerprint(FingerprintError::Validation(_))
                | LocatorError::Profile(ProfileError::Validation(_))
        )
    }
}
