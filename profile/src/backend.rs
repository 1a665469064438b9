//! Durable storage for the profile document.
//!
//! The whole collection is one document, `{ key: { beacon: median } }`, and
//! every save or delete is a read-modify-write of that document.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::ProfileError;
use crate::median::MedianProfile;

/// Profile key → median profile.
pub type ProfileDocument = BTreeMap<String, MedianProfile>;

/// Loads and stores the full profile document.
///
/// Implementations must be safe for concurrent use. Use [`MemoryBackend`]
/// for tests and [`JsonFileBackend`] for persistence.
pub trait ProfileBackend: Send + Sync {
    /// Reads the document. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> Result<Option<ProfileDocument>, ProfileError>;

    /// Replaces the document.
    fn store(&self, doc: &ProfileDocument) -> Result<(), ProfileError>;
}

/// In-memory [`ProfileBackend`].
#[derive(Default)]
pub struct MemoryBackend {
    doc: Mutex<Option<ProfileDocument>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: ProfileDocument) -> Self {
        Self {
            doc: Mutex::new(Some(doc)),
        }
    }
}

impl ProfileBackend for MemoryBackend {
    fn load(&self) -> Result<Option<ProfileDocument>, ProfileError> {
        Ok(self.doc.lock().clone())
    }

    fn store(&self, doc: &ProfileDocument) -> Result<(), ProfileError> {
        *self.doc.lock() = Some(doc.clone());
        Ok(())
    }
}

/// Pretty-printed JSON file [`ProfileBackend`].
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<ProfileDocument>, ProfileError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProfileError::StorageRead(e.to_string())),
        };
        if text.trim().is_empty() {
            return Ok(Some(ProfileDocument::new()));
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ProfileError::StorageRead(format!("{}: {e}", self.path.display())))
    }

    fn store(&self, doc: &ProfileDocument) -> Result<(), ProfileError> {
        let write_err = |e: std::io::Error| ProfileError::StorageWrite(e.to_string());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let body = serde_json::to_string_pretty(doc)
            .map_err(|e| ProfileError::StorageWrite(e.to_string()))?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, body).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use bleloc_fingerprint::BeaconId;

    use super::*;

    fn doc() -> ProfileDocument {
        let mut p = MedianProfile::new();
        p.insert(BeaconId::from_token("FDA50693-A4E2-4FB1-AFCF-C6EB07647825-10835-1012"), -63.0);
        p.insert(BeaconId::from_token("FDA50693-A4E2-4FB1-AFCF-C6EB07647825-10835-1094"), -60.5);
        let mut d = ProfileDocument::new();
        d.insert("lobby_1".into(), p);
        d
    }

    #[test]
    fn memory_backend() {
        let b = MemoryBackend::new();
        assert_eq!(b.load().unwrap(), None);
        b.store(&doc()).unwrap();
        assert_eq!(b.load().unwrap(), Some(doc()));
    }

    #[test]
    fn json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let b = JsonFileBackend::new(dir.path().join("data/median_data.json"));
        assert_eq!(b.load().unwrap(), None);
        b.store(&doc()).unwrap();
        assert_eq!(b.load().unwrap(), Some(doc()));

        let text = fs::read_to_string(b.path()).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            raw["lobby_1"]["FDA50693-A4E2-4FB1-AFCF-C6EB07647825-10835-1012"],
            serde_json::json!(-63.0)
        );
    }

    #[test]
    fn json_corrupt_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("median_data.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileBackend::new(&path).load(),
            Err(ProfileError::StorageRead(_))
        ));
    }
}
