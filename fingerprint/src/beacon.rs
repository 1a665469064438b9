use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// RSSI assigned to a beacon that was not heard in a sample.
pub const RSSI_PAD: f64 = -100.0;

/// Readings at or below this level are treated as noise.
pub const RSSI_FLOOR: f64 = -85.0;

/// Readings at or above this level are treated as noise.
pub const RSSI_CEIL: f64 = 0.0;

/// Canonical identity of a physical beacon.
///
/// Built from `(uuid, major, minor)` as `UUID-major-minor` with the uuid
/// trimmed and upper-cased. Equality, hashing and ordering all go through the
/// token, so two readings with the same token refer to the same beacon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeaconId(String);

impl BeaconId {
    pub fn new(uuid: &str, major: i64, minor: i64) -> Self {
        Self(format!("{}-{}-{}", uuid.trim().to_ascii_uppercase(), major, minor))
    }

    /// Re-canonicalizes a stored `uuid-major-minor` token, so tables
    /// written with a lowercase uuid map onto the same ids as live readings.
    /// Tokens of any other shape are kept as they are.
    pub fn canonical(token: &str) -> Self {
        let token = token.trim();
        let mut parts = token.rsplitn(3, '-');
        if let (Some(minor), Some(major), Some(uuid)) = (parts.next(), parts.next(), parts.next()) {
            if let (Ok(major), Ok(minor), false) = (major.parse::<i64>(), minor.parse::<i64>(), uuid.is_empty()) {
                return Self::new(uuid, major, minor);
            }
        }
        Self(token.to_string())
    }

    /// Wraps a token read back from storage without re-canonicalizing it.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BeaconId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sparse beacon → RSSI mapping, ordered by token.
pub type RssiMap = BTreeMap<BeaconId, f64>;

/// One raw beacon observation as reported by a receiver.
///
/// All fields are optional on the wire; a reading missing any of them is
/// unusable and gets skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeaconReading {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub major: Option<i64>,
    #[serde(default)]
    pub minor: Option<i64>,
    #[serde(default)]
    pub rssi: Option<f64>,
}

impl BeaconReading {
    pub fn new(uuid: impl Into<String>, major: i64, minor: i64, rssi: f64) -> Self {
        Self {
            uuid: Some(uuid.into()),
            major: Some(major),
            minor: Some(minor),
            rssi: Some(rssi),
        }
    }

    /// Returns the beacon id and RSSI, or `None` if any field is missing.
    pub fn parts(&self) -> Option<(BeaconId, f64)> {
        match (&self.uuid, self.major, self.minor, self.rssi) {
            (Some(uuid), Some(major), Some(minor), Some(rssi)) => {
                Some((BeaconId::new(uuid, major, minor), rssi))
            }
            _ => None,
        }
    }
}

/// Returns true if `rssi` lies in the open interval (-85, 0).
pub fn is_signal(rssi: f64) -> bool {
    rssi > RSSI_FLOOR && rssi < RSSI_CEIL
}

/// Builds a beacon map from readings, skipping incomplete ones.
/// A later reading of the same beacon overwrites an earlier one.
pub fn rssi_map(readings: &[BeaconReading]) -> RssiMap {
    readings.iter().filter_map(BeaconReading::parts).collect()
}

/// Like [`rssi_map`] but drops readings outside (-85, 0) first.
pub fn signal_map(readings: &[BeaconReading]) -> RssiMap {
    readings
        .iter()
        .filter_map(BeaconReading::parts)
        .filter(|(_, rssi)| is_signal(*rssi))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "fda50693-a4e2-4fb1-afcf-c6eb07647825";

    #[test]
    fn canonical_token() {
        let id = BeaconId::new(UUID, 10835, 1012);
        assert_eq!(id.as_str(), "FDA50693-A4E2-4FB1-AFCF-C6EB07647825-10835-1012");
        assert_eq!(id, BeaconId::new(&format!("  {}", UUID.to_uppercase()), 10835, 1012));
        assert_ne!(id, BeaconId::new(UUID, 1012, 10835));
    }

    #[test]
    fn stored_tokens_canonicalized() {
        assert_eq!(
            BeaconId::canonical(" fda50693-a4e2-4fb1-afcf-c6eb07647825-10835-1012 "),
            BeaconId::new(UUID, 10835, 1012)
        );
        assert_eq!(BeaconId::canonical("a-1-x").as_str(), "a-1-x");
        assert_eq!(BeaconId::canonical("-1-2").as_str(), "-1-2");
        assert_eq!(BeaconId::canonical("b3").as_str(), "b3");
    }

    #[test]
    fn token_serializes_as_string() {
        let id = BeaconId::from_token("A-1-2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"A-1-2\"");
    }

    #[test]
    fn incomplete_readings_skipped() {
        let readings = vec![
            BeaconReading::new(UUID, 1, 1, -60.0),
            BeaconReading {
                uuid: Some(UUID.into()),
                major: Some(1),
                minor: None,
                rssi: Some(-50.0),
            },
            BeaconReading::default(),
        ];
        let m = rssi_map(&readings);
        assert_eq!(m.len(), 1);
        assert_eq!(m[&BeaconId::new(UUID, 1, 1)], -60.0);
    }

    #[test]
    fn noise_filter_is_open_interval() {
        assert!(is_signal(-84.9));
        assert!(is_signal(-1.0));
        assert!(!is_signal(-85.0));
        assert!(!is_signal(0.0));
        assert!(!is_signal(-90.0));
        assert!(!is_signal(3.0));

        let readings = vec![
            BeaconReading::new(UUID, 1, 1, -60.0),
            BeaconReading::new(UUID, 1, 2, -85.0),
            BeaconReading::new(UUID, 1, 3, 0.0),
        ];
        let m = signal_map(&readings);
        assert_eq!(m.keys().cloned().collect::<Vec<_>>(), vec![BeaconId::new(UUID, 1, 1)]);
    }

    #[test]
    fn later_reading_wins() {
        let readings = vec![
            BeaconReading::new(UUID, 1, 1, -60.0),
            BeaconReading::new(UUID, 1, 1, -70.0),
        ];
        assert_eq!(rssi_map(&readings)[&BeaconId::new(UUID, 1, 1)], -70.0);
    }
}
