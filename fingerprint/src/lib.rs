//! Dynamic-schema fingerprint store for BLE indoor localization.
//!
//! The schema starts empty and grows as new beacons are observed: every
//! beacon becomes a column the first time a labeled sample reports it, and
//! older rows are padded with [`RSSI_PAD`] ("not heard").
//!
//! # Usage
//!
//! ```
//! use bleloc_fingerprint::{BeaconReading, FingerprintStore, SampleMeta, rssi_map};
//!
//! let store = FingerprintStore::with_memory_table();
//! let readings = vec![BeaconReading::new("fda50693-a4e2-4fb1-afcf-c6eb07647825", 10835, 1012, -63.0)];
//! store.append(SampleMeta::region(1), &rssi_map(&readings)).unwrap();
//!
//! assert_eq!(store.sample_count(), 1);
//! assert_eq!(store.column_count(), 1);
//! ```

mod beacon;
mod csv_table;
mod error;
mod matrix;
mod meta;
mod store;
mod table;

pub use beacon::{
    BeaconId, BeaconReading, RSSI_CEIL, RSSI_FLOOR, RSSI_PAD, RssiMap, is_signal, rssi_map,
    signal_map,
};
pub use csv_table::{CsvTable, META_COLUMNS};
pub use error::FingerprintError;
pub use matrix::{FeatureMatrix, Snapshot};
pub use meta::{RegionId, Sample, SampleMeta};
pub use store::{AppendOutcome, FingerprintStore};
pub use table::{FingerprintTable, MemoryTable, TableData};
