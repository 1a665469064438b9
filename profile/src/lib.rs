//! Per-visit median RSSI profiles.
//!
//! A site visit is a batch of [`BATCH_SIZE`] raw frames for one region. The
//! batch is reduced to a [`MedianProfile`] (beacons heard more than
//! [`SUPPORT_THRESHOLD`] times, median RSSI each) and stored under
//! `{region}_{visit}`. Stored profiles can then be ranked against live
//! readings with any [`bleloc_similarity::Metric`].
//!
//! ```
//! use bleloc_fingerprint::BeaconReading;
//! use bleloc_profile::{BATCH_SIZE, BatchAccumulator, MedianProfileStore};
//!
//! let acc = BatchAccumulator::default();
//! let store = MedianProfileStore::with_memory_backend();
//!
//! let mut done = None;
//! for seq in 1..=BATCH_SIZE {
//!     let frame = vec![BeaconReading::new("fda50693-a4e2-4fb1-afcf-c6eb07647825", 1, 2, -60.0)];
//!     done = acc.push("lobby", seq, frame).unwrap();
//! }
//! let out = store.ingest(&done.unwrap(), "lobby").unwrap();
//! assert_eq!(out.key, "lobby_1");
//! assert_eq!(out.profile.len(), 1);
//! ```

mod backend;
mod batch;
mod error;
mod matcher;
mod median;
mod store;

pub use backend::{JsonFileBackend, MemoryBackend, ProfileBackend, ProfileDocument};
pub use batch::BatchAccumulator;
pub use error::ProfileError;
pub use matcher::{ProfileMatcher, ProfileRanking, ProfileScore};
pub use median::{BATCH_SIZE, MedianProfile, SUPPORT_THRESHOLD, aggregate, median};
pub use store::{IngestOutcome, MedianProfileStore, profile_key, split_key};
