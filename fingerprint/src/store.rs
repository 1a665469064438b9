use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{error, info};

use crate::beacon::RssiMap;
use crate::error::FingerprintError;
use crate::matrix::{FeatureMatrix, Snapshot};
use crate::meta::{Sample, SampleMeta};
use crate::table::{FingerprintTable, MemoryTable};

/// Result of a successful [`FingerprintStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Columns added by this append (0 if the schema was unchanged).
    pub new_columns: usize,
    pub column_count: usize,
    pub sample_count: usize,
}

/// Owns the fingerprint matrix and its durable mirror.
///
/// Thread-safe: any number of readers may snapshot concurrently. `append`
/// and `reload` take the write lock and keep it across the durable write, so
/// readers never see a column count that disagrees with a row's length.
///
/// After a failed durable write the table is marked stale and every later
/// append rewrites it in full until one succeeds.
pub struct FingerprintStore {
    matrix: RwLock<FeatureMatrix>,
    table: Box<dyn FingerprintTable>,
    /// Durable copy lags the matrix. Only touched under the write lock.
    stale: AtomicBool,
}

impl FingerprintStore {
    /// Creates a store and loads whatever `table` already holds.
    ///
    /// A read failure is logged and leaves the store empty but usable.
    pub fn new(table: Box<dyn FingerprintTable>) -> Self {
        let store = Self {
            matrix: RwLock::new(FeatureMatrix::new()),
            table,
            stale: AtomicBool::new(false),
        };
        if let Err(e) = store.reload() {
            error!("{e}; starting with an empty fingerprint set");
        }
        store
    }

    /// Creates a store backed by a [`MemoryTable`].
    pub fn with_memory_table() -> Self {
        Self::new(Box::new(MemoryTable::new()))
    }

    /// Replaces the in-memory matrix with the durable copy.
    ///
    /// A missing backing resource yields an empty schema. On a read failure
    /// the store is reset to empty and the error returned.
    pub fn reload(&self) -> Result<(), FingerprintError> {
        let mut matrix = self.matrix.write();
        self.stale.store(false, Ordering::Relaxed);
        match self.table.load() {
            Ok(Some(data)) => {
                *matrix = FeatureMatrix::from_table(data);
                info!(
                    "fingerprint: loaded {} samples over {} beacons",
                    matrix.sample_count(),
                    matrix.column_count()
                );
                Ok(())
            }
            Ok(None) => {
                *matrix = FeatureMatrix::new();
                info!("fingerprint: no stored table, starting empty");
                Ok(())
            }
            Err(e) => {
                *matrix = FeatureMatrix::new();
                Err(e)
            }
        }
    }

    /// Appends one labeled sample, growing the schema for unseen beacons.
    ///
    /// New beacons become columns (in token order) and every existing row is
    /// padded for them; the durable table is then rewritten in full.
    /// Otherwise a single row is appended to it. Durable write failures are
    /// logged and do not undo the in-memory append.
    pub fn append(&self, meta: SampleMeta, rssi: &RssiMap) -> Result<AppendOutcome, FingerprintError> {
        let Some(region) = meta.region_id else {
            return Err(FingerprintError::Validation("region_id is required".into()));
        };

        let mut matrix = self.matrix.write();
        let unseen = matrix.unseen(rssi);
        let new_columns = if unseen.is_empty() {
            0
        } else {
            let added = matrix.migrate(unseen);
            info!(
                "fingerprint: schema grew by {} to {} beacons",
                added,
                matrix.column_count()
            );
            added
        };

        let row = matrix.project(rssi);
        matrix.push(region, meta.clone(), row.clone());

        let full = new_columns > 0 || self.stale.load(Ordering::Relaxed);
        let written = if full {
            self.table.rewrite(matrix.columns(), &matrix.samples())
        } else {
            self.table.append(matrix.columns(), &Sample { meta, rssi: row })
        };
        match written {
            Ok(()) => {
                if self.stale.swap(false, Ordering::Relaxed) {
                    info!("fingerprint: durable table caught up");
                }
            }
            Err(e) => {
                self.stale.store(true, Ordering::Relaxed);
                error!("{e}; in-memory sample kept, next append rewrites the table");
            }
        }

        Ok(AppendOutcome {
            new_columns,
            column_count: matrix.column_count(),
            sample_count: matrix.sample_count(),
        })
    }

    /// Returns an immutable copy of columns, rows and labels.
    pub fn snapshot(&self) -> Snapshot {
        self.matrix.read().snapshot()
    }

    pub fn column_count(&self) -> usize {
        self.matrix.read().column_count()
    }

    pub fn sample_count(&self) -> usize {
        self.matrix.read().sample_count()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::beacon::{BeaconId, RSSI_PAD};
    use crate::csv_table::CsvTable;
    use crate::table::TableData;

    fn id(t: &str) -> BeaconId {
        BeaconId::from_token(t)
    }

    fn map(entries: &[(&str, f64)]) -> RssiMap {
        entries.iter().map(|(k, v)| (id(k), *v)).collect()
    }

    struct BrokenTable;

    impl FingerprintTable for BrokenTable {
        fn load(&self) -> Result<Option<TableData>, FingerprintError> {
            Err(FingerprintError::StorageRead("disk on fire".into()))
        }
        fn rewrite(&self, _: &[BeaconId], _: &[Sample]) -> Result<(), FingerprintError> {
            Err(FingerprintError::StorageWrite("disk on fire".into()))
        }
        fn append(&self, _: &[BeaconId], _: &Sample) -> Result<(), FingerprintError> {
            Err(FingerprintError::StorageWrite("disk on fire".into()))
        }
    }

    /// Shares one MemoryTable between stores to model a reload.
    struct Shared(Arc<MemoryTable>);

    impl FingerprintTable for Shared {
        fn load(&self) -> Result<Option<TableData>, FingerprintError> {
            self.0.load()
        }
        fn rewrite(&self, c: &[BeaconId], s: &[Sample]) -> Result<(), FingerprintError> {
            self.0.rewrite(c, s)
        }
        fn append(&self, c: &[BeaconId], s: &Sample) -> Result<(), FingerprintError> {
            self.0.append(c, s)
        }
    }

    #[test]
    fn empty_bootstrap() {
        let store = FingerprintStore::with_memory_table();
        assert_eq!(store.column_count(), 0);
        assert_eq!(store.sample_count(), 0);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn append_requires_region() {
        let store = FingerprintStore::with_memory_table();
        let err = store.append(SampleMeta::default(), &map(&[("a", -60.0)])).unwrap_err();
        assert!(matches!(err, FingerprintError::Validation(_)));
        assert_eq!(store.sample_count(), 0);
        assert_eq!(store.column_count(), 0);
    }

    #[test]
    fn counts_grow_monotonically() {
        let store = FingerprintStore::with_memory_table();
        let inputs = [
            map(&[("a", -60.0)]),
            map(&[("a", -61.0), ("b", -70.0)]),
            map(&[("b", -71.0)]),
            map(&[]),
            map(&[("c", -80.0), ("a", -62.0)]),
        ];
        let mut cols = 0;
        for (i, m) in inputs.iter().enumerate() {
            let out = store.append(SampleMeta::region(1), m).unwrap();
            assert!(out.column_count >= cols);
            cols = out.column_count;
            assert_eq!(out.sample_count, i + 1);
            assert_eq!(store.sample_count(), i + 1);
        }
        assert_eq!(cols, 3);
    }

    #[test]
    fn new_beacon_pads_prior_rows() {
        let store = FingerprintStore::with_memory_table();
        store.append(SampleMeta::region(1), &map(&[("a", -60.0), ("b", -65.0)])).unwrap();
        store.append(SampleMeta::region(2), &map(&[("b", -75.0)])).unwrap();
        let before = store.snapshot();

        let out = store
            .append(SampleMeta::region(3), &map(&[("d", -55.0), ("c", -58.0)]))
            .unwrap();
        assert_eq!(out.new_columns, 2);

        let after = store.snapshot();
        assert_eq!(after.columns, vec![id("a"), id("b"), id("c"), id("d")]);
        for (old, new) in before.rows.iter().zip(&after.rows) {
            assert_eq!(&new[..old.len()], old.as_slice());
            assert!(new[old.len()..].iter().all(|&v| v == RSSI_PAD));
        }
        assert_eq!(after.rows[2], vec![RSSI_PAD, RSSI_PAD, -58.0, -55.0]);
        assert!(after.rows.iter().all(|r| r.len() == after.columns.len()));
        assert_eq!(after.labels, vec![1, 2, 3]);
    }

    #[test]
    fn reload_reconstructs_snapshot() {
        let table = Arc::new(MemoryTable::new());
        let store = FingerprintStore::new(Box::new(Shared(table.clone())));
        store.append(SampleMeta::region(1), &map(&[("a", -60.0)])).unwrap();
        store.append(SampleMeta::region(1), &map(&[("a", -62.0)])).unwrap();
        store.append(SampleMeta::region(2), &map(&[("b", -70.0)])).unwrap();
        let before = store.snapshot();

        store.reload().unwrap();
        assert_eq!(store.snapshot(), before);

        let fresh = FingerprintStore::new(Box::new(Shared(table)));
        assert_eq!(fresh.snapshot(), before);
    }

    #[test]
    fn read_failure_degrades_to_empty() {
        let store = FingerprintStore::new(Box::new(BrokenTable));
        assert_eq!(store.sample_count(), 0);
        assert!(matches!(store.reload(), Err(FingerprintError::StorageRead(_))));
    }

    #[test]
    fn write_failure_keeps_memory() {
        let store = FingerprintStore::new(Box::new(BrokenTable));
        let out = store.append(SampleMeta::region(1), &map(&[("a", -60.0)])).unwrap();
        assert_eq!(out.sample_count, 1);
        store.append(SampleMeta::region(1), &map(&[("a", -61.0)])).unwrap();
        assert_eq!(store.sample_count(), 2);
    }

    #[test]
    fn failed_rewrite_is_repaired_by_next_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.csv");
        let blocker = dir.path().join("fp.csv.tmp");
        let store = FingerprintStore::new(Box::new(CsvTable::new(&path)));

        store.append(SampleMeta::region(1), &map(&[("a", -60.0)])).unwrap();
        // A directory in the temp file's place makes the rewrite fail.
        std::fs::create_dir(&blocker).unwrap();
        store
            .append(SampleMeta::region(2), &map(&[("a", -70.0), ("b", -50.0)]))
            .unwrap();
        std::fs::remove_dir(&blocker).unwrap();
        store
            .append(SampleMeta::region(3), &map(&[("a", -71.0), ("b", -51.0)]))
            .unwrap();

        let before = store.snapshot();
        assert_eq!(before.labels, vec![1, 2, 3]);
        store.reload().unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn concurrent_appends_keep_invariants() {
        let store = Arc::new(FingerprintStore::with_memory_table());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let key = format!("b{}", (t * 25 + i) % 13);
                        let m = map(&[(key.as_str(), -60.0 - i as f64)]);
                        store.append(SampleMeta::region(t), &m).unwrap();
                        let snap = store.snapshot();
                        assert_eq!(snap.rows.len(), snap.labels.len());
                        assert!(snap.rows.iter().all(|r| r.len() == snap.columns.len()));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.sample_count(), 100);
        assert_eq!(store.column_count(), 13);
    }
}
