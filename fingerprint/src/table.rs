use parking_lot::Mutex;

use crate::beacon::BeaconId;
use crate::error::FingerprintError;
use crate::meta::Sample;

/// Column header plus every persisted sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub columns: Vec<BeaconId>,
    pub samples: Vec<Sample>,
}

/// Durable mirror of the fingerprint matrix.
///
/// Implementations must be safe for concurrent use. The store calls the
/// write methods while holding its own write lock, so implementations never
/// see interleaved writes from the same store.
pub trait FingerprintTable: Send + Sync {
    /// Reads the whole table. `Ok(None)` means the backing resource does not
    /// exist yet.
    fn load(&self) -> Result<Option<TableData>, FingerprintError>;

    /// Replaces the whole table.
    fn rewrite(&self, columns: &[BeaconId], samples: &[Sample]) -> Result<(), FingerprintError>;

    /// Appends one sample whose row already matches `columns`.
    fn append(&self, columns: &[BeaconId], sample: &Sample) -> Result<(), FingerprintError>;
}

/// In-memory [`FingerprintTable`]. Data is lost on restart.
#[derive(Default)]
pub struct MemoryTable {
    data: Mutex<Option<TableData>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table that already holds `data`.
    pub fn with_data(data: TableData) -> Self {
        Self {
            data: Mutex::new(Some(data)),
        }
    }

    /// Returns a copy of the stored table, if any.
    pub fn data(&self) -> Option<TableData> {
        self.data.lock().clone()
    }
}

impl FingerprintTable for MemoryTable {
    fn load(&self) -> Result<Option<TableData>, FingerprintError> {
        Ok(self.data.lock().clone())
    }

    fn rewrite(&self, columns: &[BeaconId], samples: &[Sample]) -> Result<(), FingerprintError> {
        *self.data.lock() = Some(TableData {
            columns: columns.to_vec(),
            samples: samples.to_vec(),
        });
        Ok(())
    }

    fn append(&self, columns: &[BeaconId], sample: &Sample) -> Result<(), FingerprintError> {
        let mut data = self.data.lock();
        let table = data.get_or_insert_with(|| TableData {
            columns: columns.to_vec(),
            samples: Vec::new(),
        });
        table.samples.push(sample.clone());
        Ok(())
    }
}
