use std::collections::HashMap;

use crate::beacon::{BeaconId, RSSI_PAD, RssiMap};
use crate::meta::{RegionId, Sample, SampleMeta};
use crate::table::TableData;

/// Labeled samples over an append-only set of beacon columns.
///
/// Invariants:
/// - every row has exactly `columns.len()` entries;
/// - columns are only ever appended, never removed or reordered;
/// - `rows`, `labels` and `metas` share one index space.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    columns: Vec<BeaconId>,
    index: HashMap<BeaconId, usize>,
    rows: Vec<Vec<f64>>,
    labels: Vec<RegionId>,
    metas: Vec<SampleMeta>,
}

/// Immutable copy of the matrix handed to readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub columns: Vec<BeaconId>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<RegionId>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Projects a sparse map onto this snapshot's column order.
    pub fn project(&self, rssi: &RssiMap) -> Vec<f64> {
        project(&self.columns, rssi)
    }
}

fn project(columns: &[BeaconId], rssi: &RssiMap) -> Vec<f64> {
    columns
        .iter()
        .map(|c| rssi.get(c).copied().unwrap_or(RSSI_PAD))
        .collect()
}

impl FeatureMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a matrix from persisted data.
    ///
    /// Samples without a region id are dropped. Rows shorter or longer than
    /// the header are padded with [`RSSI_PAD`] or truncated so the width
    /// invariant holds no matter what the backend returned.
    pub fn from_table(data: TableData) -> Self {
        let mut m = Self::new();
        m.migrate(data.columns);
        let width = m.columns.len();
        for sample in data.samples {
            let Some(region) = sample.meta.region_id else {
                continue;
            };
            let mut row = sample.rssi;
            row.resize(width, RSSI_PAD);
            m.rows.push(row);
            m.labels.push(region);
            m.metas.push(sample.meta);
        }
        m
    }

    pub fn columns(&self) -> &[BeaconId] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn labels(&self) -> &[RegionId] {
        &self.labels
    }

    pub fn metas(&self) -> &[SampleMeta] {
        &self.metas
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn sample_count(&self) -> usize {
        self.labels.len()
    }

    pub fn contains(&self, id: &BeaconId) -> bool {
        self.index.contains_key(id)
    }

    /// Beacons in `rssi` that have no column yet, in token order.
    pub fn unseen(&self, rssi: &RssiMap) -> Vec<BeaconId> {
        rssi.keys().filter(|id| !self.contains(id)).cloned().collect()
    }

    /// Appends `new_columns` to the schema and rebuilds every row into a
    /// buffer of the new width, padding the added cells with [`RSSI_PAD`].
    ///
    /// Existing cells keep their values and positions. Ids that are already
    /// columns (or repeated within `new_columns`) are ignored. Returns the
    /// number of columns actually added.
    pub fn migrate(&mut self, new_columns: Vec<BeaconId>) -> usize {
        let before = self.columns.len();
        for id in new_columns {
            if self.index.contains_key(&id) {
                continue;
            }
            self.index.insert(id.clone(), self.columns.len());
            self.columns.push(id);
        }
        let width = self.columns.len();
        if width == before {
            return 0;
        }

        self.rows = std::mem::take(&mut self.rows)
            .into_iter()
            .map(|old| {
                let mut row = Vec::with_capacity(width);
                row.extend_from_slice(&old);
                row.resize(width, RSSI_PAD);
                row
            })
            .collect();
        width - before
    }

    /// Projects a sparse map onto the current column order.
    pub fn project(&self, rssi: &RssiMap) -> Vec<f64> {
        project(&self.columns, rssi)
    }

    /// Appends one projected row with its label and metadata.
    pub(crate) fn push(&mut self, region: RegionId, meta: SampleMeta, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
        self.labels.push(region);
        self.metas.push(meta);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            labels: self.labels.clone(),
        }
    }

    /// All samples in row order, for a full rewrite of durable storage.
    pub fn samples(&self) -> Vec<Sample> {
        self.metas
            .iter()
            .zip(&self.rows)
            .map(|(meta, row)| Sample {
                meta: meta.clone(),
                rssi: row.clone(),
            })
            .collect()
    }
}
