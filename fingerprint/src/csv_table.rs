//! CSV-backed [`FingerprintTable`].
//!
//! Layout:
//!
//! ```text
//! region_id,x,y,device,time_slot,heading,<beacon 1>,<beacon 2>,...
//! 3,1.5,2.0,pixel,am,north,-61,-100,...
//! ```
//!
//! The first six columns are fixed metadata; every following column is one
//! beacon token in discovery order. Metadata cells may be empty. RSSI cells
//! that are empty or unparseable load as [`RSSI_PAD`]. Rows whose region id
//! is missing or unparseable are skipped with a warning.
//!
//! Header tokens are canonicalized on load (see [`BeaconId::canonical`]).
//! Header columns that canonicalize to the same beacon are merged; the first
//! heard value in a row wins.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::beacon::{BeaconId, RSSI_PAD};
use crate::error::FingerprintError;
use crate::meta::{Sample, SampleMeta};
use crate::table::{FingerprintTable, TableData};

/// Fixed leading columns of the table.
pub const META_COLUMNS: [&str; 6] = ["region_id", "x", "y", "device", "time_slot", "heading"];

/// A fingerprint table stored as one CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn ensure_parent(&self) -> Result<(), FingerprintError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        Ok(())
    }
}

fn read_err(e: impl std::fmt::Display) -> FingerprintError {
    FingerprintError::StorageRead(e.to_string())
}

fn write_err(e: impl std::fmt::Display) -> FingerprintError {
    FingerprintError::StorageWrite(e.to_string())
}

fn header(columns: &[BeaconId]) -> Vec<String> {
    META_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .chain(columns.iter().map(|c| c.to_string()))
        .collect()
}

fn record(sample: &Sample) -> Vec<String> {
    let m = &sample.meta;
    let opt_f64 = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    let opt_str = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut out = Vec::with_capacity(META_COLUMNS.len() + sample.rssi.len());
    out.push(m.region_id.map(|r| r.to_string()).unwrap_or_default());
    out.push(opt_f64(m.x));
    out.push(opt_f64(m.y));
    out.push(opt_str(&m.device));
    out.push(opt_str(&m.time_slot));
    out.push(opt_str(&m.heading));
    out.extend(sample.rssi.iter().map(|v| v.to_string()));
    out
}

fn non_empty(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|s| !s.is_empty())
}

/// `slots[j]` is the column index of the j-th beacon cell in the file.
fn parse_row(rec: &csv::StringRecord, slots: &[usize], width: usize) -> Option<Sample> {
    if rec.len() < META_COLUMNS.len() {
        return None;
    }
    let region_id = non_empty(rec.get(0))?.parse().ok()?;
    let meta = SampleMeta {
        region_id: Some(region_id),
        x: non_empty(rec.get(1)).and_then(|s| s.parse().ok()),
        y: non_empty(rec.get(2)).and_then(|s| s.parse().ok()),
        device: non_empty(rec.get(3)).map(String::from),
        time_slot: non_empty(rec.get(4)).map(String::from),
        heading: non_empty(rec.get(5)).map(String::from),
    };
    let mut rssi = vec![RSSI_PAD; width];
    for (j, &slot) in slots.iter().enumerate() {
        let value = non_empty(rec.get(META_COLUMNS.len() + j)).and_then(|s| s.parse().ok());
        if let Some(v) = value {
            if rssi[slot] == RSSI_PAD {
                rssi[slot] = v;
            }
        }
    }
    Some(Sample { meta, rssi })
}

impl FingerprintTable for CsvTable {
    fn load(&self) -> Result<Option<TableData>, FingerprintError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_err(e)),
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut records = reader.records();
        let head = match records.next() {
            None => return Ok(Some(TableData::default())),
            Some(head) => head.map_err(read_err)?,
        };
        let mut columns: Vec<BeaconId> = Vec::new();
        let mut slots = Vec::new();
        for token in head.iter().skip(META_COLUMNS.len()) {
            let id = BeaconId::canonical(token);
            match columns.iter().position(|c| *c == id) {
                Some(slot) => {
                    warn!("fingerprint: merging duplicate column {id} in {}", self.path.display());
                    slots.push(slot);
                }
                None => {
                    slots.push(columns.len());
                    columns.push(id);
                }
            }
        }

        let width = columns.len();
        let mut samples = Vec::new();
        for (line, rec) in records.enumerate() {
            let rec = rec.map_err(read_err)?;
            match parse_row(&rec, &slots, width) {
                Some(s) => samples.push(s),
                None => warn!(
                    "fingerprint: skipping row {} of {}: missing or invalid region id",
                    line + 2,
                    self.path.display()
                ),
            }
        }
        debug!(
            "fingerprint: read {} rows x {} beacons from {}",
            samples.len(),
            width,
            self.path.display()
        );
        Ok(Some(TableData { columns, samples }))
    }

    fn rewrite(&self, columns: &[BeaconId], samples: &[Sample]) -> Result<(), FingerprintError> {
        self.ensure_parent()?;
        let tmp = self.tmp_path();
        {
            let mut w = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .map_err(write_err)?;
            w.write_record(header(columns)).map_err(write_err)?;
            for s in samples {
                w.write_record(record(s)).map_err(write_err)?;
            }
            w.flush().map_err(write_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(write_err)
    }

    fn append(&self, columns: &[BeaconId], sample: &Sample) -> Result<(), FingerprintError> {
        self.ensure_parent()?;
        let fresh = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        let mut w = csv::WriterBuilder::new().flexible(true).from_writer(file);
        if fresh {
            w.write_record(header(columns)).map_err(write_err)?;
        }
        w.write_record(record(sample)).map_err(write_err)?;
        w.flush().map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(region: i64, rssi: Vec<f64>) -> Sample {
        Sample {
            meta: SampleMeta::region(region),
            rssi,
        }
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let t = CsvTable::new(dir.path().join("absent.csv"));
        assert_eq!(t.load().unwrap(), None);
    }

    #[test]
    fn empty_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert_eq!(CsvTable::new(&path).load().unwrap(), Some(TableData::default()));
    }

    #[test]
    fn rewrite_then_append_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let t = CsvTable::new(dir.path().join("nested/fp.csv"));
        let cols = vec![BeaconId::from_token("A-1-1"), BeaconId::from_token("A-1-2")];

        let mut first = sample(1, vec![-60.0, -72.5]);
        first.meta.x = Some(1.5);
        first.meta.device = Some("pixel, 7".into());
        t.rewrite(&cols, std::slice::from_ref(&first)).unwrap();

        let second = sample(2, vec![-100.0, -64.0]);
        t.append(&cols, &second).unwrap();

        let data = t.load().unwrap().unwrap();
        assert_eq!(data.columns, cols);
        assert_eq!(data.samples, vec![first, second]);
    }

    #[test]
    fn append_creates_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.csv");
        let t = CsvTable::new(&path);
        t.append(&[], &sample(4, vec![])).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("region_id,x,y,device,time_slot,heading"));
        let data = t.load().unwrap().unwrap();
        assert!(data.columns.is_empty());
        assert_eq!(data.samples, vec![sample(4, vec![])]);
    }

    #[test]
    fn bad_rows_and_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.csv");
        fs::write(
            &path,
            "region_id,x,y,device,time_slot,heading,B1,B2\n\
             1,,,,,,-60,junk\n\
             abc,,,,,,-60,-61\n\
             ,,,,,,-60,-61\n\
             2,,,\n\
             3,,,,,,-70\n",
        )
        .unwrap();

        let data = CsvTable::new(&path).load().unwrap().unwrap();
        assert_eq!(data.columns.len(), 2);
        assert_eq!(
            data.samples,
            vec![sample(1, vec![-60.0, RSSI_PAD]), sample(3, vec![-70.0, RSSI_PAD])]
        );
    }

    #[test]
    fn lowercase_header_matches_live_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.csv");
        fs::write(
            &path,
            "region_id,x,y,device,time_slot,heading,\
             fda50693-a4e2-4fb1-afcf-c6eb07647825-10835-1012,\
             FDA50693-A4E2-4FB1-AFCF-C6EB07647825-10835-1012,\
             fda50693-a4e2-4fb1-afcf-c6eb07647825-10835-1094\n\
             1,,,,,,-60,,-70\n\
             2,,,,,,,-65,-75\n",
        )
        .unwrap();

        let data = CsvTable::new(&path).load().unwrap().unwrap();
        let uuid = "FDA50693-A4E2-4FB1-AFCF-C6EB07647825";
        assert_eq!(
            data.columns,
            vec![BeaconId::new(uuid, 10835, 1012), BeaconId::new(uuid, 10835, 1094)]
        );
        assert_eq!(
            data.samples,
            vec![sample(1, vec![-60.0, -70.0]), sample(2, vec![-65.0, -75.0])]
        );
    }
}
