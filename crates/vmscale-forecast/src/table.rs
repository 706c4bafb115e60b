//! Prediction table — sparse `(unit, slot)` → forecast map.
//!
//! Built once from a CSV file with a single header line and six positional
//! columns:
//!
//! ```text
//! slot,unit_id,target_cpu_future,target_high_load,pred_cpu_future,pred_high_load
//! 0,1,35.2,0,41.7,0
//! ```
//!
//! Any malformed row aborts the whole load. Lookups of keys outside the
//! table return `None`; that is the normal "no signal this tick" case.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::record::ForecastRecord;

const COLUMNS: usize = 6;

/// Positional layout of one data row.
type RawRow = (u64, i64, f64, u8, f64, u8);

/// Read-only forecast lookup table.
#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    records: HashMap<(i64, u64), ForecastRecord>,
    unit_count: usize,
    duplicates: usize,
}

impl PredictionTable {
    /// Load a table from a CSV file on disk.
    pub fn load(path: &Path) -> LoadResult<Self> {
        info!(path = %path.display(), "loading forecast table");
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Load a table from any reader. `origin` names the source in errors.
    pub fn from_reader<R: Read>(reader: R, origin: &str) -> LoadResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut records = HashMap::new();
        let mut units = HashSet::new();
        let mut duplicates = 0;

        for result in rdr.records() {
            let row = result.map_err(|source| LoadError::Read {
                origin: origin.to_string(),
                source,
            })?;
            let rec = parse_row(&row, origin)?;

            units.insert(rec.unit_id);
            if let Some(prev) = records.insert((rec.unit_id, rec.slot), rec) {
                duplicates += 1;
                debug!(
                    unit = prev.unit_id,
                    slot = prev.slot,
                    "duplicate forecast key, keeping the later row"
                );
            }
        }

        if records.is_empty() {
            return Err(LoadError::Empty(origin.to_string()));
        }

        if duplicates > 0 {
            warn!(%origin, duplicates, "forecast table contains duplicate keys");
        }

        info!(
            %origin,
            records = records.len(),
            units = units.len(),
            "forecast table loaded"
        );

        Ok(Self {
            records,
            unit_count: units.len(),
            duplicates,
        })
    }

    /// Forecast for `unit_id` at `slot`, if the table has one.
    pub fn lookup(&self, unit_id: i64, slot: u64) -> Option<&ForecastRecord> {
        self.records.get(&(unit_id, slot))
    }

    /// Number of distinct `(unit, slot)` keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct units with at least one forecast.
    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    /// Rows that overwrote an earlier row with the same key.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

fn parse_row(row: &StringRecord, origin: &str) -> LoadResult<ForecastRecord> {
    let line = row.position().map(|p| p.line()).unwrap_or(0);
    let malformed = |reason: String| LoadError::Malformed {
        origin: origin.to_string(),
        line,
        reason,
    };

    if row.len() != COLUMNS {
        return Err(malformed(format!(
            "expected {COLUMNS} columns, found {}",
            row.len()
        )));
    }

    let (slot, unit_id, target_cpu_future, target_high_load, pred_cpu_future, pred_high_load): RawRow =
        row.deserialize(None).map_err(|e| malformed(e.to_string()))?;

    Ok(ForecastRecord {
        slot,
        unit_id,
        target_cpu_future,
        target_high_load: flag("target_high_load", target_high_load).map_err(&malformed)?,
        pred_cpu_future,
        pred_high_load: flag("pred_high_load", pred_high_load).map_err(&malformed)?,
    })
}

fn flag(column: &str, value: u8) -> Result<bool, String> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(format!("{column} must be 0 or 1, found {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "slot,vm_id,target_cpu_future,target_high_load,pred_cpu_future,pred_high_load\n";

    fn table(body: &str) -> LoadResult<PredictionTable> {
        let csv = format!("{HEADER}{body}");
        PredictionTable::from_reader(csv.as_bytes(), "test.csv")
    }

    #[test]
    fn round_trip_every_row() {
        let body = "\
0,1,35.2,0,41.7,0
1,1,88.0,1,84.25,1
0,2,10.5,0,12.0,0
";
        let t = table(body).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.unit_count(), 2);

        let rec = t.lookup(1, 1).unwrap();
        assert_eq!(
            *rec,
            ForecastRecord {
                slot: 1,
                unit_id: 1,
                target_cpu_future: 88.0,
                target_high_load: true,
                pred_cpu_future: 84.25,
                pred_high_load: true,
            }
        );

        let rec = t.lookup(2, 0).unwrap();
        assert_eq!(rec.target_cpu_future, 10.5);
        assert_eq!(rec.pred_cpu_future, 12.0);
        assert!(!rec.pred_high_load);

        assert!(t.lookup(1, 0).is_some());
    }

    #[test]
    fn absent_keys_return_none() {
        let t = table("0,1,35.2,0,41.7,0\n").unwrap();
        assert!(t.lookup(1, 1).is_none());
        assert!(t.lookup(2, 0).is_none());
        assert!(t.lookup(-1, 0).is_none());
    }

    #[test]
    fn duplicates_last_write_wins() {
        let t = table("0,1,35.2,0,41.7,0\n0,1,50.0,0,99.0,1\n").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.duplicates(), 1);
        assert_eq!(t.lookup(1, 0).unwrap().pred_cpu_future, 99.0);
    }

    #[test]
    fn zero_bytes_is_empty() {
        let err = PredictionTable::from_reader("".as_bytes(), "empty.csv").unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn header_only_is_empty() {
        let err = table("").unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn non_numeric_field_aborts_load() {
        let err = table("0,1,35.2,0,41.7,0\n1,1,abc,0,41.7,0\n").unwrap_err();
        match err {
            LoadError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_column_count_aborts_load() {
        let err = table("0,1,35.2,0,41.7\n").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
        assert!(err.to_string().contains("expected 6 columns"));
    }

    #[test]
    fn flag_outside_zero_one_aborts_load() {
        let err = table("0,1,35.2,2,41.7,0\n").unwrap_err();
        assert!(err.to_string().contains("target_high_load"));
    }

    #[test]
    fn negative_slot_aborts_load() {
        assert!(table("-1,1,35.2,0,41.7,0\n").is_err());
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}3,7,20.0,0,25.0,0\n").unwrap();

        let t = PredictionTable::load(file.path()).unwrap();
        assert_eq!(t.lookup(7, 3).unwrap().pred_cpu_future, 25.0);
    }

    #[test]
    fn bundled_sample_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/sample_predictions.csv");
        let t = PredictionTable::load(&path).unwrap();
        assert_eq!(t.len(), 12);
        assert_eq!(t.unit_count(), 2);
        assert_eq!(t.lookup(1, 3).unwrap().pred_cpu_future, 90.3);
        assert!(t.lookup(2, 2).is_none());
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PredictionTable::load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }
}
