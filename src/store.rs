// src/store.rs
//! The persistent summary dataset.
//!
//! `SummaryStore` is an ordered, key-unique sequence of canonical records.
//! Only the consolidator builds new store states; everything else reads.
//! On disk it is one CSV file, the same layout the dashboard reads.

use std::{collections::{HashMap, HashSet}, fs, io, path::{Path, PathBuf}};

use tracing::debug;

use crate::config::consts::STORE_HEADERS;
use crate::csv::{self, SEP};
use crate::data::{CanonicalRecord, Metadata, Period, Source, Value};
use crate::error::StoreError;
use crate::file;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryStore {
    records: Vec<CanonicalRecord>,
}

impl SummaryStore {
    pub fn new() -> Self { Self::default() }

    /// Build a store from records in any order. Sorts by the ordering key and
    /// returns the first duplicated key as an error message.
    pub(crate) fn from_records(mut records: Vec<CanonicalRecord>) -> Result<Self, String> {
        records.sort_by(CanonicalRecord::cmp_key);
        if let Some(dup) = records.windows(2).find(|w| w[0].key() == w[1].key()) {
            let (period, source, metric) = dup[0].key();
            return Err(format!("duplicate record ({period}, {source}, {metric})"));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[CanonicalRecord] { &self.records }
    pub fn into_records(self) -> Vec<CanonicalRecord> { self.records }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Distinct periods, ascending.
    pub fn periods(&self) -> Vec<Period> {
        let mut out: Vec<Period> = self.records.iter().map(|r| r.period).collect();
        out.dedup();
        out
    }

    pub fn for_period(&self, period: Period) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter().filter(move |r| r.period == period)
    }

    pub fn get(&self, period: Period, source: Source, metric: &str) -> Option<&CanonicalRecord> {
        self.records
            .binary_search_by(|r| r.key().cmp(&(period, source, metric)))
            .ok()
            .map(|i| &self.records[i])
    }

    /// Sorted and key-unique. Holds for every store this crate hands out.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.records.len());
        for (i, r) in self.records.iter().enumerate() {
            if !seen.insert(r.key()) {
                let (p, s, m) = r.key();
                return Err(format!("duplicate record ({p}, {s}, {m})"));
            }
            if i > 0 && self.records[i - 1].cmp_key(r).is_gt() {
                return Err(format!("records out of order at position {i}"));
            }
        }
        Ok(())
    }
}

/* ---------------- Serialization ---------------- */

fn metadata_cell(m: &Metadata) -> String {
    if m.is_empty() {
        return s!();
    }
    // A BTreeMap<String, String> always serializes.
    serde_json::to_string(m).unwrap_or_default()
}

fn to_row(r: &CanonicalRecord) -> Vec<String> {
    vec![
        r.period.to_string(),
        r.source.to_string(),
        r.metric_key.clone(),
        r.value.to_cell(),
        metadata_cell(&r.metadata),
    ]
}

/// Render the store as CSV text: header row, then one record per row in store order.
pub fn to_csv_string(store: &SummaryStore) -> String {
    let rows: Vec<Vec<String>> = store.records.iter().map(to_row).collect();
    csv::rows_to_string(&STORE_HEADERS, &rows, SEP)
}

/// Parse CSV text produced by `to_csv_string`.
pub fn parse_csv(text: &str) -> Result<SummaryStore, StoreError> {
    let text = crate::core::sanitize::strip_bom(text);
    let rows = csv::parse_rows(text, SEP);
    let Some((header, rows)) = csv::split_header(rows) else {
        // Zero bytes is a store that was never written to, not a corrupt one.
        return Ok(SummaryStore::new());
    };

    let header_ok = header.len() == STORE_HEADERS.len()
        && header.iter().zip(STORE_HEADERS).all(|(h, want)| h.trim().eq_ignore_ascii_case(want));
    if !header_ok {
        return Err(StoreError::Corrupt { line: 1, reason: format!("unexpected header {header:?}") });
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut first_seen: HashMap<(Period, Source, String), usize> = HashMap::new();
    for (line, row) in rows {
        let corrupt = |reason: String| StoreError::Corrupt { line, reason };
        if row.len() != STORE_HEADERS.len() {
            return Err(corrupt(format!("expected {} fields, found {}", STORE_HEADERS.len(), row.len())));
        }

        let period: Period = row[0].parse().map_err(|e| corrupt(format!("{e}")))?;
        let source: Source = row[1].parse().map_err(|e| corrupt(format!("{e}")))?;
        let metric_key = row[2].clone();
        let value = Value::from_cell(&row[3]);
        let metadata: Metadata = if row[4].trim().is_empty() {
            Metadata::new()
        } else {
            serde_json::from_str(&row[4]).map_err(|e| corrupt(format!("metadata: {e}")))?
        };

        let record = CanonicalRecord { period, source, metric_key, value, metadata };
        record.validate().map_err(corrupt)?;
        if let Some(first) = first_seen.insert((period, source, record.metric_key.clone()), line) {
            return Err(corrupt(format!("duplicate of line {first}")));
        }
        records.push(record);
    }

    SummaryStore::from_records(records).map_err(|reason| StoreError::Corrupt { line: 0, reason })
}

/* ---------------- Persistence ---------------- */

pub fn load(path: &Path) -> Result<SummaryStore, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::Missing(path.display().to_string()));
        }
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            return Err(StoreError::Corrupt { line: 0, reason: s!("not valid UTF-8") });
        }
        Err(e) => return Err(e.into()),
    };
    let store = parse_csv(&text)?;
    debug!("Loaded {} record(s) from {}", store.len(), path.display());
    Ok(store)
}

/// Replace the persisted store in one atomic step.
pub fn save(store: &SummaryStore, path: &Path) -> io::Result<PathBuf> {
    file::write_atomic(path, to_csv_string(store).as_bytes())?;
    Ok(path.to_path_buf())
}
