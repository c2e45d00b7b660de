// src/data.rs
//
// Record shapes flowing through the pipeline.
//
// - RawRecord: what an adapter hands over. One variant per upstream system;
//              the core never assumes a shared schema between them.
// - CanonicalRecord: the uniform unit the normalizer emits and the summary
//                    store holds. Keyed by (period, source, metric_key).

use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use crate::core::Period;
use crate::error::Error;

/// Auxiliary key → value pairs. Sorted so serialization is deterministic.
pub type Metadata = BTreeMap<String, String>;

/* ---------------- Source tag ---------------- */

/// Which adapter produced a record. Declaration order is the store's
/// secondary sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Portal,
    Database,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Portal, Source::Database];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Portal => "portal",
            Source::Database => "database",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portal" => Ok(Source::Portal),
            "database" => Ok(Source::Database),
            other => Err(Error::Config(format!("unknown source: {other:?}"))),
        }
    }
}

/* ---------------- Measurement value ---------------- */

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

/// Marks a text cell that would otherwise read back as a number.
const TEXT_MARK: char = '\'';

impl Value {
    /// Read a stored cell back. A leading `'` marks text; otherwise finite
    /// numbers first, text for everything else.
    pub fn from_cell(cell: &str) -> Self {
        if let Some(text) = cell.strip_prefix(TEXT_MARK) {
            return Value::Text(s!(text));
        }
        match cell.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(s!(cell)),
        }
    }

    /// Stored form; `from_cell(v.to_cell()) == v` for every valid value.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::Text(t) if t.starts_with(TEXT_MARK) || t.trim().parse::<f64>().is_ok() => {
                format!("{TEXT_MARK}{t}")
            }
            Value::Text(t) => t.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Value::Number(n) => n.is_finite(),
            Value::Text(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display is already shortest-roundtrip: 120.0 → "120"
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(t) => f.write_str(t),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self { Value::Number(n as f64) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}

/* ---------------- Canonical record ---------------- */

/// Uniqueness and ordering key of the summary store.
pub type RecordKey<'a> = (Period, Source, &'a str);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub period: Period,
    pub source: Source,
    pub metric_key: String,
    pub value: Value,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CanonicalRecord {
    pub fn new(period: Period, source: Source, metric_key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            period,
            source,
            metric_key: metric_key.into(),
            value: value.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn key(&self) -> RecordKey<'_> {
        (self.period, self.source, self.metric_key.as_str())
    }

    /// Order by (period, source, metric_key).
    pub fn cmp_key(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }

    /// Every required field present and well-formed.
    pub fn validate(&self) -> Result<(), String> {
        if self.metric_key.trim().is_empty() {
            return Err(s!("empty metric key"));
        }
        if self.metric_key.trim() != self.metric_key {
            return Err(format!("metric key {:?} has surrounding whitespace", self.metric_key));
        }
        if !self.value.is_valid() {
            return Err(format!("non-finite value for {}", self.metric_key));
        }
        Ok(())
    }
}

/* ---------------- Raw adapter output ---------------- */

/// One row of a portal report export (CSV, header row gives the field names).
#[derive(Clone, Debug, PartialEq)]
pub struct PortalRow {
    pub report: String,
    /// 1-based data line within the export, for skip reports.
    pub line: usize,
    pub fields: BTreeMap<String, String>,
}

/// One record of a hosted-table export page.
#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseRow {
    pub table: String,
    pub id: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RawRecord {
    Portal(PortalRow),
    Database(DatabaseRow),
}

impl RawRecord {
    pub fn source(&self) -> Source {
        match self {
            RawRecord::Portal(_) => Source::Portal,
            RawRecord::Database(_) => Source::Database,
        }
    }

    /// Report or table name this record came from.
    pub fn feed(&self) -> &str {
        match self {
            RawRecord::Portal(r) => &r.report,
            RawRecord::Database(r) => &r.table,
        }
    }

    /// Short identifier for logs and skip reports.
    pub fn locator(&self) -> String {
        match self {
            RawRecord::Portal(r) => format!("line {}", r.line),
            RawRecord::Database(r) => format!("id {}", r.id),
        }
    }
}
