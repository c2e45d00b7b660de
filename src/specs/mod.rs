// src/specs/mod.rs
//! # Source specs
//!
//! One spec per upstream system. A spec knows how to read that system's raw
//! record shape: how a named field is looked up, which records are noise, and
//! how a record maps onto an `Observation` (a dated, optionally attributed
//! event) that the normalizer can roll up.
//!
//! ## What lives here
//! - Field access per shape (CSV cells vs. JSON values with lookup lists).
//! - The filter stage: configured exclude/require rules plus source-specific
//!   noise (blank rows, empty table records). Filtered records are dropped
//!   silently.
//! - The mapping stage: required fields present and parseable, else a
//!   per-record `MapError`.
//!
//! ## What does **not** live here
//! - Fetching (see `fetch`), roll-up into canonical records (see `normalize`),
//!   merging into the store (see `consolidate`).
//!
//! Specs are registered by source tag via `spec_for`.

pub mod database;
pub mod portal;

use chrono::NaiveDate;

use crate::config::options::{FeedSpec, FieldRule, Measure};
use crate::core::{dates, sanitize::same_value};
use crate::data::{RawRecord, Source};

/// A raw record reduced to what the measures need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub date: NaiveDate,
    pub person: Option<String>,
}

/// Why a record could not be mapped. Never fatal for the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapError(pub String);

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait SourceSpec: Sync {
    fn source(&self) -> Source;

    /// Text of a named field, trimmed; `None` when absent or blank.
    fn field(&self, raw: &RawRecord, name: &str) -> Option<String>;

    /// Source-specific noise that never counts (blank rows and the like).
    fn is_noise(&self, _raw: &RawRecord) -> bool { false }

    /// Filter stage. `false` drops the record silently.
    fn keep(&self, raw: &RawRecord, feed: &FeedSpec) -> bool {
        if self.is_noise(raw) { return false; }
        if feed.exclude.iter().any(|rule| self.matches(raw, rule)) { return false; }
        feed.require.iter().all(|rule| self.matches(raw, rule))
    }

    fn matches(&self, raw: &RawRecord, rule: &FieldRule) -> bool {
        match self.field(raw, &rule.field) {
            Some(v) => rule.values.iter().any(|want| same_value(&v, want)),
            None => rule.values.iter().any(|want| want.trim().is_empty()),
        }
    }

    /// Mapping stage.
    fn map(&self, raw: &RawRecord, feed: &FeedSpec) -> Result<Observation, MapError> {
        if raw.source() != self.source() {
            return Err(MapError(format!(
                "{} record handed to the {} spec", raw.source(), self.source()
            )));
        }

        let cell = self
            .field(raw, &feed.date_field)
            .ok_or_else(|| MapError(format!("missing {:?}", feed.date_field)))?;
        let date = dates::parse_date(&cell)
            .ok_or_else(|| MapError(format!("unparseable {:?}: {cell:?}", feed.date_field)))?;

        let person = match &feed.measure {
            Measure::Count => None,
            Measure::ReturnRate { person_field, .. } => Some(
                self.field(raw, person_field)
                    .ok_or_else(|| MapError(format!("missing {person_field:?}")))?,
            ),
        };

        Ok(Observation { date, person })
    }
}

pub fn spec_for(source: Source) -> &'static dyn SourceSpec {
    match source {
        Source::Portal => &portal::SPEC,
        Source::Database => &database::SPEC,
    }
}
