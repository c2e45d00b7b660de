// src/error.rs
//! Error types for the snapshot pipeline.
//!
//! - `FetchError`: one adapter could not deliver raw records. Recovered at the
//!   run level as long as another source succeeded.
//! - `StoreError`: the persisted summary could not be read back. The runner
//!   downgrades this to "start from an empty store".
//! - `Error`: everything that aborts a run.

use std::{io, time::Duration};

use thiserror::Error;

use crate::data::{Period, Source};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, auth, or a missing export. Worth retrying next run.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The payload arrived but could not be parsed.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file not found: {0}")]
    Missing(String),

    #[error("corrupt store at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Every configured source failed; nothing is written.
    #[error("no source produced data for {period}: {}", join_failures(.failures))]
    NoSources {
        period: Period,
        failures: Vec<(Source, String)>,
    },

    /// A record for another month reached the consolidator.
    #[error("record {metric} from {origin} belongs to {found}, run targets {expected}")]
    PeriodMismatch {
        expected: Period,
        found: Period,
        origin: Source,
        metric: String,
    },

    /// Duplicate key or similar invariant breach. Never expected in practice.
    #[error("internal consistency violation: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid period: {0}")]
    Period(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn join_failures(failures: &[(Source, String)]) -> String {
    if failures.is_empty() {
        return s!("no sources configured");
    }
    failures
        .iter()
        .map(|(src, why)| format!("{src}: {why}"))
        .collect::<Vec<_>>()
        .join("; ")
}
