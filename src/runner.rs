// src/runner.rs
//! One snapshot run: fetch, normalize, consolidate, persist, publish.
//!
//! Nothing is written until every source has reported and the consolidated
//! store passed its checks. A run where every source failed writes nothing.

use std::{path::PathBuf, sync::Arc};

use tracing::{error, info, warn};

use crate::config::options::AppOptions;
use crate::consolidate::consolidate;
use crate::data::{CanonicalRecord, Period, Source};
use crate::error::{Error, Result, StoreError};
use crate::fetch::{self, SourceAdapter};
use crate::normalize::{normalize, Skipped};
use crate::progress::Progress;
use crate::publish::{self, Artifact};
use crate::store::{self, SummaryStore};

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub period: Period,
    /// Records in the consolidated store.
    pub records: usize,
    /// Canonical records produced this run.
    pub incoming: usize,
    pub skipped: Vec<Skipped>,
    /// Sources that failed, with the reason.
    pub degraded: Vec<(Source, String)>,
    /// `None` on a dry run.
    pub store_path: Option<PathBuf>,
    pub artifact: Option<Artifact>,
}

impl RunSummary {
    pub fn is_degraded(&self) -> bool { !self.degraded.is_empty() }
}

pub fn run(
    opts: &AppOptions,
    period: Period,
    adapters: &[Arc<dyn SourceAdapter>],
    mut progress: Option<&mut (dyn Progress + '_)>,
) -> Result<RunSummary> {
    info!("Snapshot run for {period} ({}, {} source(s))", period.window_label(), adapters.len());
    check_credentials(opts, adapters);

    let outcomes = fetch::fetch_all(adapters, period, opts.run.source_timeout(), progress.as_deref_mut());

    /* ---- normalize what arrived ---- */
    let mut incoming: Vec<CanonicalRecord> = Vec::new();
    let mut skipped = Vec::new();
    let mut degraded = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(raw) => {
                let n = normalize(raw, outcome.source, period, opts.feeds(outcome.source));
                if n.filtered > 0 {
                    info!("{}: {} record(s) filtered out", outcome.source, n.filtered);
                }
                incoming.extend(n.records);
                skipped.extend(n.skipped);
            }
            Err(e) => degraded.push((outcome.source, e.to_string())),
        }
    }

    if degraded.len() == adapters.len() {
        let err = Error::NoSources { period, failures: degraded };
        error!("{err}");
        finish(&mut progress);
        return Err(err);
    }
    if !degraded.is_empty() {
        let names: Vec<&str> = degraded.iter().map(|(s, _)| s.as_str()).collect();
        warn!("Degraded run for {period}: no data from {}", names.join(", "));
    }
    if let Some(p) = progress.as_deref_mut() {
        p.log(&format!("Normalized {} record(s), {} skipped", incoming.len(), skipped.len()));
    }

    /* ---- consolidate ---- */
    let prior = load_prior(&opts.store.path)?;
    let incoming_count = incoming.len();
    let next = match consolidate(prior, incoming, period) {
        Ok(s) => s,
        Err(e) => {
            error!("Consolidation failed, nothing written: {e}");
            finish(&mut progress);
            return Err(e);
        }
    };

    /* ---- persist + publish ---- */
    let (store_path, artifact) = if opts.run.dry_run {
        info!("Dry run: {} record(s) not written", next.len());
        (None, None)
    } else {
        let saved = store::save(&next, &opts.store.path)?;
        info!("Saved store to {}", saved.display());
        let artifact = publish::publish(&next, &opts.publish.artifact)?;
        (Some(saved), Some(artifact))
    };

    finish(&mut progress);

    Ok(RunSummary {
        period,
        records: next.len(),
        incoming: incoming_count,
        skipped,
        degraded,
        store_path,
        artifact,
    })
}

/// Prior store, or an empty one when it is missing or unreadable.
fn load_prior(path: &std::path::Path) -> Result<SummaryStore> {
    match store::load(path) {
        Ok(s) => Ok(s),
        Err(StoreError::Missing(_)) => {
            warn!("No store at {}, starting empty", path.display());
            Ok(SummaryStore::new())
        }
        Err(e @ StoreError::Corrupt { .. }) => {
            warn!("Ignoring unreadable store {}: {e}", path.display());
            Ok(SummaryStore::new())
        }
        Err(e @ StoreError::Io(_)) => Err(e.into()),
    }
}

/// Credentials belong to the collaborators that produce the exports; a
/// missing variable is reported, never read.
fn check_credentials(opts: &AppOptions, adapters: &[Arc<dyn SourceAdapter>]) {
    for adapter in adapters {
        let source = adapter.source();
        for name in opts.credential_envs(source) {
            if !name.is_empty() && std::env::var_os(name).is_none() {
                warn!("{source}: credential variable {name} is not set");
            }
        }
    }
}

fn finish(progress: &mut Option<&mut (dyn Progress + '_)>) {
    if let Some(p) = progress.as_deref_mut() {
        p.finish();
    }
}
