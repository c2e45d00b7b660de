// src/fetch/mod.rs
//! Source adapters and the timeout-bounded fetch loop.
//!
//! An adapter turns "give me period P" into raw records for one upstream
//! system. The adapters shipped here read the exports that the external
//! collaborators (browser automation for the portal, the API pager for the
//! hosted tables) leave in an inbox directory.

mod database;
mod portal;

pub use database::TableExportAdapter;
pub use portal::PortalExportAdapter;

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::config::options::AppOptions;
use crate::data::{Period, RawRecord, Source};
use crate::error::FetchError;
use crate::progress::Progress;

pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;
    fn fetch(&self, period: Period) -> Result<Vec<RawRecord>, FetchError>;
}

/// What one adapter produced for this run.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: Source,
    pub result: Result<Vec<RawRecord>, FetchError>,
    pub elapsed: Duration,
}

/// Export file for one feed: `<inbox>/<period>/<name>` when the collaborator
/// files exports per month, else `<inbox>/<name>`.
fn inbox_file(inbox: &Path, period: Period, name: &str) -> PathBuf {
    let dated = inbox.join(period.to_string()).join(name);
    if dated.is_file() { dated } else { inbox.join(name) }
}

fn read_export(path: &Path) -> Result<String, FetchError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => FetchError::Malformed(format!("{}: not UTF-8", path.display())),
        _ => FetchError::Transient(format!("{}: {e}", path.display())),
    })
}

/// Adapters for every enabled source, in source order.
pub fn adapters_from(opts: &AppOptions) -> Vec<Arc<dyn SourceAdapter>> {
    Source::ALL
        .into_iter()
        .filter(|s| opts.enabled(*s))
        .map(|s| -> Arc<dyn SourceAdapter> {
            let feeds = opts.feeds(s).to_vec();
            match s {
                Source::Portal => Arc::new(PortalExportAdapter::new(&opts.portal.inbox, feeds)),
                Source::Database => Arc::new(TableExportAdapter::new(&opts.database.inbox, feeds)),
            }
        })
        .collect()
}

/// Fetch from each adapter in turn, waiting at most `timeout` for each.
///
/// The call runs on a worker thread so a hung adapter cannot stall the run.
/// A late worker is abandoned; whatever it returns afterwards is dropped.
pub fn fetch_all(
    adapters: &[Arc<dyn SourceAdapter>],
    period: Period,
    timeout: Duration,
    mut progress: Option<&mut (dyn Progress + '_)>,
) -> Vec<SourceOutcome> {
    if let Some(p) = progress.as_deref_mut() {
        p.begin(adapters.len());
    }

    let mut outcomes = Vec::with_capacity(adapters.len());

    for adapter in adapters {
        let source = adapter.source();
        let started = Instant::now();
        let (tx, rx) = mpsc::channel();

        let worker = Arc::clone(adapter);
        let spawned = thread::Builder::new()
            .name(format!("fetch-{source}"))
            .spawn(move || {
                // Receiver may be gone after a timeout.
                let _ = tx.send(worker.fetch(period));
            });

        let result = match spawned {
            Ok(_) => match rx.recv_timeout(timeout) {
                Ok(r) => r,
                Err(mpsc::RecvTimeoutError::Timeout) => Err(FetchError::Timeout(timeout)),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    Err(FetchError::Transient(s!("adapter worker panicked")))
                }
            },
            Err(e) => Err(FetchError::Transient(format!("could not start worker: {e}"))),
        };
        let elapsed = started.elapsed();

        match &result {
            Ok(records) => {
                info!("{source}: fetched {} raw record(s) in {:.1}s", records.len(), elapsed.as_secs_f64());
                if let Some(p) = progress.as_deref_mut() {
                    p.source_done(source, records.len());
                }
            }
            Err(e) => {
                warn!("{source}: fetch failed: {e}");
                if let Some(p) = progress.as_deref_mut() {
                    p.source_failed(source, &e.to_string());
                }
            }
        }

        outcomes.push(SourceOutcome { source, result, elapsed });
    }

    outcomes
}
