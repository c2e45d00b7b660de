// src/consolidate.rs
//! Merge one period's canonical records into the summary store.
//!
//! Replace-within-period, append-across-periods: every existing record of the
//! target period is dropped, the incoming records are added, and the result is
//! re-sorted by (period, source, metric_key). Records of other periods pass
//! through untouched. Running it twice with the same input is a no-op the
//! second time.

use tracing::debug;

use crate::data::{CanonicalRecord, Period};
use crate::error::{Error, Result};
use crate::store::SummaryStore;

pub fn consolidate(store: SummaryStore, incoming: Vec<CanonicalRecord>, period: Period) -> Result<SummaryStore> {
    if let Some(stray) = incoming.iter().find(|r| r.period != period) {
        return Err(Error::PeriodMismatch {
            expected: period,
            found: stray.period,
            origin: stray.source,
            metric: stray.metric_key.clone(),
        });
    }

    if let Some(why) = incoming.iter().find_map(|r| r.validate().err()) {
        return Err(Error::Internal(format!("invalid incoming record: {why}")));
    }

    let before = store.len();
    let mut records = store.into_records();
    records.retain(|r| r.period != period);
    let replaced = before - records.len();

    let added = incoming.len();
    records.extend(incoming);

    let next = SummaryStore::from_records(records).map_err(Error::Internal)?;
    next.check_invariants().map_err(Error::Internal)?;

    debug!("Consolidated {period}: replaced {replaced}, added {added}, total {}", next.len());
    Ok(next)
}
