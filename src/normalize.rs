// src/normalize.rs
//! Raw adapter records → canonical records for one source and period.
//!
//! Per record, in adapter emission order:
//! 1. route to its feed by report/table name (unknown feeds are dropped),
//! 2. filter stage (`SourceSpec::keep`), silent,
//! 3. mapping stage (`SourceSpec::map`), failures are skipped and reported.
//!
//! Mapped observations are then rolled up per feed, one canonical record per
//! configured feed, in configured feed order.

use std::collections::HashMap;

use chrono::TimeDelta;
use tracing::{debug, warn};

use crate::config::options::{FeedSpec, Measure};
use crate::data::{CanonicalRecord, Period, RawRecord, Source, Value};
use crate::specs::{self, Observation};

/// A record the normalizer could not map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skipped {
    pub feed: String,
    pub locator: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<CanonicalRecord>,
    pub skipped: Vec<Skipped>,
    /// Records dropped by the filter stage.
    pub filtered: usize,
}

pub fn normalize<I>(raw: I, source: Source, period: Period, feeds: &[FeedSpec]) -> Normalized
where
    I: IntoIterator<Item = RawRecord>,
{
    let spec = specs::spec_for(source);
    let by_name: HashMap<String, usize> = feeds
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.trim().to_lowercase(), i))
        .collect();

    let mut observed: Vec<Vec<Observation>> = vec![Vec::new(); feeds.len()];
    let mut out = Normalized::default();

    for rec in raw {
        let Some(&ix) = by_name.get(&rec.feed().trim().to_lowercase()) else {
            debug!("{source}: no feed configured for {:?}, dropping {}", rec.feed(), rec.locator());
            out.filtered += 1;
            continue;
        };
        let feed = &feeds[ix];

        if !spec.keep(&rec, feed) {
            out.filtered += 1;
            continue;
        }

        match spec.map(&rec, feed) {
            Ok(obs) => observed[ix].push(obs),
            Err(e) => out.skipped.push(Skipped {
                feed: feed.name.clone(),
                locator: rec.locator(),
                reason: e.0,
            }),
        }
    }

    for (feed, obs) in feeds.iter().zip(&observed) {
        match roll_up(feed, obs, source, period).and_then(|r| r.validate().map(|()| r)) {
            Ok(record) => out.records.push(record),
            Err(why) => warn!("{source}: dropping {} ({why})", feed.metric),
        }
    }

    if !out.skipped.is_empty() {
        warn!("{source}: skipped {} unmappable record(s)", out.skipped.len());
        for s in &out.skipped {
            debug!("{source}: skipped {} {}: {}", s.feed, s.locator, s.reason);
        }
    }

    out
}

fn roll_up(
    feed: &FeedSpec,
    obs: &[Observation],
    source: Source,
    period: Period,
) -> Result<CanonicalRecord, String> {
    let day = |d: chrono::NaiveDate| d.format("%Y-%m-%d").to_string();

    match &feed.measure {
        Measure::Count => {
            let n = obs.iter().filter(|o| period.contains(o.date)).count();
            Ok(CanonicalRecord::new(period, source, feed.metric.trim(), n).with_metadata(meta! {
                "feed" => feed.name,
                "window_start" => day(period.first_day()),
                "window_end" => day(period.last_day()),
            }))
        }
        Measure::ReturnRate { lookback_days, min_visits, .. } => {
            let start = TimeDelta::try_days(*lookback_days)
                .and_then(|back| period.first_day().checked_sub_signed(back))
                .ok_or_else(|| format!("lookback of {lookback_days} days is out of range"))?;
            let end = period.last_day();
            let rate = return_rate(obs, start, end, *min_visits);
            Ok(CanonicalRecord::new(period, source, feed.metric.trim(), Value::Number(rate.percent))
                .with_metadata(meta! {
                    "feed" => feed.name,
                    "unit" => "percent",
                    "window_start" => day(start),
                    "window_end" => day(end),
                    "participants" => rate.participants,
                    "returning" => rate.returning,
                }))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReturnRate {
    pub participants: usize,
    pub returning: usize,
    /// Rounded to two decimals; 0 when nobody attended.
    pub percent: f64,
}

pub fn return_rate(
    obs: &[Observation],
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    min_visits: usize,
) -> ReturnRate {
    let mut visits: HashMap<&str, usize> = HashMap::new();
    for o in obs {
        if o.date < start || o.date > end { continue; }
        if let Some(p) = &o.person {
            *visits.entry(p.as_str()).or_insert(0) += 1;
        }
    }

    let participants = visits.len();
    let returning = visits.values().filter(|&&n| n >= min_visits).count();
    let percent = if participants == 0 {
        0.0
    } else {
        (returning as f64 / participants as f64 * 10_000.0).round() / 100.0
    };
    ReturnRate { participants, returning, percent }
}
