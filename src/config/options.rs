// src/config/options.rs
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::consts::*;
use crate::data::{Period, Source};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppOptions {
    pub run: RunOptions,
    pub store: StoreOptions,
    pub publish: PublishOptions,
    pub portal: PortalOptions,
    pub database: DatabaseOptions,
}

/* ---------------- Run ---------------- */

/// Which month a run targets when none is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultPeriod {
    /// The month the run happens in.
    Current,
    /// Last complete month, for triggers that fire after month end.
    Previous,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    pub default_period: DefaultPeriod,
    pub source_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
    /// Consolidate and report, but write nothing.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            default_period: DefaultPeriod::Current,
            source_timeout_secs: SOURCE_TIMEOUT_SECS,
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            dry_run: false,
        }
    }
}

impl RunOptions {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn resolve_period(&self, explicit: Option<Period>, today: NaiveDate) -> Period {
        explicit.unwrap_or_else(|| match self.default_period {
            DefaultPeriod::Previous => Period::previous(today),
            DefaultPeriod::Current => Period::current(today),
        })
    }
}

/* ---------------- Store / publish ---------------- */

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOptions {
    pub path: PathBuf,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { path: PathBuf::from(DEFAULT_STORE_PATH) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishOptions {
    pub artifact: PathBuf,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self { artifact: PathBuf::from(DEFAULT_ARTIFACT_PATH) }
    }
}

/* ---------------- Feeds ---------------- */

/// Matches when `field` equals any of `values` (trimmed, case-insensitive).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRule {
    pub field: String,
    pub values: Vec<String>,
}

impl FieldRule {
    pub fn new(field: &str, values: &[&str]) -> Self {
        Self { field: s!(field), values: values.iter().map(|v| s!(*v)).collect() }
    }
}

/// How a feed's mapped observations roll up into one metric value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measure {
    /// Records dated inside the period.
    #[default]
    Count,
    /// Share of people seen at least `min_visits` times in the lookback window.
    ReturnRate {
        person_field: String,
        #[serde(default = "default_lookback")]
        lookback_days: i64,
        #[serde(default = "default_min_visits")]
        min_visits: usize,
    },
}

fn default_lookback() -> i64 { RETURN_LOOKBACK_DAYS }
fn default_min_visits() -> usize { RETURN_MIN_VISITS }

/// One upstream report (portal) or table (database) and the metric it feeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedSpec {
    /// Report/table name as carried on the raw records.
    pub name: String,
    /// Canonical metric key.
    pub metric: String,
    pub date_field: String,
    /// Export file name in the inbox; derived from `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub measure: Measure,
    /// Drop records matching any rule (e.g. Status = Test/Draft).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<FieldRule>,
    /// Keep only records matching every rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<FieldRule>,
}

impl FeedSpec {
    pub fn count(name: &str, metric: &str, date_field: &str) -> Self {
        Self {
            name: s!(name),
            metric: s!(metric),
            date_field: s!(date_field),
            file: None,
            measure: Measure::Count,
            exclude: Vec::new(),
            require: Vec::new(),
        }
    }

    pub fn return_rate(name: &str, metric: &str, date_field: &str, person_field: &str) -> Self {
        Self {
            measure: Measure::ReturnRate {
                person_field: s!(person_field),
                lookback_days: RETURN_LOOKBACK_DAYS,
                min_visits: RETURN_MIN_VISITS,
            },
            ..Self::count(name, metric, date_field)
        }
    }

    pub fn excluding(mut self, rule: FieldRule) -> Self {
        self.exclude.push(rule);
        self
    }

    pub fn requiring(mut self, rule: FieldRule) -> Self {
        self.require.push(rule);
        self
    }

    /// Inbox file name for this feed with the given extension.
    pub fn file_name(&self, ext: &str) -> String {
        match &self.file {
            Some(f) => f.clone(),
            None => format!("{}.{ext}", crate::core::sanitize::feed_file_stem(&self.name)),
        }
    }
}

/* ---------------- Sources ---------------- */

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalOptions {
    pub enabled: bool,
    pub inbox: PathBuf,
    pub user_env: String,
    pub password_env: String,
    pub feeds: Vec<FeedSpec>,
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            inbox: PathBuf::from(DEFAULT_PORTAL_INBOX),
            user_env: s!(PORTAL_USER_ENV),
            password_env: s!(PORTAL_PASSWORD_ENV),
            feeds: vec![
                FeedSpec::count("New Clients/Month", "new_clients", "Creation Date"),
                FeedSpec::count("Benefits and Applications", "benefits_and_applications", "Start Date"),
                FeedSpec::count("Housing Applications", "housing_applications", "Date Submitted"),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseOptions {
    pub enabled: bool,
    pub inbox: PathBuf,
    pub token_env: String,
    pub feeds: Vec<FeedSpec>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            inbox: PathBuf::from(DEFAULT_DATABASE_INBOX),
            token_env: s!(DATABASE_TOKEN_ENV),
            feeds: vec![
                FeedSpec::count("Volunteers", "new_volunteers", "Start Date"),
                FeedSpec::return_rate("Event Attendance", "volunteer_return_rate", "Event Date", "Name"),
            ],
        }
    }
}

impl AppOptions {
    pub fn feeds(&self, source: Source) -> &[FeedSpec] {
        match source {
            Source::Portal => &self.portal.feeds,
            Source::Database => &self.database.feeds,
        }
    }

    pub fn enabled(&self, source: Source) -> bool {
        match source {
            Source::Portal => self.portal.enabled,
            Source::Database => self.database.enabled,
        }
    }

    /// Environment variables the external collaborators read credentials from.
    pub fn credential_envs(&self, source: Source) -> Vec<&str> {
        match source {
            Source::Portal => vec![self.portal.user_env.as_str(), self.portal.password_env.as_str()],
            Source::Database => vec![self.database.token_env.as_str()],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.run.source_timeout_secs == 0 {
            return Err(Error::Config(s!("run.source_timeout_secs must be positive")));
        }
        for source in Source::ALL {
            validate_feeds(source, self.feeds(source))?;
        }
        Ok(())
    }
}

fn validate_feeds(source: Source, feeds: &[FeedSpec]) -> Result<()> {
    let mut names = HashSet::new();
    let mut metrics = HashSet::new();

    for feed in feeds {
        let ctx = |what: &str| Error::Config(format!("{source} feed {:?}: {what}", feed.name));

        if feed.name.trim().is_empty() { return Err(ctx("empty name")); }
        if feed.metric.trim().is_empty() { return Err(ctx("empty metric key")); }
        if feed.date_field.trim().is_empty() { return Err(ctx("empty date_field")); }
        if !names.insert(feed.name.trim().to_lowercase()) { return Err(ctx("duplicate feed name")); }
        if !metrics.insert(feed.metric.trim()) { return Err(ctx("duplicate metric key")); }

        for rule in feed.exclude.iter().chain(&feed.require) {
            if rule.field.trim().is_empty() { return Err(ctx("filter rule without field")); }
        }
        if let Measure::ReturnRate { person_field, lookback_days, min_visits } = &feed.measure {
            if person_field.trim().is_empty() { return Err(ctx("empty person_field")); }
            if *lookback_days < 0 { return Err(ctx("negative lookback_days")); }
            if *lookback_days > MAX_LOOKBACK_DAYS {
                return Err(ctx(&format!("lookback_days above {MAX_LOOKBACK_DAYS}")));
            }
            if *min_visits == 0 { return Err(ctx("min_visits must be at least 1")); }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let opts = AppOptions::default();
        opts.validate().unwrap();
        assert_eq!(opts.feeds(Source::Portal).len(), 3);
        assert_eq!(opts.feeds(Source::Database).len(), 2);
    }

    #[test]
    fn duplicate_metric_is_rejected() {
        let mut opts = AppOptions::default();
        opts.portal.feeds.push(FeedSpec::count("Other", "new_clients", "Date"));
        let err = opts.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate metric key"), "{err}");
    }

    #[test]
    fn same_metric_in_both_sources_is_fine() {
        let mut opts = AppOptions::default();
        opts.database.feeds.push(FeedSpec::count("Clients", "new_clients", "Created"));
        opts.validate().unwrap();
    }

    #[test]
    fn zero_visits_is_rejected() {
        let mut opts = AppOptions::default();
        opts.database.feeds[1].measure = Measure::ReturnRate {
            person_field: s!("Name"),
            lookback_days: 180,
            min_visits: 0,
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn lookback_is_bounded() {
        let mut opts = AppOptions::default();
        let rate = |days| Measure::ReturnRate { person_field: s!("Name"), lookback_days: days, min_visits: 2 };
        opts.database.feeds[1].measure = rate(MAX_LOOKBACK_DAYS);
        opts.validate().unwrap();
        opts.database.feeds[1].measure = rate(i64::MAX);
        let err = opts.validate().unwrap_err().to_string();
        assert!(err.contains("lookback_days above"), "{err}");
    }

    #[test]
    fn period_resolution() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut run = RunOptions::default();
        assert_eq!(run.resolve_period(None, today).to_string(), "2024-06");
        run.default_period = DefaultPeriod::Previous;
        assert_eq!(run.resolve_period(None, today).to_string(), "2024-05");
        let explicit: Period = "2023-01".parse().unwrap();
        assert_eq!(run.resolve_period(Some(explicit), today), explicit);
    }

    #[test]
    fn file_names_follow_download_naming() {
        let opts = AppOptions::default();
        assert_eq!(opts.portal.feeds[0].file_name("csv"), "new_clients_month.csv");
        assert_eq!(opts.database.feeds[1].file_name("json"), "event_attendance.json");
        let custom = FeedSpec { file: Some(s!("x.csv")), ..FeedSpec::count("A", "a", "d") };
        assert_eq!(custom.file_name("csv"), "x.csv");
    }
}
