// src/config/mod.rs
//! Run configuration.
//!
//! Resolution order for the config file:
//! 1. Path given on the command line (must exist)
//! 2. `snapshot.toml` in the working directory, if present
//! 3. Built-in defaults (the organization's standard report set)
//!
//! Every section is optional; missing keys fall back to their defaults.

pub mod consts;
pub mod options;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use options::AppOptions;

/// Resolve and read the config file.
///
/// Runs before the subscriber is installed, so it does not log; the caller
/// reports the returned path once logging is up.
pub fn load(explicit: Option<&Path>) -> Result<(AppOptions, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => {
            if !p.is_file() {
                return Err(Error::Config(format!("config file not found: {}", p.display())));
            }
            Some(p.to_path_buf())
        }
        None => {
            let p = PathBuf::from(consts::DEFAULT_CONFIG_FILE);
            p.is_file().then_some(p)
        }
    };

    let opts = match &path {
        Some(p) => {
            let text = std::fs::read_to_string(p)?;
            parse(&text).map_err(|e| match e {
                Error::Config(msg) => Error::Config(format!("{}: {msg}", p.display())),
                other => other,
            })?
        }
        None => AppOptions::default(),
    };

    Ok((opts, path))
}

/// Parse and validate TOML text.
pub fn parse(text: &str) -> Result<AppOptions> {
    let opts: AppOptions = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
    opts.validate()?;
    Ok(opts)
}

pub fn to_toml(opts: &AppOptions) -> Result<String> {
    toml::to_string_pretty(opts).map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::{DefaultPeriod, Measure};
    use crate::data::Source;

    #[test]
    fn load_emits_no_events() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

        struct Count(Arc<AtomicUsize>);
        impl<S: tracing::Subscriber> Layer<S> for Count {
            fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.toml");
        std::fs::write(&path, "[run]\ndefault_period = \"previous\"\n").unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(Count(Arc::clone(&seen)));
        let (opts, found) = tracing::subscriber::with_default(subscriber, || load(Some(&path))).unwrap();

        assert_eq!(opts.run.default_period, DefaultPeriod::Previous);
        assert_eq!(found.as_deref(), Some(path.as_path()));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(parse("").unwrap(), AppOptions::default());
    }

    #[test]
    fn partial_sections_keep_default_feeds() {
        let opts = parse(
            r#"
            [run]
            default_period = "previous"
            source_timeout_secs = 5

            [portal]
            inbox = "drop/apricot"
            "#,
        )
        .unwrap();
        assert_eq!(opts.run.default_period, DefaultPeriod::Previous);
        assert_eq!(opts.run.source_timeout_secs, 5);
        assert_eq!(opts.portal.inbox, PathBuf::from("drop/apricot"));
        assert_eq!(opts.feeds(Source::Portal).len(), 3);
    }

    #[test]
    fn feeds_with_filters_and_measures() {
        let opts = parse(
            r#"
            [[database.feeds]]
            name = "Event Attendance"
            metric = "volunteer_return_rate"
            date_field = "Event Date"
            measure = { kind = "return_rate", person_field = "Name", lookback_days = 90 }

            [[database.feeds.exclude]]
            field = "Status"
            values = ["Test", "Draft"]
            "#,
        )
        .unwrap();
        let feeds = opts.feeds(Source::Database);
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].exclude[0].values, vec!["Test", "Draft"]);
        match &feeds[0].measure {
            Measure::ReturnRate { lookback_days, min_visits, .. } => {
                assert_eq!(*lookback_days, 90);
                assert_eq!(*min_visits, 2);
            }
            other => panic!("unexpected measure {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let err = parse("[store]\npth = \"x\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_survive_toml_round_trip() {
        let text = to_toml(&AppOptions::default()).unwrap();
        assert_eq!(parse(&text).unwrap(), AppOptions::default());
    }
}
