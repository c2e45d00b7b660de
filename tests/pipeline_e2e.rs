// tests/pipeline_e2e.rs
//
// Whole runs against inbox directories in a temp dir.
//
use std::fs;
use std::path::Path;

use metrics_snapshot::config::options::AppOptions;
use metrics_snapshot::data::{CanonicalRecord, Period, Source, Value};
use metrics_snapshot::error::Error;
use metrics_snapshot::fetch::adapters_from;
use metrics_snapshot::publish::parse_artifact;
use metrics_snapshot::runner::{run, RunSummary};
use metrics_snapshot::store::{self, SummaryStore};

fn may() -> Period { "2024-05".parse().unwrap() }

fn opts_in(root: &Path) -> AppOptions {
    let mut opts = AppOptions::default();
    opts.portal.inbox = root.join("inbox/portal");
    opts.database.inbox = root.join("inbox/database");
    opts.store.path = root.join("data/report_summary.csv");
    opts.publish.artifact = root.join("site/data/report_summary.csv");
    opts.run.log_file = None;
    opts
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn seed_portal(opts: &AppOptions) {
    let inbox = &opts.portal.inbox;
    write(
        &inbox.join("new_clients_month.csv"),
        "Client,Creation Date\nAda,05/02/2024\nBob,05/30/2024\nCy,04/30/2024\nDee,not a date\n",
    );
    write(&inbox.join("benefits_and_applications.csv"), "Program,Start Date\nSNAP,2024-05-10\n");
    write(&inbox.join("housing_applications.csv"), "Date Submitted\n");
}

fn seed_database(opts: &AppOptions) {
    let inbox = &opts.database.inbox;
    write(
        &inbox.join("volunteers.json"),
        r#"{"records":[
            {"id":"r1","fields":{"Start Date":"2024-05-03"}},
            {"id":"r2","fields":{"Start Date":"2024-06-01"}}
        ]}"#,
    );
    write(
        &inbox.join("event_attendance.json"),
        r#"[
            {"records":[{"id":"e1","fields":{"Event Date":"2024-03-01","Name":["Ada"]}}]},
            {"records":[
                {"id":"e2","fields":{"Event Date":"2024-05-05T18:00:00.000Z","Name":["Ada"]}},
                {"id":"e3","fields":{"Event Date":"2024-05-06","Name":["Bob"]}}
            ]}
        ]"#,
    );
}

fn run_may(opts: &AppOptions) -> Result<RunSummary, Error> {
    run(opts, may(), &adapters_from(opts), None)
}

fn number(store: &SummaryStore, source: Source, metric: &str) -> f64 {
    store.get(may(), source, metric).and_then(|r| r.value.as_f64()).unwrap()
}

#[test]
fn full_run_publishes_sorted_store() {
    let dir = tempfile::tempdir().unwrap();
    let opts = opts_in(dir.path());
    seed_portal(&opts);
    seed_database(&opts);

    let summary = run_may(&opts).unwrap();
    assert!(!summary.is_degraded());
    assert_eq!(summary.incoming, 5);
    assert_eq!(summary.records, 5);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].locator, "line 5");

    let stored = store::load(&opts.store.path).unwrap();
    let keys: Vec<(Source, &str)> = stored.records().iter().map(|r| (r.source, r.metric_key.as_str())).collect();
    assert_eq!(
        keys,
        vec![
            (Source::Portal, "benefits_and_applications"),
            (Source::Portal, "housing_applications"),
            (Source::Portal, "new_clients"),
            (Source::Database, "new_volunteers"),
            (Source::Database, "volunteer_return_rate"),
        ]
    );
    assert_eq!(number(&stored, Source::Portal, "new_clients"), 2.0);
    assert_eq!(number(&stored, Source::Portal, "housing_applications"), 0.0);
    assert_eq!(number(&stored, Source::Database, "new_volunteers"), 1.0);
    assert_eq!(number(&stored, Source::Database, "volunteer_return_rate"), 50.0);

    let rate = stored.get(may(), Source::Database, "volunteer_return_rate").unwrap();
    assert_eq!(rate.metadata["participants"], "2");
    assert_eq!(rate.metadata["returning"], "1");

    // The artifact is the store, byte for byte.
    let artifact = fs::read_to_string(&opts.publish.artifact).unwrap();
    assert_eq!(artifact, fs::read_to_string(&opts.store.path).unwrap());
    assert_eq!(parse_artifact(&artifact).unwrap(), stored);
}

#[test]
fn rerun_for_same_period_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let opts = opts_in(dir.path());
    seed_portal(&opts);
    seed_database(&opts);

    run_may(&opts).unwrap();
    let first = fs::read(&opts.store.path).unwrap();
    let again = run_may(&opts).unwrap();
    assert_eq!(again.records, 5);
    assert_eq!(fs::read(&opts.store.path).unwrap(), first);
}

#[test]
fn older_periods_survive_a_new_month() {
    let dir = tempfile::tempdir().unwrap();
    let opts = opts_in(dir.path());
    seed_portal(&opts);
    seed_database(&opts);

    let april = CanonicalRecord::new("2024-04".parse().unwrap(), Source::Portal, "new_clients", 7usize);
    let prior = metrics_snapshot::consolidate::consolidate(SummaryStore::new(), vec![april.clone()], april.period).unwrap();
    store::save(&prior, &opts.store.path).unwrap();

    let summary = run_may(&opts).unwrap();
    assert_eq!(summary.records, 6);
    let stored = store::load(&opts.store.path).unwrap();
    assert_eq!(stored.records()[0], april);
}

#[test]
fn one_source_down_gives_degraded_run() {
    let dir = tempfile::tempdir().unwrap();
    let opts = opts_in(dir.path());
    seed_portal(&opts);

    let summary = run_may(&opts).unwrap();
    assert!(summary.is_degraded());
    assert_eq!(summary.degraded.len(), 1);
    assert_eq!(summary.degraded[0].0, Source::Database);
    assert_eq!(summary.records, 3);

    let stored = store::load(&opts.store.path).unwrap();
    assert!(stored.records().iter().all(|r| r.source == Source::Portal));
}

#[test]
fn every_source_down_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let opts = opts_in(dir.path());

    let prior_text = "period,source,metric_key,value,metadata\n2024-04,portal,new_clients,7,\n";
    write(&opts.store.path, prior_text);
    write(&opts.publish.artifact, prior_text);
    let artifact_before = fs::read(&opts.publish.artifact).unwrap();

    match run_may(&opts) {
        Err(Error::NoSources { period, failures }) => {
            assert_eq!(period, may());
            assert_eq!(failures.len(), 2);
        }
        other => panic!("expected NoSources, got {other:?}"),
    }
    assert_eq!(fs::read_to_string(&opts.store.path).unwrap(), prior_text);
    assert_eq!(fs::read(&opts.publish.artifact).unwrap(), artifact_before);
    let site: Vec<_> = fs::read_dir(opts.publish.artifact.parent().unwrap()).unwrap().collect();
    assert_eq!(site.len(), 1, "no temp files left beside the artifact");
}

#[test]
fn corrupt_store_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let opts = opts_in(dir.path());
    seed_portal(&opts);
    seed_database(&opts);
    write(&opts.store.path, "this is not the store\n");

    let summary = run_may(&opts).unwrap();
    assert_eq!(summary.records, 5);
    assert_eq!(store::load(&opts.store.path).unwrap().len(), 5);
}

#[test]
fn dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = opts_in(dir.path());
    opts.run.dry_run = true;
    seed_portal(&opts);
    seed_database(&opts);

    let summary = run_may(&opts).unwrap();
    assert_eq!(summary.records, 5);
    assert!(summary.artifact.is_none());
    assert!(summary.store_path.is_none());
    assert!(!opts.store.path.exists());
    assert!(!opts.publish.artifact.exists());
}

#[test]
fn filters_from_config_apply_per_feed() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = opts_in(dir.path());
    let text = format!(
        r#"
[portal]
enabled = true
inbox = {inbox:?}

[[portal.feeds]]
name = "New Clients/Month"
metric = "new_clients"
date_field = "Creation Date"

[[portal.feeds.exclude]]
field = "Client"
values = ["test"]

[database]
enabled = false
"#,
        inbox = opts.portal.inbox.display().to_string()
    );
    let parsed = metrics_snapshot::config::parse(&text).unwrap();
    opts.portal = parsed.portal;
    opts.database = parsed.database;

    write(
        &opts.portal.inbox.join("new_clients_month.csv"),
        "Client,Creation Date\nAda,05/02/2024\n TEST ,05/03/2024\n",
    );

    let summary = run_may(&opts).unwrap();
    assert!(!summary.is_degraded());
    let stored = store::load(&opts.store.path).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored.records()[0].value, Value::Number(1.0));
}
