// src/cli.rs
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use crate::config::{self, options::AppOptions};
use crate::data::{Period, Source};
use crate::progress::Progress;
use crate::runner::{self, RunSummary};
use crate::{fetch, log, store};

#[derive(Debug, Parser)]
#[command(name = "metrics-snapshot", version, about = "Monthly metrics snapshot for the reporting dashboard")]
pub struct Cli {
    /// Config file (defaults to ./snapshot.toml when present)
    #[arg(long, global = true, env = "SNAPSHOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Month to report on, YYYY-MM (defaults per run.default_period)
    #[arg(long, global = true)]
    pub period: Option<Period>,

    /// Override store.path
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Override publish.artifact
    #[arg(long, global = true)]
    pub artifact: Option<PathBuf>,

    /// Consolidate and report without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug output on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch, consolidate and publish one period (default)
    Run,
    /// Print the persisted store
    Show,
    /// Print the resolved configuration as TOML
    CheckConfig,
}

pub fn run() -> Result<()> {
    execute(Cli::parse())
}

pub fn execute(cli: Cli) -> Result<()> {
    let (mut opts, cfg_path) = config::load(cli.config.as_deref())?;
    apply_overrides(&mut opts, &cli);

    log::init(opts.run.log_file.as_deref(), cli.verbose).wrap_err("could not open the debug log")?;
    info!("Config: {}", config_origin(cfg_path.as_deref()));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let period = opts.run.resolve_period(cli.period, chrono::Local::now().date_naive());
            let adapters = fetch::adapters_from(&opts);
            let mut progress = ConsoleProgress::default();
            let summary = runner::run(&opts, period, &adapters, Some(&mut progress))
                .wrap_err_with(|| format!("snapshot for {period} failed"))?;
            print_summary(&summary);
        }
        Command::Show => {
            let store = store::load(&opts.store.path)
                .wrap_err_with(|| format!("could not read {}", opts.store.path.display()))?;
            print!("{}", render_rows(store.records().iter().filter(|r| cli.period.is_none_or(|p| r.period == p))));
        }
        Command::CheckConfig => {
            println!("# resolved from {}", config_origin(cfg_path.as_deref()));
            print!("{}", config::to_toml(&opts)?);
        }
    }
    Ok(())
}

fn config_origin(path: Option<&Path>) -> String {
    path.map_or_else(|| s!("built-in defaults"), |p| p.display().to_string())
}

fn apply_overrides(opts: &mut AppOptions, cli: &Cli) {
    if let Some(p) = &cli.store { opts.store.path = p.clone(); }
    if let Some(p) = &cli.artifact { opts.publish.artifact = p.clone(); }
    if cli.dry_run { opts.run.dry_run = true; }
}

/* ---------------- Output ---------------- */

/// Source progress on stderr, so stdout stays clean for the summary.
#[derive(Default)]
struct ConsoleProgress {
    total: usize,
    seen: usize,
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
    }

    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }

    fn source_done(&mut self, source: Source, records: usize) {
        self.seen += 1;
        eprintln!("[{}/{}] {source}: {records} raw record(s)", self.seen, self.total);
    }

    fn source_failed(&mut self, source: Source, reason: &str) {
        self.seen += 1;
        eprintln!("[{}/{}] {source}: FAILED ({reason})", self.seen, self.total);
    }
}

fn print_summary(s: &RunSummary) {
    let mut line = format!(
        "{}: {} record(s) this run, {} in store",
        s.period, s.incoming, s.records
    );
    if !s.skipped.is_empty() {
        line.push_str(&format!(", {} skipped", s.skipped.len()));
    }
    match &s.artifact {
        Some(a) => line.push_str(&format!(", published {}", a.path.display())),
        None => line.push_str(" (dry run, nothing written)"),
    }
    println!("{line}");
    for (source, why) in &s.degraded {
        println!("  degraded: {source} missing ({why})");
    }
}

fn render_rows<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a crate::data::CanonicalRecord>,
{
    let rows: Vec<[String; 4]> = records
        .into_iter()
        .map(|r| [r.period.to_string(), s!(r.source.as_str()), r.metric_key.clone(), r.value.to_string()])
        .collect();
    let head = ["period", "source", "metric_key", "value"];

    let mut widths = head.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push = |cells: [&str; 4]| {
        let line: Vec<String> = cells.iter().zip(&widths).map(|(c, &w)| format!("{c:<w$}")).collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    };
    push(head);
    for row in &rows {
        push([row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()]);
    }
    out
}
