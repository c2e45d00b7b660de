// src/log.rs
use std::{
    fs::OpenOptions,
    io,
    path::Path,
    sync::Mutex,
};

use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, time::Uptime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::file::ensure_directory;

/// Install the global subscriber.
///
/// Stderr follows `RUST_LOG` (default `info`, or `debug` with `verbose`).
/// The debug log file, when given, is appended to at debug level regardless,
/// stamped with time since start.
///
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init(log_file: Option<&Path>, verbose: bool) -> io::Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(env);

    let file = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                ensure_directory(dir)?;
            }
            let f = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(f))
                    .with_ansi(false)
                    .with_timer(Uptime::default())
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry().with(stderr).with(file).try_init();
    Ok(())
}
