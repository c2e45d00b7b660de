// src/progress.rs
use crate::data::Source;

/// Lightweight progress reporting for a snapshot run.
/// Frontends implement this to surface status to users; the log gets the
/// same events regardless.
pub trait Progress {
    /// Called at the start with the number of sources to fetch.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// A source delivered `records` raw records.
    fn source_done(&mut self, _source: Source, _records: usize) {}

    /// A source failed or timed out; the run may continue without it.
    fn source_failed(&mut self, _source: Source, _reason: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}
