// src/publish.rs
//! Write the dashboard artifact.
//!
//! The artifact is the store's CSV rendering, byte for byte, placed where the
//! static page fetches it. The write is atomic, so the page never reads a
//! half-written file.

use std::{io, path::{Path, PathBuf}};

use tracing::info;

use crate::file;
use crate::store::{self, SummaryStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub records: usize,
    pub bytes: usize,
}

pub fn publish(store: &SummaryStore, path: &Path) -> io::Result<Artifact> {
    let text = store::to_csv_string(store);
    file::write_atomic(path, text.as_bytes())?;
    info!("Published {} record(s) to {}", store.len(), path.display());
    Ok(Artifact { path: path.to_path_buf(), records: store.len(), bytes: text.len() })
}

/// Read an artifact back, as the dashboard would.
pub fn parse_artifact(text: &str) -> Result<SummaryStore, crate::error::StoreError> {
    store::parse_csv(text)
}
