// src/fetch/database.rs
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::options::FeedSpec;
use crate::core::sanitize::strip_bom;
use crate::data::{DatabaseRow, Period, RawRecord, Source};
use crate::error::FetchError;

use super::{inbox_file, read_export, SourceAdapter};

/// Reads the JSON pages the hosted-table pager saves, one file per table.
pub struct TableExportAdapter {
    inbox: PathBuf,
    feeds: Vec<FeedSpec>,
}

impl TableExportAdapter {
    pub fn new(inbox: &Path, feeds: Vec<FeedSpec>) -> Self {
        Self { inbox: inbox.to_path_buf(), feeds }
    }
}

/* ---------------- Wire shape ---------------- */

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    records: Vec<WireRecord>,
}

#[derive(Deserialize)]
struct WireRecord {
    id: String,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Export {
    Pages(Vec<Page>),
    Page(Page),
}

impl SourceAdapter for TableExportAdapter {
    fn source(&self) -> Source { Source::Database }

    fn fetch(&self, period: Period) -> Result<Vec<RawRecord>, FetchError> {
        let mut out = Vec::new();
        for feed in &self.feeds {
            let path = inbox_file(&self.inbox, period, &feed.file_name("json"));
            let text = read_export(&path)?;
            let rows = parse_table(&feed.name, &text)
                .map_err(|e| FetchError::Malformed(format!("{}: {e}", path.display())))?;
            debug!("database: {} record(s) from {}", rows.len(), path.display());
            out.extend(rows.into_iter().map(RawRecord::Database));
        }
        Ok(out)
    }
}

/// Flatten one table export into rows, keeping page and record order.
pub(crate) fn parse_table(table: &str, text: &str) -> Result<Vec<DatabaseRow>, serde_json::Error> {
    let pages = match serde_json::from_str::<Export>(strip_bom(text))? {
        Export::Pages(p) => p,
        Export::Page(p) => vec![p],
    };
    Ok(pages
        .into_iter()
        .flat_map(|p| p.records)
        .map(|r| DatabaseRow { table: s!(table), id: r.id, fields: r.fields })
        .collect())
}
