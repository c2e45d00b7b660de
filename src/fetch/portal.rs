// src/fetch/portal.rs
use std::{collections::BTreeMap, path::{Path, PathBuf}};

use tracing::debug;

use crate::config::options::FeedSpec;
use crate::core::sanitize::{normalize_ws, strip_bom};
use crate::csv::{self, SEP};
use crate::data::{Period, PortalRow, RawRecord, Source};
use crate::error::FetchError;

use super::{inbox_file, read_export, SourceAdapter};

/// Reads the report CSVs the portal's browser automation downloads.
pub struct PortalExportAdapter {
    inbox: PathBuf,
    feeds: Vec<FeedSpec>,
}

impl PortalExportAdapter {
    pub fn new(inbox: &Path, feeds: Vec<FeedSpec>) -> Self {
        Self { inbox: inbox.to_path_buf(), feeds }
    }
}

impl SourceAdapter for PortalExportAdapter {
    fn source(&self) -> Source { Source::Portal }

    fn fetch(&self, period: Period) -> Result<Vec<RawRecord>, FetchError> {
        let mut out = Vec::new();
        for feed in &self.feeds {
            let path = inbox_file(&self.inbox, period, &feed.file_name("csv"));
            let text = read_export(&path)?;
            let rows = parse_report(&feed.name, &text)
                .map_err(|e| FetchError::Malformed(format!("{}: {e}", path.display())))?;
            debug!("portal: {} row(s) from {}", rows.len(), path.display());
            out.extend(rows.into_iter().map(RawRecord::Portal));
        }
        Ok(out)
    }
}

/// Parse one report export. The header row names the fields; short rows are
/// padded with empty cells and surplus cells are dropped.
pub(crate) fn parse_report(report: &str, text: &str) -> Result<Vec<PortalRow>, String> {
    let rows = csv::parse_rows(strip_bom(text), SEP);
    let Some((header, body)) = csv::split_header(rows) else {
        return Err(s!("export has no header row"));
    };
    let header: Vec<String> = header.iter().map(|h| normalize_ws(h)).collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(s!("export header is blank"));
    }

    Ok(body
        .into_iter()
        .map(|(line, cells)| {
            let mut fields = BTreeMap::new();
            for (i, name) in header.iter().enumerate() {
                if name.is_empty() { continue; }
                fields.insert(name.clone(), cells.get(i).cloned().unwrap_or_default());
            }
            PortalRow { report: s!(report), line, fields }
        })
        .collect())
}
