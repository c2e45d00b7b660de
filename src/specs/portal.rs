// src/specs/portal.rs
//! Spec for portal report exports.
//!
//! Rows come from CSV downloads, so every field is text. Header names are
//! matched exactly first, then case-insensitively (exports are not consistent
//! about "Date submitted" vs "Date Submitted").

use crate::core::sanitize::normalize_ws;
use crate::data::{RawRecord, Source};

use super::SourceSpec;

pub struct PortalSpec;

pub static SPEC: PortalSpec = PortalSpec;

impl SourceSpec for PortalSpec {
    fn source(&self) -> Source { Source::Portal }

    fn field(&self, raw: &RawRecord, name: &str) -> Option<String> {
        let RawRecord::Portal(row) = raw else { return None };

        let cell = row.fields.get(name).or_else(|| {
            let want = normalize_ws(name).to_lowercase();
            row.fields
                .iter()
                .find(|(k, _)| normalize_ws(k).to_lowercase() == want)
                .map(|(_, v)| v)
        })?;

        let v = normalize_ws(cell);
        (!v.is_empty()).then_some(v)
    }

    fn is_noise(&self, raw: &RawRecord) -> bool {
        match raw {
            RawRecord::Portal(row) => row.fields.values().all(|v| v.trim().is_empty()),
            _ => false,
        }
    }
}
