// src/specs/database.rs
//! Spec for hosted-table records.
//!
//! Fields are JSON values. Lookup and linked-record fields arrive as lists and
//! only their first element is meaningful here; collaborator fields arrive as
//! objects carrying a `name`.

use serde_json::Value as Json;

use crate::core::sanitize::normalize_ws;
use crate::data::{RawRecord, Source};

use super::SourceSpec;

pub struct DatabaseSpec;

pub static SPEC: DatabaseSpec = DatabaseSpec;

fn json_text(v: &Json) -> Option<String> {
    let text = match v {
        Json::Null => return None,
        Json::String(s) => normalize_ws(s),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Array(items) => return items.first().and_then(json_text),
        Json::Object(map) => return map.get("name").and_then(json_text),
    };
    (!text.is_empty()).then_some(text)
}

impl SourceSpec for DatabaseSpec {
    fn source(&self) -> Source { Source::Database }

    fn field(&self, raw: &RawRecord, name: &str) -> Option<String> {
        let RawRecord::Database(row) = raw else { return None };
        let v = row.fields.get(name).or_else(|| {
            row.fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })?;
        json_text(v)
    }

    fn is_noise(&self, raw: &RawRecord) -> bool {
        match raw {
            // Blank grid rows come back as records with no fields at all.
            RawRecord::Database(row) => row.fields.values().all(|v| json_text(v).is_none()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::options::FeedSpec;
    use crate::data::{DatabaseRow, PortalRow};

    fn rec(fields: Json) -> RawRecord {
        let Json::Object(fields) = fields else { panic!("fields must be an object") };
        RawRecord::Database(DatabaseRow { table: s!("Event Attendance"), id: s!("rec1"), fields })
    }

    #[test]
    fn lookup_lists_use_first_value() {
        let r = rec(json!({ "Event Date": ["2024-05-04", "2024-06-01"], "Name": "Ana" }));
        assert_eq!(SPEC.field(&r, "Event Date").as_deref(), Some("2024-05-04"));
        assert_eq!(SPEC.field(&r, "name").as_deref(), Some("Ana"));
    }

    #[test]
    fn scalar_and_object_fields() {
        let r = rec(json!({
            "Hours": 3,
            "Active": true,
            "Coordinator": { "id": "usr1", "name": "Lee" },
            "Empty": [],
            "Nothing": null
        }));
        assert_eq!(SPEC.field(&r, "Hours").as_deref(), Some("3"));
        assert_eq!(SPEC.field(&r, "Active").as_deref(), Some("true"));
        assert_eq!(SPEC.field(&r, "Coordinator").as_deref(), Some("Lee"));
        assert_eq!(SPEC.field(&r, "Empty"), None);
        assert_eq!(SPEC.field(&r, "Nothing"), None);
    }

    #[test]
    fn empty_records_are_noise() {
        let feed = FeedSpec::count("Event Attendance", "attendance", "Event Date");
        assert!(!SPEC.keep(&rec(json!({})), &feed));
        assert!(!SPEC.keep(&rec(json!({ "Name": "  " })), &feed));
        assert!(SPEC.keep(&rec(json!({ "Name": "Ana" })), &feed));
    }

    #[test]
    fn return_rate_needs_a_person() {
        let feed = FeedSpec::return_rate("Event Attendance", "rate", "Event Date", "Name");
        let ok = SPEC.map(&rec(json!({ "Event Date": ["2024-05-04"], "Name": " Ana " })), &feed).unwrap();
        assert_eq!(ok.person.as_deref(), Some("Ana"));
        let err = SPEC.map(&rec(json!({ "Event Date": "2024-05-04" })), &feed).unwrap_err();
        assert!(err.0.contains("Name"));
    }

    #[test]
    fn foreign_variant_is_a_mapping_error() {
        let feed = FeedSpec::count("Event Attendance", "attendance", "Event Date");
        let portal = RawRecord::Portal(PortalRow {
            report: s!("Event Attendance"),
            line: 3,
            fields: Default::default(),
        });
        assert!(SPEC.map(&portal, &feed).is_err());
    }
}
