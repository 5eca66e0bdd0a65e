//! Field discovery on a sample record
//!
//! Resources publish the registration date and company identifier under
//! different names, so both are guessed from the first record of a small
//! sample page.

use chrono::NaiveDate;
use regwatch_common::{Record, RegwatchError, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::dates::parse_loose;

/// Known registration-date field names, in priority order
pub const DATE_FIELD_CANDIDATES: [&str; 4] = [
    "date_of_registration",
    "CompanyRegistrationdate_date",
    "date_of_incorporation",
    "Date_of_Registration",
];

/// Known identity field names, in priority order
pub const ID_FIELD_CANDIDATES: [&str; 4] = ["cin", "CIN", "company_name", "CompanyName"];

/// Pick the field most likely to hold the registration date.
///
/// A known name wins outright; otherwise the first field whose value reads as
/// a date.
pub fn detect_date_field(sample: &Record) -> Option<String> {
    if let Some(known) = DATE_FIELD_CANDIDATES
        .iter()
        .find(|name| sample.contains_key(**name))
    {
        return Some(known.to_string());
    }

    sample
        .iter()
        .find(|(_, value)| parse_loose(value).is_some())
        .map(|(name, _)| name.clone())
}

/// Pick the field used as a tie-breaker and record label.
///
/// Falls back to the first field; `None` only for an empty record.
pub fn detect_id_field(sample: &Record) -> Option<String> {
    ID_FIELD_CANDIDATES
        .iter()
        .find(|name| sample.contains_key(**name))
        .map(|name| name.to_string())
        .or_else(|| sample.keys().next().cloned())
}

/// Render a field value as plain text.
///
/// Missing and null become empty, strings are taken verbatim, everything else
/// is compact JSON.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// The date and identity fields of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub date_field: String,
    pub id_field: Option<String>,
}

impl Schema {
    /// Detect the schema from a sample record.
    ///
    /// `date_override` skips date detection. Without it, a sample with no
    /// date-like field is an error: nothing could be matched to the window.
    pub fn sniff(sample: &Record, date_override: Option<&str>) -> Result<Self> {
        let date_field = match date_override {
            Some(field) => {
                debug!(field, "Using configured date field");
                field.to_string()
            },
            None => detect_date_field(sample).ok_or(RegwatchError::NoDateField)?,
        };
        let id_field = detect_id_field(sample);

        info!(
            date_field = %date_field,
            id_field = id_field.as_deref().unwrap_or(""),
            "Detected record schema"
        );

        Ok(Self {
            date_field,
            id_field,
        })
    }

    /// The record's registration date, if present and readable
    pub fn date_of(&self, record: &Record) -> Option<NaiveDate> {
        record.get(&self.date_field).and_then(parse_loose)
    }

    /// The record's identity as text; empty when absent
    pub fn id_of(&self, record: &Record) -> String {
        self.id_field
            .as_ref()
            .map(|field| value_text(record.get(field)))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test records must be objects"),
        }
    }

    #[test]
    fn test_known_date_field_wins_over_value_sniffing() {
        // An earlier field parses as a date, but the known name still wins.
        let sample = record(json!({
            "updated": "2024-01-01",
            "CompanyRegistrationdate_date": "not a date",
        }));
        assert_eq!(
            detect_date_field(&sample).as_deref(),
            Some("CompanyRegistrationdate_date")
        );
    }

    #[test]
    fn test_known_date_fields_follow_priority_order() {
        let sample = record(json!({
            "Date_of_Registration": "01-01-2024",
            "date_of_incorporation": "01-01-2024",
        }));
        assert_eq!(
            detect_date_field(&sample).as_deref(),
            Some("date_of_incorporation")
        );
    }

    #[test]
    fn test_date_field_falls_back_to_first_parseable_value() {
        let sample = record(json!({
            "name": "ACME PRIVATE LIMITED",
            "capital": 100000,
            "registered_on": "15-01-2024",
            "updated_on": "2024-02-01",
        }));
        assert_eq!(detect_date_field(&sample).as_deref(), Some("registered_on"));
    }

    #[test]
    fn test_no_date_field() {
        let sample = record(json!({ "name": "ACME", "state": "Goa" }));
        assert_eq!(detect_date_field(&sample), None);
        assert!(matches!(
            Schema::sniff(&sample, None),
            Err(RegwatchError::NoDateField)
        ));
    }

    #[test]
    fn test_date_override_skips_detection() {
        let sample = record(json!({ "name": "ACME" }));
        let schema = Schema::sniff(&sample, Some("custom_date")).unwrap();
        assert_eq!(schema.date_field, "custom_date");
    }

    #[test]
    fn test_id_field_detection() {
        let sample = record(json!({ "company_name": "ACME", "CIN": "U1" }));
        assert_eq!(detect_id_field(&sample).as_deref(), Some("CIN"));

        let sample = record(json!({ "reg_no": 7, "name": "ACME" }));
        assert_eq!(detect_id_field(&sample).as_deref(), Some("reg_no"));

        assert_eq!(detect_id_field(&Record::new()), None);
    }

    #[test]
    fn test_id_of_stringifies_values() {
        let schema = Schema {
            date_field: "d".into(),
            id_field: Some("id".into()),
        };
        assert_eq!(schema.id_of(&record(json!({ "id": "U1" }))), "U1");
        assert_eq!(schema.id_of(&record(json!({ "id": 42 }))), "42");
        assert_eq!(schema.id_of(&record(json!({ "id": null }))), "");
        assert_eq!(schema.id_of(&record(json!({}))), "");
    }
}
