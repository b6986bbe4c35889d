//! Backend JSON to view-model conversion, REST client and reference data loader.

#[cfg(not(target_arch = "wasm32"))]
mod client;
mod loader;
mod source;

use std::collections::BTreeMap;

use oilsight_core::{DashboardError, Measurement, ParentRef, ReferenceRecord, Sample};
use serde_json::{Map, Value};
use tracing::debug;

#[cfg(not(target_arch = "wasm32"))]
pub use client::ApiClient;
pub use loader::{ReferenceLoad, ReferenceLoader};
pub use source::{ApiConfig, Endpoint, ReferenceSource};

const LIST_WRAPPERS: [&str; 3] = ["data", "items", "results"];
const NAME_FIELDS: [&str; 4] = ["name", "title", "label", "full_name"];
const FLAT_PARENT_FIELDS: [&str; 5] = [
    "organization",
    "site",
    "asset",
    "sampling_point",
    "user",
];

/// Parse a reference list (organizations, sites, assets, ...) from a JSON string.
pub fn parse_reference_list_str(json: &str) -> Result<Vec<ReferenceRecord>, DashboardError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| DashboardError::Parse(err.to_string()))?;
    parse_reference_list(&value)
}

/// Parse a reference list from a `serde_json::Value`.
///
/// Accepts a bare array or an object wrapping it under `data`, `items` or
/// `results`. Records without a usable `id` are skipped.
pub fn parse_reference_list(value: &Value) -> Result<Vec<ReferenceRecord>, DashboardError> {
    let entries = records_array(value).ok_or(DashboardError::MissingData)?;

    let records: Vec<ReferenceRecord> = entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(parse_reference_record)
        .collect();

    if records.len() < entries.len() {
        debug!(
            skipped = entries.len() - records.len(),
            "dropped reference records without id"
        );
    }

    Ok(records)
}

/// Parse samples from a JSON string.
pub fn parse_samples_str(json: &str) -> Result<Vec<Sample>, DashboardError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| DashboardError::Parse(err.to_string()))?;
    parse_samples(&value)
}

/// Parse samples from a `serde_json::Value`.
///
/// Samples without a readable `date_sampled` cannot be charted and are skipped.
pub fn parse_samples(value: &Value) -> Result<Vec<Sample>, DashboardError> {
    let entries = records_array(value).ok_or(DashboardError::MissingData)?;

    let samples: Vec<Sample> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| parse_sample(index, entry.as_object()?))
        .collect();

    if samples.len() < entries.len() {
        debug!(
            skipped = entries.len() - samples.len(),
            "dropped samples without date_sampled"
        );
    }

    Ok(samples)
}

fn records_array(value: &Value) -> Option<&Vec<Value>> {
    if let Some(array) = value.as_array() {
        return Some(array);
    }
    LIST_WRAPPERS
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
}

fn parse_reference_record(object: &Map<String, Value>) -> Option<ReferenceRecord> {
    let id = object.get("id").and_then(id_text)?;

    let mut parents = BTreeMap::new();
    for (field, value) in object {
        if field == "id" {
            continue;
        }
        if let Some(parent) = parent_ref(field, value) {
            parents.insert(field.clone(), parent);
        }
    }

    Some(ReferenceRecord {
        id,
        name: record_name(object),
        parents,
    })
}

fn parent_ref(field: &str, value: &Value) -> Option<ParentRef> {
    match value {
        Value::Object(nested) => Some(ParentRef {
            id: nested.get("id").and_then(id_text)?,
            name: nested
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        Value::String(_) | Value::Number(_) if is_flat_parent_field(field) => Some(ParentRef {
            id: id_text(value)?,
            name: None,
        }),
        _ => None,
    }
}

fn is_flat_parent_field(field: &str) -> bool {
    field.starts_with("parent_") || FLAT_PARENT_FIELDS.contains(&field)
}

fn record_name(object: &Map<String, Value>) -> Option<String> {
    if let Some(name) = NAME_FIELDS
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
    {
        return Some(name.to_string());
    }

    let first = object.get("first_name").and_then(Value::as_str);
    let last = object.get("last_name").and_then(Value::as_str);
    let full = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full.is_empty() {
        return Some(full);
    }

    object
        .get("email")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_sample(index: usize, object: &Map<String, Value>) -> Option<Sample> {
    let date_sampled = object.get("date_sampled").and_then(parse_timestamp)?;
    let id = object
        .get("id")
        .and_then(id_text)
        .unwrap_or_else(|| format!("sample-{index}"));

    Some(Sample {
        id,
        date_sampled,
        site: object.get("site").and_then(|v| parent_ref("site", v)),
        asset: object.get("asset").and_then(|v| parent_ref("asset", v)),
        sampling_point: object
            .get("sampling_point")
            .and_then(|v| parent_ref("sampling_point", v)),
        wear_metals: parse_measurements(object.get("wear_metals"), &["element", "name"]),
        contaminants: parse_measurements(object.get("contaminants"), &["type", "name"]),
    })
}

fn parse_measurements(value: Option<&Value>, name_fields: &[&str]) -> Vec<Measurement> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = name_fields
                .iter()
                .find_map(|key| entry.get(*key).and_then(Value::as_str))?
                .trim();
            if name.is_empty() {
                return None;
            }
            Some(Measurement {
                name: name.to_string(),
                value: entry.get("value").and_then(parse_number),
                unit: entry
                    .get("unit")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|secs| secs.trunc() as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_and_flat_parents_are_read() {
        let records = parse_reference_list(&json!([
            {"id": "a1", "name": "Pump", "parent_site": {"id": "s1", "name": "North"}},
            {"id": 42, "parent_site": "s2"},
            {"id": "a3", "site": 9, "notes": "free text"},
        ]))
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].parent_id("parent_site"), Some("s1"));
        assert_eq!(
            records[0].parents["parent_site"].name.as_deref(),
            Some("North")
        );
        assert_eq!(records[1].id, "42");
        assert_eq!(records[1].parent_id("parent_site"), Some("s2"));
        assert_eq!(records[2].parent_id("site"), Some("9"));
        assert_eq!(records[2].parent_id("notes"), None);
    }

    #[test]
    fn wrapped_lists_and_missing_ids() {
        let records = parse_reference_list(&json!({
            "results": [{"id": ""}, {"name": "anonymous"}, {"id": "o1"}]
        }))
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "o1");

        assert!(matches!(
            parse_reference_list(&json!({"detail": "not found"})),
            Err(DashboardError::MissingData)
        ));
        assert!(matches!(
            parse_reference_list_str("<html>"),
            Err(DashboardError::Parse(_))
        ));
    }

    #[test]
    fn user_names_fall_back_to_email() {
        let records = parse_reference_list(&json!([
            {"id": "u1", "first_name": "Lan", "last_name": "Tran"},
            {"id": "u2", "email": "ops@example.com"},
            {"id": "u3"}
        ]))
        .unwrap();

        assert_eq!(records[0].label(), "Lan Tran");
        assert_eq!(records[1].label(), "ops@example.com");
        assert_eq!(records[2].label(), "u3");
    }

    #[test]
    fn samples_tolerate_string_numbers() {
        let samples = parse_samples(&json!([
            {
                "id": "x",
                "date_sampled": "1709280000",
                "sampling_point": {"id": "p1"},
                "wear_metals": [
                    {"element": "Iron", "value": "10.5", "unit": "ppm"},
                    {"element": "", "value": 3},
                    {"value": 4}
                ],
                "contaminants": [{"type": "Water", "value": null}]
            },
            {"date_sampled": 1709280000.9},
            {"id": "no-date"}
        ]))
        .unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].date_sampled, 1_709_280_000);
        assert_eq!(samples[0].wear_metal("iron"), Some(10.5));
        assert_eq!(samples[0].wear_metals.len(), 1);
        assert_eq!(samples[0].contaminants[0].value, None);
        assert_eq!(
            samples[0].sampling_point.as_ref().map(|p| p.id.as_str()),
            Some("p1")
        );
        assert_eq!(samples[1].id, "sample-1");
        assert_eq!(samples[1].date_sampled, 1_709_280_000);
    }
}
