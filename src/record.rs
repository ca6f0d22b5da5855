// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Stored records are schemaless JSON objects: callers attach arbitrary
/// metadata fields alongside the well-known ones below.
pub type Record = Map<String, Value>;

/// The large opaque payload field. Carried only in full records on disk,
/// never in cached or listed metadata.
pub const PAYLOAD_FIELD: &str = "graphData";

pub fn id_of(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

pub fn timestamp_of(record: &Record) -> f64 {
    record.get("timestamp").and_then(Value::as_f64).unwrap_or(0.0)
}

pub fn is_locked(record: &Record) -> bool {
    record.get("locked").and_then(Value::as_bool).unwrap_or(false)
}

pub fn source_of(record: &Record) -> Option<&str> {
    record.get("source").and_then(Value::as_str)
}

/// Lightweight copy of `record` without the payload field.
pub fn strip_payload(record: &Record) -> Record {
    let mut meta = record.clone();
    meta.remove(PAYLOAD_FIELD);
    meta
}

/// Merge `fields` into `record`. A null value removes the key, anything
/// else overwrites it.
pub fn merge_fields(record: &mut Record, fields: &Record) {
    for (k, v) in fields {
        if v.is_null() {
            record.remove(k);
        } else {
            record.insert(k.clone(), v.clone());
        }
    }
}

/// Sort ascending by timestamp. The sort is stable, so records with equal
/// timestamps keep their enumeration order (not guaranteed across platforms).
pub fn sort_by_timestamp(records: &mut [Record]) {
    records.sort_by(|a, b| {
        timestamp_of(a)
            .partial_cmp(&timestamp_of(b))
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: serde_json::Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn merge_null_removes_key() {
        let mut rec = obj(json!({"id": "a", "label": "old", "timestamp": 5}));
        let fields = obj(json!({"label": null, "pinned": true}));
        merge_fields(&mut rec, &fields);
        assert!(!rec.contains_key("label"));
        assert_eq!(rec.get("pinned"), Some(&json!(true)));
        assert_eq!(rec.get("timestamp"), Some(&json!(5)));
    }

    #[test]
    fn missing_timestamp_sorts_first() {
        let mut records = vec![
            obj(json!({"id": "b", "timestamp": 2})),
            obj(json!({"id": "a"})),
        ];
        sort_by_timestamp(&mut records);
        assert_eq!(id_of(&records[0]), Some("a"));
    }
}
