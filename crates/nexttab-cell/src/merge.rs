//! Deep merge of partial updates into nested records
//!
//! Patch fields overwrite, absent fields are kept. Two records at the same
//! field merge recursively; anything else, arrays and `null` included, is
//! replaced wholesale by the patch value.

use serde_json::{Map, Value};

pub fn deep_merge(prev: &Value, patch: &Value) -> Value {
    match (prev, patch) {
        (Value::Object(prev), Value::Object(patch)) => Value::Object(merge_records(prev, patch)),
        _ => patch.clone(),
    }
}

fn merge_records(prev: &Map<String, Value>, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = prev.clone();
    for (field, patch_value) in patch {
        let next = match merged.get(field) {
            Some(prev_value) => deep_merge(prev_value, patch_value),
            None => patch_value.clone(),
        };
        merged.insert(field.clone(), next);
    }
    merged
}
