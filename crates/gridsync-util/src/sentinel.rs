//! Substitutes the legacy `{".sv": "timestamp"}` sentinel some older
//! clients still embed in an event draft's JSON payload with the
//! server's own wall-clock, before the draft is deserialized into a
//! [`gridsync_core::event::EventDraft`]. Typed enum payloads
//! can't carry the sentinel themselves, so the substitution has to
//! happen one layer up, on the raw JSON value the transport received.

use serde_json::Value;

const SENTINEL_KEY: &str = ".sv";
const SENTINEL_VALUE: &str = "timestamp";

/// Walks `value` depth-first, replacing every `{".sv": "timestamp"}`
/// object with `now_ms` (as a JSON number).
pub fn substitute_timestamp_sentinel(value: &mut Value, now_ms: i64) {
    match value {
        Value::Object(map) => {
            if is_sentinel(map) {
                *value = Value::from(now_ms);
                return;
            }
            for v in map.values_mut() {
                substitute_timestamp_sentinel(v, now_ms);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_timestamp_sentinel(item, now_ms);
            }
        }
        _ => {}
    }
}

fn is_sentinel(map: &serde_json::Map<String, Value>) -> bool {
    map.len() == 1 && map.get(SENTINEL_KEY).and_then(Value::as_str) == Some(SENTINEL_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_top_level_sentinel() {
        let mut value = json!({".sv": "timestamp"});
        substitute_timestamp_sentinel(&mut value, 1_700_000_000_000);
        assert_eq!(value, json!(1_700_000_000_000i64));
    }

    #[test]
    fn replaces_nested_sentinel_and_leaves_other_fields_alone() {
        let mut value = json!({
            "row": 3,
            "col": 4,
            "timestamp": {".sv": "timestamp"},
        });
        substitute_timestamp_sentinel(&mut value, 42);
        assert_eq!(
            value,
            json!({"row": 3, "col": 4, "timestamp": 42})
        );
    }

    #[test]
    fn ignores_objects_that_merely_resemble_the_sentinel() {
        let mut value = json!({".sv": "timestamp", "extra": 1});
        substitute_timestamp_sentinel(&mut value, 99);
        assert_eq!(value, json!({".sv": "timestamp", "extra": 1}));
    }
}
