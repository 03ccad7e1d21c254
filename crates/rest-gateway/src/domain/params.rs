//! Request-level fields and the single decode step for serialized arrays.
//!
//! Query strings carry structure through bracket notation:
//!
//! ```text
//! parameters[title]=Hello&parameters[tags][]=a&parameters[tags][]=b
//! objectIDs[]=3&objectIDs[]=4
//! login[username]=alice&login[password]=secret
//! ```
//!
//! A plain string for a collection field (`parameters=...`) is a serialized
//! array: it must decode as a JSON array or object.

use super::error::{ApiError, ApiResult};
use super::value::{Value, ValueMap};

/// Deepest bracket nesting accepted in a query key
pub const MAX_KEY_DEPTH: usize = 32;

/// Fields sent alongside the path (query string and optional JSON body)
#[derive(Debug, Clone, Default)]
pub struct RequestFields {
    fields: ValueMap,
}

impl RequestFields {
    /// Build from decoded `key=value` query pairs, expanding bracket notation.
    /// Keys nested deeper than [`MAX_KEY_DEPTH`] are rejected.
    pub fn from_query_pairs<I>(pairs: I) -> ApiResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut fields = ValueMap::new();
        for (key, value) in pairs {
            let (base, segments) = split_key(&key);
            if base.is_empty() {
                continue;
            }
            if segments.len() > MAX_KEY_DEPTH {
                return Err(ApiError::bad_parameters(format!(
                    "{} nesting too deep",
                    base
                )));
            }
            assign(fields.slot_mut(&base), &segments, Value::Str(value));
        }
        Ok(Self { fields })
    }

    /// Add the top-level members of a JSON object body. Fields already set
    /// from the query string win.
    pub fn merge_json_body(&mut self, body: serde_json::Value) {
        if let serde_json::Value::Object(members) = body {
            for (key, value) in members {
                if !self.fields.contains_key(&key) {
                    self.fields.insert(key, Value::from_json(value));
                }
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A field that is present and not loosely empty
    pub fn non_empty(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_empty())
    }

    /// A trimmed, non-empty string field
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decode a serialized array. Anything but a JSON array/object is rejected.
pub fn decode_serialized_array(field: &str, raw: &str) -> ApiResult<Value> {
    match serde_json::from_str::<serde_json::Value>(raw.trim()) {
        Ok(json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
            Ok(Value::from_json(json).trimmed())
        }
        _ => Err(ApiError::bad_parameters(format!(
            "{} is not a valid serialized array",
            field
        ))),
    }
}

/// Accept a structured list/map as-is or decode a serialized-array string.
pub fn structured_collection(field: &str, value: &Value) -> ApiResult<Value> {
    match value {
        Value::List(_) | Value::Map(_) => Ok(value.clone().trimmed()),
        Value::Str(raw) => decode_serialized_array(field, raw),
        _ => Err(ApiError::bad_parameters(format!(
            "{} is not a valid serialized array",
            field
        ))),
    }
}

/// `a[b][]` → (`a`, [`b`, ``])
fn split_key(key: &str) -> (String, Vec<String>) {
    match key.find('[') {
        Some(pos) if pos > 0 && key.ends_with(']') => {
            let inner = &key[pos + 1..key.len() - 1];
            let segments = inner.split("][").map(str::to_string).collect();
            (key[..pos].to_string(), segments)
        }
        _ => (key.to_string(), Vec::new()),
    }
}

/// One past the largest non-negative integer key, or 0
fn next_index(map: &ValueMap) -> u64 {
    map.keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(0, |n| n.saturating_add(1))
}

fn assign(slot: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };

    if head.is_empty() {
        match slot {
            Value::List(items) => {
                let mut child = Value::Null;
                assign(&mut child, rest, value);
                items.push(child);
            }
            Value::Map(map) => {
                let key = next_index(map).to_string();
                assign(map.slot_mut(&key), rest, value);
            }
            _ => {
                let mut child = Value::Null;
                assign(&mut child, rest, value);
                *slot = Value::List(vec![child]);
            }
        }
        return;
    }

    if !matches!(slot, Value::Map(_)) {
        *slot = match std::mem::take(slot) {
            Value::List(items) => Value::Map(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
            ),
            _ => Value::Map(ValueMap::new()),
        };
    }
    if let Value::Map(map) = slot {
        assign(map.slot_mut(head), rest, value);
    }
}
