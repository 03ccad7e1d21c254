//! Loosely typed values flowing between the request boundary, backend targets
//! and the serializer.
//!
//! Backend objects are exposed through [`ApiObject`]: a stable type name, the
//! ordered list of stored fields, optional derived attributes, and typed access
//! via [`std::any::Any`] for registered operation handlers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Warm-up capability for objects with lazily populated state.
///
/// Called before an object is extracted for output. Implementations must be
/// idempotent since the same object can be prepared more than once.
pub trait Preparable {
    fn prepare(&self) {}
}

/// A backend object that can be returned from a dispatch and serialized.
pub trait ApiObject: Preparable + Send + Sync + fmt::Debug {
    /// Canonical namespaced type name (e.g. `wcf\data\user\User`)
    fn type_name(&self) -> &str;

    /// Stored fields in declaration order
    fn fields(&self) -> Vec<(String, Value)>;

    /// Derived, non-stored attribute lookup
    fn attribute(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Typed access for operation handlers
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a backend object
pub type ObjectRef = Arc<dyn ApiObject>;

/// Dynamic value
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(ValueMap),
    Object(ObjectRef),
}

impl Value {
    /// Loose emptiness: null, false, zero, `""`, `"0"` and empty collections
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Str(s) => s.is_empty() || s == "0",
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Object(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view, parsing numeric strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Str(s) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Keyed lookup in a map, or index lookup in a list (`"0"`, `"1"`, ...)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Convert a plain JSON value
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Trim surrounding whitespace of every string, recursively
    pub fn trimmed(self) -> Self {
        match self {
            Value::Str(s) => Value::Str(s.trim().to_string()),
            Value::List(items) => Value::List(items.into_iter().map(Value::trimmed).collect()),
            Value::Map(map) => Value::Map(map.into_iter().map(|(k, v)| (k, v.trimmed())).collect()),
            other => other,
        }
    }

    pub fn object<T: ApiObject + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

/// Insertion-ordered string-keyed map
#[derive(Clone, Debug, Default)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Mutable slot for `key`, appending a `Null` entry when absent
    pub fn slot_mut(&mut self, key: &str) -> &mut Value {
        let pos = match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => pos,
            None => {
                self.entries.push((key.to_string(), Value::Null));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace in place, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.entries.retain(|(k, v)| keep(k, v));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::from("0").is_empty());
        assert!(Value::Int(0).is_empty());
        assert!(Value::Bool(false).is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(Value::Map(ValueMap::new()).is_empty());

        assert!(!Value::from("a").is_empty());
        assert!(!Value::from("00x").is_empty());
        assert!(!Value::Int(7).is_empty());
    }

    #[test]
    fn test_map_insert_keeps_position() {
        let mut map = ValueMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", 3);

        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a").and_then(Value::as_i64), Some(3));
    }

    #[test]
    fn test_from_json_preserves_structure() {
        let json = serde_json::json!({"title": " Hi ", "tags": ["x", "y"], "n": 4});
        let value = Value::from_json(json).trimmed();

        assert_eq!(value.get("title").and_then(Value::as_str), Some("Hi"));
        assert_eq!(value.get("tags").and_then(|t| t.get("1")).and_then(Value::as_str), Some("y"));
        assert_eq!(value.get("n").and_then(Value::as_i64), Some(4));
    }

    #[test]
    fn test_numeric_string_views() {
        assert_eq!(Value::from(" 42 ").as_i64(), Some(42));
        assert_eq!(Value::from("true").as_bool(), Some(true));
        assert_eq!(Value::from("maybe").as_bool(), None);
    }
}
