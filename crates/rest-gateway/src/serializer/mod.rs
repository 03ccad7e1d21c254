//! Result bag → JSON document.
//!
//! Objects are prepared, then their stored fields are extracted with the
//! type's hidden fields removed. Plain maps nested anywhere below an object
//! inherit that object's hidden fields. Nesting beyond `max_depth` fails the
//! request.

mod hooks;
mod redaction;

pub use hooks::{AvatarUrlHook, DocumentHook, AVATAR_ATTRIBUTE, AVATAR_DOWNLOAD_FIELD};
pub use redaction::{RedactionPolicy, RedactionTable};

use crate::dispatch::ResultBag;
use crate::domain::{ApiError, ApiResult, ObjectRef, Value};
use serde_json::{Map, Number, Value as Json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Serialized response document
pub type Document = Map<String, Json>;

/// Redaction-aware serializer
#[derive(Clone)]
pub struct Serializer {
    redaction: Arc<RedactionTable>,
    hooks: Vec<Arc<dyn DocumentHook>>,
    max_depth: usize,
}

impl Serializer {
    pub fn new(redaction: Arc<RedactionTable>, max_depth: usize) -> Self {
        Self {
            redaction,
            hooks: Vec::new(),
            max_depth,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn DocumentHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Serialize every slot, then run the document hooks
    pub fn serialize(&self, results: &ResultBag) -> ApiResult<Document> {
        let mut document = Document::new();
        for (slot, value) in results.iter() {
            document.insert(slot.to_string(), self.value(value, None, 0)?);
        }

        for hook in &self.hooks {
            hook.before_encode(results, &mut document);
        }

        Ok(document)
    }

    fn value(&self, value: &Value, hidden: Option<&HashSet<String>>, depth: usize) -> ApiResult<Json> {
        if depth > self.max_depth {
            warn!(max_depth = self.max_depth, "Serialization depth exceeded");
            return Err(ApiError::internal(
                "object graph exceeds maximum serialization depth",
            ));
        }

        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(
                items
                    .iter()
                    .map(|item| self.value(item, hidden, depth + 1))
                    .collect::<ApiResult<_>>()?,
            ),
            Value::Map(map) => {
                let mut out = Map::new();
                for (key, item) in map.iter() {
                    if hidden.is_some_and(|h| h.contains(key)) {
                        continue;
                    }
                    out.insert(key.to_string(), self.value(item, hidden, depth + 1)?);
                }
                Json::Object(out)
            }
            Value::Object(object) => self.object(object, depth)?,
        })
    }

    fn object(&self, object: &ObjectRef, depth: usize) -> ApiResult<Json> {
        object.prepare();

        let hidden = self.redaction.hidden_fields(object.type_name());
        let hidden = hidden.as_deref();

        let mut out = Map::new();
        for (name, value) in object.fields() {
            if hidden.is_some_and(|h| h.contains(&name)) {
                continue;
            }
            let json = self.value(&value, hidden, depth + 1)?;
            out.insert(name, json);
        }
        Ok(Json::Object(out))
    }
}
