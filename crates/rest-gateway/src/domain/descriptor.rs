//! The per-request target descriptor produced by the route resolver.

use super::params::RequestFields;
use serde::Serialize;

/// What a request asks for: a type, optionally an instance, an operation and
/// its inline parameters.
///
/// Created once per request and never mutated; request-level overrides are
/// folded in by [`ApiRequestDescriptor::with_request_fields`], which returns
/// a new descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequestDescriptor {
    raw_path: String,
    type_name: Option<String>,
    id: Option<String>,
    operation: Option<String>,
    raw_parameters: Option<String>,
    decorator_type_name: Option<String>,
}

impl ApiRequestDescriptor {
    /// Descriptor with only the raw path set (the collection root)
    pub fn new(raw_path: impl Into<String>) -> Self {
        Self {
            raw_path: raw_path.into(),
            ..Self::default()
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_raw_parameters(mut self, raw: impl Into<String>) -> Self {
        self.raw_parameters = Some(raw.into());
        self
    }

    /// Fold in the request-level `method` and `objectDecoratorClassName`
    /// fields. `method` only applies when the path carried no operation.
    pub fn with_request_fields(mut self, fields: &RequestFields) -> Self {
        if self.operation.is_none() {
            if let Some(method) = fields.non_empty_str("method") {
                self.operation = Some(method.to_string());
            }
        }
        if let Some(decorator) = fields.non_empty_str("objectDecoratorClassName") {
            self.decorator_type_name = Some(decorator.to_string());
        }
        self
    }

    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// The identifier exactly as it appeared in the path
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The identifier, with zero identifiers treated as absent
    pub fn effective_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty() && !id.bytes().all(|b| b == b'0'))
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn raw_parameters(&self) -> Option<&str> {
        self.raw_parameters.as_deref()
    }

    pub fn decorator_type_name(&self) -> Option<&str> {
        self.decorator_type_name.as_deref()
    }

    /// True for the bare `api` route
    pub fn is_collection_root(&self) -> bool {
        self.type_name.is_none()
    }
}
