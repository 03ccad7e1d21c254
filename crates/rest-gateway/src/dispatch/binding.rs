//! Binding request parameters to an operation's formal parameters.

use crate::domain::{ApiError, ApiResult, Value};
use crate::registry::FormalParam;

/// Arguments for one invocation: one slot per formal parameter, in
/// declaration order. An empty slot means "use the default".
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    slots: Vec<(String, Option<Value>)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot (used by tests and providers invoked directly)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.slots.push((name.into(), Some(value.into())));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots
            .iter()
            .find(|(slot, _)| slot == name)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn positional(&self, index: usize) -> Option<&Value> {
        self.slots.get(index).and_then(|(_, value)| value.as_ref())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Match each formal parameter by name against `parameters`.
///
/// A loosely empty request value counts as absent. A missing required
/// parameter fails with `MissingParameters`; extra request values are ignored.
pub fn bind_arguments(formals: &[FormalParam], parameters: Option<&Value>) -> ApiResult<Arguments> {
    let mut slots = Vec::with_capacity(formals.len());

    for formal in formals {
        let value = parameters
            .and_then(|p| p.get(&formal.name))
            .filter(|v| !v.is_empty())
            .cloned();

        if value.is_none() && formal.required {
            return Err(ApiError::missing_parameters(format!(
                "parameter {} is missing",
                formal.name
            )));
        }
        slots.push((formal.name.clone(), value));
    }

    Ok(Arguments { slots })
}
