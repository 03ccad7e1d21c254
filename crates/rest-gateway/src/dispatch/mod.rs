//! Capability-based dispatch.
//!
//! The resolved type's [`TargetShape`] selects one invocation strategy, in
//! this priority order:
//!
//! 1. CRUD command (validate → execute)
//! 2. Mutator bound to an entity loaded by id
//! 3. Wrapper around a base entity loaded by id
//! 4. Collection query (`readObjects`)
//! 5. Service singleton operation
//! 6. Static operation
//! 7. Rejection of abstract / final operations
//! 8. Instance operation on an entity or a plain object
//!
//! Afterwards an optional decorator replaces the `object` slot, and the
//! `object` is prepared for output. A failed dispatch yields no results.

mod binding;

pub use binding::{bind_arguments, Arguments};

use crate::domain::params::structured_collection;
use crate::domain::{
    params::decode_serialized_array, ApiError, ApiRequestDescriptor, ApiResult, ObjectRef,
    RequestFields, Value, ValueMap,
};
use crate::registry::{
    CommandRequest, OperationDef, OperationModifier, TargetRegistry, TargetShape, TargetType,
    TypeModifier, MUTATOR_SUFFIX,
};
use crate::serializer::RedactionTable;
use std::sync::Arc;
use tracing::{debug, warn};

/// Operation name that does not need an identifier on CRUD commands
pub const CREATE_OPERATION: &str = "create";

const INVALID_ID: &str = "parameter id is missing or invalid";
const MISSING_METHOD: &str = "parameter method is missing or invalid";

/// Named results of one dispatch, in insertion order
#[derive(Debug, Clone, Default)]
pub struct ResultBag {
    slots: ValueMap,
}

impl ResultBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot; replacing keeps the slot's position
    pub fn insert(&mut self, slot: impl Into<String>, value: impl Into<Value>) {
        self.slots.insert(slot, value);
    }

    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.slots.get(slot)
    }

    /// The `object` slot when it holds an object
    pub fn object(&self) -> Option<&ObjectRef> {
        self.get("object").and_then(Value::as_object)
    }

    /// Append every slot of `other`
    pub fn extend(&mut self, other: ResultBag) {
        for (slot, value) in other.slots {
            self.slots.insert(slot, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Executes descriptors against the target registry
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<TargetRegistry>,
    redaction: Arc<RedactionTable>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TargetRegistry>, redaction: Arc<RedactionTable>) -> Self {
        Self {
            registry,
            redaction,
        }
    }

    /// Dispatch a resolved request
    pub fn dispatch(
        &self,
        descriptor: &ApiRequestDescriptor,
        fields: &RequestFields,
    ) -> ApiResult<ResultBag> {
        let Some(type_name) = descriptor.type_name() else {
            debug!("Collection root requested");
            return Ok(ResultBag::new());
        };
        let _span = gateway_telemetry::gateway_span!(
            "dispatch",
            component = "dispatcher",
            type_name = %type_name,
            operation = descriptor.operation().unwrap_or_default()
        )
        .entered();

        if let Some(decorator) = descriptor.decorator_type_name() {
            if !self.registry.contains(decorator) {
                return Err(ApiError::bad_parameters(
                    "parameter objectDecoratorClassName provides an invalid classname",
                ));
            }
        }

        let parameters = request_parameters(descriptor, fields)?;
        let target = self.resolve_type(type_name)?;
        let operation = match descriptor.operation() {
            Some(name) => Some(target.operation(name).ok_or_else(|| {
                ApiError::bad_parameters(format!("Method {}::{}() does not exist", type_name, name))
            })?),
            None => None,
        };

        let call = Call {
            descriptor,
            fields,
            target,
            operation,
            parameters: parameters.as_ref(),
        };

        let mut bag = ResultBag::new();
        match target.shape.as_ref() {
            Some(TargetShape::CrudCommand(factory)) => {
                debug!(type_name, "Dispatching CRUD command");
                self.run_crud_command(&call, factory, &mut bag)?;
            }
            Some(TargetShape::Mutator(wrap)) => {
                debug!(type_name, "Dispatching mutator");
                self.run_mutator(&call, wrap, &mut bag)?;
            }
            Some(TargetShape::Wrapper { base, wrap }) => {
                debug!(type_name, base = %base, "Dispatching wrapper");
                self.run_wrapper(&call, base, wrap, &mut bag)?;
            }
            Some(TargetShape::CollectionQuery(factory)) => {
                debug!(type_name, "Dispatching collection query");
                let mut list = factory().map_err(|e| ApiError::from_target(type_name, &e))?;
                list.read_objects()
                    .map_err(|e| ApiError::from_target("readObjects", &e))?;
                bag.insert("object", list.into_object());
            }
            Some(TargetShape::ServiceSingleton(instance)) => {
                debug!(type_name, "Dispatching singleton operation");
                let operation = call.require_operation()?;
                let result = invoke(operation, Some(instance), call.parameters)?;
                bag.insert("object", result);
            }
            _ => match operation {
                Some(op) if op.is_static() => {
                    debug!(type_name, operation = %op.name, "Dispatching static operation");
                    let result = invoke(op, None, call.parameters)?;
                    bag.insert("object", result);
                }
                Some(op) if op.modifier == OperationModifier::Abstract => {
                    return Err(ApiError::bad_parameters(format!(
                        "class \"{}::{}()\" is abstract and can not be used",
                        type_name, op.name
                    )));
                }
                Some(op) if op.modifier == OperationModifier::Final => {
                    return Err(ApiError::bad_parameters(format!(
                        "class \"{}::{}()\" is final and can not be used",
                        type_name, op.name
                    )));
                }
                _ => {
                    debug!(type_name, operation = ?descriptor.operation(), "Dispatching instance operation");
                    self.run_default(&call, &mut bag)?;
                }
            },
        }

        if let Some(decorator) = descriptor.decorator_type_name() {
            self.decorate(decorator, &mut bag)?;
        }

        if let Some(object) = bag.object() {
            object.prepare();
        }

        Ok(bag)
    }

    fn resolve_type(&self, type_name: &str) -> ApiResult<&TargetType> {
        let target = self.registry.get(type_name).ok_or_else(|| {
            ApiError::bad_parameters(format!("invalid parameter className \"{}\"", type_name))
        })?;

        match target.info.modifier {
            TypeModifier::Concrete => {}
            TypeModifier::Abstract => {
                return Err(ApiError::bad_parameters(format!(
                    "class \"{}\" is abstract and can not be used",
                    type_name
                )))
            }
            TypeModifier::Interface => {
                return Err(ApiError::bad_parameters(format!(
                    "class \"{}\" is an interface and can not be used",
                    type_name
                )))
            }
            TypeModifier::Trait => {
                return Err(ApiError::bad_parameters(format!(
                    "class \"{}\" is a trait and can not be used",
                    type_name
                )))
            }
        }

        if target.shape.is_none() {
            return Err(ApiError::bad_parameters(format!(
                "class \"{}\" can not be instantiated",
                type_name
            )));
        }

        Ok(target)
    }

    fn run_crud_command(
        &self,
        call: &Call<'_>,
        factory: &crate::registry::CommandFactory,
        bag: &mut ResultBag,
    ) -> ApiResult<()> {
        let id = call.descriptor.effective_id();
        if id.is_none() && call.descriptor.operation() != Some(CREATE_OPERATION) {
            return Err(ApiError::missing_parameters(INVALID_ID));
        }
        let operation = call
            .operation
            .ok_or_else(|| ApiError::missing_parameters(MISSING_METHOD))?;
        let parameters = call
            .parameters
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::missing_parameters("parameters array is missing"))?;

        let object_ids = match id {
            Some(id) => vec![Value::from(id)],
            None => match call.fields.non_empty("objectIDs") {
                Some(raw) => match structured_collection("objectIDs", raw)? {
                    Value::List(ids) => ids,
                    Value::Map(ids) => ids.into_iter().map(|(_, v)| v).collect(),
                    _ => Vec::new(),
                },
                None => Vec::new(),
            },
        };

        let op_name = operation.name.as_str();
        let mut command = factory(CommandRequest {
            object_ids,
            operation: op_name.to_string(),
            parameters: parameters.clone(),
        })
        .map_err(|e| ApiError::from_target(op_name, &e))?;

        command
            .validate()
            .map_err(|e| ApiError::from_target(op_name, &e))?;
        let result = command
            .execute()
            .map_err(|e| ApiError::from_target(op_name, &e))?;

        bag.insert("object", result);
        bag.insert("objectAction", command.into_object());
        Ok(())
    }

    fn run_mutator(
        &self,
        call: &Call<'_>,
        wrap: &crate::registry::WrapFn,
        bag: &mut ResultBag,
    ) -> ApiResult<()> {
        let type_name = call.target.name();
        let entity_type = type_name
            .strip_suffix(MUTATOR_SUFFIX)
            .ok_or_else(|| ApiError::internal(format!("\"{}\" is not a mutator", type_name)))?;

        let entity = self.load_entity(entity_type, call.descriptor, INVALID_ID)?;
        let operation = call.require_operation()?;

        let editor = wrap(Arc::clone(&entity))
            .map_err(|e| ApiError::from_target(&operation.name, &e))?;
        let result = invoke(operation, Some(&editor), call.parameters)?;

        bag.insert("object", entity);
        bag.insert("result", result);
        bag.insert("objectEditor", editor);
        Ok(())
    }

    fn run_wrapper(
        &self,
        call: &Call<'_>,
        base: &str,
        wrap: &crate::registry::WrapFn,
        bag: &mut ResultBag,
    ) -> ApiResult<()> {
        let base_object = self.load_entity(base, call.descriptor, INVALID_ID)?;
        let wrapper = wrap(Arc::clone(&base_object))
            .map_err(|e| ApiError::from_target(call.target.name(), &e))?;

        bag.insert("object", wrapper);
        bag.insert("decoratedObject", base_object);
        Ok(())
    }

    fn run_default(&self, call: &Call<'_>, bag: &mut ResultBag) -> ApiResult<()> {
        let type_name = call.target.name();
        let object = match call.target.shape.as_ref() {
            Some(TargetShape::Entity { identity_field, .. }) => self.load_entity(
                type_name,
                call.descriptor,
                &format!("parameter id ({}) is missing or invalid", identity_field),
            )?,
            Some(TargetShape::Plain(construct)) => {
                construct().map_err(|e| ApiError::from_target(type_name, &e))?
            }
            Some(TargetShape::Static) if call.operation.is_none() => {
                return Err(ApiError::missing_parameters(MISSING_METHOD));
            }
            _ => {
                return Err(ApiError::bad_parameters(format!(
                    "class \"{}\" can not be instantiated",
                    type_name
                )));
            }
        };

        if let Some(operation) = call.operation {
            let mut result = invoke(operation, Some(&object), call.parameters)?;
            if let Value::Map(map) = &mut result {
                if let Some(hidden) = self.redaction.hidden_fields(object.type_name()) {
                    map.retain(|key, _| !hidden.contains(key));
                }
            }
            bag.insert("methodResult", result);
        }

        bag.insert("object", object);
        Ok(())
    }

    /// Load `entity_type` by the descriptor's id and check its identity field
    fn load_entity(
        &self,
        entity_type: &str,
        descriptor: &ApiRequestDescriptor,
        invalid_message: &str,
    ) -> ApiResult<ObjectRef> {
        let Some(TargetShape::Entity {
            load,
            identity_field,
        }) = self.registry.get(entity_type).and_then(|t| t.shape.as_ref())
        else {
            return Err(ApiError::internal(format!(
                "\"{}\" is not a registered entity",
                entity_type
            )));
        };

        let id = descriptor
            .effective_id()
            .ok_or_else(|| ApiError::bad_parameters(invalid_message))?;

        let object = load(id)
            .map_err(|e| ApiError::from_target(entity_type, &e))?
            .ok_or_else(|| ApiError::bad_parameters(invalid_message))?;

        let identity_present = object
            .fields()
            .into_iter()
            .any(|(name, value)| name == *identity_field && !value.is_empty());
        if !identity_present {
            warn!(entity_type, id, "Entity not found");
            return Err(ApiError::bad_parameters(invalid_message));
        }

        Ok(object)
    }

    fn decorate(&self, decorator: &str, bag: &mut ResultBag) -> ApiResult<()> {
        let failed = || ApiError::bad_parameters(format!("decoration of object to {} failed", decorator));

        let Some(TargetShape::Wrapper { wrap, .. }) =
            self.registry.get(decorator).and_then(|t| t.shape.as_ref())
        else {
            return Err(failed());
        };
        let object = bag.object().cloned().ok_or_else(failed)?;

        let decorated = wrap(object).map_err(|e| {
            warn!(decorator, error = %e, "Decoration failed");
            failed()
        })?;
        bag.insert("object", decorated);
        Ok(())
    }
}

/// Per-dispatch context
struct Call<'a> {
    descriptor: &'a ApiRequestDescriptor,
    fields: &'a RequestFields,
    target: &'a TargetType,
    operation: Option<&'a OperationDef>,
    parameters: Option<&'a Value>,
}

impl<'a> Call<'a> {
    fn require_operation(&self) -> ApiResult<&'a OperationDef> {
        self.operation
            .ok_or_else(|| ApiError::missing_parameters(MISSING_METHOD))
    }
}

fn invoke(
    operation: &OperationDef,
    receiver: Option<&ObjectRef>,
    parameters: Option<&Value>,
) -> ApiResult<Value> {
    let args = bind_arguments(&operation.params, parameters)?;
    operation
        .invoke(receiver, &args)
        .map_err(|e| ApiError::from_target(&operation.name, &e))
}

/// Inline path parameters win over the request `parameters` field. Either
/// must be a list/map (or a serialized one).
fn request_parameters(
    descriptor: &ApiRequestDescriptor,
    fields: &RequestFields,
) -> ApiResult<Option<Value>> {
    if let Some(raw) = descriptor.raw_parameters() {
        return decode_serialized_array("parameters", raw).map(Some);
    }
    fields
        .non_empty("parameters")
        .map(|value| structured_collection("parameters", value))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{OperationDef, TypeInfo};
    use crate::serializer::RedactionPolicy;

    fn dispatcher() -> Dispatcher {
        let registry = TargetRegistry::builder()
            .type_only(TypeInfo::trait_type("app\\Loggable"))
            .provider(
                "app\\Info",
                OperationDef::static_op("echo", Vec::new(), |_args| Ok(Value::from("pong"))),
            )
            .build()
            .unwrap();
        let redaction = RedactionPolicy::builtin().compile(&registry);
        Dispatcher::new(Arc::new(registry), Arc::new(redaction))
    }

    #[test]
    fn test_result_bag_extend_keeps_order() {
        let mut first = ResultBag::new();
        first.insert("username", "alice");

        let mut second = ResultBag::new();
        second.insert("object", 1);
        second.insert("username", "bob");

        first.extend(second);
        let slots: Vec<_> = first.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(slots, vec!["username", "object"]);
        assert_eq!(first.get("username").and_then(Value::as_str), Some("bob"));
    }

    #[test]
    fn test_collection_root_yields_empty_bag() {
        let bag = dispatcher()
            .dispatch(&ApiRequestDescriptor::new("api"), &RequestFields::default())
            .unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn test_trait_types_are_rejected() {
        let descriptor = ApiRequestDescriptor::new("api/app/Loggable").with_type_name("app\\Loggable");
        let err = dispatcher()
            .dispatch(&descriptor, &RequestFields::default())
            .unwrap_err();
        assert_eq!(err.message, "class \"app\\Loggable\" is a trait and can not be used");
    }

    #[test]
    fn test_static_operation_result_is_object() {
        let descriptor = ApiRequestDescriptor::new("api/app/Info")
            .with_type_name("app\\Info")
            .with_operation("echo");
        let bag = dispatcher()
            .dispatch(&descriptor, &RequestFields::default())
            .unwrap();
        assert_eq!(bag.get("object").and_then(Value::as_str), Some("pong"));
    }

    #[test]
    fn test_inline_parameters_must_decode() {
        let descriptor = ApiRequestDescriptor::new("api/app/Info")
            .with_type_name("app\\Info")
            .with_raw_parameters("not-json");
        let err = dispatcher()
            .dispatch(&descriptor, &RequestFields::default())
            .unwrap_err();
        assert_eq!(err.kind, crate::domain::ApiErrorKind::BadParameters);
    }
}
