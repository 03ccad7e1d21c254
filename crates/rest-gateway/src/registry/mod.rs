//! Target registry: canonical type name → constructible/callable target.
//!
//! Built once at startup and shared read-only. Besides dispatchable targets
//! it holds type-only entries (abstract bases, interfaces, value types) so the
//! supertype graph is complete for redaction.

mod operation;
mod shape;
mod types;

pub use operation::{FormalParam, Invoker, OperationDef, OperationModifier};
pub use shape::{
    CommandFactory, CommandRequest, ConstructFn, CrudCommand, ListFactory, LoadFn, ObjectList,
    TargetShape, WrapFn,
};
pub use types::{TypeInfo, TypeModifier};

use crate::domain::GatewayError;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Suffix stripped from a mutator's name to find the entity it edits
pub const MUTATOR_SUFFIX: &str = "Editor";

/// A registered type
#[derive(Debug, Clone)]
pub struct TargetType {
    pub info: TypeInfo,
    /// `None` for type-only registrations
    pub shape: Option<TargetShape>,
    pub operations: Vec<OperationDef>,
}

impl TargetType {
    pub fn new(info: TypeInfo, shape: TargetShape) -> Self {
        Self {
            info,
            shape: Some(shape),
            operations: Vec::new(),
        }
    }

    /// Hierarchy-only entry
    pub fn type_only(info: TypeInfo) -> Self {
        Self {
            info,
            shape: None,
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: OperationDef) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDef> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Read-only registry of targets
#[derive(Debug, Default)]
pub struct TargetRegistry {
    types: HashMap<String, TargetType>,
}

impl TargetRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&TargetType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// All transitive supertypes of `name`, nearest first, excluding `name`.
    /// Supertypes that are not registered are still listed.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        let mut out = Vec::new();

        seen.insert(name.to_string());
        queue.push_back(name.to_string());

        while let Some(current) = queue.pop_front() {
            let Some(target) = self.types.get(&current) else {
                continue;
            };
            for parent in &target.info.supertypes {
                if seen.insert(parent.clone()) {
                    out.push(parent.clone());
                    queue.push_back(parent.clone());
                }
            }
        }

        out
    }

    /// Strict subtype check (a type is not its own subtype)
    pub fn is_subtype_of(&self, name: &str, ancestor: &str) -> bool {
        self.ancestors(name).iter().any(|a| a == ancestor)
    }
}

/// Builder for [`TargetRegistry`]
#[derive(Default)]
pub struct RegistryBuilder {
    types: Vec<TargetType>,
    providers: Vec<(String, OperationDef)>,
}

impl RegistryBuilder {
    /// Register a dispatchable or type-only target
    pub fn register(mut self, target: TargetType) -> Self {
        self.types.push(target);
        self
    }

    /// Shorthand for a type-only entry
    pub fn type_only(self, info: TypeInfo) -> Self {
        self.register(TargetType::type_only(info))
    }

    /// Register a custom data provider under `type_name`. The type is created
    /// as a static-only target when not registered otherwise.
    pub fn provider(mut self, type_name: impl Into<String>, operation: OperationDef) -> Self {
        self.providers.push((type_name.into(), operation));
        self
    }

    pub fn build(self) -> Result<TargetRegistry, GatewayError> {
        let mut types: HashMap<String, TargetType> = HashMap::new();

        for target in self.types {
            let name = target.name().to_string();
            if name.is_empty() {
                return Err(GatewayError::Registry("type name cannot be empty".into()));
            }
            if types.insert(name.clone(), target).is_some() {
                return Err(GatewayError::Registry(format!(
                    "type \"{}\" registered twice",
                    name
                )));
            }
        }

        for (type_name, operation) in self.providers {
            let target = types.entry(type_name.clone()).or_insert_with(|| {
                TargetType::new(TypeInfo::concrete(type_name.clone()), TargetShape::Static)
            });
            if target.operation(&operation.name).is_some() {
                return Err(GatewayError::Registry(format!(
                    "operation {}::{}() registered twice",
                    type_name, operation.name
                )));
            }
            target.operations.push(operation);
        }

        let registry = TargetRegistry { types };
        registry.check_references()?;

        debug!(types = registry.len(), "Target registry built");
        Ok(registry)
    }
}

impl TargetRegistry {
    fn check_references(&self) -> Result<(), GatewayError> {
        for target in self.types.values() {
            match &target.shape {
                Some(TargetShape::Wrapper { base, .. }) => {
                    self.expect_entity(base, target.name())?;
                }
                Some(TargetShape::Mutator(_)) => {
                    let entity = target
                        .name()
                        .strip_suffix(MUTATOR_SUFFIX)
                        .ok_or_else(|| {
                            GatewayError::Registry(format!(
                                "mutator \"{}\" must end with \"{}\"",
                                target.name(),
                                MUTATOR_SUFFIX
                            ))
                        })?;
                    self.expect_entity(entity, target.name())?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn expect_entity(&self, entity: &str, referenced_by: &str) -> Result<(), GatewayError> {
        match self.types.get(entity).and_then(|t| t.shape.as_ref()) {
            Some(TargetShape::Entity { .. }) => Ok(()),
            _ => Err(GatewayError::Registry(format!(
                "\"{}\" refers to \"{}\", which is not a registered entity",
                referenced_by, entity
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectRef, Value};

    fn entity(name: &str) -> TargetType {
        TargetType::new(
            TypeInfo::concrete(name).extends("app\\DatabaseObject"),
            TargetShape::entity("id", |_id: &str| Ok(None)),
        )
    }

    fn wrap_identity() -> TargetShape {
        TargetShape::mutator(|obj: ObjectRef| Ok(obj))
    }

    #[test]
    fn test_ancestors_are_transitive_and_nearest_first() {
        let registry = TargetRegistry::builder()
            .type_only(TypeInfo::abstract_type("app\\DatabaseObject").extends("app\\Storable"))
            .type_only(TypeInfo::interface("app\\Storable"))
            .register(entity("app\\User"))
            .register(TargetType::new(
                TypeInfo::concrete("app\\Admin").extends("app\\User"),
                TargetShape::Static,
            ))
            .build()
            .unwrap();

        assert_eq!(
            registry.ancestors("app\\Admin"),
            vec!["app\\User", "app\\DatabaseObject", "app\\Storable"]
        );
        assert!(registry.is_subtype_of("app\\Admin", "app\\Storable"));
        assert!(!registry.is_subtype_of("app\\User", "app\\User"));
        assert!(registry.ancestors("unknown").is_empty());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = TargetRegistry::builder()
            .register(entity("app\\User"))
            .register(entity("app\\User"))
            .build();
        assert!(matches!(result, Err(GatewayError::Registry(_))));
    }

    #[test]
    fn test_mutator_requires_entity() {
        let result = TargetRegistry::builder()
            .register(TargetType::new(
                TypeInfo::concrete("app\\PostEditor"),
                wrap_identity(),
            ))
            .build();
        assert!(result.is_err());

        let registry = TargetRegistry::builder()
            .register(entity("app\\Post"))
            .register(TargetType::new(
                TypeInfo::concrete("app\\PostEditor"),
                wrap_identity(),
            ))
            .build();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_wrapper_base_must_be_entity() {
        let result = TargetRegistry::builder()
            .register(TargetType::new(
                TypeInfo::concrete("app\\ViewablePost"),
                TargetShape::wrapper("app\\Post", |obj: ObjectRef| Ok(obj)),
            ))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_creates_static_target() {
        let registry = TargetRegistry::builder()
            .provider(
                "app\\Custom",
                OperationDef::static_op("ping", vec![], |_| Ok(Value::from("pong"))),
            )
            .build()
            .unwrap();

        let target = registry.get("app\\Custom").unwrap();
        assert!(matches!(target.shape, Some(TargetShape::Static)));
        assert!(target.operation("ping").unwrap().is_static());
    }
}
