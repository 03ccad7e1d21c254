//! Structural capabilities a registered type can have.

use crate::domain::{ObjectRef, TargetError, Value};
use std::fmt;
use std::sync::Arc;

/// Input handed to a CRUD command factory
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Target identifiers (empty for `create`)
    pub object_ids: Vec<Value>,
    /// Operation name
    pub operation: String,
    /// Parameter map
    pub parameters: Value,
}

/// A validated command over zero or more identifiers
pub trait CrudCommand: Send {
    /// Permission and input checks, run before `execute`
    fn validate(&mut self) -> Result<(), TargetError>;

    /// Perform the operation and return its result
    fn execute(&mut self) -> Result<Value, TargetError>;

    /// The command itself, for the `objectAction` result slot
    fn into_object(self: Box<Self>) -> ObjectRef;
}

/// A query that loads a set of entities without an identifier
pub trait ObjectList: Send {
    fn read_objects(&mut self) -> Result<(), TargetError>;

    fn into_object(self: Box<Self>) -> ObjectRef;
}

pub type CommandFactory =
    Arc<dyn Fn(CommandRequest) -> Result<Box<dyn CrudCommand>, TargetError> + Send + Sync>;
pub type ListFactory = Arc<dyn Fn() -> Result<Box<dyn ObjectList>, TargetError> + Send + Sync>;
/// Builds an object around another one (mutators, wrappers, decorators)
pub type WrapFn = Arc<dyn Fn(ObjectRef) -> Result<ObjectRef, TargetError> + Send + Sync>;
/// Loads an entity by identifier; `Ok(None)` when no row exists
pub type LoadFn = Arc<dyn Fn(&str) -> Result<Option<ObjectRef>, TargetError> + Send + Sync>;
pub type ConstructFn = Arc<dyn Fn() -> Result<ObjectRef, TargetError> + Send + Sync>;

/// Capability of a registered type. Dispatch picks its strategy from this.
#[derive(Clone)]
pub enum TargetShape {
    /// Generic validated command (validate → execute)
    CrudCommand(CommandFactory),
    /// Wraps an entity loaded by id; the entity type is the mutator name
    /// without its `Editor` suffix
    Mutator(WrapFn),
    /// Composes around a base entity type
    Wrapper { base: String, wrap: WrapFn },
    /// Loads a set of entities
    CollectionQuery(ListFactory),
    /// One shared instance
    ServiceSingleton(ObjectRef),
    /// Stored entity addressed by id
    Entity { load: LoadFn, identity_field: String },
    /// Anything constructible without arguments
    Plain(ConstructFn),
    /// Type-level operations only
    Static,
}

impl TargetShape {
    pub fn crud_command<F>(factory: F) -> Self
    where
        F: Fn(CommandRequest) -> Result<Box<dyn CrudCommand>, TargetError> + Send + Sync + 'static,
    {
        TargetShape::CrudCommand(Arc::new(factory))
    }

    pub fn mutator<F>(wrap: F) -> Self
    where
        F: Fn(ObjectRef) -> Result<ObjectRef, TargetError> + Send + Sync + 'static,
    {
        TargetShape::Mutator(Arc::new(wrap))
    }

    pub fn wrapper<F>(base: impl Into<String>, wrap: F) -> Self
    where
        F: Fn(ObjectRef) -> Result<ObjectRef, TargetError> + Send + Sync + 'static,
    {
        TargetShape::Wrapper {
            base: base.into(),
            wrap: Arc::new(wrap),
        }
    }

    pub fn collection_query<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn ObjectList>, TargetError> + Send + Sync + 'static,
    {
        TargetShape::CollectionQuery(Arc::new(factory))
    }

    pub fn service_singleton(instance: ObjectRef) -> Self {
        TargetShape::ServiceSingleton(instance)
    }

    pub fn entity<F>(identity_field: impl Into<String>, load: F) -> Self
    where
        F: Fn(&str) -> Result<Option<ObjectRef>, TargetError> + Send + Sync + 'static,
    {
        TargetShape::Entity {
            load: Arc::new(load),
            identity_field: identity_field.into(),
        }
    }

    pub fn plain<F>(construct: F) -> Self
    where
        F: Fn() -> Result<ObjectRef, TargetError> + Send + Sync + 'static,
    {
        TargetShape::Plain(Arc::new(construct))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetShape::CrudCommand(_) => "CrudCommand",
            TargetShape::Mutator(_) => "Mutator",
            TargetShape::Wrapper { .. } => "Wrapper",
            TargetShape::CollectionQuery(_) => "CollectionQuery",
            TargetShape::ServiceSingleton(_) => "ServiceSingleton",
            TargetShape::Entity { .. } => "Entity",
            TargetShape::Plain(_) => "Plain",
            TargetShape::Static => "Static",
        }
    }
}

impl fmt::Debug for TargetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetShape::Wrapper { base, .. } => {
                f.debug_struct("Wrapper").field("base", base).finish()
            }
            TargetShape::Entity { identity_field, .. } => f
                .debug_struct("Entity")
                .field("identity_field", identity_field)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}
