//! Operation declarations and their handlers.
//!
//! A handler receives the receiver object (`None` for static operations) and
//! the bound [`Arguments`]. Typed constructors downcast the receiver through
//! [`ApiObject::as_any`](crate::domain::ApiObject::as_any).

use crate::dispatch::Arguments;
use crate::domain::{ObjectRef, TargetError, Value, ValueMap};
use std::fmt;
use std::sync::Arc;

/// Type-erased operation body
pub type Invoker =
    Arc<dyn Fn(Option<&ObjectRef>, &Arguments) -> Result<Value, TargetError> + Send + Sync>;

/// How an operation is declared on its type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationModifier {
    Instance,
    Static,
    Abstract,
    Final,
}

/// One formal parameter. `required` is false when the parameter has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormalParam {
    pub name: String,
    pub required: bool,
}

impl FormalParam {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

#[derive(Clone)]
pub(crate) enum Handler {
    /// Executed by the owning target itself (CRUD commands)
    Declared,
    Invoke(Invoker),
}

/// A named operation on a registered type
#[derive(Clone)]
pub struct OperationDef {
    pub name: String,
    pub params: Vec<FormalParam>,
    pub modifier: OperationModifier,
    pub(crate) handler: Handler,
}

impl OperationDef {
    /// Operation executed by a CRUD command; no handler of its own
    pub fn declared(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            modifier: OperationModifier::Instance,
            handler: Handler::Declared,
        }
    }

    /// Instance operation on receivers of type `T`
    pub fn instance<T, F>(name: impl Into<String>, params: Vec<FormalParam>, body: F) -> Self
    where
        T: 'static,
        F: Fn(&T, &Arguments) -> Result<Value, TargetError> + Send + Sync + 'static,
    {
        let name = name.into();
        let op_name = name.clone();
        let invoker: Invoker = Arc::new(move |receiver, args| {
            let receiver = receiver
                .and_then(|obj| obj.as_any().downcast_ref::<T>())
                .ok_or_else(|| {
                    TargetError::Other(format!(
                        "{}() called on a receiver of the wrong type",
                        op_name
                    ))
                })?;
            body(receiver, args)
        });

        Self {
            name,
            params,
            modifier: OperationModifier::Instance,
            handler: Handler::Invoke(invoker),
        }
    }

    /// Type-level operation, invoked without a receiver
    pub fn static_op<F>(name: impl Into<String>, params: Vec<FormalParam>, body: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, TargetError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            modifier: OperationModifier::Static,
            handler: Handler::Invoke(Arc::new(move |_receiver, args| body(args))),
        }
    }

    /// Custom data provider: a side-effect free function returning a map
    pub fn provider<F>(name: impl Into<String>, params: Vec<FormalParam>, body: F) -> Self
    where
        F: Fn(&Arguments) -> Result<ValueMap, TargetError> + Send + Sync + 'static,
    {
        Self::static_op(name, params, move |args| body(args).map(Value::Map))
    }

    /// Declared but not callable
    pub fn abstract_op(name: impl Into<String>) -> Self {
        Self {
            modifier: OperationModifier::Abstract,
            ..Self::declared(name)
        }
    }

    /// Change the modifier (e.g. mark an instance operation final)
    pub fn with_modifier(mut self, modifier: OperationModifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn is_static(&self) -> bool {
        self.modifier == OperationModifier::Static
    }

    /// Run the operation
    pub fn invoke(
        &self,
        receiver: Option<&ObjectRef>,
        args: &Arguments,
    ) -> Result<Value, TargetError> {
        match &self.handler {
            Handler::Invoke(invoker) => invoker(receiver, args),
            Handler::Declared => Err(TargetError::Other(format!(
                "{}() cannot be invoked directly",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for OperationDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("modifier", &self.modifier)
            .finish()
    }
}
