//! Type metadata: names, modifiers and the supertype graph.

use serde::Serialize;

/// Kind of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TypeModifier {
    Concrete,
    Abstract,
    Interface,
    Trait,
}

/// Name, modifier and direct supertypes of a registered type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    pub name: String,
    pub modifier: TypeModifier,
    pub supertypes: Vec<String>,
}

impl TypeInfo {
    pub fn concrete(name: impl Into<String>) -> Self {
        Self::new(name, TypeModifier::Concrete)
    }

    pub fn abstract_type(name: impl Into<String>) -> Self {
        Self::new(name, TypeModifier::Abstract)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeModifier::Interface)
    }

    pub fn trait_type(name: impl Into<String>) -> Self {
        Self::new(name, TypeModifier::Trait)
    }

    pub fn new(name: impl Into<String>, modifier: TypeModifier) -> Self {
        Self {
            name: name.into(),
            modifier,
            supertypes: Vec::new(),
        }
    }

    /// Add a direct supertype (base type or implemented interface)
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }
}
