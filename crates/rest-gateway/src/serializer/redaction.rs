//! Field redaction rules.
//!
//! Two tables keyed by type name:
//!
//! - **blacklist**: fields hidden for the type and every subtype
//! - **excluded props**: fields hidden for the exact type only
//!
//! [`RedactionPolicy::compile`] flattens both against the registry's
//! supertype graph into one effective field set per type, so no hierarchy
//! walk happens per request.

use crate::domain::config::RedactionConfig;
use crate::registry::TargetRegistry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub const USER_TYPE: &str = "wcf\\data\\user\\User";
pub const DATABASE_OBJECT_TYPE: &str = "wcf\\data\\DatabaseObject";
pub const LANGUAGE_TYPE: &str = "wcf\\data\\language\\Language";

/// Mutable rule set, assembled at startup
#[derive(Debug, Clone, Default)]
pub struct RedactionPolicy {
    blacklist: BTreeMap<String, BTreeSet<String>>,
    excluded: BTreeMap<String, BTreeSet<String>>,
}

impl RedactionPolicy {
    /// No rules
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default rules for user credentials, storage metadata and
    /// language item tables
    pub fn builtin() -> Self {
        Self::empty()
            .blacklist(USER_TYPE, ["password", "accessToken"])
            .blacklist(
                DATABASE_OBJECT_TYPE,
                [
                    "databaseTableName",
                    "databaseTableIndexIsIdentity",
                    "databaseTableIndexName",
                    "sortOrder",
                    "sortBy",
                ],
            )
            .exclude(USER_TYPE, ["userOptions"])
            .exclude(LANGUAGE_TYPE, ["items", "dynamicItems"])
    }

    /// Hide `fields` on `type_name` and all of its subtypes
    pub fn blacklist<I, S>(mut self, type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist
            .entry(type_name.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Hide `fields` on exactly `type_name`
    pub fn exclude<I, S>(mut self, type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded
            .entry(type_name.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Merge rules from configuration
    pub fn with_config(self, config: &RedactionConfig) -> Self {
        let policy = config
            .blacklist
            .iter()
            .fold(self, |policy, (ty, fields)| policy.blacklist(ty.clone(), fields.clone()));
        config
            .excluded
            .iter()
            .fold(policy, |policy, (ty, fields)| policy.exclude(ty.clone(), fields.clone()))
    }

    /// Flatten into a per-type lookup table
    pub fn compile(&self, registry: &TargetRegistry) -> RedactionTable {
        let mut names: HashSet<&str> = registry.type_names().collect();
        names.extend(self.blacklist.keys().map(String::as_str));
        names.extend(self.excluded.keys().map(String::as_str));

        let effective = names
            .into_iter()
            .filter_map(|name| {
                let mut fields = self.exact_fields(name);
                for ancestor in registry.ancestors(name) {
                    if let Some(inherited) = self.blacklist.get(&ancestor) {
                        fields.extend(inherited.iter().cloned());
                    }
                }
                (!fields.is_empty()).then(|| (name.to_string(), Arc::new(fields)))
            })
            .collect();

        RedactionTable { effective }
    }

    fn exact_fields(&self, name: &str) -> HashSet<String> {
        self.excluded
            .get(name)
            .into_iter()
            .chain(self.blacklist.get(name))
            .flat_map(|set| set.iter().cloned())
            .collect()
    }
}

/// Compiled, read-only redaction lookup
#[derive(Debug, Clone, Default)]
pub struct RedactionTable {
    effective: HashMap<String, Arc<HashSet<String>>>,
}

impl RedactionTable {
    /// Hidden field names for `type_name` (empty when the type has no rules)
    pub fn hidden_fields(&self, type_name: &str) -> Option<Arc<HashSet<String>>> {
        self.effective.get(type_name).cloned()
    }

    pub fn is_hidden(&self, type_name: &str, field: &str) -> bool {
        self.effective
            .get(type_name)
            .is_some_and(|fields| fields.contains(field))
    }
}
