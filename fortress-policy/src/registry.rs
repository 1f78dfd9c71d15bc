//! # Policy Registry
//!
//! The policy resolver contract and its in-memory implementation. Hosts register
//! one role table per resource type at startup; the table set is immutable while
//! requests are served.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{PolicyError, PolicyResult};
use crate::roles::RoleTable;

/// Resolves role tables for permission checks.
pub trait PolicyResolver: Send + Sync {
    /// Role table for a resource type.
    ///
    /// Fails with [`PolicyError::Missing`] when nothing is registered for the
    /// type; callers decide whether that is fatal.
    fn roles_for(&self, resource_type: &str) -> PolicyResult<Arc<RoleTable>>;

    /// Role table used for checks that are not bound to a resource.
    fn global_roles(&self) -> Arc<RoleTable>;
}

/// In-memory policy resolver keyed by resource type.
///
/// # Example
///
/// ```
/// use fortress_policy::{PolicyRegistry, PolicyResolver, RoleTable};
///
/// let registry = PolicyRegistry::new()
///     .register("Post", RoleTable::new().with_role("editor", ["read", "write"]))
///     .with_global_roles(RoleTable::new().with_role("admin", ["manage-users"]));
///
/// assert!(registry.roles_for("Post").unwrap().grants("editor", "write"));
/// assert!(registry.roles_for("Comment").is_err());
/// assert!(registry.global_roles().grants("admin", "manage-users"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Arc<RoleTable>>,
    global: Arc<RoleTable>,
}

impl PolicyRegistry {
    /// Create an empty registry with an empty global table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the role table for a resource type, replacing any previous one.
    pub fn register(mut self, resource_type: impl Into<String>, roles: RoleTable) -> Self {
        self.policies.insert(resource_type.into(), Arc::new(roles));
        self
    }

    /// Replace the global role table.
    pub fn with_global_roles(mut self, roles: RoleTable) -> Self {
        self.global = Arc::new(roles);
        self
    }

    /// Check if a policy is registered for a resource type.
    pub fn has_policy(&self, resource_type: &str) -> bool {
        self.policies.contains_key(resource_type)
    }

    /// Registered resource types, in no particular order.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }
}

impl PolicyResolver for PolicyRegistry {
    fn roles_for(&self, resource_type: &str) -> PolicyResult<Arc<RoleTable>> {
        self.policies
            .get(resource_type)
            .cloned()
            .ok_or_else(|| PolicyError::Missing(resource_type.to_string()))
    }

    fn global_roles(&self) -> Arc<RoleTable> {
        Arc::clone(&self.global)
    }
}

/// Serializable policy definitions.
///
/// ```json
/// {
///   "global_roles": { "admin": ["manage-users"] },
///   "policies": {
///     "Post": { "editor": ["read", "write"], "viewer": ["read"] }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Global role table
    #[serde(default)]
    pub global_roles: RoleTable,

    /// Role table per resource type
    #[serde(default)]
    pub policies: BTreeMap<String, RoleTable>,
}

impl PolicyConfig {
    /// Parse policy definitions from JSON.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a registry from these definitions.
    pub fn into_registry(self) -> PolicyRegistry {
        self.policies.into_iter().fold(
            PolicyRegistry::new().with_global_roles(self.global_roles),
            |registry, (resource_type, roles)| registry.register(resource_type, roles),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_policy() {
        let registry = PolicyRegistry::new();
        let err = registry.roles_for("Post").unwrap_err();
        assert!(matches!(err, PolicyError::Missing(ref t) if t == "Post"));
        assert!(registry.global_roles().is_empty());
    }

    #[test]
    fn test_register_replaces() {
        let registry = PolicyRegistry::new()
            .register("Post", RoleTable::new().with_role("viewer", ["read"]))
            .register("Post", RoleTable::new().with_role("editor", ["write"]));

        let roles = registry.roles_for("Post").unwrap();
        assert!(!roles.contains_role("viewer"));
        assert!(roles.grants("editor", "write"));
        assert!(registry.has_policy("Post"));
        assert!(!registry.has_policy("post"));
    }

    #[test]
    fn test_policy_config_from_json() {
        let config = PolicyConfig::from_json(
            r#"{
                "global_roles": { "admin": ["manage-users"] },
                "policies": {
                    "Post": { "editor": ["read", "write"], "viewer": ["read"] },
                    "Project": { "owner": ["delete"] }
                }
            }"#,
        )
        .unwrap();

        let registry = config.into_registry();
        assert!(registry.global_roles().grants("admin", "manage-users"));
        assert_eq!(registry.roles_for("Post").unwrap().roles_with("read"), vec!["editor", "viewer"]);
        assert!(registry.roles_for("Project").unwrap().grants("owner", "delete"));
        assert_eq!(registry.resource_types().count(), 2);
    }

    #[test]
    fn test_policy_config_defaults() {
        let config = PolicyConfig::from_json("{}").unwrap();
        assert_eq!(config, PolicyConfig::default());
    }

    #[test]
    fn test_policy_config_invalid_json() {
        let err = PolicyConfig::from_json(r#"{"policies": []}"#).unwrap_err();
        assert!(matches!(err, PolicyError::Invalid(_)));
    }
}
