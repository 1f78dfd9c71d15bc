//! Engine configuration.
//!
//! Holds the static global role table and the relation-loading switch.
//! Configuration is loaded from environment variables or JSON, with defaults
//! that enable relation loading and define no global roles.

use fortress_policy::RoleTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Fortress configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortressConfig {
    /// Global role name to the abilities it confers.
    #[serde(default)]
    pub global_roles: BTreeMap<String, Vec<String>>,

    /// Whether guards load grants inherited through subject relations.
    #[serde(default = "default_load_relations")]
    pub load_relations: bool,
}

fn default_load_relations() -> bool {
    true
}

impl Default for FortressConfig {
    fn default() -> Self {
        Self {
            global_roles: BTreeMap::new(),
            load_relations: true,
        }
    }
}

impl FortressConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FORTRESS_GLOBAL_ROLES`: JSON object of role to abilities,
    ///   e.g. `{"admin": ["manage-users"]}` (default: empty)
    /// - `FORTRESS_LOAD_RELATIONS`: whether to inherit relation grants (default: true)
    ///
    /// A malformed `FORTRESS_GLOBAL_ROLES` is logged and ignored; use
    /// [`FortressConfig::try_from_env`] to treat it as an error.
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring invalid FORTRESS_GLOBAL_ROLES");
            Self::from_lookup(|key| match key {
                "FORTRESS_GLOBAL_ROLES" => None,
                _ => std::env::var(key).ok(),
            })
        })
    }

    /// Load configuration from environment variables, failing on malformed values.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidValue {
            key: "fortress".to_string(),
            message: e.to_string(),
        })
    }

    /// The global role table described by this configuration.
    pub fn global_role_table(&self) -> RoleTable {
        self.global_roles
            .iter()
            .map(|(role, abilities)| (role.clone(), abilities.clone()))
            .collect()
    }

    /// Every ability named anywhere in the global role table, deduplicated.
    pub fn global_abilities(&self) -> Vec<String> {
        let mut abilities: Vec<String> = self.global_roles.values().flatten().cloned().collect();
        abilities.sort();
        abilities.dedup();
        abilities
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::try_from_lookup(lookup).unwrap_or_default()
    }

    fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let global_roles = match lookup("FORTRESS_GLOBAL_ROLES") {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
                key: "FORTRESS_GLOBAL_ROLES".to_string(),
                message: e.to_string(),
            })?,
            None => default.global_roles,
        };

        let load_relations = lookup("FORTRESS_LOAD_RELATIONS")
            .map(|s| s != "false" && s != "0")
            .unwrap_or(default.load_relations);

        Ok(Self {
            global_roles,
            load_relations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = FortressConfig::default();
        assert!(config.global_roles.is_empty());
        assert!(config.load_relations);
    }

    #[test]
    fn test_lookup_parses_global_roles() {
        let config = FortressConfig::try_from_lookup(lookup(&[(
            "FORTRESS_GLOBAL_ROLES",
            r#"{"admin": ["manage-users", "view-reports"], "auditor": ["view-reports"]}"#,
        )]))
        .unwrap();

        let table = config.global_role_table();
        assert!(table.grants("admin", "manage-users"));
        assert_eq!(table.roles_with("view-reports"), vec!["admin", "auditor"]);
        assert_eq!(config.global_abilities(), vec!["manage-users", "view-reports"]);
    }

    #[test]
    fn test_lookup_load_relations_switch() {
        let off = FortressConfig::try_from_lookup(lookup(&[("FORTRESS_LOAD_RELATIONS", "0")])).unwrap();
        assert!(!off.load_relations);

        let on = FortressConfig::try_from_lookup(lookup(&[("FORTRESS_LOAD_RELATIONS", "yes")])).unwrap();
        assert!(on.load_relations);
    }

    #[test]
    fn test_lookup_rejects_malformed_roles() {
        let err = FortressConfig::try_from_lookup(lookup(&[("FORTRESS_GLOBAL_ROLES", "[1, 2]")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FORTRESS_GLOBAL_ROLES"));
    }

    #[test]
    fn test_from_json() {
        let config = FortressConfig::from_json(r#"{"global_roles": {"admin": ["manage-users"]}}"#).unwrap();
        assert!(config.load_relations);
        assert_eq!(config.global_roles["admin"], vec!["manage-users".to_string()]);

        assert!(FortressConfig::from_json("not json").is_err());
    }
}
