//! # Role Tables
//!
//! A role table maps role names to the set of permissions each role confers.
//! One table exists per resource type, plus one global table for checks that are
//! not bound to a resource.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping from role name to the permissions that role confers.
///
/// Role and permission names are matched exactly; there are no wildcards and no
/// implied permissions.
///
/// # Example
///
/// ```
/// use fortress_policy::RoleTable;
///
/// let table = RoleTable::new()
///     .with_role("editor", ["read", "write"])
///     .with_role("viewer", ["read"]);
///
/// assert!(table.grants("editor", "write"));
/// assert!(!table.grants("viewer", "write"));
///
/// let readers = table.roles_with("read");
/// assert_eq!(readers, vec!["editor", "viewer"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleTable {
    /// Role name to permission names (ordered for stable iteration).
    roles: BTreeMap<String, BTreeSet<String>>,
}

impl RoleTable {
    /// Create a new empty role table.
    pub fn new() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    /// Builder form of [`RoleTable::define`].
    pub fn with_role<I, P>(mut self, role: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.define(role, permissions);
        self
    }

    /// Add permissions to a role, creating the role if needed.
    ///
    /// A role may be defined with no permissions at all; it then exists but
    /// confers nothing.
    ///
    /// # Arguments
    ///
    /// * `role` - The role name
    /// * `permissions` - Permissions the role confers
    pub fn define<I, P>(&mut self, role: impl Into<String>, permissions: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let entry = self.roles.entry(role.into()).or_default();
        entry.extend(permissions.into_iter().map(Into::into));
    }

    /// Remove a role entirely.
    ///
    /// # Returns
    ///
    /// `true` if the role was present, `false` otherwise
    pub fn remove(&mut self, role: &str) -> bool {
        self.roles.remove(role).is_some()
    }

    /// Check if `role` confers `permission`.
    pub fn grants(&self, role: &str, permission: &str) -> bool {
        self.roles
            .get(role)
            .map_or(false, |perms| perms.contains(permission))
    }

    /// All roles whose permission set contains `permission`.
    ///
    /// This is the expansion step of every permission check: a permission is held
    /// when the subject holds any of these roles.
    ///
    /// # Returns
    ///
    /// Role names in ascending order, empty if no role confers the permission
    pub fn roles_with(&self, permission: &str) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, perms)| perms.contains(permission))
            .map(|(role, _)| role.as_str())
            .collect()
    }

    /// Permissions conferred by a role, `None` if the role is not defined.
    pub fn permissions_of(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.roles.get(role)
    }

    /// Check if a role is defined in this table.
    pub fn contains_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Iterate over all defined role names.
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Merge another table into this one, unioning permission sets per role.
    ///
    /// # Arguments
    ///
    /// * `other` - The role table to merge
    pub fn merge(&mut self, other: &RoleTable) {
        for (role, perms) in &other.roles {
            self.roles
                .entry(role.clone())
                .or_default()
                .extend(perms.iter().cloned());
        }
    }

    /// Get the number of defined roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl<R, I, P> FromIterator<(R, I)> for RoleTable
where
    R: Into<String>,
    I: IntoIterator<Item = P>,
    P: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (R, I)>>(iter: T) -> Self {
        let mut table = RoleTable::new();
        for (role, perms) in iter {
            table.define(role, perms);
        }
        table
    }
}
