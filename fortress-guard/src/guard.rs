//! Per-subject authorization guard
//!
//! A [`Guard`] is built for one subject at the start of a unit of work (usually a
//! request), answers role and permission checks from its [`GrantCache`], and
//! writes role changes through to the store before patching the cache.
//!
//! Guards are not shared across requests or subjects and never expire; drop the
//! guard when the unit of work ends.

use fortress_policy::{PolicyError, PolicyResolver};
use fortress_store::{Grant, GrantFilter, GrantStore, NewGrant, ResourceScope};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::GrantCache;
use crate::entity::{Entity, EntityLoader, EntityRef};
use crate::error::{GuardError, GuardResult};

/// Authorization guard bound to one subject.
///
/// Query methods never fail for "not granted"; absence is `Ok(false)`. Mutations
/// take `&mut self`, so a guard has exactly one writer.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fortress_guard::{EntityRef, Fortress};
/// use fortress_policy::{PolicyRegistry, RoleTable};
/// use fortress_store::MemoryGrantStore;
///
/// async fn example() {
///     let policies = PolicyRegistry::new()
///         .register("Post", RoleTable::new().with_role("editor", ["read", "write"]));
///     let fortress = Fortress::new(Arc::new(MemoryGrantStore::new()), Arc::new(policies));
///
///     let user = EntityRef::new("User", "42");
///     let post = EntityRef::new("Post", "7");
///
///     let mut guard = fortress.guard(&user).await.unwrap();
///     guard.assign_role("editor", Some(&post)).await.unwrap();
///
///     assert!(guard.has_permission("write", Some(&post)).unwrap());
///     assert!(!guard.has_role("editor", None).unwrap());
/// }
/// ```
pub struct Guard {
    subject: EntityRef,
    store: Arc<dyn GrantStore>,
    policies: Arc<dyn PolicyResolver>,
    cache: GrantCache,
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("subject", &self.subject)
            .field("direct_grants", &self.cache.direct().len())
            .field("inherited_grants", &self.cache.inherited().len())
            .finish()
    }
}

impl Guard {
    /// Build a guard, loading the subject's grants and its relations' grants.
    ///
    /// Construction is all-or-nothing: a store failure during either load fails
    /// the whole call.
    ///
    /// # Errors
    ///
    /// - [`GuardError::InvalidArgument`] if the subject or a relation identity is malformed
    /// - [`GuardError::Store`] if the store fails
    #[instrument(skip_all, fields(subject = %subject))]
    pub async fn load(
        subject: EntityRef,
        relations: Vec<EntityRef>,
        store: Arc<dyn GrantStore>,
        policies: Arc<dyn PolicyResolver>,
    ) -> GuardResult<Self> {
        subject.validate()?;
        for relation in &relations {
            relation.validate()?;
        }

        let cache = GrantCache::load(store.as_ref(), &subject, &relations).await?;

        debug!(
            direct = cache.direct().len(),
            inherited = cache.inherited().len(),
            relations = relations.len(),
            "Guard ready"
        );

        Ok(Self {
            subject,
            store,
            policies,
            cache,
        })
    }

    /// The subject this guard protects.
    pub fn subject(&self) -> &EntityRef {
        &self.subject
    }

    /// Grants held by the subject itself.
    pub fn direct_grants(&self) -> &[Grant] {
        self.cache.direct()
    }

    /// Grants inherited through relations.
    pub fn inherited_grants(&self) -> &[Grant] {
        self.cache.inherited()
    }

    /// Distinct role names held in any scope, direct or inherited.
    pub fn roles(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.cache
            .iter()
            .map(|g| g.role.as_str())
            .filter(|role| seen.insert(*role))
            .collect()
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Check if the subject holds `role`, globally (`None`) or on one resource.
    ///
    /// Global and scoped grants are independent: a role held on a resource does
    /// not satisfy a global check and vice versa.
    ///
    /// # Errors
    ///
    /// [`GuardError::InvalidArgument`] if `resource` is a malformed identity.
    pub fn has_role(&self, role: &str, resource: Option<&EntityRef>) -> GuardResult<bool> {
        if let Some(r) = resource {
            r.validate()?;
        }
        Ok(self.cache.matches(role, resource))
    }

    /// Check if the subject holds `role` globally.
    pub fn has_global_role(&self, role: &str) -> bool {
        self.cache.matches(role, None)
    }

    /// Grant `role` to the subject, globally (`None`) or on one resource.
    ///
    /// Idempotent: if the subject already holds the role directly in that scope,
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// - [`GuardError::InvalidArgument`] for a malformed resource or an empty role
    /// - [`GuardError::Store`] if the write fails; the cache is left untouched
    #[instrument(skip(self, resource), fields(subject = %self.subject))]
    pub async fn assign_role(&mut self, role: &str, resource: Option<&EntityRef>) -> GuardResult<bool> {
        if let Some(r) = resource {
            r.validate()?;
        }

        if self.cache.matches_direct(role, resource) {
            debug!("Role already held, skipping assign");
            return Ok(true);
        }

        let new = match resource {
            Some(r) => NewGrant::scoped(
                self.subject.entity_type.clone(),
                self.subject.id.clone(),
                role,
                r.entity_type.clone(),
                r.id.clone(),
            )?,
            None => NewGrant::global(self.subject.entity_type.clone(), self.subject.id.clone(), role)?,
        };

        let stored = self.store.insert(new).await?;
        debug!(grant_id = stored.id, resource = ?resource.map(|r| r.to_string()), "Role assigned");
        self.cache.insert_direct(stored);

        Ok(true)
    }

    /// Grant `role` to the subject globally.
    pub async fn assign_global_role(&mut self, role: &str) -> GuardResult<bool> {
        self.assign_role(role, None).await
    }

    /// Take `role` away from the subject, globally (`None`) or on one resource.
    ///
    /// Only the subject's own grants are removed; grants inherited through
    /// relations are never touched. Revoking a role that is not held directly
    /// succeeds without contacting the store.
    ///
    /// A global revoke removes only the global grant, never scoped grants of the
    /// same role.
    #[instrument(skip(self, resource), fields(subject = %self.subject))]
    pub async fn revoke_role(&mut self, role: &str, resource: Option<&EntityRef>) -> GuardResult<bool> {
        if let Some(r) = resource {
            r.validate()?;
        }

        if !self.cache.matches_direct(role, resource) {
            debug!("Role not held directly, nothing to revoke");
            return Ok(true);
        }

        let scope = match resource {
            Some(r) => ResourceScope::resource(r.entity_type.clone(), r.id.clone()),
            None => ResourceScope::Global,
        };
        let filter = GrantFilter::subject(self.subject.entity_type.clone(), self.subject.id.clone())
            .with_role(role)
            .with_scope(scope);

        let deleted = self.store.delete(&filter).await?;
        let removed = self.cache.remove_direct(role, resource);
        debug!(deleted, cached = removed.len(), "Role revoked");

        Ok(true)
    }

    /// Take a global role away from the subject.
    pub async fn revoke_global_role(&mut self, role: &str) -> GuardResult<bool> {
        self.revoke_role(role, None).await
    }

    /// Delete every grant the subject holds directly.
    ///
    /// # Returns
    ///
    /// The number of deleted rows
    #[instrument(skip(self), fields(subject = %self.subject))]
    pub async fn destroy_grants(&mut self) -> GuardResult<u64> {
        let deleted = self
            .store
            .delete_all(&self.subject.entity_type, &self.subject.id)
            .await?;
        self.cache.clear_direct();
        info!(deleted, "Destroyed all grants of subject");
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Check if the subject holds `permission`, globally (`None`) or on one resource.
    ///
    /// Without a resource this is a global permission check against the global
    /// role table. With a resource the permission is expanded through the policy
    /// for the resource's type, and the subject must hold one of the expanded
    /// roles on that exact resource. A resource type without a registered policy
    /// yields `false`.
    ///
    /// # Errors
    ///
    /// [`GuardError::InvalidArgument`] if `resource` is a malformed identity.
    pub fn has_permission(&self, permission: &str, resource: Option<&EntityRef>) -> GuardResult<bool> {
        let resource = match resource {
            None => return Ok(self.has_global_permission(permission)),
            Some(r) => {
                r.validate()?;
                r
            }
        };

        let table = match self.policies.roles_for(&resource.entity_type) {
            Ok(table) => table,
            Err(PolicyError::Missing(resource_type)) => {
                debug!(%resource_type, permission, "No policy for resource type, denying");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(table
            .roles_with(permission)
            .into_iter()
            .any(|role| self.cache.matches(role, Some(resource))))
    }

    /// Check a global permission through the global role table.
    pub fn has_global_permission(&self, ability: &str) -> bool {
        self.policies
            .global_roles()
            .roles_with(ability)
            .into_iter()
            .any(|role| self.cache.matches(role, None))
    }

    /// Alias of [`Guard::has_global_permission`].
    pub fn can_global(&self, ability: &str) -> bool {
        self.has_global_permission(ability)
    }

    /// Negation of [`Guard::can_global`].
    pub fn cannot_global(&self, ability: &str) -> bool {
        !self.can_global(ability)
    }

    /// Require a global permission.
    ///
    /// # Errors
    ///
    /// [`GuardError::Forbidden`] when the subject lacks the permission.
    pub fn authorize_global(&self, ability: &str) -> GuardResult<()> {
        if self.can_global(ability) {
            Ok(())
        } else {
            Err(GuardError::Forbidden(format!(
                "{} may not {}",
                self.subject, ability
            )))
        }
    }

    // ------------------------------------------------------------------
    // Reverse lookup
    // ------------------------------------------------------------------

    /// Grants (direct or inherited) that give `ability` on resources of `resource_type`.
    ///
    /// # Errors
    ///
    /// [`GuardError::PolicyMissing`] if no policy is registered for the type;
    /// the caller asked about a type it expects to be governed.
    pub fn my_allowed_grants(&self, ability: &str, resource_type: &str) -> GuardResult<Vec<Grant>> {
        let table = self.policies.roles_for(resource_type)?;
        let roles = table.roles_with(ability);
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .cache
            .iter()
            .filter(|g| {
                roles.contains(&g.role.as_str()) && g.resource_type.as_deref() == Some(resource_type)
            })
            .cloned()
            .collect())
    }

    /// Reverse lookup with a caller-supplied resolver.
    ///
    /// The filtered grants are handed to `resolver` and its result returned
    /// verbatim, so the caller controls hydration and shape (for example by
    /// feeding them to a [`GrantResolver`](crate::GrantResolver)).
    pub fn my_allowed_resources_with<F, T>(
        &self,
        ability: &str,
        resource_type: &str,
        resolver: F,
    ) -> GuardResult<T>
    where
        F: FnOnce(Vec<Grant>) -> T,
    {
        let grants = self.my_allowed_grants(ability, resource_type)?;
        Ok(resolver(grants))
    }

    /// Reverse lookup: every resource of `resource_type` the subject has `ability` on.
    ///
    /// Each referenced resource is loaded individually. Dangling references (the
    /// resource no longer exists, fails to load, or loads without a valid identity)
    /// are skipped. A resource reachable through several grants is returned once.
    #[instrument(skip(self, loader), fields(subject = %self.subject))]
    pub async fn my_allowed_resources<L>(
        &self,
        ability: &str,
        resource_type: &str,
        loader: &L,
    ) -> GuardResult<Vec<L::Entity>>
    where
        L: EntityLoader + ?Sized,
    {
        let grants = self.my_allowed_grants(ability, resource_type)?;
        let mut seen = HashSet::new();
        let mut resources = Vec::new();

        for grant in &grants {
            let Some(reference) = EntityRef::resource_of(grant) else {
                continue;
            };
            if !seen.insert(reference.clone()) {
                continue;
            }

            match loader.find(&reference.entity_type, &reference.id).await {
                Ok(Some(entity)) => {
                    if entity.entity_ref().validate().is_ok() {
                        resources.push(entity);
                    } else {
                        debug!(resource = %reference, "Loaded resource has no valid identity, skipping");
                    }
                }
                Ok(None) => {
                    warn!(resource = %reference, grant_id = grant.id, "Dangling grant reference, skipping");
                }
                Err(e) => {
                    warn!(resource = %reference, error = %e, "Failed to load granted resource, skipping");
                }
            }
        }

        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fortress_policy::{PolicyRegistry, RoleTable};
    use fortress_store::MemoryGrantStore;

    fn policies() -> Arc<PolicyRegistry> {
        Arc::new(
            PolicyRegistry::new()
                .register(
                    "Post",
                    RoleTable::new()
                        .with_role("editor", ["read", "write"])
                        .with_role("viewer", ["read"]),
                )
                .with_global_roles(RoleTable::new().with_role("admin", ["manage-users"])),
        )
    }

    async fn guard_for(store: &MemoryGrantStore, subject: &EntityRef) -> Guard {
        Guard::load(subject.clone(), Vec::new(), Arc::new(store.clone()), policies())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_subject_rejected() {
        let store = MemoryGrantStore::new();
        let err = Guard::load(EntityRef::new("User", ""), Vec::new(), Arc::new(store), policies())
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_invalid_resource_rejected() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;
        let bad = EntityRef::new("", "3");

        assert!(matches!(guard.has_role("editor", Some(&bad)), Err(GuardError::InvalidArgument(_))));
        assert!(matches!(
            guard.has_permission("read", Some(&bad)),
            Err(GuardError::InvalidArgument(_))
        ));
        assert!(guard.assign_role("editor", Some(&bad)).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_role_rejected() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;

        let err = guard.assign_role("", None).await.unwrap_err();
        assert!(matches!(err, GuardError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_assign_patches_cache() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;

        assert!(guard.assign_global_role("admin").await.unwrap());
        assert!(guard.has_global_role("admin"));
        assert_eq!(guard.direct_grants().len(), 1);
        assert_eq!(guard.roles(), vec!["admin"]);
    }

    #[tokio::test]
    async fn test_global_permission() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;

        assert!(!guard.has_permission("manage-users", None).unwrap());
        assert!(guard.cannot_global("manage-users"));
        assert!(matches!(
            guard.authorize_global("manage-users"),
            Err(GuardError::Forbidden(_))
        ));

        guard.assign_global_role("admin").await.unwrap();

        assert!(guard.has_permission("manage-users", None).unwrap());
        assert!(guard.can_global("manage-users"));
        assert!(guard.authorize_global("manage-users").is_ok());
    }

    #[tokio::test]
    async fn test_scoped_role_does_not_grant_global_permission() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;

        guard
            .assign_role("admin", Some(&EntityRef::new("Post", "3")))
            .await
            .unwrap();

        assert!(!guard.has_global_permission("manage-users"));
    }

    #[tokio::test]
    async fn test_permission_without_policy_is_false() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;
        let comment = EntityRef::new("Comment", "1");

        guard.assign_role("editor", Some(&comment)).await.unwrap();

        assert!(guard.has_role("editor", Some(&comment)).unwrap());
        assert!(!guard.has_permission("read", Some(&comment)).unwrap());
    }

    #[tokio::test]
    async fn test_my_allowed_grants_requires_policy() {
        let store = MemoryGrantStore::new();
        let guard = guard_for(&store, &EntityRef::new("User", "1")).await;

        let err = guard.my_allowed_grants("read", "Comment").unwrap_err();
        assert!(matches!(err, GuardError::PolicyMissing(ref t) if t == "Comment"));
    }

    #[tokio::test]
    async fn test_my_allowed_resources_with_resolver() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;

        guard.assign_role("viewer", Some(&EntityRef::new("Post", "3"))).await.unwrap();
        guard.assign_role("editor", Some(&EntityRef::new("Post", "4"))).await.unwrap();
        guard.assign_global_role("editor").await.unwrap();

        let ids = guard
            .my_allowed_resources_with("write", "Post", |grants| {
                grants
                    .into_iter()
                    .filter_map(|g| g.resource_id)
                    .collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(ids, vec!["4".to_string()]);

        let none = guard
            .my_allowed_resources_with("delete", "Post", |grants| grants.len())
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_destroy_grants_clears_cache() {
        let store = MemoryGrantStore::new();
        let mut guard = guard_for(&store, &EntityRef::new("User", "1")).await;

        guard.assign_global_role("admin").await.unwrap();
        guard.assign_role("editor", Some(&EntityRef::new("Post", "3"))).await.unwrap();

        assert_eq!(guard.destroy_grants().await.unwrap(), 2);
        assert!(guard.direct_grants().is_empty());
        assert!(!guard.has_global_role("admin"));
        assert!(store.is_empty().await);
    }
}
