//! Fortress service
//!
//! The shared entry point a host builds once at startup. It owns the store and
//! policy handles, builds a [`Guard`] per subject and unit of work, and answers
//! resource-centric questions ("who may edit this post?") straight from the store.

use fortress_policy::{PolicyRegistry, PolicyResolver};
use fortress_store::{Grant, GrantId, GrantStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::FortressConfig;
use crate::entity::{Entity, EntityRef, Subject};
use crate::error::GuardResult;
use crate::guard::Guard;

/// Shared authorization service.
///
/// Cheap to clone; clones share the same store and policies.
#[derive(Clone)]
pub struct Fortress {
    store: Arc<dyn GrantStore>,
    policies: Arc<dyn PolicyResolver>,
    load_relations: bool,
}

impl std::fmt::Debug for Fortress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fortress")
            .field("load_relations", &self.load_relations)
            .finish_non_exhaustive()
    }
}

impl Fortress {
    /// Create a service over a store and a policy resolver.
    ///
    /// Relation grants are loaded for every guard.
    pub fn new(store: Arc<dyn GrantStore>, policies: Arc<dyn PolicyResolver>) -> Self {
        Self {
            store,
            policies,
            load_relations: true,
        }
    }

    /// Create a service from configuration.
    ///
    /// The configured global roles are merged into the registry's global table.
    pub fn from_config(
        store: Arc<dyn GrantStore>,
        registry: PolicyRegistry,
        config: &FortressConfig,
    ) -> Self {
        let mut global = registry.global_roles().as_ref().clone();
        global.merge(&config.global_role_table());

        Self {
            store,
            policies: Arc::new(registry.with_global_roles(global)),
            load_relations: config.load_relations,
        }
    }

    /// The underlying grant store.
    pub fn store(&self) -> &Arc<dyn GrantStore> {
        &self.store
    }

    /// The policy resolver in use.
    pub fn policies(&self) -> &Arc<dyn PolicyResolver> {
        &self.policies
    }

    /// Build a guard for `subject`.
    ///
    /// Call this once at the start of a unit of work and pass the guard along;
    /// it sees its own mutations but not writes made through other guards.
    pub async fn guard<S>(&self, subject: &S) -> GuardResult<Guard>
    where
        S: Subject + ?Sized,
    {
        let relations = if self.load_relations {
            subject.relations()
        } else {
            Vec::new()
        };

        Guard::load(
            subject.entity_ref(),
            relations,
            Arc::clone(&self.store),
            Arc::clone(&self.policies),
        )
        .await
    }

    /// Grants through which subjects hold `permission` on `resource`.
    ///
    /// Only grants stored directly on the resource are considered; relation
    /// inheritance is a property of guards, not of this lookup.
    ///
    /// # Errors
    ///
    /// [`GuardError::PolicyMissing`](crate::GuardError::PolicyMissing) if the
    /// resource type has no policy.
    #[instrument(skip(self, resource), fields(resource = %resource))]
    pub async fn allowed_models(&self, permission: &str, resource: &EntityRef) -> GuardResult<Vec<Grant>> {
        resource.validate()?;

        let table = self.policies.roles_for(&resource.entity_type)?;
        let roles = table.roles_with(permission);
        if roles.is_empty() {
            debug!("No role confers the permission");
            return Ok(Vec::new());
        }

        let grants = self
            .store
            .find_by_resource(&resource.entity_type, &resource.id, None)
            .await?;

        Ok(grants
            .into_iter()
            .filter(|g| roles.contains(&g.role.as_str()))
            .collect())
    }

    /// [`Fortress::allowed_models`] with a caller-supplied resolver.
    ///
    /// The matching grants are handed to `resolver` and its result returned
    /// verbatim, for example to hydrate the holders through a
    /// [`GrantResolver`](crate::GrantResolver).
    pub async fn allowed_models_with<F, T>(
        &self,
        permission: &str,
        resource: &EntityRef,
        resolver: F,
    ) -> GuardResult<T>
    where
        F: FnOnce(Vec<Grant>) -> T,
    {
        let grants = self.allowed_models(permission, resource).await?;
        Ok(resolver(grants))
    }

    /// Every grant on `resource`, optionally only those held by one subject type.
    pub async fn models_for_resource(
        &self,
        resource: &EntityRef,
        subject_type: Option<&str>,
    ) -> GuardResult<Vec<Grant>> {
        resource.validate()?;
        Ok(self
            .store
            .find_by_resource(&resource.entity_type, &resource.id, subject_type)
            .await?)
    }

    /// Delete a single grant by id.
    ///
    /// # Errors
    ///
    /// [`GuardError::NotFound`](crate::GuardError::NotFound) if no such grant exists.
    #[instrument(skip(self))]
    pub async fn destroy_role(&self, id: GrantId) -> GuardResult<()> {
        self.store.delete_by_id(id).await?;
        info!("Grant destroyed");
        Ok(())
    }

    /// Lifecycle hook for subject deletion.
    ///
    /// A permanent delete removes every grant the subject holds; a soft delete
    /// keeps them so a restored subject gets its roles back.
    ///
    /// # Returns
    ///
    /// The number of deleted grants (always 0 for soft deletes)
    pub async fn on_subject_deleted<S>(&self, subject: &S, soft_delete: bool) -> GuardResult<u64>
    where
        S: Entity + ?Sized,
    {
        let subject = subject.entity_ref();
        subject.validate()?;

        if soft_delete {
            debug!(subject = %subject, "Soft delete, keeping grants");
            return Ok(0);
        }

        let deleted = self.store.delete_all(&subject.entity_type, &subject.id).await?;
        info!(subject = %subject, deleted, "Removed grants of deleted subject");
        Ok(deleted)
    }
}
