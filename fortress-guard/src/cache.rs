//! Session-scoped grant cache
//!
//! Holds every grant of one subject (direct) and of its declared relations
//! (inherited). Reads search both sets; writes only ever touch the direct set.

use fortress_store::{Grant, GrantStore, SubjectKey};

use crate::entity::EntityRef;
use crate::error::GuardResult;

/// Snapshot of one subject's grants for the lifetime of a guard.
#[derive(Debug, Clone, Default)]
pub struct GrantCache {
    direct: Vec<Grant>,
    inherited: Vec<Grant>,
}

impl GrantCache {
    /// Load the subject's own grants and, if any relations are given, theirs.
    ///
    /// Any store failure aborts the load; there is no partially filled cache.
    pub async fn load(
        store: &dyn GrantStore,
        subject: &EntityRef,
        relations: &[EntityRef],
    ) -> GuardResult<Self> {
        let direct = store.find(&subject.entity_type, &subject.id).await?;

        let inherited = if relations.is_empty() {
            Vec::new()
        } else {
            let keys: Vec<SubjectKey> = relations.iter().map(EntityRef::subject_key).collect();
            store.find_by_relations(&keys).await?
        };

        Ok(Self { direct, inherited })
    }

    /// Build a cache from grants already in hand.
    pub fn from_parts(direct: Vec<Grant>, inherited: Vec<Grant>) -> Self {
        Self { direct, inherited }
    }

    /// Grants held by the subject itself.
    pub fn direct(&self) -> &[Grant] {
        &self.direct
    }

    /// Grants inherited through relations.
    pub fn inherited(&self) -> &[Grant] {
        &self.inherited
    }

    /// Direct grants followed by inherited grants.
    pub fn iter(&self) -> impl Iterator<Item = &Grant> {
        self.direct.iter().chain(self.inherited.iter())
    }

    /// Check if any grant (direct or inherited) gives `role` in the given scope.
    ///
    /// `None` matches only global grants; `Some(resource)` matches only grants on
    /// exactly that resource.
    pub fn matches(&self, role: &str, resource: Option<&EntityRef>) -> bool {
        self.iter().any(|g| Self::grant_matches(g, role, resource))
    }

    /// Check if a direct grant gives `role` in the given scope.
    pub fn matches_direct(&self, role: &str, resource: Option<&EntityRef>) -> bool {
        self.direct.iter().any(|g| Self::grant_matches(g, role, resource))
    }

    /// Record a freshly stored grant.
    ///
    /// Rows already present (same id) are not duplicated.
    pub fn insert_direct(&mut self, grant: Grant) {
        if !self.direct.iter().any(|g| g.id == grant.id) {
            self.direct.push(grant);
        }
    }

    /// Drop the direct grants matching `role` in the given scope.
    ///
    /// # Returns
    ///
    /// The removed grants
    pub fn remove_direct(&mut self, role: &str, resource: Option<&EntityRef>) -> Vec<Grant> {
        let (removed, kept): (Vec<Grant>, Vec<Grant>) = std::mem::take(&mut self.direct)
            .into_iter()
            .partition(|g| Self::grant_matches(g, role, resource));
        self.direct = kept;
        removed
    }

    /// Forget every direct grant.
    pub fn clear_direct(&mut self) {
        self.direct.clear();
    }

    fn grant_matches(grant: &Grant, role: &str, resource: Option<&EntityRef>) -> bool {
        if grant.role != role {
            return false;
        }
        match resource {
            None => grant.is_global(),
            Some(r) => grant.is_on(&r.entity_type, &r.id),
        }
    }
}
