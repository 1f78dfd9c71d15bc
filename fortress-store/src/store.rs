//! Grant store abstraction
//!
//! This module provides the storage contract the authorization core consumes.
//! Implementations are pure persistence: no role or permission logic lives here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::grant::{Grant, GrantId, NewGrant};

/// Resource part of a grant query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResourceScope {
    /// Do not filter on the resource columns
    #[default]
    Any,
    /// Only global grants (both resource columns null)
    Global,
    /// Only grants on exactly this resource
    Resource {
        resource_type: String,
        resource_id: String,
    },
}

impl ResourceScope {
    /// Scope to one resource instance.
    pub fn resource(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        ResourceScope::Resource {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Check if a grant falls inside this scope.
    pub fn matches(&self, grant: &Grant) -> bool {
        match self {
            ResourceScope::Any => true,
            ResourceScope::Global => grant.is_global(),
            ResourceScope::Resource {
                resource_type,
                resource_id,
            } => grant.is_on(resource_type, resource_id),
        }
    }
}

/// Conjunctive filter over grant rows.
///
/// Unset fields do not constrain the match.
///
/// # Examples
///
/// ```
/// use fortress_store::{GrantFilter, ResourceScope};
///
/// let filter = GrantFilter::subject("User", "42")
///     .with_role("editor")
///     .with_scope(ResourceScope::resource("Post", "7"));
/// assert_eq!(filter.role.as_deref(), Some("editor"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrantFilter {
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub scope: ResourceScope,
}

impl GrantFilter {
    /// Filter on every grant held by one subject.
    pub fn subject(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: Some(subject_type.into()),
            subject_id: Some(subject_id.into()),
            ..Self::default()
        }
    }

    /// Restrict to one role name.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Restrict the resource columns.
    pub fn with_scope(mut self, scope: ResourceScope) -> Self {
        self.scope = scope;
        self
    }

    /// Check if a grant satisfies every set field.
    pub fn matches(&self, grant: &Grant) -> bool {
        if let Some(ref st) = self.subject_type {
            if &grant.subject_type != st {
                return false;
            }
        }
        if let Some(ref sid) = self.subject_id {
            if &grant.subject_id != sid {
                return false;
            }
        }
        if let Some(ref role) = self.role {
            if &grant.role != role {
                return false;
            }
        }
        self.scope.matches(grant)
    }
}

/// A (type, id) pair naming the subject whose grants are requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectKey {
    pub subject_type: String,
    pub subject_id: String,
}

impl SubjectKey {
    pub fn new(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }
}

/// Persistence contract for grant rows.
///
/// Implementations must keep at most one row per
/// (subject_type, subject_id, role, resource_type, resource_id) tuple even under
/// concurrent inserts, either with a unique index or with check-then-insert inside
/// a transaction.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// All grants held by one subject.
    async fn find(&self, subject_type: &str, subject_id: &str) -> StoreResult<Vec<Grant>>;

    /// All grants scoped to one resource, optionally restricted to one subject type.
    async fn find_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        subject_type: Option<&str>,
    ) -> StoreResult<Vec<Grant>>;

    /// All grants held by any of the given subjects.
    ///
    /// An empty slice yields an empty result without touching the backend.
    async fn find_by_relations(&self, relations: &[SubjectKey]) -> StoreResult<Vec<Grant>>;

    /// Fetch one grant by id.
    async fn find_by_id(&self, id: GrantId) -> StoreResult<Option<Grant>>;

    /// Insert a grant, returning the stored row.
    ///
    /// Inserting a tuple that already exists returns the existing row and writes
    /// nothing.
    async fn insert(&self, grant: NewGrant) -> StoreResult<Grant>;

    /// Delete every row matching the filter, returning the number deleted.
    async fn delete(&self, filter: &GrantFilter) -> StoreResult<u64>;

    /// Delete every row held by one subject, returning the number deleted.
    async fn delete_all(&self, subject_type: &str, subject_id: &str) -> StoreResult<u64> {
        self.delete(&GrantFilter::subject(subject_type, subject_id)).await
    }

    /// Delete one grant by id.
    ///
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound) when no
    /// such row exists.
    async fn delete_by_id(&self, id: GrantId) -> StoreResult<()>;

    /// Count rows matching the filter.
    async fn count(&self, filter: &GrantFilter) -> StoreResult<usize>;
}
