//! In-memory grant store
//!
//! Suitable for single-process applications and testing. The uniqueness of
//! (subject, role, resource) tuples is enforced by doing check-then-insert under
//! one write lock.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::grant::{Grant, GrantId, NewGrant};
use crate::store::{GrantFilter, GrantStore, SubjectKey};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Grant>,
    next_id: GrantId,
}

/// In-memory grant store implementation.
///
/// Cloning yields a handle to the same table.
#[derive(Clone, Default)]
pub struct MemoryGrantStore {
    table: Arc<RwLock<Table>>,
}

impl std::fmt::Debug for MemoryGrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGrantStore").finish_non_exhaustive()
    }
}

impl MemoryGrantStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Check if the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }

    /// Snapshot of every stored row, in insertion order.
    pub async fn all(&self) -> Vec<Grant> {
        self.table.read().await.rows.clone()
    }

    async fn select<F>(&self, predicate: F) -> Vec<Grant>
    where
        F: Fn(&Grant) -> bool + Send,
    {
        self.table
            .read()
            .await
            .rows
            .iter()
            .filter(|g| predicate(g))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn find(&self, subject_type: &str, subject_id: &str) -> StoreResult<Vec<Grant>> {
        Ok(self.select(|g| g.belongs_to(subject_type, subject_id)).await)
    }

    async fn find_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        subject_type: Option<&str>,
    ) -> StoreResult<Vec<Grant>> {
        Ok(self
            .select(|g| {
                g.is_on(resource_type, resource_id)
                    && subject_type.map_or(true, |st| g.subject_type == st)
            })
            .await)
    }

    async fn find_by_relations(&self, relations: &[SubjectKey]) -> StoreResult<Vec<Grant>> {
        if relations.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .select(|g| {
                relations
                    .iter()
                    .any(|r| g.belongs_to(&r.subject_type, &r.subject_id))
            })
            .await)
    }

    async fn find_by_id(&self, id: GrantId) -> StoreResult<Option<Grant>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|g| g.id == id).cloned())
    }

    async fn insert(&self, grant: NewGrant) -> StoreResult<Grant> {
        grant.validate()?;
        let mut table = self.table.write().await;

        if let Some(existing) = table.rows.iter().find(|g| g.same_tuple(&grant)) {
            tracing::debug!(grant_id = existing.id, "Grant already stored, skipping insert");
            return Ok(existing.clone());
        }

        table.next_id += 1;
        let row = grant.into_grant(table.next_id);
        table.rows.push(row.clone());

        Ok(row)
    }

    async fn delete(&self, filter: &GrantFilter) -> StoreResult<u64> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|g| !filter.matches(g));
        Ok((before - table.rows.len()) as u64)
    }

    async fn delete_by_id(&self, id: GrantId) -> StoreResult<()> {
        let mut table = self.table.write().await;
        let position = table
            .rows
            .iter()
            .position(|g| g.id == id)
            .ok_or(StoreError::NotFound(id))?;
        table.rows.remove(position);
        Ok(())
    }

    async fn count(&self, filter: &GrantFilter) -> StoreResult<usize> {
        let table = self.table.read().await;
        Ok(table.rows.iter().filter(|g| filter.matches(g)).count())
    }
}
