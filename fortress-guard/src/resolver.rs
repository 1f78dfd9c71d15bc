//! Batched hydration of grant references.
//!
//! [`GrantResolver`] turns a list of grants into the entities they point at,
//! either the holders (`get_models`) or the resources (`get_resources`). Ids
//! are grouped per type so each type costs one [`EntityLoader::find_many`].

use fortress_store::Grant;
use tracing::debug;

use crate::entity::{EntityLoader, EntityRef, FetchQuery, SortDirection};
use crate::error::GuardResult;

/// Builder over a set of grants.
///
/// # Examples
///
/// ```rust,no_run
/// use fortress_guard::{EntityLoader, Guard, GrantResolver, SortDirection};
///
/// async fn editable_posts<L: EntityLoader>(guard: &Guard, loader: &L) -> Vec<L::Entity> {
///     let grants = guard.my_allowed_grants("edit", "Post").unwrap_or_default();
///     GrantResolver::new(grants)
///         .with(["author"])
///         .order_by("title", SortDirection::Asc)
///         .get_resources(loader)
///         .await
///         .unwrap_or_default()
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GrantResolver {
    grants: Vec<Grant>,
    query: FetchQuery,
}

impl GrantResolver {
    pub fn new(grants: Vec<Grant>) -> Self {
        Self {
            grants,
            query: FetchQuery::default(),
        }
    }

    /// Replace the grant set.
    pub fn grants(mut self, grants: Vec<Grant>) -> Self {
        self.grants = grants;
        self
    }

    /// Keep only grants held by subjects of `subject_type`.
    pub fn filter_model_type(mut self, subject_type: &str) -> Self {
        self.grants.retain(|g| g.subject_type == subject_type);
        self
    }

    /// Keep only grants scoped to resources of `resource_type`.
    pub fn filter_resource_type(mut self, resource_type: &str) -> Self {
        self.grants
            .retain(|g| g.resource_type.as_deref() == Some(resource_type));
        self
    }

    /// Relations to eager-load with each entity.
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.with.extend(relations.into_iter().map(Into::into));
        self
    }

    /// Order each per-type batch by `column`.
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.query.order_by = Some((column.into(), direction));
        self
    }

    /// The grants currently selected.
    pub fn selected(&self) -> &[Grant] {
        &self.grants
    }

    /// The query passed to every batch.
    pub fn query(&self) -> &FetchQuery {
        &self.query
    }

    /// Load the subjects holding the selected grants.
    pub async fn get_models<L>(&self, loader: &L) -> GuardResult<Vec<L::Entity>>
    where
        L: EntityLoader + ?Sized,
    {
        let refs = self.grants.iter().map(|g| Some(EntityRef::subject_of(g)));
        self.load_grouped(refs, loader).await
    }

    /// Load the resources the selected grants are scoped to.
    ///
    /// Global grants have no resource and are skipped.
    pub async fn get_resources<L>(&self, loader: &L) -> GuardResult<Vec<L::Entity>>
    where
        L: EntityLoader + ?Sized,
    {
        let refs = self.grants.iter().map(EntityRef::resource_of);
        self.load_grouped(refs, loader).await
    }

    async fn load_grouped<L, I>(&self, refs: I, loader: &L) -> GuardResult<Vec<L::Entity>>
    where
        L: EntityLoader + ?Sized,
        I: Iterator<Item = Option<EntityRef>>,
    {
        // (type, ids) in first-appearance order
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();

        for reference in refs.flatten() {
            match groups.iter_mut().find(|(t, _)| *t == reference.entity_type) {
                Some((_, ids)) => {
                    if !ids.contains(&reference.id) {
                        ids.push(reference.id);
                    }
                }
                None => groups.push((reference.entity_type, vec![reference.id])),
            }
        }

        let mut entities = Vec::new();
        for (entity_type, ids) in &groups {
            debug!(entity_type = %entity_type, count = ids.len(), "Loading grant references");
            let batch = loader.find_many(entity_type, ids, &self.query).await?;
            entities.extend(batch);
        }

        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, LoadError};
    use crate::error::GuardError;
    use async_trait::async_trait;
    use fortress_store::NewGrant;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        kind: String,
        id: String,
    }

    impl Entity for Row {
        fn entity_type(&self) -> &str {
            &self.kind
        }

        fn entity_id(&self) -> String {
            self.id.clone()
        }
    }

    /// Loader that knows every id except "gone" and records each batch.
    #[derive(Default)]
    struct RecordingLoader {
        batches: Mutex<Vec<(String, Vec<String>, FetchQuery)>>,
        fail_type: Option<String>,
    }

    #[async_trait]
    impl EntityLoader for RecordingLoader {
        type Entity = Row;

        async fn find(&self, entity_type: &str, id: &str) -> Result<Option<Row>, LoadError> {
            Ok((id != "gone").then(|| Row {
                kind: entity_type.to_string(),
                id: id.to_string(),
            }))
        }

        async fn find_many(
            &self,
            entity_type: &str,
            ids: &[String],
            query: &FetchQuery,
        ) -> Result<Vec<Row>, LoadError> {
            if self.fail_type.as_deref() == Some(entity_type) {
                return Err(LoadError::new(entity_type, "table missing"));
            }
            self.batches
                .lock()
                .unwrap()
                .push((entity_type.to_string(), ids.to_vec(), query.clone()));
            Ok(ids
                .iter()
                .filter(|id| id.as_str() != "gone")
                .map(|id| Row {
                    kind: entity_type.to_string(),
                    id: id.clone(),
                })
                .collect())
        }
    }

    fn grants() -> Vec<Grant> {
        vec![
            NewGrant::scoped("User", "1", "editor", "Post", "3").unwrap().into_grant(1),
            NewGrant::scoped("User", "1", "viewer", "Post", "3").unwrap().into_grant(2),
            NewGrant::scoped("Group", "7", "viewer", "Post", "gone").unwrap().into_grant(3),
            NewGrant::scoped("User", "2", "editor", "Page", "9").unwrap().into_grant(4),
            NewGrant::global("User", "1", "admin").unwrap().into_grant(5),
        ]
    }

    #[tokio::test]
    async fn test_get_resources_batches_per_type() {
        let loader = RecordingLoader::default();
        let resources = GrantResolver::new(grants()).get_resources(&loader).await.unwrap();

        let ids: Vec<_> = resources.iter().map(|r| r.entity_ref().to_string()).collect();
        assert_eq!(ids, vec!["Post#3", "Page#9"]);

        let batches = loader.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, "Post");
        assert_eq!(batches[0].1, vec!["3".to_string(), "gone".to_string()]);
        assert_eq!(batches[1].0, "Page");
    }

    #[tokio::test]
    async fn test_get_models_dedupes_holders() {
        let loader = RecordingLoader::default();
        let models = GrantResolver::new(grants())
            .filter_resource_type("Post")
            .get_models(&loader)
            .await
            .unwrap();

        let ids: Vec<_> = models.iter().map(|r| r.entity_ref().to_string()).collect();
        assert_eq!(ids, vec!["User#1", "Group#7"]);
    }

    #[tokio::test]
    async fn test_filters_and_query_are_forwarded() {
        let loader = RecordingLoader::default();
        let resolver = GrantResolver::default()
            .grants(grants())
            .filter_model_type("User")
            .with(["author", "tags"])
            .order_by("title", SortDirection::Desc);

        assert_eq!(resolver.selected().len(), 4);
        assert_eq!(resolver.query().with.len(), 2);

        let resources = resolver.get_resources(&loader).await.unwrap();
        assert_eq!(resources.len(), 2);

        let batches = loader.batches.lock().unwrap();
        let query = &batches[0].2;
        assert_eq!(query.with, vec!["author".to_string(), "tags".to_string()]);
        assert_eq!(query.order_by, Some(("title".to_string(), SortDirection::Desc)));
    }

    #[tokio::test]
    async fn test_loader_failure_propagates() {
        let loader = RecordingLoader {
            fail_type: Some("Page".to_string()),
            ..Default::default()
        };
        let err = GrantResolver::new(grants()).get_resources(&loader).await.unwrap_err();
        assert!(matches!(err, GuardError::Load(_)));
    }

    #[tokio::test]
    async fn test_empty_grants_load_nothing() {
        let loader = RecordingLoader::default();
        let resources = GrantResolver::new(Vec::new()).get_resources(&loader).await.unwrap();
        assert!(resources.is_empty());
        assert!(loader.batches.lock().unwrap().is_empty());
    }
}
