//! Entity identity and loading
//!
//! Subjects and resources are opaque to the engine: it only ever looks at a
//! (type, id) pair, plus the optional list of relations a subject declares.
//! Loading full entities back from ids is delegated to an [`EntityLoader`]
//! supplied by the host.

use async_trait::async_trait;
use fortress_store::{Grant, SubjectKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::{GuardError, GuardResult};

/// The identity of a subject or resource.
///
/// # Examples
///
/// ```
/// use fortress_guard::EntityRef;
///
/// let post = EntityRef::new("Post", "7");
/// assert_eq!(post.to_string(), "Post#7");
/// assert!(post.validate().is_ok());
/// assert!(EntityRef::new("Post", "").validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// Type name (e.g. "User", "Post")
    pub entity_type: String,

    /// Instance id, compared as an exact string
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Identity of any [`Entity`].
    pub fn of<E: Entity + ?Sized>(entity: &E) -> Self {
        Self::new(entity.entity_type(), entity.entity_id())
    }

    /// Identity of the resource a grant is scoped to, `None` for global grants.
    pub fn resource_of(grant: &Grant) -> Option<Self> {
        match (&grant.resource_type, &grant.resource_id) {
            (Some(rt), Some(rid)) => Some(Self::new(rt.clone(), rid.clone())),
            _ => None,
        }
    }

    /// Identity of the subject holding a grant.
    pub fn subject_of(grant: &Grant) -> Self {
        Self::new(grant.subject_type.clone(), grant.subject_id.clone())
    }

    /// Check that both parts of the identity are present.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidArgument`] for an empty type or id.
    pub fn validate(&self) -> GuardResult<()> {
        if self.entity_type.trim().is_empty() {
            return Err(GuardError::InvalidArgument(format!(
                "entity type must not be empty (id {:?})",
                self.id
            )));
        }
        if self.id.trim().is_empty() {
            return Err(GuardError::InvalidArgument(format!(
                "entity id must not be empty (type {:?})",
                self.entity_type
            )));
        }
        Ok(())
    }

    pub(crate) fn subject_key(&self) -> SubjectKey {
        SubjectKey::new(self.entity_type.clone(), self.id.clone())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.id)
    }
}

/// Anything the engine can identify by type and id.
pub trait Entity {
    /// Type name used in grant rows.
    fn entity_type(&self) -> &str;

    /// Instance id used in grant rows.
    fn entity_id(&self) -> String;

    /// Identity as an [`EntityRef`].
    fn entity_ref(&self) -> EntityRef {
        EntityRef::of(self)
    }
}

impl Entity for EntityRef {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn entity_id(&self) -> String {
        self.id.clone()
    }

    fn entity_ref(&self) -> EntityRef {
        self.clone()
    }
}

/// An entity that can hold roles.
///
/// Grants held by the declared relations (e.g. the groups a user belongs to)
/// are inherited read-only by the subject.
pub trait Subject: Entity {
    /// Related entities whose grants this subject inherits.
    fn relations(&self) -> Vec<EntityRef> {
        Vec::new()
    }
}

impl Subject for EntityRef {}

/// Entity loading failure.
#[derive(Debug, Error)]
#[error("Failed to load {entity_type}: {message}")]
pub struct LoadError {
    /// Type that was being loaded
    pub entity_type: String,
    /// Backend message
    pub message: String,
}

impl LoadError {
    pub fn new(entity_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            message: message.into(),
        }
    }
}

/// Sort direction for batched loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Shaping hints passed through to batched loads.
///
/// The engine does not interpret these; loaders apply them as their backend
/// allows (eager-loaded relations, ordering).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchQuery {
    /// Relations to eager-load with each entity
    #[serde(default)]
    pub with: Vec<String>,

    /// Column and direction to order each batch by
    #[serde(default)]
    pub order_by: Option<(String, SortDirection)>,
}

/// Loads entities back from grant references.
#[async_trait]
pub trait EntityLoader: Send + Sync {
    /// Loaded entity type.
    type Entity: Entity + Send;

    /// Load one entity, `None` if it no longer exists.
    async fn find(&self, entity_type: &str, id: &str) -> Result<Option<Self::Entity>, LoadError>;

    /// Load every existing entity of one type among `ids` in a single batch.
    ///
    /// Missing ids are skipped.
    async fn find_many(
        &self,
        entity_type: &str,
        ids: &[String],
        query: &FetchQuery,
    ) -> Result<Vec<Self::Entity>, LoadError>;
}
