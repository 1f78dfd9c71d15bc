//! Grant domain model
//!
//! A grant is the atomic authorization fact: a subject (identified by type and id)
//! holds a named role, either globally or on exactly one resource instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Identifier assigned to a grant by the store.
pub type GrantId = u64;

/// A stored grant row.
///
/// `resource_type` and `resource_id` are either both set (scoped grant) or both
/// `None` (global grant). Stores only accept rows as a [`NewGrant`], whose
/// constructors and deserializer enforce that invariant.
///
/// # Examples
///
/// ```
/// use fortress_store::NewGrant;
///
/// let grant = NewGrant::scoped("User", "42", "post.read", "Post", "7")
///     .unwrap()
///     .into_grant(1);
/// assert!(!grant.is_global());
/// assert!(grant.is_on("Post", "7"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Store-assigned id
    pub id: GrantId,

    /// Type of the entity holding the role (e.g. "User")
    pub subject_type: String,

    /// Id of the entity holding the role
    pub subject_id: String,

    /// Role name
    pub role: String,

    /// Type of the scoped resource, `None` for global grants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Id of the scoped resource, `None` for global grants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grant {
    /// Check if this grant applies everywhere (no resource scope).
    pub fn is_global(&self) -> bool {
        self.resource_type.is_none() && self.resource_id.is_none()
    }

    /// Check if this grant is scoped to exactly the given resource.
    ///
    /// Comparison is exact and case-sensitive on both type and id.
    pub fn is_on(&self, resource_type: &str, resource_id: &str) -> bool {
        self.resource_type.as_deref() == Some(resource_type)
            && self.resource_id.as_deref() == Some(resource_id)
    }

    /// Check if this grant belongs to the given subject.
    pub fn belongs_to(&self, subject_type: &str, subject_id: &str) -> bool {
        self.subject_type == subject_type && self.subject_id == subject_id
    }

    /// Check if this grant has the same (subject, role, resource) tuple as `other`.
    pub fn same_tuple(&self, other: &NewGrant) -> bool {
        self.subject_type == other.subject_type
            && self.subject_id == other.subject_id
            && self.role == other.role
            && self.resource_type == other.resource_type
            && self.resource_id == other.resource_id
    }
}

/// A grant that has not been persisted yet.
///
/// Construction validates the role name and the all-or-nothing resource scope,
/// so every `NewGrant` describes a well-formed row. Deserialization goes through
/// the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NewGrantRow")]
pub struct NewGrant {
    subject_type: String,
    subject_id: String,
    role: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
}

/// Unchecked wire shape of a [`NewGrant`].
#[derive(Deserialize)]
struct NewGrantRow {
    subject_type: String,
    subject_id: String,
    role: String,
    #[serde(default)]
    resource_type: Option<String>,
    #[serde(default)]
    resource_id: Option<String>,
}

impl TryFrom<NewGrantRow> for NewGrant {
    type Error = StoreError;

    fn try_from(row: NewGrantRow) -> Result<Self, Self::Error> {
        let resource = match (row.resource_type, row.resource_id) {
            (Some(rt), Some(rid)) => Some((rt, rid)),
            (None, None) => None,
            _ => return Err(partial_scope()),
        };
        Self::build(row.subject_type, row.subject_id, row.role, resource)
    }
}

fn partial_scope() -> StoreError {
    StoreError::InvalidGrant("resource type and id must both be set for a scoped grant".to_string())
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl NewGrant {
    /// Create a global grant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidGrant`] if the role or the subject identity is blank.
    pub fn global(
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        role: impl Into<String>,
    ) -> StoreResult<Self> {
        Self::build(subject_type.into(), subject_id.into(), role.into(), None)
    }

    /// Create a grant scoped to one resource instance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidGrant`] if the role, the subject identity or
    /// the resource identity is blank.
    pub fn scoped(
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        role: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> StoreResult<Self> {
        Self::build(
            subject_type.into(),
            subject_id.into(),
            role.into(),
            Some((resource_type.into(), resource_id.into())),
        )
    }

    fn build(
        subject_type: String,
        subject_id: String,
        role: String,
        resource: Option<(String, String)>,
    ) -> StoreResult<Self> {
        let (resource_type, resource_id) = match resource {
            Some((rt, rid)) => (Some(rt), Some(rid)),
            None => (None, None),
        };
        let grant = Self {
            subject_type,
            subject_id,
            role,
            resource_type,
            resource_id,
        };
        grant.validate()?;
        Ok(grant)
    }

    /// Check the row invariants: non-blank role and subject, and a resource
    /// scope that is either fully set or fully absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidGrant`] describing the first violation.
    pub fn validate(&self) -> StoreResult<()> {
        if blank(&self.role) {
            return Err(StoreError::InvalidGrant("role name must not be empty".to_string()));
        }
        if blank(&self.subject_type) || blank(&self.subject_id) {
            return Err(StoreError::InvalidGrant(
                "subject type and id must not be empty".to_string(),
            ));
        }
        match (&self.resource_type, &self.resource_id) {
            (None, None) => Ok(()),
            (Some(rt), Some(rid)) if !blank(rt) && !blank(rid) => Ok(()),
            _ => Err(partial_scope()),
        }
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Check if this grant is global.
    pub fn is_global(&self) -> bool {
        self.resource_type.is_none() && self.resource_id.is_none()
    }

    /// Materialize the row with a store-assigned id and fresh timestamps.
    pub fn into_grant(self, id: GrantId) -> Grant {
        let now = Utc::now();
        Grant {
            id,
            subject_type: self.subject_type,
            subject_id: self.subject_id,
            role: self.role,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_grant_creation() {
        let grant = NewGrant::global("User", "1", "admin").unwrap();
        assert!(grant.is_global());
        assert!(grant.resource_id().is_none());

        let row = grant.into_grant(10);
        assert_eq!(row.id, 10);
        assert!(row.is_global());
        assert!(row.belongs_to("User", "1"));
        assert_eq!(row.created_at, row.updated_at);
    }

    #[test]
    fn test_scoped_grant_creation() {
        let row = NewGrant::scoped("User", "1", "editor", "Post", "9")
            .unwrap()
            .into_grant(1);

        assert!(!row.is_global());
        assert!(row.is_on("Post", "9"));
        assert!(!row.is_on("Post", "90"));
        assert!(!row.is_on("post", "9"));
    }

    #[test]
    fn test_empty_role_rejected() {
        let err = NewGrant::global("User", "1", "  ").unwrap_err();
        assert!(matches!(err, StoreError::InvalidGrant(_)));
    }

    #[test]
    fn test_partial_scope_rejected() {
        assert!(NewGrant::scoped("User", "1", "editor", "Post", "").is_err());
        assert!(NewGrant::scoped("User", "1", "editor", "", "9").is_err());
        assert!(NewGrant::global("", "1", "editor").is_err());
    }

    #[test]
    fn test_blank_identities_rejected() {
        assert!(NewGrant::global(" ", "1", "editor").is_err());
        assert!(NewGrant::global("User", "\t", "editor").is_err());
        assert!(NewGrant::scoped("User", "1", "editor", "Post", "  ").is_err());
        assert!(NewGrant::scoped("User", "1", "editor", " ", "9").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let grant: NewGrant = serde_json::from_str(
            r#"{"subject_type": "User", "subject_id": "1", "role": "editor", "resource_type": "Post", "resource_id": "9"}"#,
        )
        .unwrap();
        assert_eq!(grant.resource_type(), Some("Post"));
        assert_eq!(grant.resource_id(), Some("9"));

        let global: NewGrant =
            serde_json::from_str(r#"{"subject_type": "User", "subject_id": "1", "role": "admin"}"#).unwrap();
        assert!(global.is_global());

        let partial = serde_json::from_str::<NewGrant>(
            r#"{"subject_type": "User", "subject_id": "1", "role": "editor", "resource_type": "Post"}"#,
        );
        assert!(partial.is_err());

        let empty_role = serde_json::from_str::<NewGrant>(
            r#"{"subject_type": "User", "subject_id": "1", "role": "", "resource_type": null, "resource_id": "9"}"#,
        );
        assert!(empty_role.is_err());
    }

    #[test]
    fn test_serialize_then_deserialize_keeps_grant() {
        let grant = NewGrant::scoped("User", "1", "editor", "Post", "9").unwrap();
        let json = serde_json::to_string(&grant).unwrap();
        assert_eq!(serde_json::from_str::<NewGrant>(&json).unwrap(), grant);
    }

    #[test]
    fn test_same_tuple() {
        let new = NewGrant::scoped("User", "1", "editor", "Post", "9").unwrap();
        let row = new.clone().into_grant(3);
        assert!(row.same_tuple(&new));

        let other = NewGrant::global("User", "1", "editor").unwrap();
        assert!(!row.same_tuple(&other));
    }

    #[test]
    fn test_global_grant_serialization_omits_resource() {
        let row = NewGrant::global("User", "1", "admin").unwrap().into_grant(1);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("resource_type").is_none());
        assert_eq!(json["role"], "admin");
    }
}
