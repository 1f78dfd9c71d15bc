//! # Fortress Guard
//!
//! Per-subject authorization for the Fortress RBAC engine.
//!
//! ## Overview
//!
//! The fortress-guard crate handles:
//! - **Guards**: A subject's grants loaded once, answering role and permission checks
//! - **Mutations**: Assigning and revoking roles with the cache kept in step
//! - **Reverse lookups**: Which resources a subject may act on, and who may act on a resource
//! - **Gate**: Named global abilities for route-level checks
//! - **Resolver**: Batched hydration of grant references into host entities
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fortress_guard::{EntityRef, Fortress};
//! use fortress_policy::{PolicyRegistry, RoleTable};
//! use fortress_store::MemoryGrantStore;
//! use std::sync::Arc;
//!
//! async fn example() {
//!     let policies = PolicyRegistry::new().register(
//!         "Post",
//!         RoleTable::new()
//!             .with_role("editor", ["read", "write"])
//!             .with_role("viewer", ["read"]),
//!     );
//!     let fortress = Fortress::new(Arc::new(MemoryGrantStore::new()), Arc::new(policies));
//!
//!     let user = EntityRef::new("User", "1");
//!     let post = EntityRef::new("Post", "3");
//!
//!     let mut guard = fortress.guard(&user).await.unwrap();
//!     guard.assign_role("editor", Some(&post)).await.unwrap();
//!
//!     assert!(guard.has_permission("write", Some(&post)).unwrap());
//!     assert!(!guard.has_role("editor", None).unwrap());
//! }
//! ```
//!
//! ## Consistency
//!
//! A guard snapshots the grants of its subject (and the subject's relations)
//! when it is built. Its own mutations are reflected immediately; writes made
//! elsewhere are visible only to guards built afterwards.

pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod fortress;
pub mod gate;
pub mod guard;
pub mod resolver;

// Re-export main types
pub use cache::GrantCache;
pub use config::{ConfigError, FortressConfig};
pub use entity::{Entity, EntityLoader, EntityRef, FetchQuery, LoadError, SortDirection, Subject};
pub use error::{GuardError, GuardResult};
pub use fortress::Fortress;
pub use gate::{AbilityCheck, Gate};
pub use guard::Guard;
pub use resolver::GrantResolver;
