//! # Fortress Store
//!
//! Grant records and the storage contract for the Fortress RBAC engine.
//!
//! ## Overview
//!
//! The fortress-store crate handles:
//! - **Grants**: The (subject, role, optional resource) facts the engine matches on
//! - **Filters**: Conjunctive queries over grant rows
//! - **Store contract**: The async [`GrantStore`] trait backends implement
//! - **Memory store**: A reference backend for single-process use and tests
//!
//! ## Data Model
//!
//! ```text
//! Grant
//!   ├─ subject_type, subject_id   (who holds the role)
//!   ├─ role                       (non-empty role name)
//!   └─ resource_type, resource_id (both None => global grant)
//! ```
//!
//! Canonical table shape for SQL backends (`fortress_roles`): `id` (auto-increment
//! primary key), `model_type`, `model_id`, `role`, `resource_type` (nullable),
//! `resource_id` (nullable), `created_at`, `updated_at`, with a unique index over
//! `(model_type, model_id, role, resource_type, resource_id)`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fortress_store::{GrantStore, MemoryGrantStore, NewGrant};
//!
//! async fn example() {
//!     let store = MemoryGrantStore::new();
//!     let grant = NewGrant::scoped("User", "42", "editor", "Post", "7").unwrap();
//!     store.insert(grant).await.unwrap();
//!
//!     let grants = store.find("User", "42").await.unwrap();
//!     assert_eq!(grants.len(), 1);
//! }
//! ```
//!
//! ## Features
//!
//! - `memory` (default): In-memory grant store

pub mod error;
pub mod grant;
pub mod store;

#[cfg(feature = "memory")]
pub mod memory;

// Re-export main types
pub use error::{StoreError, StoreResult};
pub use grant::{Grant, GrantId, NewGrant};
pub use store::{GrantFilter, GrantStore, ResourceScope, SubjectKey};

#[cfg(feature = "memory")]
pub use memory::MemoryGrantStore;
