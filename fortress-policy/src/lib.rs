//! # Fortress Policy
//!
//! Role to permission policies for the Fortress RBAC engine.
//!
//! ## Overview
//!
//! The fortress-policy crate handles:
//! - **Role tables**: Role name to permission set, one table per resource type
//! - **Global roles**: A separate table for checks not bound to a resource
//! - **Resolution**: The [`PolicyResolver`] contract the guard consumes
//!
//! ## Architecture
//!
//! ```text
//! PolicyResolver
//!   ├─ roles_for("Post")  → { editor: [read, write], viewer: [read] }
//!   ├─ roles_for("Project") → { owner: [delete, ...], ... }
//!   └─ global_roles()     → { admin: [manage-users], ... }
//! ```
//!
//! A permission check expands the permission into the roles that confer it,
//! then asks whether the subject holds any of them.
//!
//! ## Usage
//!
//! ```rust
//! use fortress_policy::{PolicyRegistry, PolicyResolver, RoleTable};
//!
//! let registry = PolicyRegistry::new().register(
//!     "Post",
//!     RoleTable::new()
//!         .with_role("editor", ["read", "write"])
//!         .with_role("viewer", ["read"]),
//! );
//!
//! let roles = registry.roles_for("Post").unwrap();
//! assert_eq!(roles.roles_with("write"), vec!["editor"]);
//! ```

pub mod error;
pub mod registry;
pub mod roles;

// Re-export main types for convenience
pub use error::{PolicyError, PolicyResult};
pub use registry::{PolicyConfig, PolicyRegistry, PolicyResolver};
pub use roles::RoleTable;
