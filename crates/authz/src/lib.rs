//! Role-based access control for Tessera services.
//!
//! This crate answers "what may this user do": users hold roles, roles
//! hold permissions, and [`RbacResolver`] computes a user's effective
//! permission set as the deduplicated union across their roles. The
//! resolver also owns the mutation side of the graph with referential
//! checks before every write, and [`validate_permission_name`] enforces
//! the dotted-path permission grammar before any store is touched.
//!
//! Stores come from [`tessera_storage`]; the resolver is generic over the
//! store traits, so the same code runs against the in-memory reference
//! stores in tests and a relational backend in production.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use tessera_authz::RbacResolver;
//! use tessera_storage::{
//!     MemoryPermissionStore, MemoryRolePermissionStore, MemoryRoleStore,
//!     MemoryUserRoleStore, MemoryUserStore, PermissionId, PermissionRecord,
//!     RoleId, RoleRecord, UserId, UserRecord, UserStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let users = Arc::new(MemoryUserStore::new());
//!     let resolver = RbacResolver::builder()
//!         .users(users.clone())
//!         .roles(Arc::new(MemoryRoleStore::new()))
//!         .permissions(Arc::new(MemoryPermissionStore::new()))
//!         .user_roles(Arc::new(MemoryUserRoleStore::new()))
//!         .role_permissions(Arc::new(MemoryRolePermissionStore::new()))
//!         .build();
//!
//!     let user = UserRecord::builder()
//!         .id(1)
//!         .username("ada")
//!         .display_name("Ada Lovelace")
//!         .build();
//!     users.create(&user).await?;
//!
//!     let editor = RoleRecord::builder().id(10).display_name("Editor").build();
//!     resolver.create_role(&editor).await?;
//!
//!     let publish = PermissionRecord::builder().id(100).name("articles.publish").build();
//!     resolver.create_permission(&publish).await?;
//!
//!     resolver.grant_permission(RoleId::from(10), PermissionId::from(100)).await?;
//!     resolver.assign_role(UserId::from(1), RoleId::from(10)).await?;
//!
//!     let effective = resolver.permissions_of(UserId::from(1)).await?;
//!     assert_eq!(effective.len(), 1);
//!     assert_eq!(effective[0].name, "articles.publish");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result`] with [`AuthzError`]. Input problems
//! are [`AuthzError::InvalidArgument`], dangling references are
//! [`AuthzError::NotFound`], duplicate entities and associations are
//! [`AuthzError::AlreadyExists`], and removing an association that is not
//! there is [`AuthzError::FailedPrecondition`]. Backend faults pass
//! through as [`AuthzError::Storage`] with the source chain intact.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod resolver;
pub mod validation;

// Re-export primary types at crate root for convenience
pub use error::{AuthzError, Result};
pub use resolver::RbacResolver;
pub use validation::{MAX_PERMISSION_NAME_LEN, validate_permission_name};
