//! Business logic on top of [`Store`](crate::db::Store).
//!
//! # Services
//!
//! - `relationships` - transactional firm/contact inserts and RBAC assignments
//! - `resolver` - effective permissions of a user
//! - `gate` - the authentication/authorization check every protected handler runs first
//! - `seed` - idempotent bootstrap of the permission catalog and admin account
//! - `auth` - registration, login and bearer tokens

pub mod auth;
pub mod gate;
pub mod relationships;
pub mod resolver;
pub mod seed;

pub use auth::{AuthError, AuthService, IssuedToken};
pub use gate::{AuthorizationGate, AuthzError, require_identity};
pub use relationships::RelationshipManager;
pub use resolver::PermissionResolver;
pub use seed::{BootstrapAdmin, PERMISSION_CATALOG, SeedError, SeedReport};
