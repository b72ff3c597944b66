//! Core types for the addressbook backend.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod permission;

pub use email::{Email, EmailError};
pub use id::*;
pub use permission::{PermissionName, PermissionNameError};
