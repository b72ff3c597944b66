//! Addressbook Core - Shared types library.
//!
//! This crate provides common types used across all addressbook components:
//! - `server` - REST backend for firms, contacts, RBAC and the device catalog
//! - `cli` - Command-line tools for schema setup, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails and permission names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
