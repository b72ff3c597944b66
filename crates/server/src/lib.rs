//! Addressbook server library.
//!
//! REST backend for firms, contacts and role-based access control, plus an
//! independent device catalog. The binary in `main.rs` wires configuration,
//! logging and the store; everything else lives here so the CLI and the
//! integration tests can reuse it.
//!
//! # Layers
//!
//! - [`db`] - the [`db::Store`] trait family with `PostgreSQL` and in-memory backends
//! - [`services`] - relationship manager, permission resolver, authorization gate, seed, auth
//! - [`routes`] - axum handlers, one explicit gate call per protected route
//! - [`app`] - router assembly and the middleware stack

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use app::{build_app, cors_layer};
pub use state::AppState;
