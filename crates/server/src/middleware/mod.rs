//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//!
//! Identity is resolved per handler by the [`CallerIdentity`] extractor;
//! permission checks are explicit gate calls inside handlers.

pub mod auth;
pub mod request_id;

pub use auth::{BearerToken, CallerIdentity};
pub use request_id::request_id_middleware;
