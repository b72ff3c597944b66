//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Store;
use crate::services::{AuthService, AuthorizationGate, PermissionResolver, RelationshipManager};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; services are built per call as borrowed
/// views over the shared store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    token_ttl: chrono::Duration,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, token_ttl: chrono::Duration) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store, token_ttl }),
        }
    }

    /// The persistence backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn gate(&self) -> AuthorizationGate<'_> {
        AuthorizationGate::new(self.store())
    }

    #[must_use]
    pub fn resolver(&self) -> PermissionResolver<'_> {
        PermissionResolver::new(self.store())
    }

    #[must_use]
    pub fn relationships(&self) -> RelationshipManager<'_> {
        RelationshipManager::new(self.store())
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store(), self.inner.token_ttl)
    }
}
