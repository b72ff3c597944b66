//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! POST   /auth/register                         - Self-registration (default role)
//! POST   /auth/login                            - Issue a bearer token
//! POST   /auth/logout                           - Revoke the presented token
//! GET    /me/permissions                        - Caller's effective permissions
//!
//! POST   /users/create                          - create_users
//! GET    /users/get?id=                         - view_users
//! GET    /users/list                            - view_users
//! PUT    /users/update                          - edit_users
//! DELETE /users/delete?id=                      - delete_users
//! (same five under /roles and /permissions with *_roles / *_permissions)
//!
//! POST   /user_roles/assign                     - assign_roles
//! DELETE /user_roles/remove?user_id=&role_id=   - unassign_roles
//! GET    /user_roles/list?user_id=              - view_roles
//! POST   /role_permissions/assign               - assign_permissions
//! DELETE /role_permissions/remove?role_id=&permission_id= - unassign_permissions
//! GET    /role_permissions/list?role_id=        - view_permissions
//!
//! POST   /firm/submit                           - create_firms
//! GET    /firm/get                              - view_firms
//! GET    /firm/get_by_id?id=                    - view_firms
//! GET    /firm/by_contact?contact_id=           - view_firms
//! PUT    /firm/update                           - edit_firms
//! DELETE /firm/delete?id=                       - delete_firms
//! (contact side mirrored under /contact with *_contacts and by_firm?firm_id=)
//!
//! /devices/{create,get,list,update,delete}      - any authenticated caller
//! /device_links/{create,get,list,update,delete} - any authenticated caller
//! ```
//!
//! Every protected handler starts with an explicit gate call; there is no
//! route-level permission middleware.

pub mod assignments;
pub mod auth;
pub mod contacts;
pub mod devices;
pub mod firms;
pub mod me;
pub mod params;
pub mod permissions;
pub mod roles;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the user management routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(users::create))
        .route("/get", get(users::show))
        .route("/list", get(users::index))
        .route("/update", put(users::update))
        .route("/delete", delete(users::remove))
}

/// Create the role management routes router.
pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(roles::create))
        .route("/get", get(roles::show))
        .route("/list", get(roles::index))
        .route("/update", put(roles::update))
        .route("/delete", delete(roles::remove))
}

/// Create the permission management routes router.
pub fn permission_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(permissions::create))
        .route("/get", get(permissions::show))
        .route("/list", get(permissions::index))
        .route("/update", put(permissions::update))
        .route("/delete", delete(permissions::remove))
}

/// Create the user↔role junction routes router.
pub fn user_role_routes() -> Router<AppState> {
    Router::new()
        .route("/assign", post(assignments::assign_role))
        .route("/remove", delete(assignments::remove_role))
        .route("/list", get(assignments::roles_of_user))
}

/// Create the role↔permission junction routes router.
pub fn role_permission_routes() -> Router<AppState> {
    Router::new()
        .route("/assign", post(assignments::assign_permission))
        .route("/remove", delete(assignments::remove_permission))
        .route("/list", get(assignments::permissions_of_role))
}

/// Create the firm routes router.
pub fn firm_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(firms::submit))
        .route("/get", get(firms::index))
        .route("/get_by_id", get(firms::show))
        .route("/by_contact", get(firms::by_contact))
        .route("/update", put(firms::update))
        .route("/delete", delete(firms::remove))
}

/// Create the contact routes router.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(contacts::submit))
        .route("/get", get(contacts::index))
        .route("/get_by_id", get(contacts::show))
        .route("/by_firm", get(contacts::by_firm))
        .route("/update", put(contacts::update))
        .route("/delete", delete(contacts::remove))
}

/// Create the device routes router.
pub fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(devices::create))
        .route("/get", get(devices::show))
        .route("/list", get(devices::index))
        .route("/update", put(devices::update))
        .route("/delete", delete(devices::remove))
}

/// Create the device link routes router.
pub fn device_link_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(devices::create_link))
        .route("/get", get(devices::links_from))
        .route("/list", get(devices::link_index))
        .route("/update", put(devices::update_link))
        .route("/delete", delete(devices::remove_link))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .route("/me/permissions", get(me::permissions))
        // RBAC administration
        .nest("/users", user_routes())
        .nest("/roles", role_routes())
        .nest("/permissions", permission_routes())
        .nest("/user_roles", user_role_routes())
        .nest("/role_permissions", role_permission_routes())
        // Directory
        .nest("/firm", firm_routes())
        .nest("/contact", contact_routes())
        // Device catalog
        .nest("/devices", device_routes())
        .nest("/device_links", device_link_routes())
}
