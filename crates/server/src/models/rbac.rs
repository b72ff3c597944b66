//! Role and permission domain types.

use serde::Serialize;

use addressbook_core::{PermissionId, PermissionName, RoleId};

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
}

/// Input for creating or fully replacing a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub description: String,
}

/// A named capability such as `view_firms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: PermissionName,
    pub description: String,
}

/// Input for creating or fully replacing a permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    pub name: PermissionName,
    pub description: String,
}
