//! Roles, permissions and their junctions for the `PostgreSQL` backend.

use async_trait::async_trait;

use addressbook_core::{PermissionId, PermissionName, RoleId, UserId};

use super::{PgStore, expect_one};
use crate::db::{AssignmentStore, PermissionStore, RepositoryError, RoleStore, classify};
use crate::models::{NewPermission, NewRole, Permission, Role};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    description: String,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::new(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PermissionRow {
    id: i64,
    name: String,
    description: String,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = RepositoryError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let name = PermissionName::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid permission name in database: {e}"))
        })?;

        Ok(Self {
            id: PermissionId::new(row.id),
            name,
            description: row.description,
        })
    }
}

// =============================================================================
// Roles
// =============================================================================

#[async_trait]
impl RoleStore for PgStore {
    async fn insert_role(&self, role: &NewRole) -> Result<RoleId, RepositoryError> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING id")
                .bind(&role.name)
                .bind(&role.description)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| classify(e, "role name already exists"))?;

        Ok(RoleId::new(id))
    }

    async fn get_role(&self, id: RoleId) -> Result<Role, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn role_by_name(&self, name: &str) -> Result<Role, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn update_role(&self, id: RoleId, role: &NewRole) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE roles SET name = $1, description = $2 WHERE id = $3")
            .bind(&role.name)
            .bind(&role.description)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "role name already exists"))?;

        expect_one(&result)
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description FROM roles ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Permissions
// =============================================================================

#[async_trait]
impl PermissionStore for PgStore {
    async fn insert_permission(
        &self,
        permission: &NewPermission,
    ) -> Result<PermissionId, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO permissions (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(permission.name.as_str())
        .bind(&permission.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "permission name already exists"))?;

        Ok(PermissionId::new(id))
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Permission, RepositoryError> {
        sqlx::query_as::<_, PermissionRow>(
            "SELECT id, name, description FROM permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    async fn permission_by_name(&self, name: &str) -> Result<Permission, RepositoryError> {
        sqlx::query_as::<_, PermissionRow>(
            "SELECT id, name, description FROM permissions WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        permission: &NewPermission,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE permissions SET name = $1, description = $2 WHERE id = $3")
                .bind(permission.name.as_str())
                .bind(&permission.description)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| classify(e, "permission name already exists"))?;

        expect_one(&result)
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, RepositoryError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT id, name, description FROM permissions ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// =============================================================================
// Assignments
// =============================================================================

#[async_trait]
impl AssignmentStore for PgStore {
    async fn insert_user_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "role already assigned to user"))?;

        Ok(())
    }

    async fn delete_user_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user)
            .bind(role)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn insert_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(role)
            .bind(permission)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "permission already assigned to role"))?;

        Ok(())
    }

    async fn delete_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2",
        )
        .bind(role)
        .bind(permission)
        .execute(&self.pool)
        .await?;

        expect_one(&result)
    }

    async fn roles_for_user(&self, user: UserId) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r"
            SELECT r.id, r.name, r.description
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.id DESC
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn permissions_for_role(
        &self,
        role: RoleId,
    ) -> Result<Vec<Permission>, RepositoryError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r"
            SELECT p.id, p.name, p.description
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.id DESC
            ",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn permission_names_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<PermissionName>, RepositoryError> {
        let names: Vec<String> = sqlx::query_scalar(
            r"
            SELECT DISTINCT p.name
            FROM user_roles ur
            JOIN role_permissions rp ON rp.role_id = ur.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE ur.user_id = $1
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().map(PermissionName::from_trusted).collect())
    }
}
