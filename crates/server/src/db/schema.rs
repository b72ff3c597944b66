//! Idempotent DDL for both databases.
//!
//! Statements run in order; each is `IF NOT EXISTS` so re-running against a
//! populated database is a no-op. Junction tables carry composite unique
//! keys and `ON DELETE CASCADE` on both parents.

use sqlx::PgPool;

use super::RepositoryError;

/// Main database: RBAC, directory and auth tokens.
pub const MAIN_SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        r"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            hashed_password TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_by BIGINT REFERENCES users(id) ON DELETE SET NULL,
            last_login TIMESTAMPTZ
        )
        ",
    ),
    (
        "roles",
        r"
        CREATE TABLE IF NOT EXISTS roles (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )
        ",
    ),
    (
        "permissions",
        r"
        CREATE TABLE IF NOT EXISTS permissions (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )
        ",
    ),
    (
        "user_roles",
        r"
        CREATE TABLE IF NOT EXISTS user_roles (
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, role_id)
        )
        ",
    ),
    (
        "role_permissions",
        r"
        CREATE TABLE IF NOT EXISTS role_permissions (
            role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            permission_id BIGINT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
            PRIMARY KEY (role_id, permission_id)
        )
        ",
    ),
    (
        "firms",
        r"
        CREATE TABLE IF NOT EXISTS firms (
            id BIGSERIAL PRIMARY KEY,
            salutation TEXT NOT NULL DEFAULT '',
            name_1 TEXT NOT NULL,
            name_2 TEXT NOT NULL DEFAULT '',
            name_3 TEXT NOT NULL DEFAULT '',
            street TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            postal_code TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            website TEXT NOT NULL DEFAULT '',
            is_customer BOOLEAN NOT NULL DEFAULT FALSE,
            is_supplier BOOLEAN NOT NULL DEFAULT FALSE,
            is_blocked BOOLEAN NOT NULL DEFAULT FALSE,
            remark TEXT NOT NULL DEFAULT '',
            firm_type TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
    ),
    (
        "contacts",
        r"
        CREATE TABLE IF NOT EXISTS contacts (
            id BIGSERIAL PRIMARY KEY,
            salutation TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL DEFAULT '',
            position TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            mobile TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL UNIQUE,
            department TEXT NOT NULL DEFAULT '',
            birthdate DATE,
            remark TEXT NOT NULL DEFAULT '',
            account_type TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
    ),
    (
        "firm_contacts",
        r"
        CREATE TABLE IF NOT EXISTS firm_contacts (
            id BIGSERIAL PRIMARY KEY,
            firm_id BIGINT NOT NULL REFERENCES firms(id) ON DELETE CASCADE,
            contact_id BIGINT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
            relationship TEXT NOT NULL DEFAULT '',
            is_primary BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (firm_id, contact_id)
        )
        ",
    ),
    (
        "auth_tokens",
        r"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            expires_at TIMESTAMPTZ NOT NULL
        )
        ",
    ),
];

/// Device database: the inventory catalog.
pub const DEVICE_SCHEMA: &[(&str, &str)] = &[
    (
        "devices",
        r"
        CREATE TABLE IF NOT EXISTS devices (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            hostname TEXT NOT NULL DEFAULT '',
            ip TEXT NOT NULL DEFAULT '',
            domain TEXT NOT NULL DEFAULT '',
            manufacturer TEXT NOT NULL DEFAULT '',
            model_type TEXT NOT NULL DEFAULT '',
            serial_numbers TEXT NOT NULL DEFAULT '',
            mac TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            equipment TEXT NOT NULL DEFAULT '',
            function TEXT NOT NULL DEFAULT '',
            settings TEXT NOT NULL DEFAULT '',
            device_link TEXT NOT NULL DEFAULT '',
            commissioning_date TEXT NOT NULL DEFAULT '',
            origin TEXT NOT NULL DEFAULT '',
            warranty_service_number TEXT NOT NULL DEFAULT '',
            warranty_until TEXT NOT NULL DEFAULT '',
            licenses TEXT NOT NULL DEFAULT '',
            location_text TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            internal_contact TEXT NOT NULL DEFAULT '',
            external_contact TEXT NOT NULL DEFAULT '',
            map_link TEXT NOT NULL DEFAULT '',
            software_interfaces TEXT NOT NULL DEFAULT '',
            backup_method TEXT NOT NULL DEFAULT '',
            backup_file_link TEXT NOT NULL DEFAULT '',
            software_asset TEXT NOT NULL DEFAULT '',
            password_link TEXT NOT NULL DEFAULT '',
            internal_access TEXT NOT NULL DEFAULT '',
            external_access TEXT NOT NULL DEFAULT '',
            misc_links TEXT NOT NULL DEFAULT '',
            externally_accessible BOOLEAN NOT NULL DEFAULT FALSE,
            restart_how TEXT NOT NULL DEFAULT '',
            restart_notes TEXT NOT NULL DEFAULT '',
            restart_coordination TEXT NOT NULL DEFAULT '',
            network_connection TEXT NOT NULL DEFAULT '',
            patch_location TEXT NOT NULL DEFAULT '',
            documents TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
    ),
    (
        "device_links",
        r"
        CREATE TABLE IF NOT EXISTS device_links (
            id BIGSERIAL PRIMARY KEY,
            from_device_id BIGINT NOT NULL REFERENCES devices(id) ON DELETE CASCADE,
            to_device_id BIGINT NOT NULL REFERENCES devices(id) ON DELETE CASCADE
        )
        ",
    ),
];

/// Run a list of DDL statements in order.
///
/// # Errors
///
/// Returns the first failing statement's error.
pub async fn apply(pool: &PgPool, statements: &[(&str, &str)]) -> Result<(), RepositoryError> {
    for (table, ddl) in statements {
        sqlx::query(ddl).execute(pool).await?;
        tracing::debug!(table, "Table ready");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_statement_is_idempotent() {
        for (table, ddl) in MAIN_SCHEMA.iter().chain(DEVICE_SCHEMA) {
            assert!(
                ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "{table} must be created with IF NOT EXISTS"
            );
        }
    }

    #[test]
    fn test_parents_are_created_before_junctions() {
        let order: Vec<&str> = MAIN_SCHEMA.iter().map(|(t, _)| *t).collect();
        let pos = |name: &str| order.iter().position(|t| *t == name);
        assert!(pos("users") < pos("user_roles"));
        assert!(pos("roles") < pos("role_permissions"));
        assert!(pos("permissions") < pos("role_permissions"));
        assert!(pos("contacts") < pos("firm_contacts"));
    }
}
