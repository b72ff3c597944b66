//! Device inventory for the `PostgreSQL` backend.
//!
//! All queries here run against the device pool, which may be a separate
//! database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use addressbook_core::{DeviceId, DeviceLinkId};

use super::{PgStore, expect_one};
use crate::db::{DeviceStore, RepositoryError};
use crate::models::{Device, DeviceFields, DeviceLink, DeviceLinkFields};

/// Editable device columns, in bind order.
const DEVICE_FIELDS: [&str; 38] = [
    "name",
    "hostname",
    "ip",
    "domain",
    "manufacturer",
    "model_type",
    "serial_numbers",
    "mac",
    "description",
    "equipment",
    "function",
    "settings",
    "device_link",
    "commissioning_date",
    "origin",
    "warranty_service_number",
    "warranty_until",
    "licenses",
    "location_text",
    "department",
    "internal_contact",
    "external_contact",
    "map_link",
    "software_interfaces",
    "backup_method",
    "backup_file_link",
    "software_asset",
    "password_link",
    "internal_access",
    "external_access",
    "misc_links",
    "externally_accessible",
    "restart_how",
    "restart_notes",
    "restart_coordination",
    "network_connection",
    "patch_location",
    "documents",
];

#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    id: i64,
    name: String,
    hostname: String,
    ip: String,
    domain: String,
    manufacturer: String,
    model_type: String,
    serial_numbers: String,
    mac: String,
    description: String,
    equipment: String,
    function: String,
    settings: String,
    device_link: String,
    commissioning_date: String,
    origin: String,
    warranty_service_number: String,
    warranty_until: String,
    licenses: String,
    location_text: String,
    department: String,
    internal_contact: String,
    external_contact: String,
    map_link: String,
    software_interfaces: String,
    backup_method: String,
    backup_file_link: String,
    software_asset: String,
    password_link: String,
    internal_access: String,
    external_access: String,
    misc_links: String,
    externally_accessible: bool,
    restart_how: String,
    restart_notes: String,
    restart_coordination: String,
    network_connection: String,
    patch_location: String,
    documents: String,
    created_at: DateTime<Utc>,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            id: DeviceId::new(row.id),
            fields: DeviceFields {
                name: row.name,
                hostname: row.hostname,
                ip: row.ip,
                domain: row.domain,
                manufacturer: row.manufacturer,
                model_type: row.model_type,
                serial_numbers: row.serial_numbers,
                mac: row.mac,
                description: row.description,
                equipment: row.equipment,
                function: row.function,
                settings: row.settings,
                device_link: row.device_link,
                commissioning_date: row.commissioning_date,
                origin: row.origin,
                warranty_service_number: row.warranty_service_number,
                warranty_until: row.warranty_until,
                licenses: row.licenses,
                location_text: row.location_text,
                department: row.department,
                internal_contact: row.internal_contact,
                external_contact: row.external_contact,
                map_link: row.map_link,
                software_interfaces: row.software_interfaces,
                backup_method: row.backup_method,
                backup_file_link: row.backup_file_link,
                software_asset: row.software_asset,
                password_link: row.password_link,
                internal_access: row.internal_access,
                external_access: row.external_access,
                misc_links: row.misc_links,
                externally_accessible: row.externally_accessible,
                restart_how: row.restart_how,
                restart_notes: row.restart_notes,
                restart_coordination: row.restart_coordination,
                network_connection: row.network_connection,
                patch_location: row.patch_location,
                documents: row.documents,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeviceLinkRow {
    id: i64,
    from_device_id: i64,
    to_device_id: i64,
}

impl From<DeviceLinkRow> for DeviceLink {
    fn from(row: DeviceLinkRow) -> Self {
        Self {
            id: DeviceLinkId::new(row.id),
            fields: DeviceLinkFields {
                from_device_id: DeviceId::new(row.from_device_id),
                to_device_id: DeviceId::new(row.to_device_id),
            },
        }
    }
}

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

fn bind_device<'q>(query: PgQuery<'q>, d: &'q DeviceFields) -> PgQuery<'q> {
    query
        .bind(&d.name)
        .bind(&d.hostname)
        .bind(&d.ip)
        .bind(&d.domain)
        .bind(&d.manufacturer)
        .bind(&d.model_type)
        .bind(&d.serial_numbers)
        .bind(&d.mac)
        .bind(&d.description)
        .bind(&d.equipment)
        .bind(&d.function)
        .bind(&d.settings)
        .bind(&d.device_link)
        .bind(&d.commissioning_date)
        .bind(&d.origin)
        .bind(&d.warranty_service_number)
        .bind(&d.warranty_until)
        .bind(&d.licenses)
        .bind(&d.location_text)
        .bind(&d.department)
        .bind(&d.internal_contact)
        .bind(&d.external_contact)
        .bind(&d.map_link)
        .bind(&d.software_interfaces)
        .bind(&d.backup_method)
        .bind(&d.backup_file_link)
        .bind(&d.software_asset)
        .bind(&d.password_link)
        .bind(&d.internal_access)
        .bind(&d.external_access)
        .bind(&d.misc_links)
        .bind(d.externally_accessible)
        .bind(&d.restart_how)
        .bind(&d.restart_notes)
        .bind(&d.restart_coordination)
        .bind(&d.network_connection)
        .bind(&d.patch_location)
        .bind(&d.documents)
}

fn select_devices(tail: &str) -> String {
    format!(
        "SELECT id, {}, created_at FROM devices {tail}",
        DEVICE_FIELDS.join(", ")
    )
}

fn insert_device_sql() -> String {
    let placeholders: Vec<String> = (1..=DEVICE_FIELDS.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO devices ({}) VALUES ({}) RETURNING id",
        DEVICE_FIELDS.join(", "),
        placeholders.join(", ")
    )
}

fn update_device_sql() -> String {
    let assignments: Vec<String> = DEVICE_FIELDS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect();
    format!(
        "UPDATE devices SET {} WHERE id = ${}",
        assignments.join(", "),
        DEVICE_FIELDS.len() + 1
    )
}

#[async_trait]
impl DeviceStore for PgStore {
    async fn insert_device(&self, device: &DeviceFields) -> Result<DeviceId, RepositoryError> {
        let sql = insert_device_sql();
        let row = bind_device(sqlx::query(&sql), device)
            .fetch_one(&self.device_pool)
            .await?;

        Ok(DeviceId::new(row.try_get::<i64, _>("id")?))
    }

    async fn get_device(&self, id: DeviceId) -> Result<Device, RepositoryError> {
        let sql = select_devices("WHERE id = $1");
        let row = sqlx::query_as::<_, DeviceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.device_pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn update_device(
        &self,
        id: DeviceId,
        device: &DeviceFields,
    ) -> Result<(), RepositoryError> {
        let sql = update_device_sql();
        let result = bind_device(sqlx::query(&sql), device)
            .bind(id)
            .execute(&self.device_pool)
            .await?;

        expect_one(&result)
    }

    async fn delete_device(&self, id: DeviceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.device_pool)
            .await?;

        expect_one(&result)
    }

    async fn list_devices(&self) -> Result<Vec<Device>, RepositoryError> {
        let sql = select_devices("ORDER BY id DESC");
        let rows = sqlx::query_as::<_, DeviceRow>(&sql)
            .fetch_all(&self.device_pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_device_link(
        &self,
        link: &DeviceLinkFields,
    ) -> Result<DeviceLinkId, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO device_links (from_device_id, to_device_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(link.from_device_id)
        .bind(link.to_device_id)
        .fetch_one(&self.device_pool)
        .await?;

        Ok(DeviceLinkId::new(id))
    }

    async fn get_device_link(&self, id: DeviceLinkId) -> Result<DeviceLink, RepositoryError> {
        let row = sqlx::query_as::<_, DeviceLinkRow>(
            "SELECT id, from_device_id, to_device_id FROM device_links WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.device_pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn update_device_link(
        &self,
        id: DeviceLinkId,
        link: &DeviceLinkFields,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE device_links SET from_device_id = $1, to_device_id = $2 WHERE id = $3",
        )
        .bind(link.from_device_id)
        .bind(link.to_device_id)
        .bind(id)
        .execute(&self.device_pool)
        .await?;

        expect_one(&result)
    }

    async fn delete_device_link(&self, id: DeviceLinkId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM device_links WHERE id = $1")
            .bind(id)
            .execute(&self.device_pool)
            .await?;

        expect_one(&result)
    }

    async fn list_device_links(&self) -> Result<Vec<DeviceLink>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeviceLinkRow>(
            "SELECT id, from_device_id, to_device_id FROM device_links ORDER BY id DESC",
        )
        .fetch_all(&self.device_pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn links_from_device(
        &self,
        device: DeviceId,
    ) -> Result<Vec<DeviceLink>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeviceLinkRow>(
            r"
            SELECT id, from_device_id, to_device_id
            FROM device_links
            WHERE from_device_id = $1
            ORDER BY id DESC
            ",
        )
        .bind(device)
        .fetch_all(&self.device_pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
