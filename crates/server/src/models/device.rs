//! Device inventory domain types.
//!
//! Devices are an independent catalog: no RBAC links, no firm/contact
//! relations. JSON keys are `PascalCase` (`Hostname`, `IP`, `MAC`, ...) to
//! match the existing inventory frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use addressbook_core::{DeviceId, DeviceLinkId};

/// Editable columns of a device.
///
/// Date-like values (`CommissioningDate`, `WarrantyUntil`) and the list
/// fields (`SerialNumbers`, `Licenses`, `SoftwareInterfaces`, `MiscLinks`)
/// are stored as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DeviceFields {
    pub name: String,
    pub hostname: String,
    #[serde(rename = "IP")]
    pub ip: String,
    pub domain: String,
    pub manufacturer: String,
    pub model_type: String,
    pub serial_numbers: String,
    #[serde(rename = "MAC")]
    pub mac: String,
    pub description: String,
    pub equipment: String,
    pub function: String,
    pub settings: String,
    pub device_link: String,
    pub commissioning_date: String,
    pub origin: String,
    pub warranty_service_number: String,
    pub warranty_until: String,
    pub licenses: String,
    pub location_text: String,
    pub department: String,
    pub internal_contact: String,
    pub external_contact: String,
    pub map_link: String,
    pub software_interfaces: String,
    pub backup_method: String,
    pub backup_file_link: String,
    pub software_asset: String,
    pub password_link: String,
    pub internal_access: String,
    pub external_access: String,
    pub misc_links: String,
    pub externally_accessible: bool,
    pub restart_how: String,
    pub restart_notes: String,
    pub restart_coordination: String,
    pub network_connection: String,
    pub patch_location: String,
    pub documents: String,
}

/// A stored device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    #[serde(rename = "ID")]
    pub id: DeviceId,
    #[serde(flatten)]
    pub fields: DeviceFields,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
}

/// A directed link between two devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLinkFields {
    pub from_device_id: DeviceId,
    pub to_device_id: DeviceId,
}

/// A stored device link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceLink {
    pub id: DeviceLinkId,
    #[serde(flatten)]
    pub fields: DeviceLinkFields,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_device_fields_keep_inventory_key_names() {
        let fields: DeviceFields = serde_json::from_value(json!({
            "Name": "core-switch",
            "IP": "10.0.0.2",
            "MAC": "00:11:22:33:44:55",
            "ExternallyAccessible": true,
            "WarrantyUntil": "2027-12-31"
        }))
        .unwrap();

        assert_eq!(fields.name, "core-switch");
        assert_eq!(fields.ip, "10.0.0.2");
        assert_eq!(fields.mac, "00:11:22:33:44:55");
        assert!(fields.externally_accessible);
        assert_eq!(fields.warranty_until, "2027-12-31");

        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value["ModelType"], json!(""));
        assert_eq!(value["IP"], json!("10.0.0.2"));
    }

    #[test]
    fn test_device_link_flattens_ids() {
        let link = DeviceLink {
            id: DeviceLinkId::new(3),
            fields: DeviceLinkFields {
                from_device_id: DeviceId::new(1),
                to_device_id: DeviceId::new(2),
            },
        };
        assert_eq!(
            serde_json::to_value(link).unwrap(),
            json!({"id": 3, "from_device_id": 1, "to_device_id": 2})
        );
    }
}
