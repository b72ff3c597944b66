//! Firm and contact domain types.
//!
//! Serde renames keep the German field names the frontend uses
//! (`anrede`, `name_1`, `plz`, `vorname`, ...). Every field defaults so a
//! partial body deserializes and validation can report what is missing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use addressbook_core::{ContactId, FirmId};

/// Editable columns of a firm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmFields {
    #[serde(rename = "anrede")]
    pub salutation: String,
    pub name_1: String,
    pub name_2: String,
    pub name_3: String,
    #[serde(rename = "straße")]
    pub street: String,
    #[serde(rename = "land")]
    pub country: String,
    #[serde(rename = "plz")]
    pub postal_code: String,
    #[serde(rename = "ort")]
    pub city: String,
    #[serde(rename = "telefon")]
    pub phone: String,
    pub email: String,
    pub website: String,
    #[serde(rename = "kunde")]
    pub is_customer: bool,
    #[serde(rename = "lieferant")]
    pub is_supplier: bool,
    #[serde(rename = "gesperrt")]
    pub is_blocked: bool,
    #[serde(rename = "bemerkung")]
    pub remark: String,
    #[serde(rename = "firma_typ")]
    pub firm_type: String,
}

impl FirmFields {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("anrede", &self.salutation),
            ("name_1", &self.name_1),
            ("plz", &self.postal_code),
            ("ort", &self.city),
            ("telefon", &self.phone),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// A stored firm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Firm {
    pub id: FirmId,
    #[serde(flatten)]
    pub fields: FirmFields,
    pub created_at: DateTime<Utc>,
}

/// Editable columns of a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactFields {
    #[serde(rename = "anrede")]
    pub salutation: String,
    #[serde(rename = "vorname")]
    pub first_name: String,
    #[serde(rename = "nachname")]
    pub last_name: String,
    pub position: String,
    #[serde(rename = "telefon")]
    pub phone: String,
    #[serde(rename = "mobil")]
    pub mobile: String,
    pub email: String,
    #[serde(rename = "abteilung")]
    pub department: String,
    /// `YYYY-MM-DD` on the wire; blank means unknown.
    #[serde(rename = "geburtstag", with = "blank_date")]
    pub birthdate: Option<NaiveDate>,
    #[serde(rename = "bemerkung")]
    pub remark: String,
    #[serde(rename = "kontotyp")]
    pub account_type: String,
}

impl ContactFields {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        [("vorname", &self.first_name), ("email", &self.email)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

/// A stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(flatten)]
    pub fields: ContactFields,
    pub created_at: DateTime<Utc>,
}

/// Serde adapter mapping `""`/`null` to `None` and `YYYY-MM-DD` to a date.
mod blank_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%d";

    #[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)] // signature fixed by serde
    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.collect_str(&date.format(FORMAT)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s, FORMAT)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("geburtstag must be YYYY-MM-DD: {e}"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_firm_fields_use_frontend_names() {
        let fields: FirmFields = serde_json::from_value(json!({
            "anrede": "Firma",
            "name_1": "Muster GmbH",
            "straße": "Hauptstraße 1",
            "plz": "10115",
            "ort": "Berlin",
            "telefon": "030 123",
            "email": "info@muster.de",
            "kunde": true
        }))
        .unwrap();

        assert_eq!(fields.street, "Hauptstraße 1");
        assert!(fields.is_customer);
        assert!(!fields.is_supplier);
        assert!(fields.missing_required().is_empty());
    }

    #[test]
    fn test_firm_missing_required_lists_blank_fields() {
        let fields = FirmFields {
            name_1: "Muster GmbH".to_owned(),
            email: "  ".to_owned(),
            ..FirmFields::default()
        };
        assert_eq!(
            fields.missing_required(),
            vec!["anrede", "plz", "ort", "telefon", "email"]
        );
    }

    #[test]
    fn test_contact_birthdate_blank_and_set() {
        let blank: ContactFields =
            serde_json::from_value(json!({"vorname": "Eva", "geburtstag": ""})).unwrap();
        assert_eq!(blank.birthdate, None);

        let set: ContactFields =
            serde_json::from_value(json!({"vorname": "Eva", "geburtstag": "1990-04-01"}))
                .unwrap();
        assert_eq!(set.birthdate, NaiveDate::from_ymd_opt(1990, 4, 1));
        assert_eq!(
            serde_json::to_value(&set).unwrap()["geburtstag"],
            json!("1990-04-01")
        );
    }

    #[test]
    fn test_contact_birthdate_rejects_other_formats() {
        let result: Result<ContactFields, _> =
            serde_json::from_value(json!({"geburtstag": "01.04.1990"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_contact_missing_required() {
        let fields = ContactFields::default();
        assert_eq!(fields.missing_required(), vec!["vorname", "email"]);
    }
}
