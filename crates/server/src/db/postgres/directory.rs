//! Firms, contacts and `firm_contacts` for the `PostgreSQL` backend.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use addressbook_core::{ContactId, FirmId};

use super::{PgStore, expect_one};
use crate::db::{DirectoryStore, RepositoryError, classify};
use crate::models::{Contact, ContactFields, Firm, FirmFields};

const FIRM_COLUMNS: &str = "id, salutation, name_1, name_2, name_3, street, country, \
    postal_code, city, phone, email, website, is_customer, is_supplier, is_blocked, remark, \
    firm_type, created_at";

const CONTACT_COLUMNS: &str = "id, salutation, first_name, last_name, position, phone, \
    mobile, email, department, birthdate, remark, account_type, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
#[allow(clippy::struct_excessive_bools)]
struct FirmRow {
    id: i64,
    salutation: String,
    name_1: String,
    name_2: String,
    name_3: String,
    street: String,
    country: String,
    postal_code: String,
    city: String,
    phone: String,
    email: String,
    website: String,
    is_customer: bool,
    is_supplier: bool,
    is_blocked: bool,
    remark: String,
    firm_type: String,
    created_at: DateTime<Utc>,
}

impl From<FirmRow> for Firm {
    fn from(row: FirmRow) -> Self {
        Self {
            id: FirmId::new(row.id),
            fields: FirmFields {
                salutation: row.salutation,
                name_1: row.name_1,
                name_2: row.name_2,
                name_3: row.name_3,
                street: row.street,
                country: row.country,
                postal_code: row.postal_code,
                city: row.city,
                phone: row.phone,
                email: row.email,
                website: row.website,
                is_customer: row.is_customer,
                is_supplier: row.is_supplier,
                is_blocked: row.is_blocked,
                remark: row.remark,
                firm_type: row.firm_type,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i64,
    salutation: String,
    first_name: String,
    last_name: String,
    position: String,
    phone: String,
    mobile: String,
    email: String,
    department: String,
    birthdate: Option<NaiveDate>,
    remark: String,
    account_type: String,
    created_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Self {
            id: ContactId::new(row.id),
            fields: ContactFields {
                salutation: row.salutation,
                first_name: row.first_name,
                last_name: row.last_name,
                position: row.position,
                phone: row.phone,
                mobile: row.mobile,
                email: row.email,
                department: row.department,
                birthdate: row.birthdate,
                remark: row.remark,
                account_type: row.account_type,
            },
            created_at: row.created_at,
        }
    }
}

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind firm columns as `$1..$16` in `FIRM_COLUMNS` order (without id).
fn bind_firm<'q>(query: PgQuery<'q>, firm: &'q FirmFields) -> PgQuery<'q> {
    query
        .bind(&firm.salutation)
        .bind(&firm.name_1)
        .bind(&firm.name_2)
        .bind(&firm.name_3)
        .bind(&firm.street)
        .bind(&firm.country)
        .bind(&firm.postal_code)
        .bind(&firm.city)
        .bind(&firm.phone)
        .bind(&firm.email)
        .bind(&firm.website)
        .bind(firm.is_customer)
        .bind(firm.is_supplier)
        .bind(firm.is_blocked)
        .bind(&firm.remark)
        .bind(&firm.firm_type)
}

/// Bind contact columns as `$1..$11` in `CONTACT_COLUMNS` order (without id).
fn bind_contact<'q>(query: PgQuery<'q>, contact: &'q ContactFields) -> PgQuery<'q> {
    query
        .bind(&contact.salutation)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.position)
        .bind(&contact.phone)
        .bind(&contact.mobile)
        .bind(&contact.email)
        .bind(&contact.department)
        .bind(contact.birthdate)
        .bind(&contact.remark)
        .bind(&contact.account_type)
}

const INSERT_FIRM: &str = r"
    INSERT INTO firms (salutation, name_1, name_2, name_3, street, country, postal_code,
                       city, phone, email, website, is_customer, is_supplier, is_blocked,
                       remark, firm_type)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
    RETURNING id
";

const INSERT_CONTACT: &str = r"
    INSERT INTO contacts (salutation, first_name, last_name, position, phone, mobile, email,
                          department, birthdate, remark, account_type)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    RETURNING id
";

const INSERT_LINK: &str = "INSERT INTO firm_contacts (firm_id, contact_id) VALUES ($1, $2)";

/// Describe a failed step inside a transaction that is about to roll back.
fn rolled_back(step: &str, e: sqlx::Error) -> RepositoryError {
    let cause = match classify(e, "link already exists") {
        RepositoryError::NotFound => "referenced row does not exist".to_owned(),
        other => other.to_string(),
    };
    tracing::warn!(step, cause = %cause, "Rolling back transaction");
    RepositoryError::Transaction(format!("{step}: {cause}"))
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn insert_firm_with_contacts(
        &self,
        firm: &FirmFields,
        contact_ids: &[ContactId],
    ) -> Result<FirmId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = bind_firm(sqlx::query(INSERT_FIRM), firm)
            .fetch_one(&mut *tx)
            .await?;
        let firm_id = FirmId::new(row.try_get::<i64, _>("id")?);

        for contact_id in contact_ids {
            sqlx::query(INSERT_LINK)
                .bind(firm_id)
                .bind(contact_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| rolled_back(&format!("linking contact {contact_id}"), e))?;
        }

        tx.commit()
            .await
            .map_err(|e| rolled_back("commit", e))?;

        Ok(firm_id)
    }

    async fn insert_contact_with_firms(
        &self,
        contact: &ContactFields,
        firm_ids: &[FirmId],
    ) -> Result<ContactId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = bind_contact(sqlx::query(INSERT_CONTACT), contact)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify(e, "contact email already exists"))?;
        let contact_id = ContactId::new(row.try_get::<i64, _>("id")?);

        for firm_id in firm_ids {
            sqlx::query(INSERT_LINK)
                .bind(firm_id)
                .bind(contact_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| rolled_back(&format!("linking firm {firm_id}"), e))?;
        }

        tx.commit()
            .await
            .map_err(|e| rolled_back("commit", e))?;

        Ok(contact_id)
    }

    async fn get_firm(&self, id: FirmId) -> Result<Firm, RepositoryError> {
        let sql = format!("SELECT {FIRM_COLUMNS} FROM firms WHERE id = $1");
        let row = sqlx::query_as::<_, FirmRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn update_firm(&self, id: FirmId, firm: &FirmFields) -> Result<(), RepositoryError> {
        let query = sqlx::query(
            r"
            UPDATE firms
            SET salutation = $1, name_1 = $2, name_2 = $3, name_3 = $4, street = $5,
                country = $6, postal_code = $7, city = $8, phone = $9, email = $10,
                website = $11, is_customer = $12, is_supplier = $13, is_blocked = $14,
                remark = $15, firm_type = $16
            WHERE id = $17
            ",
        );
        let result = bind_firm(query, firm)
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn delete_firm(&self, id: FirmId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM firms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn list_firms(&self) -> Result<Vec<Firm>, RepositoryError> {
        let sql = format!("SELECT {FIRM_COLUMNS} FROM firms ORDER BY id DESC");
        let rows = sqlx::query_as::<_, FirmRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_contact(&self, id: ContactId) -> Result<Contact, RepositoryError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn update_contact(
        &self,
        id: ContactId,
        contact: &ContactFields,
    ) -> Result<(), RepositoryError> {
        let query = sqlx::query(
            r"
            UPDATE contacts
            SET salutation = $1, first_name = $2, last_name = $3, position = $4, phone = $5,
                mobile = $6, email = $7, department = $8, birthdate = $9, remark = $10,
                account_type = $11
            WHERE id = $12
            ",
        );
        let result = bind_contact(query, contact)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "contact email already exists"))?;

        expect_one(&result)
    }

    async fn delete_contact(&self, id: ContactId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, RepositoryError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY id DESC");
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn firms_for_contact(&self, contact: ContactId) -> Result<Vec<Firm>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM firms f JOIN firm_contacts fc ON fc.firm_id = f.id \
             WHERE fc.contact_id = $1 ORDER BY f.id DESC",
            qualified("f", FIRM_COLUMNS)
        );
        let rows = sqlx::query_as::<_, FirmRow>(&sql)
            .bind(contact)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn contacts_for_firm(&self, firm: FirmId) -> Result<Vec<Contact>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM contacts c JOIN firm_contacts fc ON fc.contact_id = c.id \
             WHERE fc.firm_id = $1 ORDER BY c.id DESC",
            qualified("c", CONTACT_COLUMNS)
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(firm)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Prefix every column in a comma-separated list with a table alias.
fn qualified(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_prefixes_each_column() {
        assert_eq!(qualified("f", "id, name_1,  city"), "f.id, f.name_1, f.city");
    }

    #[test]
    fn test_column_lists_match_bind_order() {
        // 16 bound firm fields plus id and created_at
        assert_eq!(FIRM_COLUMNS.split(',').count(), 18);
        // 11 bound contact fields plus id and created_at
        assert_eq!(CONTACT_COLUMNS.split(',').count(), 13);
    }
}
