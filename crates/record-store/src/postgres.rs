use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Charge, ChargeId, ChargeState, Contact, Email, Money, Organization, PaymentLink,
    RecordPayload,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{ChargeStore, RecordId, RecordKind, RecordStore, RemoteId, Result, StoreError};

const ORGANIZATION_COLUMNS: &str =
    "id, name, email, phone, address, remote_id, created_at, updated_at";
const CONTACT_COLUMNS: &str =
    "id, email, first_name, last_name, phone, organization_id, remote_id, created_at, updated_at";
const CHARGE_COLUMNS: &str = "id, organization_id, amount_cents, description, state, \
     payment_link_id, payment_link_url, payment_reference, created_at, updated_at";

/// PostgreSQL-backed record store implementation.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn table(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Organization => "organizations",
            RecordKind::Contact => "contacts",
        }
    }

    fn parse_email(raw: String) -> Result<Email> {
        Email::parse(&raw).map_err(|e| StoreError::CorruptRow(e.to_string()))
    }

    fn row_to_organization(row: PgRow) -> Result<Organization> {
        let email: Option<String> = row.try_get("email")?;
        Ok(Organization {
            id: RecordId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            email: email.map(Self::parse_email).transpose()?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            remote_id: row.try_get::<Option<String>, _>("remote_id")?.map(RemoteId::from),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_contact(row: PgRow) -> Result<Contact> {
        Ok(Contact {
            id: RecordId::new(row.try_get("id")?),
            email: Self::parse_email(row.try_get("email")?)?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            organization_id: row
                .try_get::<Option<i64>, _>("organization_id")?
                .map(RecordId::new),
            remote_id: row.try_get::<Option<String>, _>("remote_id")?.map(RemoteId::from),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_charge(row: PgRow) -> Result<Charge> {
        let state: String = row.try_get("state")?;
        let link_id: Option<String> = row.try_get("payment_link_id")?;
        let link_url: Option<String> = row.try_get("payment_link_url")?;

        Ok(Charge {
            id: ChargeId::from_uuid(row.try_get::<Uuid, _>("id")?),
            organization_id: RecordId::new(row.try_get("organization_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            description: row.try_get("description")?,
            state: state.parse::<ChargeState>().map_err(StoreError::CorruptRow)?,
            payment_link: link_id
                .zip(link_url)
                .map(|(id, url)| PaymentLink { id, url }),
            payment_reference: row.try_get("payment_reference")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

/// Maps a failed write onto the store's error taxonomy.
///
/// Named unique and foreign-key violations become `ConstraintViolation`;
/// connection-level failures become `Unavailable`.
fn classify_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        let constraint = db_err.constraint().unwrap_or("unknown").to_string();
        metrics::counter!("record_store_constraint_violations_total", "constraint" => constraint.clone())
            .increment(1);
        return StoreError::ConstraintViolation {
            constraint,
            detail: db_err.message().to_string(),
        };
    }

    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[tracing::instrument(skip(self, payload), fields(kind = %payload.kind()))]
    async fn create(&self, payload: &RecordPayload) -> Result<RecordId> {
        let id: i64 = match payload {
            RecordPayload::Organization(new) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO organizations (name, email, phone, address)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id
                    "#,
                )
                .bind(&new.name)
                .bind(new.email.as_ref().map(Email::as_str))
                .bind(&new.phone)
                .bind(&new.address)
                .fetch_one(&self.pool)
                .await
            }
            RecordPayload::Contact(new) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO contacts (email, first_name, last_name, phone, organization_id)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(new.email.as_str())
                .bind(&new.first_name)
                .bind(&new.last_name)
                .bind(&new.phone)
                .bind(new.organization_id.map(|id| id.as_i64()))
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(classify_write_error)?;

        tracing::debug!(id, "record inserted");
        Ok(RecordId::new(id))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, kind: RecordKind, id: RecordId) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", Self::table(kind));
        let result = sqlx::query(&sql)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(classify_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(kind.as_str(), id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_remote_id(
        &self,
        kind: RecordKind,
        id: RecordId,
        remote_id: &RemoteId,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET remote_id = $2, updated_at = NOW() WHERE id = $1",
            Self::table(kind)
        );
        let result = sqlx::query(&sql)
            .bind(id.as_i64())
            .bind(remote_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(classify_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(kind.as_str(), id));
        }
        Ok(())
    }

    async fn get_organization(&self, id: RecordId) -> Result<Option<Organization>> {
        let sql = format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_organization).transpose()
    }

    async fn get_contact(&self, id: RecordId) -> Result<Option<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_contact).transpose()
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let sql = format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations ORDER BY id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_organization).collect()
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_contact).collect()
    }
}

#[async_trait]
impl ChargeStore for PostgresRecordStore {
    #[tracing::instrument(skip(self, charge), fields(charge_id = %charge.id))]
    async fn insert_charge(&self, charge: &Charge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO charges (id, organization_id, amount_cents, description, state,
                                 payment_link_id, payment_link_url, payment_reference,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(charge.id.as_uuid())
        .bind(charge.organization_id.as_i64())
        .bind(charge.amount.cents())
        .bind(&charge.description)
        .bind(charge.state.as_str())
        .bind(charge.payment_link.as_ref().map(|l| l.id.as_str()))
        .bind(charge.payment_link.as_ref().map(|l| l.url.as_str()))
        .bind(&charge.payment_reference)
        .bind(charge.created_at)
        .bind(charge.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        Ok(())
    }

    async fn get_charge(&self, id: ChargeId) -> Result<Option<Charge>> {
        let sql = format!("SELECT {CHARGE_COLUMNS} FROM charges WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_charge).transpose()
    }

    #[tracing::instrument(skip(self, charge), fields(charge_id = %charge.id))]
    async fn update_charge(&self, charge: &Charge) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE charges
            SET amount_cents = $2, description = $3, state = $4, payment_link_id = $5,
                payment_link_url = $6, payment_reference = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(charge.id.as_uuid())
        .bind(charge.amount.cents())
        .bind(&charge.description)
        .bind(charge.state.as_str())
        .bind(charge.payment_link.as_ref().map(|l| l.id.as_str()))
        .bind(charge.payment_link.as_ref().map(|l| l.url.as_str()))
        .bind(&charge.payment_reference)
        .bind(charge.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("charge", charge.id));
        }
        Ok(())
    }

    async fn list_charges(&self, organization_id: RecordId) -> Result<Vec<Charge>> {
        let sql = format!(
            "SELECT {CHARGE_COLUMNS} FROM charges WHERE organization_id = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(organization_id.as_i64())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_charge).collect()
    }
}
