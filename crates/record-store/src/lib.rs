//! Local record store.
//!
//! Organizations and contacts are written here first and mirrored to the CRM
//! afterwards; charges live only in this store. Every write is a single atomic
//! operation, so a record is either fully present or absent.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{RecordId, RecordKind, RemoteId};
pub use error::{Result, StoreError};
pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;
pub use store::{ChargeStore, RecordStore, RecordStoreExt};

/// Constraint names shared by the in-memory and PostgreSQL stores.
pub mod constraints {
    pub const ORGANIZATION_NAME_UNIQUE: &str = "organizations_name_key";
    pub const CONTACT_EMAIL_UNIQUE: &str = "contacts_email_key";
    pub const CONTACT_ORGANIZATION_FK: &str = "contacts_organization_id_fkey";
    pub const CHARGE_ORGANIZATION_FK: &str = "charges_organization_id_fkey";
}
