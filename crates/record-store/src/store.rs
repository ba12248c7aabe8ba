use async_trait::async_trait;
use domain::{Charge, ChargeId, Contact, Organization, RecordPayload};

use crate::{RecordId, RecordKind, RemoteId, Result};

/// Transactional storage for the records that are mirrored to the CRM.
///
/// All implementations must be thread-safe (Send + Sync). Each method is a
/// single atomic operation against the underlying storage.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a new organization or contact and returns the assigned ID.
    ///
    /// Uniqueness and foreign-key rules are enforced here and reported as
    /// `StoreError::ConstraintViolation`.
    async fn create(&self, payload: &RecordPayload) -> Result<RecordId>;

    /// Deletes a record. Fails with `NotFound` if the row does not exist.
    async fn delete(&self, kind: RecordKind, id: RecordId) -> Result<()>;

    /// Records the CRM identifier for a record.
    async fn set_remote_id(&self, kind: RecordKind, id: RecordId, remote_id: &RemoteId)
    -> Result<()>;

    async fn get_organization(&self, id: RecordId) -> Result<Option<Organization>>;

    async fn get_contact(&self, id: RecordId) -> Result<Option<Contact>>;

    /// Lists organizations ordered by ID.
    async fn list_organizations(&self) -> Result<Vec<Organization>>;

    /// Lists contacts ordered by ID.
    async fn list_contacts(&self) -> Result<Vec<Contact>>;
}

/// Extension trait providing convenience methods for record stores.
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Checks whether a record of the given kind exists.
    async fn exists(&self, kind: RecordKind, id: RecordId) -> Result<bool> {
        Ok(match kind {
            RecordKind::Organization => self.get_organization(id).await?.is_some(),
            RecordKind::Contact => self.get_contact(id).await?.is_some(),
        })
    }

    /// Returns the CRM identifier of a record, if it has been synced.
    async fn remote_id_of(&self, kind: RecordKind, id: RecordId) -> Result<Option<RemoteId>> {
        Ok(match kind {
            RecordKind::Organization => self.get_organization(id).await?.and_then(|o| o.remote_id),
            RecordKind::Contact => self.get_contact(id).await?.and_then(|c| c.remote_id),
        })
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}

/// Storage for charges raised against organizations.
#[async_trait]
pub trait ChargeStore: Send + Sync {
    /// Inserts a new charge. The owning organization must exist.
    async fn insert_charge(&self, charge: &Charge) -> Result<()>;

    async fn get_charge(&self, id: ChargeId) -> Result<Option<Charge>>;

    /// Overwrites a stored charge. Fails with `NotFound` if it does not exist.
    async fn update_charge(&self, charge: &Charge) -> Result<()>;

    /// Lists an organization's charges, oldest first.
    async fn list_charges(&self, organization_id: RecordId) -> Result<Vec<Charge>>;
}
