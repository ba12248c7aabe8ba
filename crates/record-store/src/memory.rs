use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use domain::{Charge, ChargeId, Contact, Organization, RecordPayload};
use tokio::sync::RwLock;

use crate::constraints::{
    CHARGE_ORGANIZATION_FK, CONTACT_EMAIL_UNIQUE, CONTACT_ORGANIZATION_FK,
    ORGANIZATION_NAME_UNIQUE,
};
use crate::{ChargeStore, RecordId, RecordKind, RecordStore, RemoteId, Result, StoreError};

#[derive(Debug)]
struct Tables {
    organizations: BTreeMap<RecordId, Organization>,
    contacts: BTreeMap<RecordId, Contact>,
    charges: HashMap<ChargeId, Charge>,
    next_organization_id: i64,
    next_contact_id: i64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            organizations: BTreeMap::new(),
            contacts: BTreeMap::new(),
            charges: HashMap::new(),
            next_organization_id: 1,
            next_contact_id: 1,
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_create: AtomicBool,
    fail_on_delete: AtomicBool,
    fail_on_set_remote_id: AtomicBool,
}

/// In-memory record store implementation for testing.
///
/// Enforces the same constraints as the PostgreSQL schema and can be told to
/// fail individual operations, which makes it the substitute store for
/// exercising every branch of the dual write.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ID the next created record of `kind` will receive.
    pub async fn set_next_id(&self, kind: RecordKind, next: i64) {
        let mut tables = self.tables.write().await;
        match kind {
            RecordKind::Organization => tables.next_organization_id = next,
            RecordKind::Contact => tables.next_contact_id = next,
        }
    }

    /// Makes `create` fail with `StoreError::Unavailable`.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.faults.fail_on_create.store(fail, Ordering::SeqCst);
    }

    /// Makes `delete` fail with `StoreError::Unavailable`.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.faults.fail_on_delete.store(fail, Ordering::SeqCst);
    }

    /// Makes `set_remote_id` fail with `StoreError::Unavailable`.
    pub fn set_fail_on_set_remote_id(&self, fail: bool) {
        self.faults.fail_on_set_remote_id.store(fail, Ordering::SeqCst);
    }

    pub async fn organization_count(&self) -> usize {
        self.tables.read().await.organizations.len()
    }

    pub async fn contact_count(&self) -> usize {
        self.tables.read().await.contacts.len()
    }

    /// Clears all records and resets the ID sequences.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }

    fn check_fault(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "simulated failure during {operation}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, payload: &RecordPayload) -> Result<RecordId> {
        Self::check_fault(&self.faults.fail_on_create, "create")?;

        let mut tables = self.tables.write().await;
        let now = Utc::now();

        match payload {
            RecordPayload::Organization(new) => {
                if tables.organizations.values().any(|o| o.name == new.name) {
                    return Err(StoreError::constraint(
                        ORGANIZATION_NAME_UNIQUE,
                        format!("organization named {:?} already exists", new.name),
                    ));
                }

                let id = RecordId::new(tables.next_organization_id);
                tables.next_organization_id += 1;
                tables
                    .organizations
                    .insert(id, Organization::from_new(id, new.clone(), now));
                Ok(id)
            }
            RecordPayload::Contact(new) => {
                if tables.contacts.values().any(|c| c.email == new.email) {
                    return Err(StoreError::constraint(
                        CONTACT_EMAIL_UNIQUE,
                        format!("contact with email {} already exists", new.email),
                    ));
                }
                if let Some(org_id) = new.organization_id
                    && !tables.organizations.contains_key(&org_id)
                {
                    return Err(StoreError::constraint(
                        CONTACT_ORGANIZATION_FK,
                        format!("organization {org_id} does not exist"),
                    ));
                }

                let id = RecordId::new(tables.next_contact_id);
                tables.next_contact_id += 1;
                tables
                    .contacts
                    .insert(id, Contact::from_new(id, new.clone(), now));
                Ok(id)
            }
        }
    }

    async fn delete(&self, kind: RecordKind, id: RecordId) -> Result<()> {
        Self::check_fault(&self.faults.fail_on_delete, "delete")?;

        let mut tables = self.tables.write().await;
        match kind {
            RecordKind::Organization => {
                if !tables.organizations.contains_key(&id) {
                    return Err(StoreError::not_found(kind.as_str(), id));
                }
                if tables.charges.values().any(|c| c.organization_id == id) {
                    return Err(StoreError::constraint(
                        CHARGE_ORGANIZATION_FK,
                        format!("organization {id} still has charges"),
                    ));
                }
                tables.organizations.remove(&id);
                // ON DELETE SET NULL
                for contact in tables.contacts.values_mut() {
                    if contact.organization_id == Some(id) {
                        contact.organization_id = None;
                    }
                }
                Ok(())
            }
            RecordKind::Contact => tables
                .contacts
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found(kind.as_str(), id)),
        }
    }

    async fn set_remote_id(
        &self,
        kind: RecordKind,
        id: RecordId,
        remote_id: &RemoteId,
    ) -> Result<()> {
        Self::check_fault(&self.faults.fail_on_set_remote_id, "set_remote_id")?;

        let mut tables = self.tables.write().await;
        let now = Utc::now();
        match kind {
            RecordKind::Organization => {
                let org = tables
                    .organizations
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found(kind.as_str(), id))?;
                org.remote_id = Some(remote_id.clone());
                org.updated_at = now;
            }
            RecordKind::Contact => {
                let contact = tables
                    .contacts
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found(kind.as_str(), id))?;
                contact.remote_id = Some(remote_id.clone());
                contact.updated_at = now;
            }
        }
        Ok(())
    }

    async fn get_organization(&self, id: RecordId) -> Result<Option<Organization>> {
        Ok(self.tables.read().await.organizations.get(&id).cloned())
    }

    async fn get_contact(&self, id: RecordId) -> Result<Option<Contact>> {
        Ok(self.tables.read().await.contacts.get(&id).cloned())
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        Ok(self
            .tables
            .read()
            .await
            .organizations
            .values()
            .cloned()
            .collect())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.tables.read().await.contacts.values().cloned().collect())
    }
}

#[async_trait]
impl ChargeStore for InMemoryRecordStore {
    async fn insert_charge(&self, charge: &Charge) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&charge.organization_id) {
            return Err(StoreError::constraint(
                CHARGE_ORGANIZATION_FK,
                format!("organization {} does not exist", charge.organization_id),
            ));
        }
        tables.charges.insert(charge.id, charge.clone());
        Ok(())
    }

    async fn get_charge(&self, id: ChargeId) -> Result<Option<Charge>> {
        Ok(self.tables.read().await.charges.get(&id).cloned())
    }

    async fn update_charge(&self, charge: &Charge) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .charges
            .get_mut(&charge.id)
            .ok_or_else(|| StoreError::not_found("charge", charge.id))?;
        *stored = charge.clone();
        Ok(())
    }

    async fn list_charges(&self, organization_id: RecordId) -> Result<Vec<Charge>> {
        let tables = self.tables.read().await;
        let mut charges: Vec<_> = tables
            .charges
            .values()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect();
        charges.sort_by_key(|c| c.created_at);
        Ok(charges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordStoreExt;
    use domain::{Email, Money, NewContact, NewOrganization};

    fn org(name: &str) -> RecordPayload {
        NewOrganization::new(name).unwrap().into()
    }

    fn contact(email: &str) -> NewContact {
        NewContact::new(Email::parse(email).unwrap(), "Jane").unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = InMemoryRecordStore::new();

        let a = store.create(&org("Acme Corp")).await.unwrap();
        let b = store.create(&org("Globex")).await.unwrap();

        assert_eq!(a, RecordId::new(1));
        assert_eq!(b, RecordId::new(2));
        assert_eq!(store.organization_count().await, 2);
    }

    #[tokio::test]
    async fn test_set_next_id() {
        let store = InMemoryRecordStore::new();
        store.set_next_id(RecordKind::Organization, 42).await;

        let id = store.create(&org("Acme Corp")).await.unwrap();
        assert_eq!(id, RecordId::new(42));
    }

    #[tokio::test]
    async fn test_duplicate_organization_name_is_constraint_violation() {
        let store = InMemoryRecordStore::new();
        store.create(&org("Acme Corp")).await.unwrap();

        let err = store.create(&org("Acme Corp")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConstraintViolation { ref constraint, .. }
                if constraint == ORGANIZATION_NAME_UNIQUE
        ));
        assert_eq!(store.organization_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_contact_email_is_case_insensitive() {
        let store = InMemoryRecordStore::new();
        store
            .create(&contact("jane@acme.io").into())
            .await
            .unwrap();

        let err = store
            .create(&contact("JANE@Acme.io").into())
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_contact_requires_existing_organization() {
        let store = InMemoryRecordStore::new();
        let payload = contact("jane@acme.io").for_organization(RecordId::new(99));

        let err = store.create(&payload.into()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConstraintViolation { ref constraint, .. }
                if constraint == CONTACT_ORGANIZATION_FK
        ));
    }

    #[tokio::test]
    async fn test_set_remote_id_and_delete() {
        let store = InMemoryRecordStore::new();
        let id = store.create(&org("Acme Corp")).await.unwrap();

        store
            .set_remote_id(RecordKind::Organization, id, &RemoteId::new("CRM-1"))
            .await
            .unwrap();
        assert_eq!(
            store.remote_id_of(RecordKind::Organization, id).await.unwrap(),
            Some(RemoteId::new("CRM-1"))
        );

        store.delete(RecordKind::Organization, id).await.unwrap();
        assert!(!store.exists(RecordKind::Organization, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let store = InMemoryRecordStore::new();
        let missing = RecordId::new(7);

        assert!(
            store
                .delete(RecordKind::Contact, missing)
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            store
                .set_remote_id(RecordKind::Organization, missing, &RemoteId::new("x"))
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_deleting_organization_detaches_contacts() {
        let store = InMemoryRecordStore::new();
        let org_id = store.create(&org("Acme Corp")).await.unwrap();
        let contact_id = store
            .create(&contact("jane@acme.io").for_organization(org_id).into())
            .await
            .unwrap();

        store.delete(RecordKind::Organization, org_id).await.unwrap();

        let contact = store.get_contact(contact_id).await.unwrap().unwrap();
        assert_eq!(contact.organization_id, None);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = InMemoryRecordStore::new();

        store.set_fail_on_create(true);
        assert!(matches!(
            store.create(&org("Acme Corp")).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_fail_on_create(false);

        let id = store.create(&org("Acme Corp")).await.unwrap();
        store.set_fail_on_delete(true);
        assert!(store.delete(RecordKind::Organization, id).await.is_err());
        assert!(store.exists(RecordKind::Organization, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_charges_roundtrip_and_block_organization_delete() {
        let store = InMemoryRecordStore::new();
        let org_id = store.create(&org("Acme Corp")).await.unwrap();

        let mut charge = Charge::new(org_id, Money::from_cents(5000), "Deposit").unwrap();
        store.insert_charge(&charge).await.unwrap();

        charge.description = "Security deposit".to_string();
        store.update_charge(&charge).await.unwrap();

        let loaded = store.get_charge(charge.id).await.unwrap().unwrap();
        assert_eq!(loaded.description, "Security deposit");
        assert_eq!(store.list_charges(org_id).await.unwrap().len(), 1);

        let err = store
            .delete(RecordKind::Organization, org_id)
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_charge_requires_existing_organization() {
        let store = InMemoryRecordStore::new();
        let charge = Charge::new(RecordId::new(5), Money::from_cents(100), "Fee").unwrap();

        let err = store.insert_charge(&charge).await.unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(
            store
                .update_charge(&charge)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}
