//! Organization records.

use chrono::{DateTime, Utc};
use common::{RecordId, RemoteId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Email, normalize_optional, require_non_blank};

/// A validated request to create an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewOrganization {
    /// Creates an organization payload, rejecting a blank name.
    pub fn new(name: &str) -> Result<Self, DomainError> {
        Ok(Self {
            name: require_non_blank("name", name)?,
            email: None,
            phone: None,
            address: None,
        })
    }

    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = normalize_optional(phone);
        self
    }

    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address = normalize_optional(address);
        self
    }
}

/// An organization as persisted in the local record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: RecordId,
    pub name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Set once the organization has been mirrored to the CRM.
    pub remote_id: Option<RemoteId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Materializes a freshly inserted organization.
    pub fn from_new(id: RecordId, new: NewOrganization, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            remote_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_organization_trims_fields() {
        let org = NewOrganization::new("  Acme Corp ")
            .unwrap()
            .with_phone(Some(" 555-0100 ".into()))
            .with_address(Some("   ".into()));

        assert_eq!(org.name, "Acme Corp");
        assert_eq!(org.phone.as_deref(), Some("555-0100"));
        assert_eq!(org.address, None);
    }

    #[test]
    fn test_new_organization_rejects_blank_name() {
        let err = NewOrganization::new("   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "name", .. }));
    }

    #[test]
    fn test_from_new_starts_unsynced() {
        let new = NewOrganization::new("Acme Corp").unwrap();
        let org = Organization::from_new(RecordId::new(42), new, Utc::now());

        assert_eq!(org.id, RecordId::new(42));
        assert!(!org.is_synced());
        assert_eq!(org.created_at, org.updated_at);
    }
}
