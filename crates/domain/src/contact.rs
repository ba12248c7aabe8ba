//! Contact records.

use chrono::{DateTime, Utc};
use common::{RecordId, RemoteId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Email, normalize_optional, require_non_blank};

/// A validated request to create a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub email: Email,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub organization_id: Option<RecordId>,
}

impl NewContact {
    /// Creates a contact payload, rejecting a blank first name.
    pub fn new(email: Email, first_name: &str) -> Result<Self, DomainError> {
        Ok(Self {
            email,
            first_name: require_non_blank("first_name", first_name)?,
            last_name: None,
            phone: None,
            organization_id: None,
        })
    }

    pub fn with_last_name(mut self, last_name: Option<String>) -> Self {
        self.last_name = normalize_optional(last_name);
        self
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = normalize_optional(phone);
        self
    }

    pub fn for_organization(mut self, organization_id: RecordId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}

/// A contact as persisted in the local record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: RecordId,
    pub email: Email,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub organization_id: Option<RecordId>,
    /// Set once the contact has been mirrored to the CRM.
    pub remote_id: Option<RemoteId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Materializes a freshly inserted contact.
    pub fn from_new(id: RecordId, new: NewContact, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            phone: new.phone,
            organization_id: new.organization_id,
            remote_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }
}
