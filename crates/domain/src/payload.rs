//! Canonical payloads for records that are mirrored to the CRM.

use common::RecordKind;
use serde::{Deserialize, Serialize};

use crate::contact::NewContact;
use crate::organization::NewOrganization;

/// A validated creation payload for one of the dual-written record kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordPayload {
    Organization(NewOrganization),
    Contact(NewContact),
}

impl RecordPayload {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordPayload::Organization(_) => RecordKind::Organization,
            RecordPayload::Contact(_) => RecordKind::Contact,
        }
    }

    /// Human-readable label used in logs.
    pub fn label(&self) -> &str {
        match self {
            RecordPayload::Organization(org) => &org.name,
            RecordPayload::Contact(contact) => contact.email.as_str(),
        }
    }
}

impl From<NewOrganization> for RecordPayload {
    fn from(org: NewOrganization) -> Self {
        RecordPayload::Organization(org)
    }
}

impl From<NewContact> for RecordPayload {
    fn from(contact: NewContact) -> Self {
        RecordPayload::Contact(contact)
    }
}
