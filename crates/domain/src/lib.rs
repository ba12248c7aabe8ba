//! Domain layer for the property-management backend.
//!
//! This crate provides the typed records the rest of the workspace moves around:
//! - Organizations and contacts, plus the payloads used to create them
//! - Charges and their pending → quoted → paid lifecycle
//! - Value objects such as e-mail addresses and money amounts

pub mod charge;
pub mod contact;
pub mod error;
pub mod organization;
pub mod payload;
pub mod value_objects;

pub use charge::{Charge, ChargeError, ChargeId, ChargeState, PaymentLink};
pub use contact::{Contact, NewContact};
pub use error::DomainError;
pub use organization::{NewOrganization, Organization};
pub use payload::RecordPayload;
pub use value_objects::{Email, Money};
