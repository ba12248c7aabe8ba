//! Dual write of organizations and contacts to the local store and the CRM.
//!
//! A record is written to the local store first and mirrored to the CRM
//! afterwards:
//! 1. Insert the record locally (single transaction)
//! 2. Upsert it in the CRM
//! 3. Store the CRM's identifier on the local record
//!
//! If the CRM rejects the record, the local insert is compensated by deleting
//! the row again. This is best-effort compensation, not a two-phase commit:
//! when the compensation itself fails the result says so explicitly.

pub mod coordinator;
pub mod crm;
pub mod result;

pub use coordinator::DualWriteCoordinator;
pub use crm::{CrmClient, CrmError, ErrorClass, HttpCrmClient, HttpCrmConfig, InMemoryCrmClient};
pub use result::{LocalEffect, SyncFailure, SyncResult, SyncStatus};
