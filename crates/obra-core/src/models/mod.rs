//! Data models for Obra

mod client;
mod distribution;
mod event;
mod expense;
mod invoice;
mod photo;
mod registration;

pub use client::{Client, ClientStatus};
pub use distribution::{DistributionShare, PayoutStatus, ProfitDistribution};
pub use event::{CalendarEvent, EventKind};
pub use expense::Expense;
pub use invoice::SupplierInvoice;
pub use photo::{Photo, PhotoCategory};
pub use registration::PushRegistration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// A record that lives in a named remote collection.
///
/// Identifiers are unique within a collection. Callers may assign their own
/// id before writing; records created through [`fresh_id`] get a UUID v7
/// (time-sortable).
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the remote collection this record type is stored in.
    const COLLECTION: &'static str;

    /// Unique identifier within the collection.
    fn id(&self) -> &str;

    /// Replace the identifier, e.g. with a store-assigned one.
    fn set_id(&mut self, id: String);
}

/// Generate a fresh record identifier (UUID v7, time-sortable).
#[must_use]
pub fn fresh_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_unique() {
        assert_ne!(fresh_id(), fresh_id());
    }

    #[test]
    fn test_fresh_id_parses_as_uuid() {
        let id = fresh_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
