//! Supplier invoice model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{fresh_id, Document};

/// A scanned supplier invoice.
///
/// The scan itself is stored externally; this record keeps the metadata
/// needed for filtering and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierInvoice {
    /// Unique identifier
    pub id: String,
    /// Supplier name as entered
    pub provider: String,
    pub date: NaiveDate,
    /// URL of the scanned document image
    pub image_url: String,
}

impl SupplierInvoice {
    #[must_use]
    pub fn new(provider: impl Into<String>, date: NaiveDate, image_url: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            provider: provider.into(),
            date,
            image_url: image_url.into(),
        }
    }
}

impl Document for SupplierInvoice {
    const COLLECTION: &'static str = "supplier_invoices";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 12).unwrap();
        let invoice = SupplierInvoice::new("Almacenes Ruiz", date, "https://example.com/f.jpg");
        let json = serde_json::to_string(&invoice).unwrap();
        let back: SupplierInvoice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, invoice);
    }
}
