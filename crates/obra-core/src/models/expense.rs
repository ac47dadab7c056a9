//! Expense model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{fresh_id, Document};

/// A business expense, optionally tied to a client job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique identifier
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    /// Free-form category label ("materials", "fuel", ...)
    pub category: String,
    /// Client this expense belongs to, when attributable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl Expense {
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        date: NaiveDate,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: fresh_id(),
            description: description.into(),
            amount,
            date,
            category: category.into(),
            client_id: None,
        }
    }

    /// Attribute this expense to a client
    #[must_use]
    pub fn for_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

impl Document for Expense {
    const COLLECTION: &'static str = "expenses";

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
    fn test_new_expense() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let expense = Expense::new("Cement", 120.5, date, "materials");
        assert_eq!(expense.category, "materials");
        assert!(expense.client_id.is_none());
    }

    #[test]
    fn test_for_client() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let expense = Expense::new("Paint", 80.0, date, "materials").for_client("c-1");
        assert_eq!(expense.client_id.as_deref(), Some("c-1"));
    }
}
