//! Client model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{fresh_id, Document};

/// Work status of a client engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Engagement agreed but work not started
    #[default]
    Pending,
    /// Work underway
    InProgress,
    /// Work delivered and closed
    Completed,
}

/// A client of the business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: ClientStatus,
    /// Avatar image URL or initials
    pub avatar: String,
    /// Total billed to this client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Client {
    /// Create a new pending client
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let avatar = initials(&name);
        Self {
            id: fresh_id(),
            name,
            email: email.into(),
            phone: phone.into(),
            status: ClientStatus::Pending,
            avatar,
            billing: None,
            join_date: None,
            address: None,
            city: None,
            notes: None,
        }
    }
}

impl Document for Client {
    const COLLECTION: &'static str = "clients";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Derive an avatar placeholder from a name ("Ana Torres" -> "AT").
fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_defaults() {
        let client = Client::new("Ana Torres", "ana@example.com", "600111222");
        assert_eq!(client.status, ClientStatus::Pending);
        assert_eq!(client.avatar, "AT");
        assert!(client.billing.is_none());
    }

    #[test]
    fn test_initials_single_word() {
        assert_eq!(initials("obras"), "O");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ClientStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_optional_fields_absent_in_json() {
        let client = Client::new("Ana", "a@example.com", "600");
        let value = serde_json::to_value(&client).unwrap();
        assert!(value.get("billing").is_none());
        assert!(value.get("notes").is_none());
    }
}
