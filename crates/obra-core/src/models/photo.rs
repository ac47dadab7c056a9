//! Photo documentation model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{fresh_id, Document};

/// Stage a job-site photo documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhotoCategory {
    /// State of the work as found / in progress
    #[default]
    Progress,
    /// Finished result
    Final,
}

/// A photo documenting work for a client.
///
/// Only metadata lives here; the image itself is stored externally and
/// referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Unique identifier
    pub id: String,
    pub client_id: String,
    pub url: String,
    pub category: PhotoCategory,
    pub date: NaiveDate,
}

impl Photo {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        url: impl Into<String>,
        category: PhotoCategory,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: fresh_id(),
            client_id: client_id.into(),
            url: url.into(),
            category,
            date,
        }
    }
}

impl Document for Photo {
    const COLLECTION: &'static str = "photos";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
