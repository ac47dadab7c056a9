//! Push endpoint registration model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Document;

/// A device/browser endpoint registered for push notifications.
///
/// The token doubles as the record id, so re-registering the same endpoint
/// is a natural upsert: every permission grant or app load refreshes
/// `last_updated` in place. The notifier deletes registrations whose token
/// is reported permanently invalid on delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRegistration {
    /// Opaque endpoint identifier issued by the push service
    pub token: String,
    pub last_updated: DateTime<Utc>,
    /// "android", "web", ...
    pub platform: String,
    pub user_agent: String,
}

impl PushRegistration {
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        platform: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            last_updated: Utc::now(),
            platform: platform.into(),
            user_agent: user_agent.into(),
        }
    }
}

impl Document for PushRegistration {
    const COLLECTION: &'static str = "push_tokens";

    fn id(&self) -> &str {
        &self.token
    }

    fn set_id(&mut self, id: String) {
        self.token = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_the_id() {
        let registration = PushRegistration::new("tok-abc", "web", "Mozilla/5.0");
        assert_eq!(Document::id(&registration), "tok-abc");
    }
}
