//! Push gateway client.
//!
//! One multicast call delivers a message to every registered token; the
//! gateway reports a per-token outcome. Outcomes are classified so the
//! caller can prune endpoints the push service says are gone for good and
//! merely log the rest.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Invalid push gateway configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Push gateway HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Push gateway API error: {0}")]
    Api(String),
    #[error("Invalid push gateway payload: {0}")]
    InvalidPayload(String),
}

pub type PushResult<T> = Result<T, PushError>;

/// Notification payload for one event reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub data: PushData,
    pub android: AndroidHints,
}

/// Data payload the client app receives alongside the notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushData {
    pub event_id: String,
    /// Deep link opening the acknowledgment view
    pub url: String,
}

/// Platform delivery hints, passed through to the gateway unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AndroidHints {
    pub priority: &'static str,
    pub sound: &'static str,
    pub notification_priority: &'static str,
    pub visibility: &'static str,
    /// Collapse key so repeated reminders for one event replace each other
    pub tag: String,
}

impl AndroidHints {
    #[must_use]
    pub fn for_event(event_id: &str) -> Self {
        Self {
            priority: "high",
            sound: "default",
            notification_priority: "PRIORITY_MAX",
            visibility: "public",
            tag: event_id.to_string(),
        }
    }
}

/// Result of delivering one message to one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Failed(DeliveryError),
}

/// Per-token delivery failure, non-fatal to the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError {
    /// Gateway error code, e.g. "not-registered"
    pub code: String,
}

impl DeliveryError {
    /// True when the endpoint is gone for good and its registration should
    /// be deleted
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self.code.as_str(), "not-registered" | "invalid-argument")
    }
}

/// Per-token outcomes of one multicast call, in token order
#[derive(Debug, Clone)]
pub struct MulticastReport {
    pub outcomes: Vec<SendOutcome>,
}

impl MulticastReport {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SendOutcome::Delivered))
            .count()
    }
}

/// Seam between the tick logic and the wire
#[allow(async_fn_in_trait)]
pub trait PushGateway {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> PushResult<MulticastReport>;
}

/// HTTP implementation of [`PushGateway`]
#[derive(Clone)]
pub struct HttpPushGateway {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpPushGateway {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> PushResult<Self> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(PushError::InvalidConfiguration(
                "Push endpoint must be an HTTP(S) URL".to_string(),
            ));
        }
        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            client: reqwest::Client::builder().build()?,
        })
    }
}

impl PushGateway for HttpPushGateway {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> PushResult<MulticastReport> {
        let request = MulticastRequest { message, tokens };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Api(parse_api_error(status, &body)));
        }

        let payload = response.json::<MulticastResponse>().await?;
        payload.into_report(tokens.len())
    }
}

#[derive(Serialize)]
struct MulticastRequest<'a> {
    message: &'a PushMessage,
    tokens: &'a [String],
}

#[derive(Debug, Deserialize)]
struct MulticastResponse {
    responses: Vec<TokenResponse>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl MulticastResponse {
    fn into_report(self, expected: usize) -> PushResult<MulticastReport> {
        if self.responses.len() != expected {
            return Err(PushError::InvalidPayload(format!(
                "expected {expected} per-token responses, got {}",
                self.responses.len()
            )));
        }

        let outcomes = self
            .responses
            .into_iter()
            .map(|response| {
                if response.success {
                    SendOutcome::Delivered
                } else {
                    SendOutcome::Failed(DeliveryError {
                        code: response.error.unwrap_or_else(|| "unknown".to_string()),
                    })
                }
            })
            .collect();

        Ok(MulticastReport { outcomes })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_permanent_codes() {
        assert!(DeliveryError { code: "not-registered".into() }.is_permanent());
        assert!(DeliveryError { code: "invalid-argument".into() }.is_permanent());
        assert!(!DeliveryError { code: "unavailable".into() }.is_permanent());
        assert!(!DeliveryError { code: "internal".into() }.is_permanent());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"responses":[{"success":true},{"success":false,"error":"not-registered"}]}"#;
        let payload: MulticastResponse = serde_json::from_str(raw).unwrap();
        let report = payload.into_report(2).unwrap();

        assert_eq!(report.success_count(), 1);
        assert_eq!(
            report.outcomes[1],
            SendOutcome::Failed(DeliveryError { code: "not-registered".into() })
        );
    }

    #[test]
    fn test_response_length_mismatch_is_invalid() {
        let raw = r#"{"responses":[{"success":true}]}"#;
        let payload: MulticastResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            payload.into_report(2),
            Err(PushError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        assert!(matches!(
            HttpPushGateway::new("ftp://push.example", "key"),
            Err(PushError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_parse_api_error_prefers_json_message() {
        let message = parse_api_error(
            StatusCode::FORBIDDEN,
            r#"{"message":"key revoked"}"#,
        );
        assert_eq!(message, "key revoked (403)");

        let fallback = parse_api_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(fallback, "HTTP 502");
    }

    #[test]
    fn test_message_serialization_shape() {
        let message = PushMessage {
            title: "Site visit".to_string(),
            body: "In 15 minutes (09:00). Tap to dismiss.".to_string(),
            image_url: None,
            data: PushData {
                event_id: "e1".to_string(),
                url: "/?eventId=e1".to_string(),
            },
            android: AndroidHints::for_event("e1"),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["data"]["event_id"], "e1");
        assert_eq!(value["android"]["priority"], "high");
        assert!(value.get("image_url").is_none());
    }
}
