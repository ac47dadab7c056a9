//! One scheduler tick: scan today's events, fan out reminders, prune dead
//! endpoints.

use std::collections::HashSet;

use chrono::{DateTime, Timelike, Utc};
use obra_core::db::{Database, DocumentRepository, LibSqlDocumentRepository};
use obra_core::models::{CalendarEvent, Document, PushRegistration};

use crate::config::NotifierConfig;
use crate::push::{AndroidHints, PushData, PushGateway, PushMessage, SendOutcome};

/// Minutes before an event at which a reminder fires.
///
/// Matching is exact: a tick that runs late misses that lead for good.
/// Range-matching would need a delivered-set to avoid duplicate sends
/// across adjacent ticks, so the coarse fixed-interval scheduler keeps the
/// simpler rule.
pub const NOTIFICATION_LEADS: [i32; 3] = [15, 10, 5];

/// What one tick did
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Reminders multicast to the registered endpoints
    pub notified: usize,
    /// Registrations deleted because their token is permanently invalid
    pub pruned: usize,
}

/// Run one tick against the current wall clock
pub async fn tick<G: PushGateway>(
    db: &Database,
    gateway: &G,
    config: &NotifierConfig,
) -> obra_core::Result<TickOutcome> {
    tick_at(db, gateway, config, Utc::now()).await
}

/// Run one tick as of `now`.
///
/// Event dates and times are compared in the configured civil timezone, not
/// the host's. A failure delivering one event's reminder is logged and never
/// aborts the remaining events.
pub async fn tick_at<G: PushGateway>(
    db: &Database,
    gateway: &G,
    config: &NotifierConfig,
    now: DateTime<Utc>,
) -> obra_core::Result<TickOutcome> {
    db.sync().await?;

    let local = now.with_timezone(&config.timezone);
    let today = local.date_naive();
    let now_minutes = i32::try_from(local.hour() * 60 + local.minute()).unwrap_or(i32::MAX);

    let repo = LibSqlDocumentRepository::new(db.connection());
    let events = decode::<CalendarEvent>(repo.list_on_date(CalendarEvent::COLLECTION, today).await?);

    let due = due_events(&events, now_minutes);
    if due.is_empty() {
        tracing::debug!(%today, now_minutes, "no reminders due");
        return Ok(TickOutcome::default());
    }

    let registrations =
        decode::<PushRegistration>(repo.list(PushRegistration::COLLECTION).await?);
    let tokens: Vec<String> = registrations
        .into_iter()
        .map(|registration| registration.token)
        .collect();
    if tokens.is_empty() {
        tracing::warn!(
            due = due.len(),
            "reminders due but no push endpoints are registered"
        );
        return Ok(TickOutcome::default());
    }

    let mut outcome = TickOutcome::default();
    let mut pruned: HashSet<String> = HashSet::new();

    for (event, lead) in due {
        let message = reminder_message(&event, lead, config.icon_url.clone());

        let report = match gateway.send_multicast(&message, &tokens).await {
            Ok(report) => report,
            Err(error) => {
                tracing::error!(event = %event.id, %error, "reminder delivery failed");
                continue;
            }
        };

        outcome.notified += 1;
        tracing::info!(
            event = %event.id,
            lead,
            delivered = report.success_count(),
            "reminder sent"
        );

        for (token, send) in tokens.iter().zip(&report.outcomes) {
            let SendOutcome::Failed(error) = send else {
                continue;
            };
            if !error.is_permanent() {
                tracing::warn!(%token, code = %error.code, "transient delivery failure");
                continue;
            }
            if !pruned.insert(token.clone()) {
                continue;
            }
            match repo.delete(PushRegistration::COLLECTION, token).await {
                Ok(()) => {
                    outcome.pruned += 1;
                    tracing::warn!(%token, code = %error.code, "registration removed");
                }
                Err(error) => {
                    tracing::warn!(%token, %error, "failed to remove dead registration");
                }
            }
        }
    }

    Ok(outcome)
}

/// Events whose lead time is exactly one of [`NOTIFICATION_LEADS`] and that
/// have not been dismissed
fn due_events(events: &[CalendarEvent], now_minutes: i32) -> Vec<(CalendarEvent, i32)> {
    events
        .iter()
        .filter(|event| !event.dismissed)
        .filter_map(|event| {
            let lead = event.minutes_of_day() - now_minutes;
            NOTIFICATION_LEADS
                .contains(&lead)
                .then(|| (event.clone(), lead))
        })
        .collect()
}

fn reminder_message(event: &CalendarEvent, lead: i32, icon_url: Option<String>) -> PushMessage {
    let time = event.time.format("%H:%M");
    let body = if lead == 5 {
        format!("Final warning! In 5 minutes ({time})")
    } else {
        format!("In {lead} minutes ({time}). Tap to dismiss.")
    };

    PushMessage {
        title: format!("Reminder: {}", event.title),
        body,
        image_url: icon_url,
        data: PushData {
            event_id: event.id.clone(),
            url: format!("/?eventId={}", event.id),
        },
        android: AndroidHints::for_event(&event.id),
    }
}

/// Decode stored bodies, dropping ones that no longer match the model.
///
/// The notifier keeps running on a partially bad collection; a skipped
/// record only costs its own reminder.
fn decode<T: Document>(bodies: Vec<serde_json::Value>) -> Vec<T> {
    bodies
        .into_iter()
        .filter_map(|body| match serde_json::from_value(body) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(collection = T::COLLECTION, %error, "skipping malformed record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{DeliveryError, MulticastReport, PushError, PushResult};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use chrono_tz::Tz;
    use obra_core::models::Document as _;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const MADRID: Tz = chrono_tz::Europe::Madrid;

    /// Gateway double: records calls, scripts per-token failures
    #[derive(Default)]
    struct FakeGateway {
        calls: Mutex<Vec<(PushMessage, Vec<String>)>>,
        failures: HashMap<String, String>,
        unreachable: bool,
    }

    impl FakeGateway {
        fn failing_for(failures: &[(&str, &str)]) -> Self {
            Self {
                failures: failures
                    .iter()
                    .map(|(token, code)| ((*token).to_string(), (*code).to_string()))
                    .collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(PushMessage, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PushGateway for FakeGateway {
        async fn send_multicast(
            &self,
            message: &PushMessage,
            tokens: &[String],
        ) -> PushResult<MulticastReport> {
            self.calls
                .lock()
                .unwrap()
                .push((message.clone(), tokens.to_vec()));

            if self.unreachable {
                return Err(PushError::Api("HTTP 502".to_string()));
            }

            let outcomes = tokens
                .iter()
                .map(|token| match self.failures.get(token) {
                    Some(code) => SendOutcome::Failed(DeliveryError { code: code.clone() }),
                    None => SendOutcome::Delivered,
                })
                .collect();
            Ok(MulticastReport { outcomes })
        }
    }

    fn test_config() -> NotifierConfig {
        NotifierConfig {
            db_path: "unused".into(),
            turso_url: None,
            turso_auth_token: None,
            push_endpoint: "https://push.example/v1/multicast".to_string(),
            push_api_key: "key".to_string(),
            timezone: MADRID,
            tick_interval: Duration::from_secs(60),
            icon_url: None,
        }
    }

    fn event(id: &str, hour: u32, minute: u32) -> CalendarEvent {
        let mut event = CalendarEvent::new(
            "Site visit",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
        );
        event.set_id(id.to_string());
        event
    }

    fn madrid(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
        MADRID
            .with_ymd_and_hms(2024, 3, 1, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn seed(db: &Database, events: &[CalendarEvent], tokens: &[&str]) {
        let repo = LibSqlDocumentRepository::new(db.connection());
        for event in events {
            repo.upsert(
                CalendarEvent::COLLECTION,
                event.id(),
                serde_json::to_value(event).unwrap(),
            )
            .await
            .unwrap();
        }
        for token in tokens {
            let registration = obra_core::models::PushRegistration::new(*token, "web", "test");
            repo.upsert(
                PushRegistration::COLLECTION,
                token,
                serde_json::to_value(&registration).unwrap(),
            )
            .await
            .unwrap();
        }
    }

    #[test]
    fn test_due_events_exact_match_only() {
        let events = vec![event("1", 14, 0)];

        // 13:45 hits the 15-minute lead
        let due = due_events(&events, 13 * 60 + 45);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].1, 15);

        // One minute later there is no catch-up
        assert!(due_events(&events, 13 * 60 + 46).is_empty());

        assert_eq!(due_events(&events, 13 * 60 + 50)[0].1, 10);
        assert_eq!(due_events(&events, 13 * 60 + 55)[0].1, 5);
        assert!(due_events(&events, 14 * 60).is_empty());
    }

    #[test]
    fn test_due_events_skips_dismissed() {
        let mut dismissed = event("1", 14, 0);
        dismissed.dismissed = true;
        assert!(due_events(&[dismissed], 13 * 60 + 45).is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tick_sends_one_multicast_for_due_event() {
        let db = Database::open_in_memory().await.unwrap();
        seed(&db, &[event("1", 9, 0)], &["tok-a"]).await;
        let gateway = FakeGateway::default();

        let outcome = tick_at(&db, &gateway, &test_config(), madrid(8, 45))
            .await
            .unwrap();

        assert_eq!(outcome.notified, 1);
        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.data.event_id, "1");
        assert_eq!(calls[0].0.data.url, "/?eventId=1");
        assert_eq!(calls[0].1, vec!["tok-a".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tick_outside_lead_sends_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        seed(&db, &[event("1", 9, 0)], &["tok-a"]).await;
        let gateway = FakeGateway::default();

        let outcome = tick_at(&db, &gateway, &test_config(), madrid(8, 46))
            .await
            .unwrap();

        assert_eq!(outcome.notified, 0);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tick_prunes_permanently_invalid_tokens_only() {
        let db = Database::open_in_memory().await.unwrap();
        seed(&db, &[event("1", 9, 0)], &["tok-dead", "tok-flaky"]).await;
        let gateway = FakeGateway::failing_for(&[
            ("tok-dead", "not-registered"),
            ("tok-flaky", "unavailable"),
        ]);

        let outcome = tick_at(&db, &gateway, &test_config(), madrid(8, 45))
            .await
            .unwrap();
        assert_eq!(outcome.pruned, 1);

        let repo = LibSqlDocumentRepository::new(db.connection());
        assert!(repo
            .get(PushRegistration::COLLECTION, "tok-dead")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .get(PushRegistration::COLLECTION, "tok-flaky")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_gateway_failure_does_not_abort_other_events() {
        let db = Database::open_in_memory().await.unwrap();
        // Both events hit a lead at 08:45: one at 09:00 (15) and one at 08:55 (10)
        seed(&db, &[event("1", 9, 0), event("2", 8, 55)], &["tok-a"]).await;
        let gateway = FakeGateway {
            unreachable: true,
            ..FakeGateway::default()
        };

        let outcome = tick_at(&db, &gateway, &test_config(), madrid(8, 45))
            .await
            .unwrap();

        assert_eq!(outcome.notified, 0);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tick_with_no_registrations_is_quiet() {
        let db = Database::open_in_memory().await.unwrap();
        seed(&db, &[event("1", 9, 0)], &[]).await;
        let gateway = FakeGateway::default();

        let outcome = tick_at(&db, &gateway, &test_config(), madrid(8, 45))
            .await
            .unwrap();

        assert_eq!(outcome.notified, 0);
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn test_reminder_message_body_varies_by_lead() {
        let event = event("1", 9, 0);
        let fifteen = reminder_message(&event, 15, None);
        assert_eq!(fifteen.body, "In 15 minutes (09:00). Tap to dismiss.");

        let last = reminder_message(&event, 5, Some("https://obra.example/icon.png".into()));
        assert_eq!(last.body, "Final warning! In 5 minutes (09:00)");
        assert_eq!(last.image_url.as_deref(), Some("https://obra.example/icon.png"));
        assert_eq!(last.android.tag, "1");
    }
}
