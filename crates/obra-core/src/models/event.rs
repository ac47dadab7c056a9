//! Calendar event (reminder) model

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::{fresh_id, Document};

/// Kind of calendar event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Meeting,
    Deadline,
    Call,
    Personal,
}

/// A dated reminder with a wall-clock time.
///
/// Events are never auto-deleted; acknowledging one sets `dismissed`, which
/// also stops further push notifications for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Unique identifier
    pub id: String,
    pub title: String,
    /// Calendar day the event falls on
    pub date: NaiveDate,
    /// Wall-clock time, serialized as "HH:MM"
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set when the user acknowledges the reminder
    #[serde(default)]
    pub dismissed: bool,
}

impl CalendarEvent {
    /// Create a new event of the default kind
    #[must_use]
    pub fn new(title: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            id: fresh_id(),
            title: title.into(),
            date,
            time,
            kind: EventKind::default(),
            description: None,
            dismissed: false,
        }
    }

    /// Minutes since midnight of the event's wall-clock time
    #[must_use]
    pub fn minutes_of_day(&self) -> i32 {
        let minutes = self.time.hour() * 60 + self.time.minute();
        i32::try_from(minutes).unwrap_or(i32::MAX)
    }
}

impl Document for CalendarEvent {
    const COLLECTION: &'static str = "events";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Serde adapter for "HH:MM" wall-clock strings.
///
/// Seconds are dropped on write and rejected on read; event times are
/// entered and compared at minute precision.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> CalendarEvent {
        CalendarEvent::new(
            "Site visit",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_time_serializes_as_hhmm() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["time"], "09:00");
        assert_eq!(value["date"], "2024-03-01");
    }

    #[test]
    fn test_time_roundtrip() {
        let event = sample();
        let json = serde_json::to_string(&event).unwrap();
        let back: CalendarEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_rejects_seconds_in_time() {
        let json = r#"{"id":"1","title":"x","date":"2024-03-01","time":"09:00:30"}"#;
        assert!(serde_json::from_str::<CalendarEvent>(json).is_err());
    }

    #[test]
    fn test_missing_dismissed_defaults_false() {
        let json = r#"{"id":"1","title":"x","date":"2024-03-01","time":"14:30"}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert!(!event.dismissed);
        assert_eq!(event.kind, EventKind::Meeting);
    }

    #[test]
    fn test_minutes_of_day() {
        let event = CalendarEvent::new(
            "x",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(14, 5, 0).unwrap(),
        );
        assert_eq!(event.minutes_of_day(), 14 * 60 + 5);
    }
}
