//! In-app reminder checker.
//!
//! Complements the server-side notifier: while the app is open, a periodic
//! sweep over the mirrored `events` collection rings exactly when an event's
//! date and wall-clock minute arrive. Fired events are remembered for the
//! session so a sweep every few seconds cannot ring twice.

use std::collections::HashSet;

use chrono::{NaiveDateTime, Timelike};

use crate::models::CalendarEvent;

/// Session-scoped reminder alarm
#[derive(Debug, Default)]
pub struct ReminderAlarm {
    notified: HashSet<String>,
}

impl ReminderAlarm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events due exactly at `now` (minute precision) that have not yet
    /// fired this session. Dismissed events never ring.
    pub fn due(&mut self, events: &[CalendarEvent], now: NaiveDateTime) -> Vec<CalendarEvent> {
        let today = now.date();
        let minute_of_day = i32::try_from(now.hour() * 60 + now.minute()).unwrap_or(i32::MAX);

        let due: Vec<CalendarEvent> = events
            .iter()
            .filter(|event| {
                event.date == today
                    && event.minutes_of_day() == minute_of_day
                    && !event.dismissed
                    && !self.notified.contains(&event.id)
            })
            .cloned()
            .collect();

        for event in &due {
            self.notified.insert(event.id.clone());
        }
        due
    }
}
