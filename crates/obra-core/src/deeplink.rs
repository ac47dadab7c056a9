//! Notification deep links.
//!
//! Push notifications link back into the app with an `eventId` query
//! parameter meaning "open the acknowledgment view for this event". After
//! handling it, the parameter is stripped so the link is not re-triggered
//! by a reload or share.

use url::Url;

use crate::error::{Error, Result};

/// Query parameter carried by notification deep links
const EVENT_ID_PARAM: &str = "eventId";

/// Extract the event id from a deep-link URL, if present
#[must_use]
pub fn event_id(link: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == EVENT_ID_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Return the URL with the `eventId` parameter removed, other query
/// parameters intact
pub fn strip_event_id(link: &str) -> Result<String> {
    let mut parsed =
        Url::parse(link).map_err(|error| Error::InvalidInput(format!("Invalid URL: {error}")))?;

    let remaining: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != EVENT_ID_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if remaining.is_empty() {
        parsed.set_query(None);
    } else {
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(remaining.iter().map(|(key, value)| (key, value)));
    }

    Ok(parsed.to_string())
}
