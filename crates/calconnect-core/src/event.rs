//! Event types shared by every calendar provider.
//!
//! - [`Slot`]: a normalized, timezone-resolved busy range returned by listings
//! - [`NewEvent`]: the caller's request to book an event
//! - [`EventQuery`]: a listing window expressed in a caller timezone
//! - [`EventCreated`]: the outcome of a successful booking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar identifier meaning "the user's default calendar".
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Timezone used when a query does not name one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Message attached to every successful booking.
pub const EVENT_BOOKED_MESSAGE: &str = "Event successfully booked.";

/// A single event occurrence, normalized to UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub summary: String,
    /// Empty when the provider has no description.
    #[serde(default)]
    pub description: String,
    /// Empty when the provider has no location.
    #[serde(default)]
    pub location: String,
}

impl Slot {
    /// Duration of the slot in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_date - self.start_date).num_minutes()
    }
}

/// An event attendee, identified by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    /// Optional display name (only Outlook sends it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A request to create an event.
///
/// `start` and `end` are wall-clock strings interpreted in `timezone` by the
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,
    pub start: String,
    pub end: String,
    pub timezone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
}

impl NewEvent {
    pub fn new(
        summary: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            start: start.into(),
            end: end.into(),
            timezone: timezone.into(),
            description: String::new(),
            attendees: Vec::new(),
            calendar_id: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    #[must_use]
    pub fn with_attendees(mut self, emails: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.attendees.extend(emails.into_iter().map(Attendee::new));
        self
    }

    #[must_use]
    pub fn with_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    /// The target calendar, falling back to the default calendar.
    pub fn calendar_id(&self) -> &str {
        self.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR_ID)
    }
}

/// A listing window.
///
/// `start` and `end` are wall-clock strings; their digits are read as local
/// time in `timezone` before querying the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub start: String,
    pub end: String,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
}

impl EventQuery {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            calendar_id: None,
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    #[must_use]
    pub fn with_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    pub fn calendar_id(&self) -> &str {
        self.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR_ID)
    }
}

/// Outcome of a successful booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCreated {
    pub message: String,
    pub event_id: String,
    pub event_link: String,
}

impl EventCreated {
    pub fn booked(event_id: impl Into<String>, event_link: impl Into<String>) -> Self {
        Self {
            message: EVENT_BOOKED_MESSAGE.to_string(),
            event_id: event_id.into(),
            event_link: event_link.into(),
        }
    }
}
