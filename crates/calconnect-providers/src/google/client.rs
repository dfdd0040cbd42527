//! Google Calendar v3 HTTP client.
//!
//! Stateless with respect to users: every call takes the access token to
//! use, so one client serves every stored user.

use std::time::Duration;

use calconnect_core::{NewEvent, Slot};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CalendarError, CalendarResult};
use crate::http::{build_client, read_success_body};

/// Reminder policy applied to every created event: an email a day ahead
/// and a popup ten minutes before.
const REMINDER_OVERRIDES: &[(&str, u32)] = &[("email", 24 * 60), ("popup", 10)];

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleCalendarClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration, user_agent: &str) -> CalendarResult<Self> {
        Ok(Self {
            http_client: build_client(timeout, user_agent)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    /// Lists single event occurrences between `time_min` and `time_max`,
    /// ordered by start time, following every page.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> CalendarResult<Vec<Slot>> {
        let mut slots = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(access_token, calendar_id, time_min, time_max, page_token.as_deref())
                .await?;

            slots.extend(page.items.into_iter().filter_map(convert_event));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} events from calendar {}", slots.len(), calendar_id);
        Ok(slots)
    }

    async fn list_events_page(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> CalendarResult<EventListResponse> {
        let mut request = self
            .http_client
            .get(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(CalendarError::from_transport)?;
        let body = read_success_body(response).await?;

        serde_json::from_str(&body).map_err(|e| {
            CalendarError::invalid_response(format!("failed to parse event list: {e}")).with_source(e)
        })
    }

    /// Inserts an event and returns what Google echoed back.
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> CalendarResult<InsertedEvent> {
        let response = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(CalendarError::from_transport)?;

        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            CalendarError::invalid_response(format!("failed to parse created event: {e}")).with_source(e)
        })
    }
}

fn convert_event(event: ApiEvent) -> Option<Slot> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id.unwrap_or_default();
    let start = event.start.as_ref().and_then(ApiEventTime::to_utc);
    let end = event.end.as_ref().and_then(ApiEventTime::to_utc);
    let (Some(start_date), Some(end_date)) = (start, end) else {
        warn!("skipping event {:?} without usable start/end", id);
        return None;
    };

    Some(Slot {
        start_date,
        end_date,
        summary: event.summary.unwrap_or_default(),
        description: event.description.unwrap_or_default(),
        location: event.location.unwrap_or_default(),
    })
}

// Request/response types

/// Body of an `events.insert` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: PayloadTime,
    pub end: PayloadTime,
    pub attendees: Vec<PayloadAttendee>,
    pub reminders: PayloadReminders,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadAttendee {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadReminders {
    pub use_default: bool,
    pub overrides: Vec<PayloadReminder>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadReminder {
    pub method: String,
    pub minutes: u32,
}

impl EventPayload {
    pub fn from_new_event(event: &NewEvent) -> Self {
        let time = |date_time: &str| PayloadTime {
            date_time: date_time.to_string(),
            time_zone: event.timezone.clone(),
        };

        Self {
            summary: event.summary.clone(),
            description: event.description.clone(),
            start: time(&event.start),
            end: time(&event.end),
            attendees: event
                .attendees
                .iter()
                .map(|a| PayloadAttendee { email: a.email.clone() })
                .collect(),
            reminders: PayloadReminders {
                use_default: false,
                overrides: REMINDER_OVERRIDES
                    .iter()
                    .map(|(method, minutes)| PayloadReminder {
                        method: method.to_string(),
                        minutes: *minutes,
                    })
                    .collect(),
            },
        }
    }
}

/// The fields of an inserted event we care about.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
    /// All-day events carry a bare date instead.
    date: Option<String>,
}

impl ApiEventTime {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        if let Some(ref dt) = self.date_time {
            return DateTime::parse_from_rfc3339(dt)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| warn!("failed to parse event time {:?}: {}", dt, e))
                .ok();
        }
        let date = self.date.as_deref()?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .map_err(|e| warn!("failed to parse event date {:?}: {}", date, e))
            .ok()
    }
}
