//! Microsoft Graph calendar client.

use std::time::Duration;

use calconnect_core::{DEFAULT_CALENDAR_ID, NewEvent, Slot, format_utc, parse_utc_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CalendarError, CalendarResult};
use crate::http::{build_client, read_success_body};

/// Ask Graph to express every event time in UTC.
const UTC_TIMEZONE_PREFERENCE: &str = r#"outlook.timezone="UTC""#;
const PAGE_SIZE_PREFERENCE: &str = "odata.maxpagesize=50";

/// Microsoft Graph calendar client.
#[derive(Debug, Clone)]
pub struct GraphCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl GraphCalendarClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration, user_agent: &str) -> CalendarResult<Self> {
        Ok(Self {
            http_client: build_client(timeout, user_agent)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// `/me` for the default calendar, `/me/calendars/{id}` otherwise.
    fn calendar_root(&self, calendar_id: &str) -> String {
        if calendar_id == DEFAULT_CALENDAR_ID {
            format!("{}/me", self.api_base)
        } else {
            format!("{}/me/calendars/{}", self.api_base, urlencoding::encode(calendar_id))
        }
    }

    /// Lists event occurrences in the window via `calendarView`, which
    /// expands recurring series. Follows `@odata.nextLink`.
    pub async fn calendar_view(
        &self,
        access_token: &str,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CalendarResult<Vec<Slot>> {
        let first = self
            .http_client
            .get(format!("{}/calendarView", self.calendar_root(calendar_id)))
            .query(&[
                ("startDateTime", format_utc(&start)),
                ("endDateTime", format_utc(&end)),
                ("$orderby", "start/dateTime".to_string()),
                ("$select", "subject,bodyPreview,location,start,end,isCancelled".to_string()),
            ]);

        let mut slots = Vec::new();
        let mut page = self.fetch_page(first, access_token).await?;
        loop {
            slots.extend(page.value.into_iter().filter_map(convert_event));

            let Some(next) = page.next_link else { break };
            page = self
                .fetch_page(self.http_client.get(next), access_token)
                .await?;
        }

        debug!("fetched {} events from outlook calendar {}", slots.len(), calendar_id);
        Ok(slots)
    }

    async fn fetch_page(
        &self,
        request: reqwest::RequestBuilder,
        access_token: &str,
    ) -> CalendarResult<EventsPage> {
        let response = request
            .bearer_auth(access_token)
            .header("Prefer", UTC_TIMEZONE_PREFERENCE)
            .header("Prefer", PAGE_SIZE_PREFERENCE)
            .send()
            .await
            .map_err(CalendarError::from_transport)?;

        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            CalendarError::invalid_response(format!("failed to parse calendar view: {e}")).with_source(e)
        })
    }

    /// Creates an event and returns what Graph echoed back.
    pub async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: &GraphEventPayload,
    ) -> CalendarResult<CreatedGraphEvent> {
        let response = self
            .http_client
            .post(format!("{}/events", self.calendar_root(calendar_id)))
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

fn convert_event(event: GraphEvent) -> Option<Slot> {
    if event.is_cancelled {
        return None;
    }

    let parse = |time: &Option<GraphDateTime>| {
        let time = time.as_ref()?;
        parse_utc_timestamp(&time.date_time)
            .map_err(|e| warn!("failed to parse outlook event time: {}", e))
            .ok()
    };

    let (Some(start_date), Some(end_date)) = (parse(&event.start), parse(&event.end)) else {
        warn!("skipping outlook event {:?} without usable start/end", event.id);
        return None;
    };

    Some(Slot {
        start_date,
        end_date,
        summary: event.subject.unwrap_or_default(),
        description: event.body_preview.unwrap_or_default(),
        location: event
            .location
            .and_then(|l| l.display_name)
            .unwrap_or_default(),
    })
}

// Request/response types

/// Body of a `POST /me/events` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEventPayload {
    pub subject: String,
    pub body: GraphItemBody,
    pub start: GraphDateTime,
    pub end: GraphDateTime,
    pub attendees: Vec<GraphAttendee>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphItemBody {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDateTime {
    pub date_time: String,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAttendee {
    pub email_address: GraphEmailAddress,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEmailAddress {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GraphEventPayload {
    pub fn from_new_event(event: &NewEvent) -> Self {
        let time = |date_time: &str| GraphDateTime {
            date_time: date_time.to_string(),
            time_zone: Some(event.timezone.clone()),
        };

        Self {
            subject: event.summary.clone(),
            body: GraphItemBody {
                content_type: "HTML".to_string(),
                content: event.description.clone(),
            },
            start: time(&event.start),
            end: time(&event.end),
            attendees: event
                .attendees
                .iter()
                .map(|a| GraphAttendee {
                    email_address: GraphEmailAddress {
                        address: a.email.clone(),
                        name: a.name.clone(),
                    },
                    kind: "required".to_string(),
                })
                .collect(),
        }
    }
}

/// The fields of a created event we care about.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGraphEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub web_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: Option<String>,
    subject: Option<String>,
    body_preview: Option<String>,
    location: Option<GraphLocation>,
    start: Option<GraphDateTime>,
    end: Option<GraphDateTime>,
    #[serde(default)]
    is_cancelled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphLocation {
    display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use calconnect_core::Attendee;
    use serde_json::json;

    #[test]
    fn payload_shape() {
        let event = NewEvent::new("Sync", "2024-12-10T09:00:00", "2024-12-10T09:30:00", "Europe/Paris")
            .with_description("<p>Agenda</p>")
            .with_attendee(Attendee::new("a@example.com").with_name("Ann"))
            .with_attendees(["b@example.com"]);

        let payload = serde_json::to_value(GraphEventPayload::from_new_event(&event)).unwrap();
        assert_eq!(
            payload,
            json!({
                "subject": "Sync",
                "body": {"contentType": "HTML", "content": "<p>Agenda</p>"},
                "start": {"dateTime": "2024-12-10T09:00:00", "timeZone": "Europe/Paris"},
                "end": {"dateTime": "2024-12-10T09:30:00", "timeZone": "Europe/Paris"},
                "attendees": [
                    {"emailAddress": {"address": "a@example.com", "name": "Ann"}, "type": "required"},
                    {"emailAddress": {"address": "b@example.com"}, "type": "required"}
                ]
            })
        );
    }

    #[test]
    fn converts_seven_digit_utc_times() {
        let event: GraphEvent = serde_json::from_value(json!({
            "id": "AAMk",
            "subject": "Planning",
            "bodyPreview": "Agenda",
            "location": {"displayName": "Room 1"},
            "start": {"dateTime": "2024-12-10T09:00:00.0000000", "timeZone": "UTC"},
            "end": {"dateTime": "2024-12-10T10:00:00.0000000", "timeZone": "UTC"}
        }))
        .unwrap();

        let slot = convert_event(event).unwrap();
        assert_eq!(format_utc(&slot.start_date), "2024-12-10T09:00:00Z");
        assert_eq!(format_utc(&slot.end_date), "2024-12-10T10:00:00Z");
        assert_eq!(slot.location, "Room 1");
        assert_eq!(slot.description, "Agenda");
    }

    #[test]
    fn skips_cancelled() {
        let event: GraphEvent = serde_json::from_value(json!({
            "isCancelled": true,
            "start": {"dateTime": "2024-12-10T09:00:00.0000000"},
            "end": {"dateTime": "2024-12-10T10:00:00.0000000"}
        }))
        .unwrap();
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn calendar_root_paths() {
        let client = GraphCalendarClient::new("https://graph.example/v1.0/", Duration::from_secs(5), "test").unwrap();
        assert_eq!(client.calendar_root("primary"), "https://graph.example/v1.0/me");
        assert_eq!(client.calendar_root("AQMk=="), "https://graph.example/v1.0/me/calendars/AQMk%3D%3D");
    }
}
