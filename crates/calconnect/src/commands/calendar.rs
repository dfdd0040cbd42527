//! Calendar commands: connect, access, events, create-event, refresh, run.

use calconnect_core::{EventQuery, NewEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::AppResult;
use crate::service::CalendarService;

use super::print_json;

/// What `access` prints: enough to confirm the exchange, never the tokens.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessSummary<'a> {
    user_id: &'a str,
    provider: &'a str,
    scope: &'a str,
    expiry_date: DateTime<Utc>,
    has_refresh_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshSummary<'a> {
    user_id: &'a str,
    provider: &'a str,
    has_refresh_token: bool,
}

/// Print the authorization URL.
pub fn connect(service: &CalendarService) -> AppResult<()> {
    println!("{}", service.connect());
    Ok(())
}

/// Exchange an authorization code for `user`.
pub async fn access(service: &CalendarService, user: &str, code: &str) -> AppResult<()> {
    let tokens = service.access(code, user).await?;
    print_json(&AccessSummary {
        user_id: user,
        provider: service.provider().as_str(),
        scope: &tokens.scope,
        expiry_date: tokens.expiry_date,
        has_refresh_token: tokens.refresh_token.is_some(),
    })
}

/// List the user's events in a window.
pub async fn events(service: &CalendarService, user: &str, query: EventQuery) -> AppResult<()> {
    let slots = service.get_events_in_range(user, &query).await?;
    print_json(&slots)
}

/// Create an event.
pub async fn create_event(service: &CalendarService, user: &str, event: NewEvent) -> AppResult<()> {
    let created = service.create_event(user, &event).await?;
    print_json(&created)
}

/// Refresh the user's access token when due.
pub async fn refresh(service: &CalendarService, user: &str) -> AppResult<()> {
    let credentials = service.refresh_access_token(user).await?;
    info!(user_id = user, provider = %service.provider(), "access token ready");
    print_json(&RefreshSummary {
        user_id: user,
        provider: service.provider().as_str(),
        has_refresh_token: !credentials.refresh_token.is_empty(),
    })
}

/// Run the refresh job in the foreground until Ctrl-C.
pub async fn run(service: &CalendarService) -> AppResult<()> {
    service.start_job()?;
    info!(provider = %service.provider(), "refresh job running, press Ctrl-C to stop");

    let result = tokio::signal::ctrl_c().await;
    service.stop_job();
    info!("refresh job stopped");
    result?;
    Ok(())
}
