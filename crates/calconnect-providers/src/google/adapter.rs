//! [`CalendarAdapter`] implementation for Google Calendar.

use std::sync::Arc;

use calconnect_core::{
    EventCreated, EventQuery, NewEvent, Slot, adjust_time_by_timezone, parse_timezone,
    parse_wall_clock,
};
use tracing::{debug, info};

use crate::error::{CalendarError, CalendarResult};
use crate::oauth::{TokenEndpoint, generate_state, with_query};
use crate::provider::{BoxFuture, CalendarAdapter, Credentials, ProviderKind};
use crate::refresh_job::{JobState, RefreshFn, RefreshJob};
use crate::store::{CredentialStore, TokenSet};
use crate::tokens::TokenManager;

use super::client::{EventPayload, GoogleCalendarClient};
use super::config::GoogleConfig;

const PROVIDER: ProviderKind = ProviderKind::Google;

fn tagged(err: CalendarError) -> CalendarError {
    err.with_provider(PROVIDER.as_str())
}

struct Inner {
    config: GoogleConfig,
    tokens: TokenManager,
    api: GoogleCalendarClient,
}

/// Google Calendar adapter.
///
/// Cheap to share behind an `Arc`; the refresh job holds its own handle on
/// the shared internals.
pub struct GoogleAdapter {
    inner: Arc<Inner>,
    job: RefreshJob,
}

impl GoogleAdapter {
    /// Builds the adapter, failing fast on invalid configuration
    /// (including an unparseable refresh interval).
    pub fn new(config: GoogleConfig, store: Arc<dyn CredentialStore>) -> CalendarResult<Self> {
        let interval = config.validate().map_err(tagged)?;

        let endpoint = TokenEndpoint::new(&config.token_url, config.credentials.clone(), config.timeout)
            .map_err(tagged)?;
        let tokens = TokenManager::new(PROVIDER, store, endpoint, config.scope_string(), interval);
        let api = GoogleCalendarClient::new(&config.api_base, config.timeout, &config.user_agent)
            .map_err(tagged)?;

        debug!(interval_secs = interval.as_secs(), "google adapter ready");
        Ok(Self {
            inner: Arc::new(Inner { config, tokens, api }),
            job: RefreshJob::new(PROVIDER, interval),
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.inner.config
    }

    /// Builds the consent URL with a caller-chosen `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        let config = &self.inner.config;
        let scope = config.scope_string();
        with_query(
            &config.auth_url,
            &[
                ("client_id", config.credentials.client_id.as_str()),
                ("redirect_uri", config.credentials.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
    }

    pub async fn job_state(&self) -> JobState {
        self.job.state().await
    }

    fn refresh_fn(&self) -> RefreshFn {
        let inner = Arc::clone(&self.inner);
        Arc::new(move |user_id: String| -> BoxFuture<'static, _> {
            let inner = Arc::clone(&inner);
            Box::pin(async move {
                inner
                    .tokens
                    .refresh(&user_id)
                    .await
                    .map(|(_, outcome)| outcome)
                    .map_err(tagged)
            })
        })
    }
}

impl Inner {
    async fn events_in_range(&self, user_id: &str, query: &EventQuery) -> CalendarResult<Vec<Slot>> {
        let tokens = self.tokens.tokens_for(user_id).await?;
        let time_min = adjust_time_by_timezone(&query.start, &query.timezone)?;
        let time_max = adjust_time_by_timezone(&query.end, &query.timezone)?;

        self.api
            .list_events(&tokens.access_token, query.calendar_id(), time_min, time_max)
            .await
    }

    async fn create_event(&self, user_id: &str, event: &NewEvent) -> CalendarResult<EventCreated> {
        let tokens = self.tokens.tokens_for(user_id).await?;
        parse_timezone(&event.timezone)?;
        parse_wall_clock(&event.start)?;
        parse_wall_clock(&event.end)?;

        let payload = EventPayload::from_new_event(event);
        let inserted = self
            .api
            .insert_event(&tokens.access_token, event.calendar_id(), &payload)
            .await
            .map_err(|e| {
                let mut err = CalendarError::event_creation(format!(
                    "Failed to save the event in {}: {}",
                    PROVIDER.display_name(),
                    e.message()
                ));
                if let Some(status) = e.status() {
                    err = err.with_status(status);
                }
                err.with_source(e)
            })?;

        match (inserted.id, inserted.html_link) {
            (Some(id), Some(link)) if !id.is_empty() && !link.is_empty() => {
                info!(user_id, event_id = %id, "event created");
                Ok(EventCreated::booked(id, link))
            }
            _ => Err(CalendarError::event_creation_incomplete(
                "Event created, but no ID or link returned",
            )),
        }
    }
}

impl CalendarAdapter for GoogleAdapter {
    fn provider(&self) -> ProviderKind {
        PROVIDER
    }

    fn connect(&self) -> String {
        self.authorization_url(&generate_state())
    }

    fn access<'a>(&'a self, code: &'a str, user_id: &'a str) -> BoxFuture<'a, CalendarResult<TokenSet>> {
        Box::pin(async move { self.inner.tokens.exchange(code, user_id).await.map_err(tagged) })
    }

    fn get_events_in_range<'a>(
        &'a self,
        user_id: &'a str,
        query: &'a EventQuery,
    ) -> BoxFuture<'a, CalendarResult<Vec<Slot>>> {
        Box::pin(async move { self.inner.events_in_range(user_id, query).await.map_err(tagged) })
    }

    fn create_event<'a>(
        &'a self,
        user_id: &'a str,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, CalendarResult<EventCreated>> {
        Box::pin(async move { self.inner.create_event(user_id, event).await.map_err(tagged) })
    }

    fn refresh_access_token<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, CalendarResult<Credentials>> {
        Box::pin(async move {
            self.inner
                .tokens
                .refresh(user_id)
                .await
                .map(|(credentials, _)| credentials)
                .map_err(tagged)
        })
    }

    fn start_job(&self) -> CalendarResult<()> {
        let store = Arc::clone(self.inner.tokens.store());
        self.job.start(store, self.refresh_fn()).map(|_| ()).map_err(tagged)
    }

    fn stop_job(&self) {
        self.job.stop();
    }

    fn is_job_running(&self) -> bool {
        self.job.is_running()
    }
}

impl std::fmt::Debug for GoogleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAdapter")
            .field("config", &self.inner.config)
            .field("job", &self.job)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarErrorCode;
    use crate::oauth::OAuthCredentials;
    use crate::store::MemoryStore;

    fn adapter() -> GoogleAdapter {
        let config = GoogleConfig::new(OAuthCredentials::new(
            "client.apps.googleusercontent.com",
            "secret",
            "https://app.example/auth/callback",
        ));
        GoogleAdapter::new(config, Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn connect_builds_offline_consent_url() {
        let url = adapter().connect();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example%2Fauth%2Fcallback"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("calendar.events"));
        assert!(url.contains("&state="));
    }

    #[test]
    fn connect_uses_fresh_state() {
        let adapter = adapter();
        assert_ne!(adapter.connect(), adapter.connect());
    }

    #[test]
    fn invalid_interval_fails_construction() {
        let config = GoogleConfig::new(OAuthCredentials::new("id", "secret", "https://app/cb"))
            .with_refresh_interval("fortnightly");
        let err = GoogleAdapter::new(config, Arc::new(MemoryStore::new())).unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::InvalidInterval);
        assert_eq!(err.provider(), Some("google"));
    }

    #[test]
    fn zero_interval_fails_construction() {
        let config = GoogleConfig::new(OAuthCredentials::new("id", "secret", "https://app/cb"))
            .with_refresh_interval("0 minute");
        let err = GoogleAdapter::new(config, Arc::new(MemoryStore::new())).unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::InvalidInterval);
    }

    #[tokio::test]
    async fn unregistered_user_cannot_list_or_create() {
        let adapter = adapter();
        let query = EventQuery::new("2024-12-10T00:00:00", "2024-12-11T00:00:00");
        let err = adapter.get_events_in_range("ghost", &query).await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::NotRegistered);

        let event = NewEvent::new("x", "2024-12-10T09:00:00", "2024-12-10T10:00:00", "UTC");
        let err = adapter.create_event("ghost", &event).await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::NotRegistered);

        let err = adapter.refresh_access_token("ghost").await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::NotRegistered);
    }

    #[tokio::test]
    async fn job_lifecycle() {
        let adapter = adapter();
        assert!(!adapter.is_job_running());
        adapter.start_job().unwrap();
        adapter.start_job().unwrap();
        assert!(adapter.is_job_running());
        adapter.stop_job();
        adapter.stop_job();
        assert!(!adapter.is_job_running());
        assert_eq!(adapter.job_state().await.cycles_completed, 0);
    }
}
