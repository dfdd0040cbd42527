//! [`CalendarAdapter`] implementation for Outlook through Microsoft Graph.

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

use super::client::{GraphCalendarClient, GraphEventPayload};
use super::config::OutlookConfig;

const PROVIDER: ProviderKind = ProviderKind::Outlook;

fn tagged(err: CalendarError) -> CalendarError {
    err.with_provider(PROVIDER.as_str())
}

struct Inner {
    config: OutlookConfig,
    tokens: TokenManager,
    graph: GraphCalendarClient,
}

/// Outlook Calendar adapter.
pub struct OutlookAdapter {
    inner: Arc<Inner>,
    job: RefreshJob,
}

impl OutlookAdapter {
    /// Builds the adapter, failing fast on invalid configuration.
    pub fn new(config: OutlookConfig, store: Arc<dyn CredentialStore>) -> CalendarResult<Self> {
        let interval = config.validate().map_err(tagged)?;
        let scope = config.scope_string();

        // The identity platform wants the scope on both grants.
        let endpoint = TokenEndpoint::new(config.token_url(), config.credentials.clone(), config.timeout)
            .map_err(tagged)?
            .with_scope(scope.clone());
        let tokens = TokenManager::new(PROVIDER, store, endpoint, scope, interval);
        let graph = GraphCalendarClient::new(&config.api_base, config.timeout, &config.user_agent)
            .map_err(tagged)?;

        debug!(interval_secs = interval.as_secs(), tenant = %config.tenant, "outlook adapter ready");
        Ok(Self {
            inner: Arc::new(Inner { config, tokens, graph }),
            job: RefreshJob::new(PROVIDER, interval),
        })
    }

    pub fn config(&self) -> &OutlookConfig {
        &self.inner.config
    }

    pub fn authorization_url(&self, state: &str) -> String {
        let config = &self.inner.config;
        let scope = config.scope_string();
        with_query(
            &config.authorize_url(),
            &[
                ("client_id", config.credentials.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", config.credentials.redirect_uri.as_str()),
                ("response_mode", "query"),
                ("scope", scope.as_str()),
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
        let start = adjust_time_by_timezone(&query.start, &query.timezone)?;
        let end = adjust_time_by_timezone(&query.end, &query.timezone)?;

        self.graph
            .calendar_view(&tokens.access_token, query.calendar_id(), start, end)
            .await
    }

    async fn create_event(&self, user_id: &str, event: &NewEvent) -> CalendarResult<EventCreated> {
        let tokens = self.tokens.tokens_for(user_id).await?;
        parse_timezone(&event.timezone)?;
        parse_wall_clock(&event.start)?;
        parse_wall_clock(&event.end)?;

        let payload = GraphEventPayload::from_new_event(event);
        let created = self
            .graph
            .create_event(&tokens.access_token, event.calendar_id(), &payload)
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

        match (created.id, created.web_link) {
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

impl CalendarAdapter for OutlookAdapter {
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

impl std::fmt::Debug for OutlookAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlookAdapter")
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

    fn adapter() -> OutlookAdapter {
        let config = OutlookConfig::new(OAuthCredentials::new(
            "00000000-aaaa",
            "secret",
            "https://app.example/auth/outlook",
        ));
        OutlookAdapter::new(config, Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn connect_builds_identity_platform_url() {
        let url = adapter().authorization_url("fixed");
        assert!(url.starts_with("https://login.microsoftonline.com/common/oauth2/v2.0/authorize?"));
        assert!(url.contains("client_id=00000000-aaaa"));
        assert!(url.contains("response_mode=query"));
        assert!(url.contains("scope=offline_access%20Calendars.ReadWrite%20User.Read"));
        assert!(url.ends_with("state=fixed"));
    }

    #[test]
    fn provider_is_outlook() {
        assert_eq!(adapter().provider(), ProviderKind::Outlook);
    }

    #[tokio::test]
    async fn unregistered_user() {
        let adapter = adapter();
        let query = EventQuery::new("2024-12-10T00:00:00", "2024-12-11T00:00:00");
        let err = adapter.get_events_in_range("ghost", &query).await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::NotRegistered);
        assert_eq!(err.provider(), Some("outlook"));
    }

    #[test]
    fn missing_secret_fails_construction() {
        let config = OutlookConfig::new(OAuthCredentials::new("id", "", "https://app/cb"));
        let err = OutlookAdapter::new(config, Arc::new(MemoryStore::new())).unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
    }
}
