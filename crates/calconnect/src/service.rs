//! Calendar service facade.
//!
//! [`CalendarService`] picks one adapter from a provider tag at construction
//! and forwards every call to it unchanged.

use std::sync::Arc;
use std::time::Duration;

use calconnect_core::{EventCreated, EventQuery, NewEvent, Slot};
use calconnect_providers::{
    CalendarAdapter, CalendarError, CalendarResult, CredentialStore, Credentials, OAuthCredentials,
    ProviderKind, TokenSet, open_store,
};
use tracing::debug;

/// Everything needed to build an adapter for one provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub oauth: OAuthCredentials,
    /// Overrides the adapter's default refresh interval.
    pub refresh_interval: Option<String>,
    /// Microsoft identity platform tenant; ignored for Google.
    pub tenant: Option<String>,
    /// Points every endpoint at an alternate root (mock servers, proxies).
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl ProviderCredentials {
    pub fn new(oauth: OAuthCredentials) -> Self {
        Self {
            oauth,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_refresh_interval(mut self, interval: impl Into<String>) -> Self {
        self.refresh_interval = Some(interval.into());
        self
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Provider-agnostic entry point.
pub struct CalendarService {
    adapter: Box<dyn CalendarAdapter>,
}

impl CalendarService {
    /// Builds the adapter named by `provider` (`google` or `outlook`, any
    /// case) on top of `store`.
    pub fn new(
        provider: &str,
        credentials: ProviderCredentials,
        store: Arc<dyn CredentialStore>,
    ) -> CalendarResult<Self> {
        let kind: ProviderKind = provider.parse()?;
        let adapter = build_adapter(kind, credentials, store)?;
        debug!(provider = %kind, "calendar service ready");
        Ok(Self { adapter })
    }

    /// Opens the store named by `store_connection`, then builds the adapter.
    pub fn open(
        provider: &str,
        credentials: ProviderCredentials,
        store_connection: &str,
    ) -> CalendarResult<Self> {
        let store = open_store(store_connection)?;
        Self::new(provider, credentials, store)
    }

    /// Wraps an already-built adapter.
    pub fn from_adapter(adapter: Box<dyn CalendarAdapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &dyn CalendarAdapter {
        self.adapter.as_ref()
    }

    pub fn provider(&self) -> ProviderKind {
        self.adapter.provider()
    }

    pub fn connect(&self) -> String {
        self.adapter.connect()
    }

    pub async fn access(&self, code: &str, user_id: &str) -> CalendarResult<TokenSet> {
        self.adapter.access(code, user_id).await
    }

    pub async fn get_events_in_range(&self, user_id: &str, query: &EventQuery) -> CalendarResult<Vec<Slot>> {
        self.adapter.get_events_in_range(user_id, query).await
    }

    pub async fn create_event(&self, user_id: &str, event: &NewEvent) -> CalendarResult<EventCreated> {
        self.adapter.create_event(user_id, event).await
    }

    pub async fn refresh_access_token(&self, user_id: &str) -> CalendarResult<Credentials> {
        self.adapter.refresh_access_token(user_id).await
    }

    pub fn start_job(&self) -> CalendarResult<()> {
        self.adapter.start_job()
    }

    pub fn stop_job(&self) {
        self.adapter.stop_job()
    }

    pub fn is_job_running(&self) -> bool {
        self.adapter.is_job_running()
    }
}

impl std::fmt::Debug for CalendarService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarService")
            .field("provider", &self.adapter.provider())
            .field("job_running", &self.adapter.is_job_running())
            .finish()
    }
}

#[allow(unused_variables)]
fn build_adapter(
    kind: ProviderKind,
    credentials: ProviderCredentials,
    store: Arc<dyn CredentialStore>,
) -> CalendarResult<Box<dyn CalendarAdapter>> {
    match kind {
        #[cfg(feature = "google")]
        ProviderKind::Google => {
            use calconnect_providers::google::{GoogleAdapter, GoogleConfig};

            let mut config = GoogleConfig::new(credentials.oauth);
            if let Some(interval) = credentials.refresh_interval {
                config = config.with_refresh_interval(interval);
            }
            if let Some(timeout) = credentials.timeout {
                config = config.with_timeout(timeout);
            }
            if let Some(ref base) = credentials.base_url {
                config = config.with_base_url(base);
            }
            Ok(Box::new(GoogleAdapter::new(config, store)?))
        }
        #[cfg(feature = "outlook")]
        ProviderKind::Outlook => {
            use calconnect_providers::outlook::{OutlookAdapter, OutlookConfig};

            let mut config = OutlookConfig::new(credentials.oauth);
            if let Some(tenant) = credentials.tenant {
                config = config.with_tenant(tenant);
            }
            if let Some(interval) = credentials.refresh_interval {
                config = config.with_refresh_interval(interval);
            }
            if let Some(timeout) = credentials.timeout {
                config = config.with_timeout(timeout);
            }
            if let Some(ref base) = credentials.base_url {
                config = config.with_base_url(base);
            }
            Ok(Box::new(OutlookAdapter::new(config, store)?))
        }
        #[allow(unreachable_patterns)]
        other => Err(CalendarError::unsupported_provider(other.as_str())),
    }
}
