//! Google Calendar adapter configuration.

use std::time::Duration;

use crate::error::{CalendarError, CalendarResult};
use crate::oauth::OAuthCredentials;
use crate::refresh_job::job_interval;

/// Configuration for the Google Calendar adapter.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// OAuth scopes requested on the consent screen.
    pub scopes: Vec<String>,

    /// Interval of the refresh job, also used as the refresh buffer.
    ///
    /// Human-readable, e.g. `"55 minute"`.
    pub refresh_interval: String,

    pub timeout: Duration,
    pub user_agent: String,

    pub auth_url: String,
    pub token_url: String,
    /// Base URL of the Calendar v3 API.
    pub api_base: String,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_REFRESH_INTERVAL: &'static str = "55 minute";
    pub const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Calendar read/write plus basic profile.
    pub const DEFAULT_SCOPES: &'static [&'static str] = &[
        "https://www.googleapis.com/auth/calendar",
        "https://www.googleapis.com/auth/calendar.events",
        "https://www.googleapis.com/auth/calendar.readonly",
        "https://www.googleapis.com/auth/userinfo.email",
        "https://www.googleapis.com/auth/userinfo.profile",
    ];

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calconnect/{}", env!("CARGO_PKG_VERSION")),
            auth_url: Self::AUTH_URL.to_string(),
            token_url: Self::TOKEN_URL.to_string(),
            api_base: Self::API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_refresh_interval(mut self, interval: impl Into<String>) -> Self {
        self.refresh_interval = interval.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Points every endpoint at `base` (authorize, token and API).
    ///
    /// Used to run the adapter against a local mock server.
    #[must_use]
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{base}/o/oauth2/v2/auth");
        self.token_url = format!("{base}/token");
        self.api_base = format!("{base}/calendar/v3");
        self
    }

    /// Space-separated scope string as sent to Google.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Parses the refresh interval.
    pub fn refresh_interval(&self) -> CalendarResult<Duration> {
        job_interval(&self.refresh_interval)
    }

    /// Validates the configuration and returns the parsed refresh interval.
    pub fn validate(&self) -> CalendarResult<Duration> {
        self.credentials
            .validate()
            .map_err(|e| CalendarError::configuration(format!("google: {e}")))?;
        if self.scopes.is_empty() {
            return Err(CalendarError::configuration("google: at least one scope is required"));
        }
        self.refresh_interval()
    }
}
