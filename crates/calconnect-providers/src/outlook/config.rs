//! Outlook (Microsoft Graph) adapter configuration.

use std::time::Duration;

use crate::error::{CalendarError, CalendarResult};
use crate::oauth::OAuthCredentials;
use crate::refresh_job::job_interval;

/// Configuration for the Outlook adapter.
#[derive(Debug, Clone)]
pub struct OutlookConfig {
    pub credentials: OAuthCredentials,

    /// Identity platform tenant: `common`, `consumers`, `organizations` or
    /// a directory id.
    pub tenant: String,

    pub scopes: Vec<String>,

    /// Interval of the refresh job, also used as the refresh buffer.
    pub refresh_interval: String,

    pub timeout: Duration,
    pub user_agent: String,

    /// Identity platform root; the tenant path is appended.
    pub login_base: String,
    /// Microsoft Graph root, e.g. `https://graph.microsoft.com/v1.0`.
    pub api_base: String,
}

impl OutlookConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_REFRESH_INTERVAL: &'static str = "55 minute";
    pub const DEFAULT_TENANT: &'static str = "common";
    pub const LOGIN_BASE: &'static str = "https://login.microsoftonline.com";
    pub const API_BASE: &'static str = "https://graph.microsoft.com/v1.0";
    pub const DEFAULT_SCOPES: &'static [&'static str] =
        &["offline_access", "Calendars.ReadWrite", "User.Read"];

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            tenant: Self::DEFAULT_TENANT.to_string(),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calconnect/{}", env!("CARGO_PKG_VERSION")),
            login_base: Self::LOGIN_BASE.to_string(),
            api_base: Self::API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
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

    /// Points the identity platform and Graph at `base`.
    #[must_use]
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.login_base = base.to_string();
        self.api_base = format!("{base}/v1.0");
        self
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/authorize", self.login_base, self.tenant)
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_base, self.tenant)
    }

    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn refresh_interval(&self) -> CalendarResult<Duration> {
        job_interval(&self.refresh_interval)
    }

    /// Validates the configuration and returns the parsed refresh interval.
    pub fn validate(&self) -> CalendarResult<Duration> {
        self.credentials
            .validate()
            .map_err(|e| CalendarError::configuration(format!("outlook: {e}")))?;
        if self.tenant.trim().is_empty() {
            return Err(CalendarError::configuration("outlook: tenant is required"));
        }
        if self.scopes.is_empty() {
            return Err(CalendarError::configuration("outlook: at least one scope is required"));
        }
        if !self.scopes.iter().any(|s| s == "offline_access") {
            return Err(CalendarError::configuration(
                "outlook: offline_access scope is required to obtain refresh tokens",
            ));
        }
        self.refresh_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarErrorCode;

    fn credentials() -> OAuthCredentials {
        OAuthCredentials::new("app-id", "secret", "https://app/cb")
    }

    #[test]
    fn defaults_to_common_tenant() {
        let config = OutlookConfig::new(credentials());
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
        assert_eq!(config.scope_string(), "offline_access Calendars.ReadWrite User.Read");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tenant_override() {
        let config = OutlookConfig::new(credentials()).with_tenant("consumers");
        assert!(config.authorize_url().contains("/consumers/oauth2/v2.0/authorize"));
    }

    #[test]
    fn offline_access_is_required() {
        let config = OutlookConfig::new(credentials()).with_scopes(vec!["Calendars.Read".into()]);
        assert_eq!(config.validate().unwrap_err().code(), CalendarErrorCode::ConfigurationError);
    }

    #[test]
    fn invalid_interval() {
        let config = OutlookConfig::new(credentials()).with_refresh_interval("5");
        assert_eq!(config.validate().unwrap_err().code(), CalendarErrorCode::InvalidInterval);
    }
}
