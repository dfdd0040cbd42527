//! Error types for calendar adapter operations.
//!
//! Every adapter operation fails with a [`CalendarError`] carrying a
//! [`CalendarErrorCode`], so callers can branch on the category without
//! matching on message text.

use std::fmt;

use calconnect_core::{IntervalError, TimeError};
use thiserror::Error;

use crate::store::StoreError;

/// The category of a calendar error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarErrorCode {
    /// Provider tag is neither `google` nor `outlook`.
    UnsupportedProvider,
    /// The token endpoint rejected an authorization code.
    AuthorizationFailed,
    /// No credential record exists for the user.
    NotRegistered,
    /// A record exists but holds no tokens for this provider.
    MissingProviderToken,
    /// A refresh is needed but no refresh token is stored.
    MissingRefreshToken,
    /// The provider answered with a non-success status.
    RemoteApiFailure,
    /// The provider throttled the request.
    RateLimited,
    /// Connection failed, timed out or was reset.
    NetworkError,
    /// The provider answered with a body we could not understand.
    InvalidResponse,
    /// The provider refused to create the event.
    EventCreationFailed,
    /// The provider accepted the event but returned no id or link.
    EventCreationIncomplete,
    /// An interval string did not parse.
    InvalidInterval,
    /// A caller-supplied argument (timestamp, timezone) is malformed.
    InvalidInput,
    /// The credential store failed.
    StoreError,
    /// Missing or invalid configuration.
    ConfigurationError,
    InternalError,
}

impl CalendarErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::RateLimited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedProvider => "unsupported_provider",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NotRegistered => "not_registered",
            Self::MissingProviderToken => "missing_provider_token",
            Self::MissingRefreshToken => "missing_refresh_token",
            Self::RemoteApiFailure => "remote_api_failure",
            Self::RateLimited => "rate_limited",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::EventCreationFailed => "event_creation_failed",
            Self::EventCreationIncomplete => "event_creation_incomplete",
            Self::InvalidInterval => "invalid_interval",
            Self::InvalidInput => "invalid_input",
            Self::StoreError => "store_error",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for CalendarErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while serving a calendar operation.
#[derive(Debug, Error)]
pub struct CalendarError {
    code: CalendarErrorCode,
    message: String,
    /// The provider that generated this error ("google", "outlook").
    provider: Option<String>,
    /// HTTP status returned by the provider, when there was one.
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CalendarError {
    pub fn new(code: CalendarErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            status: None,
            source: None,
        }
    }

    pub fn unsupported_provider(tag: &str) -> Self {
        Self::new(
            CalendarErrorCode::UnsupportedProvider,
            format!("unsupported calendar provider: {tag:?}"),
        )
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::AuthorizationFailed, message)
    }

    /// The user has never connected any provider.
    pub fn not_registered() -> Self {
        Self::new(CalendarErrorCode::NotRegistered, "User not registered!")
    }

    pub fn missing_provider_token(provider: &str) -> Self {
        Self::new(
            CalendarErrorCode::MissingProviderToken,
            format!("no {provider} tokens stored for user"),
        )
    }

    pub fn missing_refresh_token() -> Self {
        Self::new(
            CalendarErrorCode::MissingRefreshToken,
            "refresh token is not available",
        )
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::RemoteApiFailure, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::RateLimited, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::NetworkError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::InvalidResponse, message)
    }

    pub fn event_creation(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::EventCreationFailed, message)
    }

    pub fn event_creation_incomplete(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::EventCreationIncomplete, message)
    }

    pub fn invalid_interval(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::InvalidInterval, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::InvalidInput, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::StoreError, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::InternalError, message)
    }

    /// Maps a transport failure from `reqwest`.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else if err.is_decode() {
            return Self::invalid_response(format!("failed to decode response: {err}"))
                .with_source(err);
        } else {
            format!("request failed: {err}")
        };
        Self::network(message).with_source(err)
    }

    /// Maps a non-success HTTP status into the matching error.
    pub fn from_status(status: u16, retry_after: Option<u64>, body: &str) -> Self {
        let err = match status {
            429 => Self::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {s} seconds"))
                    .unwrap_or_default()
            )),
            401 => Self::remote("access token expired or invalid"),
            403 => Self::remote("access denied to calendar"),
            _ => Self::remote(format!("API error ({status}): {}", body.trim())),
        };
        err.with_status(status)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> CalendarErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<IntervalError> for CalendarError {
    fn from(err: IntervalError) -> Self {
        Self::new(CalendarErrorCode::InvalidInterval, err.to_string()).with_source(err)
    }
}

impl From<TimeError> for CalendarError {
    fn from(err: TimeError) -> Self {
        Self::invalid_input(err.to_string()).with_source(err)
    }
}

impl From<StoreError> for CalendarError {
    fn from(err: StoreError) -> Self {
        Self::store(err.to_string()).with_source(err)
    }
}

/// A specialized Result type for calendar operations.
pub type CalendarResult<T> = Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(CalendarErrorCode::NetworkError.is_retryable());
        assert!(CalendarErrorCode::RateLimited.is_retryable());
        assert!(!CalendarErrorCode::RemoteApiFailure.is_retryable());
        assert!(!CalendarErrorCode::NotRegistered.is_retryable());
    }

    #[test]
    fn not_registered_message() {
        let err = CalendarError::not_registered();
        assert_eq!(err.code(), CalendarErrorCode::NotRegistered);
        assert_eq!(err.message(), "User not registered!");
    }

    #[test]
    fn display_includes_provider_and_code() {
        let err = CalendarError::event_creation("Failed to save the event in Google Calendar")
            .with_provider("google");
        let display = err.to_string();
        assert!(display.starts_with("[google] event_creation_failed"));
        assert!(display.contains("Failed to save the event"));
    }

    #[test]
    fn status_mapping() {
        let err = CalendarError::from_status(429, Some(30), "");
        assert_eq!(err.code(), CalendarErrorCode::RateLimited);
        assert!(err.message().contains("retry after 30 seconds"));
        assert_eq!(err.status(), Some(429));

        let err = CalendarError::from_status(401, None, "");
        assert_eq!(err.code(), CalendarErrorCode::RemoteApiFailure);

        let err = CalendarError::from_status(500, None, " boom ");
        assert_eq!(err.message(), "API error (500): boom");
    }

    #[test]
    fn converts_core_errors() {
        let err: CalendarError = IntervalError::InvalidFormat("soon".into()).into();
        assert_eq!(err.code(), CalendarErrorCode::InvalidInterval);

        let err: CalendarError = TimeError::UnknownTimezone("Mars/Olympus".into()).into();
        assert_eq!(err.code(), CalendarErrorCode::InvalidInput);
    }

    #[test]
    fn with_source_is_exposed() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = CalendarError::store("failed to persist").with_source(io_err);
        assert!(err.source().is_some());
    }
}
