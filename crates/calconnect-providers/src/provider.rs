//! CalendarAdapter trait definition.
//!
//! An adapter is the provider-specific implementation of the capability set
//! shared by Google Calendar and Outlook: building the authorization URL,
//! exchanging codes, listing and creating events, refreshing tokens and
//! driving its own token refresh job.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use calconnect_core::{EventCreated, EventQuery, NewEvent, Slot};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};
use crate::store::TokenSet;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The calendar providers we can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Outlook,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Outlook => "outlook",
        }
    }

    /// Human-readable name used in user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google Calendar",
            Self::Outlook => "Outlook Calendar",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "outlook" => Ok(Self::Outlook),
            _ => Err(CalendarError::unsupported_provider(s)),
        }
    }
}

/// The access/refresh token pair returned by a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// The capability set every calendar provider implements.
///
/// Methods return boxed futures so the trait stays object safe and the
/// service can hold a `Box<dyn CalendarAdapter>`.
pub trait CalendarAdapter: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> ProviderKind;

    /// Builds the OAuth2 authorization URL the user must visit.
    ///
    /// Pure: no I/O and no state change. Each call embeds a fresh random
    /// `state` value.
    fn connect(&self) -> String;

    /// Exchanges an authorization code and persists the resulting tokens
    /// for `user_id`, creating the credential record when missing.
    fn access<'a>(&'a self, code: &'a str, user_id: &'a str) -> BoxFuture<'a, CalendarResult<TokenSet>>;

    /// Lists events overlapping the query window, ordered by start time.
    ///
    /// Uses the stored access token as is; an expired token surfaces as a
    /// remote failure.
    fn get_events_in_range<'a>(
        &'a self,
        user_id: &'a str,
        query: &'a EventQuery,
    ) -> BoxFuture<'a, CalendarResult<Vec<Slot>>>;

    /// Creates an event on the user's calendar.
    fn create_event<'a>(
        &'a self,
        user_id: &'a str,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, CalendarResult<EventCreated>>;

    /// Refreshes the user's access token when it is within the refresh
    /// buffer of its expiry; otherwise returns the stored pair untouched.
    fn refresh_access_token<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, CalendarResult<Credentials>>;

    /// Starts the periodic token refresh job. Starting twice is a no-op.
    fn start_job(&self) -> CalendarResult<()>;

    /// Stops the refresh job. Stopping a stopped job is a no-op.
    fn stop_job(&self);

    /// Whether the refresh job is currently scheduled.
    fn is_job_running(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarErrorCode;

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("Outlook".parse::<ProviderKind>().unwrap(), ProviderKind::Outlook);
        assert_eq!(" GOOGLE ".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
    }

    #[test]
    fn unknown_provider_is_unsupported() {
        let err = "yahoo".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::UnsupportedProvider);
    }

    #[test]
    fn provider_kind_display() {
        assert_eq!(ProviderKind::Google.to_string(), "google");
        assert_eq!(ProviderKind::Outlook.display_name(), "Outlook Calendar");
    }
}
