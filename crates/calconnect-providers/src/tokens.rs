//! Per-user token lookup, exchange and refresh.
//!
//! [`TokenManager`] is the piece both adapters share: it ties a provider's
//! [`TokenEndpoint`] to the credential store and owns the refresh decision.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{CalendarError, CalendarResult};
use crate::oauth::TokenEndpoint;
use crate::provider::{Credentials, ProviderKind};
use crate::store::{CredentialStore, TokenSet};

/// What a refresh call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token was obtained and stored.
    Refreshed,
    /// The stored token was outside the refresh buffer; nothing was done.
    StillValid,
}

/// Token operations for one provider against a shared store.
pub struct TokenManager {
    provider: ProviderKind,
    store: Arc<dyn CredentialStore>,
    endpoint: TokenEndpoint,
    /// Scope recorded when the token response does not echo one.
    requested_scope: String,
    refresh_buffer: Duration,
}

impl TokenManager {
    pub fn new(
        provider: ProviderKind,
        store: Arc<dyn CredentialStore>,
        endpoint: TokenEndpoint,
        requested_scope: impl Into<String>,
        refresh_buffer: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            endpoint,
            requested_scope: requested_scope.into(),
            refresh_buffer,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn endpoint(&self) -> &TokenEndpoint {
        &self.endpoint
    }

    pub fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    /// Exchanges `code` and upserts the resulting tokens for `user_id`.
    pub async fn exchange(&self, code: &str, user_id: &str) -> CalendarResult<TokenSet> {
        let response = self.endpoint.exchange_code(code).await?;
        let tokens = response.into_token_set(&self.requested_scope, Utc::now())?;

        self.store
            .upsert_tokens(user_id, self.provider, tokens.clone())
            .await?;

        info!(
            user_id,
            provider = %self.provider,
            has_refresh_token = tokens.refresh_token.is_some(),
            "stored tokens for user"
        );
        Ok(tokens)
    }

    /// Loads this provider's stored tokens for `user_id`.
    pub async fn tokens_for(&self, user_id: &str) -> CalendarResult<TokenSet> {
        let record = self
            .store
            .find(user_id)
            .await?
            .ok_or_else(CalendarError::not_registered)?;

        record
            .tokens(self.provider)
            .cloned()
            .ok_or_else(|| CalendarError::missing_provider_token(self.provider.as_str()))
    }

    /// Refreshes the access token when it is within the buffer of expiry.
    ///
    /// The provider may rotate the refresh token; when it does not, the
    /// previous one is kept.
    pub async fn refresh(&self, user_id: &str) -> CalendarResult<(Credentials, RefreshOutcome)> {
        let mut tokens = self.tokens_for(user_id).await?;
        let refresh_token = tokens
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(CalendarError::missing_refresh_token)?;

        let now = Utc::now();
        if !tokens.is_due(now, self.refresh_buffer) {
            debug!(user_id, provider = %self.provider, expiry = %tokens.expiry_date, "token still valid");
            let credentials = Credentials {
                access_token: tokens.access_token,
                refresh_token,
            };
            return Ok((credentials, RefreshOutcome::StillValid));
        }

        let refreshed = self.endpoint.refresh(&refresh_token, now).await?;
        let refresh_token = refreshed.refresh_token.unwrap_or(refresh_token);
        tokens.access_token = refreshed.access_token;
        tokens.expiry_date = refreshed.expiry_date;
        tokens.refresh_token = Some(refresh_token.clone());
        if let Some(id_token) = refreshed.id_token {
            tokens.id_token = Some(id_token);
        }

        let access_token = tokens.access_token.clone();
        let expiry = tokens.expiry_date;
        self.store.upsert_tokens(user_id, self.provider, tokens).await?;

        info!(user_id, provider = %self.provider, expiry = %expiry, "refreshed access token");
        Ok((
            Credentials {
                access_token,
                refresh_token,
            },
            RefreshOutcome::Refreshed,
        ))
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("provider", &self.provider)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish_non_exhaustive()
    }
}
