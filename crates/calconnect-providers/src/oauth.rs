//! OAuth2 authorization-code plumbing shared by both providers.
//!
//! Google and Microsoft identity platforms speak the same token endpoint
//! dialect: form-encoded `authorization_code` and `refresh_token` grants
//! answered with a JSON token response. Only the URLs and an optional
//! `scope` parameter differ.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CalendarError, CalendarResult};
use crate::store::{DEFAULT_TOKEN_TYPE, TokenSet};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// OAuth client credentials for one provider application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Where the provider sends the user back with `?code=...`.
    pub redirect_uri: String,
}

impl OAuthCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Checks every field is filled in.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required".to_string());
        }
        if self.client_secret.trim().is_empty() {
            return Err("client_secret is required".to_string());
        }
        if self.redirect_uri.trim().is_empty() {
            return Err("redirect_uri is required".to_string());
        }
        Ok(())
    }
}

/// Response from a token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry computed from `expires_in`.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS).max(0);
        now + TimeDelta::seconds(secs)
    }

    /// Builds a fresh [`TokenSet`]; fails when no access token was issued.
    pub fn into_token_set(self, fallback_scope: &str, now: DateTime<Utc>) -> CalendarResult<TokenSet> {
        let expiry_date = self.expiry_from(now);
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CalendarError::authorization("token response did not include an access token"))?;

        Ok(TokenSet {
            access_token,
            refresh_token: self.refresh_token,
            scope: self.scope.unwrap_or_else(|| fallback_scope.to_string()),
            token_type: self.token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            expiry_date,
            id_token: self.id_token,
        })
    }
}

/// Outcome of a successful `refresh_token` grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Present only when the provider rotated the refresh token.
    pub refresh_token: Option<String>,
    pub expiry_date: DateTime<Utc>,
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Validates a refresh answer; fails when no access token was issued.
    pub fn into_refreshed(self, now: DateTime<Utc>) -> CalendarResult<RefreshedToken> {
        let expiry_date = self.expiry_from(now);
        let access_token = self.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            CalendarError::invalid_response("refresh response did not include an access token")
        })?;

        Ok(RefreshedToken {
            access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expiry_date,
            id_token: self.id_token,
        })
    }
}

/// Client for a provider's OAuth2 token endpoint.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    http_client: reqwest::Client,
    token_url: String,
    credentials: OAuthCredentials,
    /// Sent with both grants when set (Microsoft requires it).
    scope: Option<String>,
}

impl TokenEndpoint {
    pub fn new(
        token_url: impl Into<String>,
        credentials: OAuthCredentials,
        timeout: Duration,
    ) -> CalendarResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CalendarError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            token_url: token_url.into(),
            credentials,
            scope: None,
        })
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// A non-success answer is an authorization failure: the code was
    /// rejected, expired or already used.
    pub async fn exchange_code(&self, code: &str) -> CalendarResult<TokenResponse> {
        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];
        if let Some(ref scope) = self.scope {
            params.push(("scope", scope.as_str()));
        }

        let (status, body) = self.post(&params).await?;
        if !(200..300).contains(&status) {
            return Err(CalendarError::authorization(format!(
                "token exchange failed ({status}): {}",
                body.trim()
            ))
            .with_status(status));
        }

        let response = parse_token_response(&body)?;
        info!("exchanged authorization code for tokens");
        Ok(response)
    }

    /// Redeems a refresh token. Expiry counts from `now`.
    pub async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> CalendarResult<RefreshedToken> {
        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(ref scope) = self.scope {
            params.push(("scope", scope.as_str()));
        }

        let (status, body) = self.post(&params).await?;
        if !(200..300).contains(&status) {
            return Err(CalendarError::remote(format!(
                "token refresh failed ({status}): {}",
                body.trim()
            ))
            .with_status(status));
        }

        let refreshed = parse_token_response(&body)?.into_refreshed(now)?;
        debug!(rotated = refreshed.refresh_token.is_some(), "refreshed access token");
        Ok(refreshed)
    }

    async fn post(&self, params: &[(&str, &str)]) -> CalendarResult<(u16, String)> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(CalendarError::from_transport)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(CalendarError::from_transport)?;
        Ok((status, body))
    }
}

fn parse_token_response(body: &str) -> CalendarResult<TokenResponse> {
    serde_json::from_str(body)
        .map_err(|e| CalendarError::invalid_response(format!("invalid token response: {e}")).with_source(e))
}

/// Generates a random anti-forgery `state` value.
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Appends URL-encoded query parameters to an endpoint URL.
pub(crate) fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarErrorCode;

    #[test]
    fn state_is_random_and_url_safe() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b);
        assert_eq!(a.len(), 22);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn query_is_encoded() {
        let url = with_query("https://auth.example/authorize", &[("scope", "a b"), ("state", "x/y")]);
        assert_eq!(url, "https://auth.example/authorize?scope=a%20b&state=x%2Fy");
        assert_eq!(with_query("https://x?a=1", &[("b", "2")]), "https://x?a=1&b=2");
    }

    #[test]
    fn token_set_from_response() {
        let now = Utc::now();
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"at","refresh_token":"rt","expires_in":1800,"token_type":"Bearer"}"#,
        )
        .unwrap();

        let tokens = response.into_token_set("calendar", now).unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.scope, "calendar");
        assert_eq!(tokens.expiry_date, now + TimeDelta::seconds(1800));
    }

    #[test]
    fn missing_expiry_defaults_to_an_hour() {
        let now = Utc::now();
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"at"}"#).unwrap();
        assert_eq!(response.expiry_from(now), now + TimeDelta::seconds(3600));
        assert_eq!(response.into_token_set("", now).unwrap().token_type, "Bearer");
    }

    #[test]
    fn missing_access_token_is_authorization_failure() {
        let response: TokenResponse = serde_json::from_str(r#"{"refresh_token":"rt"}"#).unwrap();
        let err = response.into_token_set("", Utc::now()).unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::AuthorizationFailed);
    }

    #[test]
    fn refresh_answer_needs_an_access_token() {
        let now = Utc::now();
        for body in [r#"{"refresh_token":"rt2"}"#, r#"{"access_token":"","expires_in":60}"#] {
            let response: TokenResponse = serde_json::from_str(body).unwrap();
            let err = response.into_refreshed(now).unwrap_err();
            assert_eq!(err.code(), CalendarErrorCode::InvalidResponse);
        }

        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"at2","refresh_token":"","expires_in":60}"#).unwrap();
        let refreshed = response.into_refreshed(now).unwrap();
        assert_eq!(refreshed.access_token, "at2");
        assert_eq!(refreshed.refresh_token, None);
        assert_eq!(refreshed.expiry_date, now + TimeDelta::seconds(60));
    }

    #[test]
    fn credentials_validation() {
        assert!(OAuthCredentials::new("id", "secret", "https://app/cb").validate().is_ok());
        assert!(OAuthCredentials::new("", "secret", "https://app/cb").validate().is_err());
        assert!(OAuthCredentials::new("id", " ", "https://app/cb").validate().is_err());
        assert!(OAuthCredentials::new("id", "secret", "").validate().is_err());
    }
}
