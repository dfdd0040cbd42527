//! Persisted credential documents.
//!
//! One [`CredentialRecord`] exists per user. It holds an optional
//! [`TokenSet`] per provider, so a user can be connected to Google and
//! Outlook at the same time.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

/// Token type used when the provider does not send one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// The OAuth tokens stored for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Absolute expiry of `access_token`.
    pub expiry_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

impl TokenSet {
    /// Whether `now` has reached `expiry_date - buffer`.
    pub fn is_due(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        let refresh_at = TimeDelta::from_std(buffer)
            .ok()
            .and_then(|delta| self.expiry_date.checked_sub_signed(delta));
        match refresh_at {
            Some(refresh_at) => now >= refresh_at,
            None => true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }
}

/// All credentials stored for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RecordDocument")]
pub struct CredentialRecord {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<TokenSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlook: Option<TokenSet>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            google: None,
            outlook: None,
            updated_at: Utc::now(),
        }
    }

    pub fn tokens(&self, provider: ProviderKind) -> Option<&TokenSet> {
        match provider {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Outlook => self.outlook.as_ref(),
        }
    }

    /// Replaces one provider's tokens, leaving the others untouched.
    pub fn set_tokens(&mut self, provider: ProviderKind, tokens: TokenSet) {
        match provider {
            ProviderKind::Google => self.google = Some(tokens),
            ProviderKind::Outlook => self.outlook = Some(tokens),
        }
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn with_tokens(mut self, provider: ProviderKind, tokens: TokenSet) -> Self {
        self.set_tokens(provider, tokens);
        self
    }
}

/// On-disk shape accepted when reading.
///
/// Besides the nested layout this also accepts the older flat layout,
/// where Google tokens sat directly on the user document.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordDocument {
    user_id: String,
    #[serde(default)]
    google: Option<TokenSet>,
    #[serde(default)]
    outlook: Option<TokenSet>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    id_token: Option<String>,
}

impl From<RecordDocument> for CredentialRecord {
    fn from(doc: RecordDocument) -> Self {
        let legacy = match (doc.google.is_none(), doc.access_token) {
            (true, Some(access_token)) => Some(TokenSet {
                access_token,
                refresh_token: doc.refresh_token,
                scope: doc.scope.unwrap_or_default(),
                token_type: doc.token_type.unwrap_or_else(default_token_type),
                // Unknown expiry: treat as already expired.
                expiry_date: doc.expiry_date.unwrap_or(DateTime::UNIX_EPOCH),
                id_token: doc.id_token,
            }),
            _ => None,
        };

        Self {
            user_id: doc.user_id,
            google: doc.google.or(legacy),
            outlook: doc.outlook,
            updated_at: doc.updated_at.unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(expiry: DateTime<Utc>) -> TokenSet {
        TokenSet {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            scope: "calendar".into(),
            token_type: "Bearer".into(),
            expiry_date: expiry,
            id_token: None,
        }
    }

    #[test]
    fn due_inside_buffer() {
        let now = Utc::now();
        let buffer = Duration::from_secs(55 * 60);

        assert!(!tokens(now + TimeDelta::hours(2)).is_due(now, buffer));
        assert!(tokens(now + TimeDelta::minutes(30)).is_due(now, buffer));
        assert!(tokens(now - TimeDelta::minutes(1)).is_due(now, buffer));
        assert!(tokens(now + TimeDelta::minutes(30)).is_due(now, Duration::MAX));
    }

    #[test]
    fn set_tokens_preserves_other_provider() {
        let expiry = Utc::now() + TimeDelta::hours(1);
        let mut record = CredentialRecord::new("u1").with_tokens(ProviderKind::Google, tokens(expiry));

        let mut outlook = tokens(expiry);
        outlook.access_token = "outlook-at".into();
        record.set_tokens(ProviderKind::Outlook, outlook);

        assert_eq!(record.tokens(ProviderKind::Google).unwrap().access_token, "at");
        assert_eq!(record.tokens(ProviderKind::Outlook).unwrap().access_token, "outlook-at");
    }

    #[test]
    fn reads_nested_document() {
        let record: CredentialRecord = serde_json::from_value(json!({
            "userId": "u1",
            "outlook": {
                "accessToken": "at",
                "refreshToken": "rt",
                "scope": "Calendars.ReadWrite",
                "tokenType": "Bearer",
                "expiryDate": "2024-12-10T10:00:00Z"
            },
            "updatedAt": "2024-12-10T09:00:00Z"
        }))
        .unwrap();

        assert!(record.google.is_none());
        assert_eq!(record.outlook.unwrap().scope, "Calendars.ReadWrite");
    }

    #[test]
    fn reads_legacy_flat_document_as_google() {
        let record: CredentialRecord = serde_json::from_value(json!({
            "userId": "legacy",
            "accessToken": "old-at",
            "refreshToken": "old-rt",
            "scope": "https://www.googleapis.com/auth/calendar",
            "tokenType": "Bearer",
            "expiryDate": "2024-12-10T10:00:00Z",
            "idToken": "jwt",
            "updatedAt": "2024-12-10T09:00:00Z"
        }))
        .unwrap();

        let google = record.google.as_ref().unwrap();
        assert_eq!(google.access_token, "old-at");
        assert_eq!(google.refresh_token.as_deref(), Some("old-rt"));
        assert_eq!(google.id_token.as_deref(), Some("jwt"));
        assert!(record.outlook.is_none());
    }

    #[test]
    fn legacy_document_without_expiry_reads_as_expired() {
        let record: CredentialRecord = serde_json::from_value(json!({
            "userId": "legacy",
            "accessToken": "old-at"
        }))
        .unwrap();

        let google = record.google.unwrap();
        assert!(google.is_expired(Utc::now()));
        assert_eq!(google.token_type, "Bearer");
        assert!(google.refresh_token.is_none());
    }

    #[test]
    fn writes_nested_shape_only() {
        let legacy: CredentialRecord = serde_json::from_value(json!({
            "userId": "legacy",
            "accessToken": "old-at",
            "expiryDate": "2024-12-10T10:00:00Z"
        }))
        .unwrap();

        let written = serde_json::to_value(&legacy).unwrap();
        assert!(written.get("accessToken").is_none());
        assert_eq!(written["google"]["accessToken"], "old-at");
        assert!(written.get("outlook").is_none());
    }
}
