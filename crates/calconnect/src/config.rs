//! Application configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/calconnect/config.toml`.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `env::VAR_NAME` - resolved from the environment
//! - `file::/path` - read from a file
//! - plain text - used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use calconnect_core::{TracingConfig, TracingOutputFormat, parse_level};
use calconnect_providers::{OAuthCredentials, ProviderKind, job_interval};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::service::ProviderCredentials;

/// Configuration for the calconnect binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider tag: `google` or `outlook`.
    pub provider: Option<String>,

    /// Credential store connection string (`memory://`, `file:///…`, or a path).
    pub store: Option<String>,

    /// Refresh job interval applied to every provider, e.g. `"55 minute"`.
    pub refresh_interval: Option<String>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    pub google: Option<ProviderSettings>,
    pub outlook: Option<ProviderSettings>,

    pub logging: LoggingSettings,
}

/// Per-provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// OAuth client ID (supports `env::` and `file::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `env::` and `file::` prefixes).
    pub client_secret: Option<String>,

    pub redirect_uri: Option<String>,

    /// Microsoft identity platform tenant (Outlook only).
    pub tenant: Option<String>,

    /// Overrides the top-level `refresh_interval` for this provider.
    pub refresh_interval: Option<String>,

    /// Alternate endpoint root, for testing against a mock server.
    pub base_url: Option<String>,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: TracingOutputFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: TracingOutputFormat::Pretty,
        }
    }
}

impl LoggingSettings {
    /// Builds the tracing configuration; `debug` forces the debug level.
    pub fn tracing_config(&self, debug: bool) -> AppResult<TracingConfig> {
        let level = if debug {
            tracing::Level::DEBUG
        } else {
            parse_level(&self.level).map_err(|e| AppError::Config(e.to_string()))?
        };
        Ok(TracingConfig::cli(debug)
            .with_level(level)
            .with_format(self.format))
    }
}

impl AppConfig {
    pub const DEFAULT_PROVIDER: &'static str = "google";

    /// Loads configuration from the default path, or defaults when absent.
    pub fn load() -> AppResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calconnect")
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calconnect")
    }

    /// Provider tag from the command line, the file, or the default.
    pub fn provider_tag<'a>(&'a self, cli_override: Option<&'a str>) -> &'a str {
        cli_override
            .or(self.provider.as_deref())
            .unwrap_or(Self::DEFAULT_PROVIDER)
    }

    /// Store connection string, defaulting to a JSON file in the data dir.
    pub fn store_connection(&self) -> String {
        self.store.clone().unwrap_or_else(|| {
            Self::default_data_dir()
                .join("credentials.json")
                .display()
                .to_string()
        })
    }

    pub fn provider_settings(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        match kind {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Outlook => self.outlook.as_ref(),
        }
    }

    /// Resolves everything the service needs to build `kind`'s adapter.
    pub fn provider_credentials(&self, kind: ProviderKind) -> AppResult<ProviderCredentials> {
        let settings = self.provider_settings(kind).ok_or_else(|| {
            AppError::Config(format!(
                "no [{kind}] section in {}. Add:\n  \
                 [{kind}]\n  \
                 client_id = \"...\"\n  \
                 client_secret = \"env::SECRET_VAR\"\n  \
                 redirect_uri = \"https://example.com/callback\"",
                Self::default_path().display()
            ))
        })?;

        let mut credentials = ProviderCredentials::new(settings.resolve_oauth(kind)?);
        if let Some(interval) = settings
            .refresh_interval
            .as_ref()
            .or(self.refresh_interval.as_ref())
        {
            credentials = credentials.with_refresh_interval(interval.clone());
        }
        if let Some(ref tenant) = settings.tenant {
            credentials = credentials.with_tenant(tenant.clone());
        }
        if let Some(ref base) = settings.base_url {
            credentials = credentials.with_base_url(base.clone());
        }
        if let Some(secs) = self.timeout {
            credentials = credentials.with_timeout(Duration::from_secs(secs));
        }
        Ok(credentials)
    }

    /// Checks the selected provider's section and every interval string.
    pub fn validate(&self, provider: ProviderKind) -> AppResult<()> {
        let intervals = [
            self.refresh_interval.as_ref(),
            self.google.as_ref().and_then(|g| g.refresh_interval.as_ref()),
            self.outlook.as_ref().and_then(|o| o.refresh_interval.as_ref()),
        ];
        for interval in intervals.into_iter().flatten() {
            job_interval(interval).map_err(|e| AppError::Config(e.message().to_string()))?;
        }
        if self.timeout == Some(0) {
            return Err(AppError::Config("timeout must be greater than zero".into()));
        }

        let credentials = self.provider_credentials(provider)?;
        credentials
            .oauth
            .validate()
            .map_err(|e| AppError::Config(format!("invalid {provider} credentials: {e}")))?;
        Ok(())
    }
}

impl ProviderSettings {
    /// Resolves secret references into concrete OAuth credentials.
    pub(crate) fn resolve_oauth(&self, kind: ProviderKind) -> AppResult<OAuthCredentials> {
        let field = |value: &Option<String>, name: &str| -> AppResult<String> {
            let raw = value
                .as_deref()
                .ok_or_else(|| AppError::Config(format!("{name} is missing from [{kind}] section")))?;
            crate::secret::resolve(raw).map_err(|e| AppError::Secret(format!("{name}: {e}")))
        };

        Ok(OAuthCredentials::new(
            field(&self.client_id, "client_id")?,
            field(&self.client_secret, "client_secret")?,
            field(&self.redirect_uri, "redirect_uri")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
provider = "outlook"
store = "memory://"
refresh_interval = "30 minutes"
timeout = 10

[google]
client_id = "g-id.apps.googleusercontent.com"
client_secret = "g-secret"
redirect_uri = "https://example.com/google"

[outlook]
client_id = "ms-id"
client_secret = "env::_CALCONNECT_CFG_TEST_SECRET"
redirect_uri = "https://example.com/outlook"
tenant = "consumers"
refresh_interval = "45 minute"

[logging]
level = "debug"
format = "json"
"#;

    #[test]
    fn defaults_when_empty() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.provider_tag(None), "google");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, TracingOutputFormat::Pretty);
        assert!(config.store_connection().ends_with("credentials.json"));
    }

    #[test]
    fn parses_full_file() {
        unsafe {
            std::env::set_var("_CALCONNECT_CFG_TEST_SECRET", "ms-secret");
        }
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.provider_tag(None), "outlook");
        assert_eq!(config.provider_tag(Some("google")), "google");
        assert_eq!(config.store_connection(), "memory://");
        assert_eq!(config.logging.format, TracingOutputFormat::Json);

        let outlook = config.provider_credentials(ProviderKind::Outlook).unwrap();
        assert_eq!(outlook.oauth.client_secret, "ms-secret");
        assert_eq!(outlook.tenant.as_deref(), Some("consumers"));
        assert_eq!(outlook.refresh_interval.as_deref(), Some("45 minute"));
        assert_eq!(outlook.timeout, Some(Duration::from_secs(10)));

        let google = config.provider_credentials(ProviderKind::Google).unwrap();
        assert_eq!(google.refresh_interval.as_deref(), Some("30 minutes"));
        assert!(config.validate(ProviderKind::Google).is_ok());
        unsafe {
            std::env::remove_var("_CALCONNECT_CFG_TEST_SECRET");
        }
    }

    #[test]
    fn missing_section_is_config_error() {
        let config = AppConfig::parse("provider = \"outlook\"").unwrap();
        let err = config.provider_credentials(ProviderKind::Outlook).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("[outlook]")));
    }

    #[test]
    fn missing_redirect_uri() {
        let config = AppConfig::parse("[google]\nclient_id = \"a\"\nclient_secret = \"b\"\n").unwrap();
        let err = config.provider_credentials(ProviderKind::Google).unwrap_err();
        assert!(err.to_string().contains("redirect_uri"));
    }

    #[test]
    fn validate_rejects_bad_interval() {
        let content = r#"
refresh_interval = "soonish"
[google]
client_id = "a"
client_secret = "b"
redirect_uri = "https://x/cb"
"#;
        let config = AppConfig::parse(content).unwrap();
        assert!(config.validate(ProviderKind::Google).is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let content = r#"
[outlook]
client_id = "a"
client_secret = "b"
redirect_uri = "https://x/cb"
refresh_interval = "0 minute"
"#;
        let config = AppConfig::parse(content).unwrap();
        let err = config.validate(ProviderKind::Outlook).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "provider = \"google\"\nstore = \"memory://\"\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.store.as_deref(), Some("memory://"));

        assert!(AppConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn logging_settings_build_tracing_config() {
        let settings = LoggingSettings {
            level: "error".into(),
            format: TracingOutputFormat::Compact,
        };
        let config = settings.tracing_config(false).unwrap();
        assert_eq!(config.default_level, tracing::Level::ERROR);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert_eq!(settings.tracing_config(true).unwrap().default_level, tracing::Level::DEBUG);

        let bad = LoggingSettings {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(bad.tracing_config(false).is_err());
    }
}
