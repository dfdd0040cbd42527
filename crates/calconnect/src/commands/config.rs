//! Configuration commands.

use calconnect_providers::ProviderKind;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &AppConfig) -> AppResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| AppError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", AppConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration for the selected provider.
pub fn validate(config: &AppConfig, provider: &str) -> AppResult<()> {
    let kind: ProviderKind = provider.parse()?;
    config.validate(kind)?;
    println!("{} credentials are valid.", kind.display_name());
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> AppResult<()> {
    println!("config: {}", AppConfig::default_path().display());
    println!("store: {}", AppConfig::default().store_connection());
    Ok(())
}
