//! Application error types.

use calconnect_providers::{CalendarError, StoreError};
use thiserror::Error;

/// Result type for CLI and service-construction operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the `calconnect` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("secret resolution failed: {0}")]
    Secret(String),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_errors_keep_their_display() {
        let err: AppError = CalendarError::not_registered().with_provider("google").into();
        assert_eq!(err.to_string(), "[google] not_registered: User not registered!");
    }

    #[test]
    fn config_error_display() {
        let err = AppError::Config("missing [google] section".into());
        assert_eq!(err.to_string(), "configuration error: missing [google] section");
    }
}
