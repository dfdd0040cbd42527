//! Calendar service facade, configuration and CLI
//!
//! This crate provides [`CalendarService`] and the `calconnect` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod service;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use service::{CalendarService, ProviderCredentials};
