//! Google Calendar adapter.
//!
//! - OAuth 2.0 authorization-code flow with offline access, so Google
//!   issues a refresh token
//! - Event listing through Calendar v3 `events.list` with recurring events
//!   expanded server-side and pagination followed
//! - Event creation with a fixed reminder policy
//!
//! # Example
//!
//! ```ignore
//! use calconnect_providers::google::{GoogleAdapter, GoogleConfig};
//! use calconnect_providers::{CalendarAdapter, OAuthCredentials, open_store};
//!
//! let config = GoogleConfig::new(OAuthCredentials::new(id, secret, redirect_uri));
//! let adapter = GoogleAdapter::new(config, open_store("memory://")?)?;
//! println!("visit {}", adapter.connect());
//! ```

mod adapter;
mod client;
mod config;

pub use adapter::GoogleAdapter;
pub use client::{EventPayload, GoogleCalendarClient, InsertedEvent};
pub use config::GoogleConfig;
