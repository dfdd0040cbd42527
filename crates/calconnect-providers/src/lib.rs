//! CalendarAdapter trait, credential store and provider implementations.
//!
//! - [`CalendarAdapter`] - The capability set every calendar provider implements
//! - [`CredentialStore`] - Persistence for per-user OAuth tokens
//! - [`TokenManager`] - Code exchange and refresh against a token endpoint
//! - [`RefreshJob`] - Periodic background refresh of every stored user
//! - [`CalendarError`] - Error type for adapter operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐
//! │  Google API     │    │ Microsoft Graph  │
//! └────────┬────────┘    └────────┬─────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │  GoogleAdapter  │    │ OutlookAdapter  │
//! └────────┬────────┘    └────────┬────────┘
//!          │   CalendarAdapter    │
//!          └──────────┬───────────┘
//!                     ▼
//!        ┌────────────────────────┐
//!        │ TokenManager/RefreshJob│
//!        └───────────┬────────────┘
//!                    ▼
//!          ┌──────────────────┐
//!          │ CredentialStore  │
//!          └──────────────────┘
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
mod http;
pub mod oauth;
#[cfg(feature = "outlook")]
pub mod outlook;
pub mod provider;
pub mod refresh_job;
pub mod store;
pub mod tokens;

// Re-export main types at crate root
pub use error::{CalendarError, CalendarErrorCode, CalendarResult};
pub use oauth::{OAuthCredentials, RefreshedToken, TokenEndpoint, TokenResponse, generate_state};
pub use provider::{BoxFuture, CalendarAdapter, Credentials, ProviderKind};
pub use refresh_job::{CycleReport, JobState, RefreshFn, RefreshJob, job_interval, run_cycle};
pub use store::{
    CredentialRecord, CredentialStore, FileStore, MemoryStore, StoreError, StoreResult, TokenSet,
    open_store,
};
pub use tokens::{RefreshOutcome, TokenManager};
