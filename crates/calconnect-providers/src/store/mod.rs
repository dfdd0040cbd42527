//! Credential persistence.
//!
//! Adapters and the refresh job only see the [`CredentialStore`] trait.
//! Two backends ship with the crate: [`MemoryStore`] for tests and
//! short-lived processes, and [`FileStore`], a single JSON document on
//! disk. [`open_store`] picks one from a connection string.

mod file;
mod memory;
mod record;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::provider::{BoxFuture, ProviderKind};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{CredentialRecord, DEFAULT_TOKEN_TYPE, TokenSet};

/// Errors raised by credential store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize credential store: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported credential store connection: {0}")]
    UnsupportedBackend(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed persistence for credential records.
///
/// Upserts are atomic per record: concurrent writers never observe a
/// half-merged document, but the last writer wins.
pub trait CredentialStore: Send + Sync {
    /// Looks up the record for `user_id`.
    fn find<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<CredentialRecord>>>;

    /// Creates the record when missing, then replaces `provider`'s tokens
    /// and stamps `updated_at`. Other providers' tokens are preserved.
    fn upsert_tokens<'a>(
        &'a self,
        user_id: &'a str,
        provider: ProviderKind,
        tokens: TokenSet,
    ) -> BoxFuture<'a, StoreResult<CredentialRecord>>;

    /// Returns every stored record.
    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<CredentialRecord>>>;
}

/// Opens a store from a connection string.
///
/// - `memory://` opens an empty in-memory store
/// - `file:///abs/path.json` or a plain path opens a [`FileStore`]
pub fn open_store(connection: &str) -> StoreResult<Arc<dyn CredentialStore>> {
    let connection = connection.trim();
    if connection.is_empty() {
        return Err(StoreError::UnsupportedBackend("empty connection string".into()));
    }

    match Url::parse(connection) {
        Ok(url) => match url.scheme() {
            "memory" => Ok(Arc::new(MemoryStore::new())),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| StoreError::UnsupportedBackend(connection.to_string()))?;
                Ok(Arc::new(FileStore::open(path)?))
            }
            // Windows drive letters parse as one-letter schemes.
            scheme if scheme.len() == 1 => Ok(Arc::new(FileStore::open(connection)?)),
            _ => Err(StoreError::UnsupportedBackend(connection.to_string())),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Arc::new(FileStore::open(connection)?)),
        Err(_) => Err(StoreError::UnsupportedBackend(connection.to_string())),
    }
}
