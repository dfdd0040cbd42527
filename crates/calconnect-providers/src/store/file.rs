use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{CredentialRecord, CredentialStore, StoreError, StoreResult, TokenSet};
use crate::provider::{BoxFuture, ProviderKind};

/// Credential store backed by one JSON file.
///
/// The whole file is loaded at open and rewritten on every upsert through a
/// temp file and a rename, so readers never see a partial document. On Unix
/// the file is restricted to the owner.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl FileStore {
    /// Opens the store, reading existing records when the file exists.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let records = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            let records: Vec<CredentialRecord> = if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            };
            info!(path = %path.display(), records = records.len(), "loaded credential store");
            records
                .into_iter()
                .map(|record| (record.user_id.clone(), record))
                .collect()
        } else {
            debug!(path = %path.display(), "no credential store file yet");
            HashMap::new()
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &HashMap<String, CredentialRecord>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let mut sorted: Vec<&CredentialRecord> = records.values().collect();
        sorted.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        let content = serde_json::to_string_pretty(&sorted)?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| StoreError::io(&temp_path, e))?;
        }

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        debug!(path = %self.path.display(), records = sorted.len(), "saved credential store");
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn find<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<CredentialRecord>>> {
        Box::pin(async move { Ok(self.records.read().await.get(user_id).cloned()) })
    }

    fn upsert_tokens<'a>(
        &'a self,
        user_id: &'a str,
        provider: ProviderKind,
        tokens: TokenSet,
    ) -> BoxFuture<'a, StoreResult<CredentialRecord>> {
        Box::pin(async move {
            let mut records = self.records.write().await;

            // Memory changes only after the file does, so an upsert that
            // fails or is dropped mid-write leaves both on the old state.
            let mut next = records.clone();
            let record = next
                .entry(user_id.to_string())
                .or_insert_with(|| CredentialRecord::new(user_id));
            record.set_tokens(provider, tokens);
            let updated = record.clone();

            self.persist(&next).await?;
            *records = next;
            Ok(updated)
        })
    }

    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<CredentialRecord>>> {
        Box::pin(async move {
            let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
            records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
            Ok(records)
        })
    }
}
