use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{CredentialRecord, CredentialStore, StoreResult, TokenSet};
use crate::provider::{BoxFuture, ProviderKind};

/// In-process credential store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.user_id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

impl CredentialStore for MemoryStore {
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
            let record = records
                .entry(user_id.to_string())
                .or_insert_with(|| CredentialRecord::new(user_id));
            record.set_tokens(provider, tokens);
            Ok(record.clone())
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
