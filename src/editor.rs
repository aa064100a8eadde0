use crate::store::{DictionaryRow, DictionaryStore, Scope, StoreError};
use crate::terms::TermCache;
use std::sync::Arc;
use tracing::info;

/// Writes to the store, invalidating the scope's cached index after every
/// successful mutation. Failed writes leave the cache untouched.
#[derive(Clone)]
pub struct DictionaryEditor {
    store: Arc<dyn DictionaryStore>,
    cache: Arc<TermCache>,
}

impl DictionaryEditor {
    pub fn new(store: Arc<dyn DictionaryStore>, cache: Arc<TermCache>) -> Self {
        Self { store, cache }
    }

    /// Create or update one language of a dictionary group.
    pub async fn upsert(&self, scope: &Scope, row: DictionaryRow) -> Result<(), StoreError> {
        self.store.upsert_entry(scope, &row).await?;
        self.cache.invalidate(scope);
        info!(
            "Saved dictionary entry {}/{} in {}",
            row.group_id, row.language_code, scope
        );
        Ok(())
    }

    /// Delete one language of a dictionary group.
    pub async fn delete_entry(
        &self,
        scope: &Scope,
        group_id: &str,
        language_code: &str,
    ) -> Result<bool, StoreError> {
        let removed = self
            .store
            .delete_entry(scope, group_id, language_code)
            .await?;
        self.cache.invalidate(scope);
        if removed {
            info!(
                "Deleted dictionary entry {}/{} in {}",
                group_id, language_code, scope
            );
        }
        Ok(removed)
    }

    /// Delete every language of a dictionary group.
    pub async fn delete_group(&self, scope: &Scope, group_id: &str) -> Result<u64, StoreError> {
        let removed = self.store.delete_group(scope, group_id).await?;
        self.cache.invalidate(scope);
        info!(
            "Deleted dictionary group {} ({} entries) in {}",
            group_id, removed, scope
        );
        Ok(removed)
    }
}
