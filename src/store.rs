use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Tenant scope a dictionary (and its cached index) belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub entity_id: String,
    pub project_id: String,
}

impl Scope {
    pub fn new(entity_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            project_id: project_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_id, self.project_id)
    }
}

/// One translation of a dictionary group in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRow {
    /// Opaque identifier shared by all translations of the same term
    pub group_id: String,
    /// Language code (e.g., "en", "es")
    pub language_code: String,
    /// The term as written in that language
    pub text: String,
}

impl DictionaryRow {
    pub fn new(
        group_id: impl Into<String>,
        language_code: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            language_code: language_code.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("dictionary store unavailable: {0}")]
    Unavailable(String),

    #[error("dictionary store query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read and write access to dictionary entries.
///
/// `load_rows` must return at most one row per (group, language) and must
/// preserve insertion order: the term index resolves ownership collisions
/// by first occurrence.
#[async_trait]
pub trait DictionaryStore: Send + Sync {
    async fn load_rows(&self, scope: &Scope) -> Result<Vec<DictionaryRow>, StoreError>;

    /// Insert a row, or replace the text of an existing (group, language) row.
    async fn upsert_entry(&self, scope: &Scope, row: &DictionaryRow) -> Result<(), StoreError>;

    /// Delete one language of a group. Returns whether a row was removed.
    async fn delete_entry(
        &self,
        scope: &Scope,
        group_id: &str,
        language_code: &str,
    ) -> Result<bool, StoreError>;

    /// Delete every language of a group. Returns the number of rows removed.
    async fn delete_group(&self, scope: &Scope, group_id: &str) -> Result<u64, StoreError>;
}

/// In-process store used by tests and local runs without PostgreSQL.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Scope, Vec<DictionaryRow>>>,
    loads: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a scope with rows, bypassing any cache invalidation.
    ///
    /// This is the "side channel" write path: a cache in front of this store
    /// only notices it after the TTL elapses.
    pub fn with_rows(self, scope: Scope, rows: Vec<DictionaryRow>) -> Self {
        self.rows.lock().insert(scope, rows);
        self
    }

    /// Replace all rows of a scope directly.
    pub fn replace_rows(&self, scope: &Scope, rows: Vec<DictionaryRow>) {
        self.rows.lock().insert(scope.clone(), rows);
    }

    /// Number of `load_rows` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DictionaryStore for MemoryStore {
    async fn load_rows(&self, scope: &Scope) -> Result<Vec<DictionaryRow>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.rows.lock().get(scope).cloned().unwrap_or_default())
    }

    async fn upsert_entry(&self, scope: &Scope, row: &DictionaryRow) -> Result<(), StoreError> {
        self.check_available()?;
        let mut rows = self.rows.lock();
        let scoped = rows.entry(scope.clone()).or_default();
        match scoped
            .iter_mut()
            .find(|r| r.group_id == row.group_id && r.language_code == row.language_code)
        {
            Some(existing) => existing.text = row.text.clone(),
            None => scoped.push(row.clone()),
        }
        Ok(())
    }

    async fn delete_entry(
        &self,
        scope: &Scope,
        group_id: &str,
        language_code: &str,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.lock();
        let Some(scoped) = rows.get_mut(scope) else {
            return Ok(false);
        };
        let before = scoped.len();
        scoped.retain(|r| !(r.group_id == group_id && r.language_code == language_code));
        Ok(scoped.len() < before)
    }

    async fn delete_group(&self, scope: &Scope, group_id: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.lock();
        let Some(scoped) = rows.get_mut(scope) else {
            return Ok(0);
        };
        let before = scoped.len();
        scoped.retain(|r| r.group_id != group_id);
        Ok((before - scoped.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        Scope::new("acme", "website")
    }

    #[tokio::test]
    async fn test_load_rows_unknown_scope_is_empty() {
        let store = MemoryStore::new();
        let rows = store.load_rows(&scope()).await.expect("Should load");
        assert!(rows.is_empty());
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_group_and_language() {
        let store = MemoryStore::new();
        store
            .upsert_entry(&scope(), &DictionaryRow::new("g1", "en", "Widget"))
            .await
            .expect("Should insert");
        store
            .upsert_entry(&scope(), &DictionaryRow::new("g1", "es", "Artilugio"))
            .await
            .expect("Should insert");
        store
            .upsert_entry(&scope(), &DictionaryRow::new("g1", "en", "Gadget"))
            .await
            .expect("Should update");

        let rows = store.load_rows(&scope()).await.expect("Should load");
        assert_eq!(
            rows,
            vec![
                DictionaryRow::new("g1", "en", "Gadget"),
                DictionaryRow::new("g1", "es", "Artilugio"),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_entry_and_group() {
        let store = MemoryStore::new().with_rows(
            scope(),
            vec![
                DictionaryRow::new("g1", "en", "Widget"),
                DictionaryRow::new("g1", "es", "Artilugio"),
                DictionaryRow::new("g2", "en", "Acme"),
            ],
        );

        assert!(store.delete_entry(&scope(), "g1", "es").await.unwrap());
        assert!(!store.delete_entry(&scope(), "g1", "es").await.unwrap());
        assert_eq!(store.delete_group(&scope(), "g1").await.unwrap(), 1);
        assert_eq!(store.delete_group(&scope(), "missing").await.unwrap(), 0);

        let rows = store.load_rows(&scope()).await.unwrap();
        assert_eq!(rows, vec![DictionaryRow::new("g2", "en", "Acme")]);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let other = Scope::new("acme", "mobile");
        let store = MemoryStore::new()
            .with_rows(scope(), vec![DictionaryRow::new("g1", "en", "Widget")]);

        assert!(store.load_rows(&other).await.unwrap().is_empty());
        assert_eq!(store.load_rows(&scope()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store_returns_unavailable() {
        let store = MemoryStore::new();
        store.set_failing(true);

        let result = store.load_rows(&scope()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store
            .upsert_entry(&scope(), &DictionaryRow::new("g1", "en", "x"))
            .await
            .is_err());
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(scope().to_string(), "acme/website");
    }
}
