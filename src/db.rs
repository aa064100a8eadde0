use crate::store::{DictionaryRow, DictionaryStore, Scope, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// PostgreSQL-backed dictionary store.
#[derive(Clone)]
pub struct PgDictionaryStore {
    pool: PgPool,
}

impl PgDictionaryStore {
    /// Connect to PostgreSQL and create the dictionary table if needed
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool (schema is assumed to exist)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_schema(&self) -> Result<()> {
        // `id` records insertion order; index builds rely on it for
        // first-writer-wins ownership of shared terms
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dictionary_entries (
                id BIGSERIAL NOT NULL,
                entity_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                language_code TEXT NOT NULL,
                text TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (entity_id, project_id, group_id, language_code)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create dictionary_entries table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS dictionary_entries_scope_idx
             ON dictionary_entries (entity_id, project_id, id)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create dictionary_entries scope index")?;

        Ok(())
    }
}

#[async_trait]
impl DictionaryStore for PgDictionaryStore {
    async fn load_rows(&self, scope: &Scope) -> Result<Vec<DictionaryRow>, StoreError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT group_id, language_code, text
             FROM dictionary_entries
             WHERE entity_id = $1 AND project_id = $2
             ORDER BY id",
        )
        .bind(&scope.entity_id)
        .bind(&scope.project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(group_id, language_code, text)| DictionaryRow {
                group_id,
                language_code,
                text,
            })
            .collect())
    }

    async fn upsert_entry(&self, scope: &Scope, row: &DictionaryRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO dictionary_entries (entity_id, project_id, group_id, language_code, text)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (entity_id, project_id, group_id, language_code)
             DO UPDATE SET text = EXCLUDED.text, updated_at = NOW()",
        )
        .bind(&scope.entity_id)
        .bind(&scope.project_id)
        .bind(&row.group_id)
        .bind(&row.language_code)
        .bind(&row.text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_entry(
        &self,
        scope: &Scope,
        group_id: &str,
        language_code: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM dictionary_entries
             WHERE entity_id = $1 AND project_id = $2 AND group_id = $3 AND language_code = $4",
        )
        .bind(&scope.entity_id)
        .bind(&scope.project_id)
        .bind(group_id)
        .bind(language_code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_group(&self, scope: &Scope, group_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM dictionary_entries
             WHERE entity_id = $1 AND project_id = $2 AND group_id = $3",
        )
        .bind(&scope.entity_id)
        .bind(&scope.project_id)
        .bind(group_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests need a live PostgreSQL instance:
    // DATABASE_URL=postgres://... cargo test -- --ignored

    async fn create_test_store(project: &str) -> (PgDictionaryStore, Scope) {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgDictionaryStore::connect(&url)
            .await
            .expect("Failed to connect");
        let scope = Scope::new("test-entity", project);

        sqlx::query("DELETE FROM dictionary_entries WHERE entity_id = $1 AND project_id = $2")
            .bind(&scope.entity_id)
            .bind(&scope.project_id)
            .execute(&store.pool)
            .await
            .expect("Failed to clean scope");

        (store, scope)
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL)"]
    async fn test_load_rows_preserves_insertion_order() {
        let (store, scope) = create_test_store("order").await;

        for row in [
            DictionaryRow::new("g2", "en", "Second"),
            DictionaryRow::new("g1", "en", "First"),
            DictionaryRow::new("g2", "es", "Segundo"),
        ] {
            store.upsert_entry(&scope, &row).await.expect("Should insert");
        }

        let rows = store.load_rows(&scope).await.expect("Should load");
        let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Second", "First", "Segundo"]);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL)"]
    async fn test_upsert_updates_in_place() {
        let (store, scope) = create_test_store("upsert").await;

        store
            .upsert_entry(&scope, &DictionaryRow::new("g1", "en", "Old"))
            .await
            .expect("Should insert");
        store
            .upsert_entry(&scope, &DictionaryRow::new("g1", "en", "New"))
            .await
            .expect("Should update");

        let rows = store.load_rows(&scope).await.expect("Should load");
        assert_eq!(rows, vec![DictionaryRow::new("g1", "en", "New")]);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL)"]
    async fn test_delete_entry_and_group() {
        let (store, scope) = create_test_store("delete").await;

        for row in [
            DictionaryRow::new("g1", "en", "One"),
            DictionaryRow::new("g1", "es", "Uno"),
            DictionaryRow::new("g2", "en", "Two"),
        ] {
            store.upsert_entry(&scope, &row).await.expect("Should insert");
        }

        assert!(store.delete_entry(&scope, "g1", "es").await.expect("delete"));
        assert!(!store.delete_entry(&scope, "g1", "es").await.expect("delete"));
        assert_eq!(store.delete_group(&scope, "g2").await.expect("delete"), 1);

        let rows = store.load_rows(&scope).await.expect("Should load");
        assert_eq!(rows, vec![DictionaryRow::new("g1", "en", "One")]);
    }

    #[tokio::test]
    async fn test_connect_invalid_url_fails() {
        let result = PgDictionaryStore::connect("not-a-database-url").await;
        assert!(result.is_err());
    }
}
