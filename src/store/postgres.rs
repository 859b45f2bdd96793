//! Postgres-backed data store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::{DatabaseConfig, IndexConfig};
use crate::store::{DataStore, StoreError};

/// [`DataStore`] over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    config: DatabaseConfig,
}

impl PgStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataStore for PgStore {
    type Handle = PgPool;

    async fn connect(&self) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.acquire_timeout_secs))
            .connect(&self.config.url)
            .await
            .map_err(StoreError::Connect)?;

        tracing::info!(
            max_connections = self.config.max_connections,
            "Database pool connected"
        );
        Ok(pool)
    }

    async fn ensure_indexes(&self, pool: &PgPool) -> Result<(), StoreError> {
        for index in &self.config.indexes {
            let statement = create_index_statement(index);
            sqlx::query(&statement)
                .execute(pool)
                .await
                .map_err(|source| StoreError::Index {
                    name: index.name.clone(),
                    source,
                })?;
            tracing::debug!(index = %index.name, table = %index.table, "Index ensured");
        }
        Ok(())
    }

    async fn close(&self, pool: PgPool) {
        pool.close().await;
        tracing::debug!("Database pool closed");
    }
}

/// Quote an identifier, splitting schema-qualified names on `.`.
fn quote_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Idempotent `CREATE INDEX` for one configured index.
pub fn create_index_statement(index: &IndexConfig) -> String {
    let columns = index
        .columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        quote_identifier(&index.name),
        quote_identifier(&index.table),
        columns
    )
}
