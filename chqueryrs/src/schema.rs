//! Schema metadata consumed from the datasource.
//!
//! The transport that talks to ClickHouse lives outside this crate; it is
//! plugged in through [`SchemaProvider`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::SchemaCacheConfig;
use crate::error::Result;
use crate::models::QueryBuilderOptions;
use crate::schema_cache::SchemaCache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Schema lookup capability of the datasource.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn fetch_columns(&self, database: &str, table: &str) -> Result<Vec<TableColumn>>;
    async fn fetch_tables(&self, database: &str) -> Result<Vec<String>>;
    async fn fetch_databases(&self) -> Result<Vec<String>>;
}

/// A provider with a listing cache in front of it.
pub struct SchemaLookup<P> {
    provider: P,
    cache: Mutex<SchemaCache>,
}

impl<P: SchemaProvider> SchemaLookup<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, &SchemaCacheConfig::default())
    }

    pub fn with_config(provider: P, config: &SchemaCacheConfig) -> Self {
        Self {
            provider,
            cache: Mutex::new(SchemaCache::with_config(config)),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Columns of `database.table`; an unset database or table has none.
    pub async fn columns(&self, database: &str, table: &str) -> Result<Vec<TableColumn>> {
        if database.is_empty() || table.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(cached) = self.cache.lock().await.columns(database, table) {
            tracing::trace!(database, table, "column cache hit");
            return Ok(cached);
        }

        let columns = self.provider.fetch_columns(database, table).await?;
        tracing::debug!(database, table, count = columns.len(), "fetched columns");
        self.cache
            .lock()
            .await
            .store_columns(database, table, columns.clone());
        Ok(columns)
    }

    pub async fn tables(&self, database: &str) -> Result<Vec<String>> {
        if database.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(cached) = self.cache.lock().await.tables(database) {
            return Ok(cached);
        }

        let tables = self.provider.fetch_tables(database).await?;
        tracing::debug!(database, count = tables.len(), "fetched tables");
        self.cache.lock().await.store_tables(database, tables.clone());
        Ok(tables)
    }

    pub async fn databases(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.cache.lock().await.databases() {
            return Ok(cached);
        }

        let databases = self.provider.fetch_databases().await?;
        tracing::debug!(count = databases.len(), "fetched databases");
        self.cache.lock().await.store_databases(databases.clone());
        Ok(databases)
    }

    /// Fetch the live schema of the options' table and mark custom columns.
    pub async fn annotate(&self, options: &mut QueryBuilderOptions) -> Result<()> {
        let live = self.columns(&options.database, &options.table).await?;
        if !live.is_empty() {
            mark_custom_columns(options, &live);
        }
        Ok(())
    }

    pub async fn invalidate(&self) {
        self.cache.lock().await.clear();
    }

    /// Drop cached tables and columns of one database, e.g. after DDL.
    pub async fn invalidate_database(&self, database: &str) {
        self.cache.lock().await.invalidate_database(database);
    }
}

/// Set `custom` on selected columns missing from the live schema and fill
/// a missing `type` from it.
pub fn mark_custom_columns(options: &mut QueryBuilderOptions, live: &[TableColumn]) {
    let types: HashMap<&str, &str> = live
        .iter()
        .map(|c| (c.name.as_str(), c.column_type.as_str()))
        .collect();
    for column in &mut options.columns {
        match types.get(column.name.as_str()) {
            Some(live_type) => {
                column.custom = Some(false);
                if column.column_type.is_none() {
                    column.column_type = Some((*live_type).to_string());
                }
            }
            None => column.custom = Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryType, SelectedColumn};

    #[test]
    fn marks_columns_missing_from_live_schema() {
        let mut options = QueryBuilderOptions::new("db", "t", QueryType::Table);
        options.columns = vec![
            SelectedColumn::new("id"),
            SelectedColumn::new("toStartOfHour(ts)"),
            SelectedColumn::new("name").with_type("Nullable(String)"),
        ];
        let live = vec![
            TableColumn::new("id", "UInt64"),
            TableColumn::new("name", "String"),
        ];
        mark_custom_columns(&mut options, &live);
        assert_eq!(options.columns[0].custom, Some(false));
        assert_eq!(options.columns[0].column_type.as_deref(), Some("UInt64"));
        assert_eq!(options.columns[1].custom, Some(true));
        assert_eq!(options.columns[2].column_type.as_deref(), Some("Nullable(String)"));
    }
}
