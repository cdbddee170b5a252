//! Cached schema listings.
//!
//! One cache holds all three listings the editor browses: databases, the
//! tables of a database, and the columns of a table. Stale entries are
//! dropped when read; at capacity the least recently read entry goes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::SchemaCacheConfig;
use crate::schema::TableColumn;

/// What a cached listing describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaKey {
    Databases,
    Tables { database: String },
    Columns { database: String, table: String },
}

impl SchemaKey {
    pub fn tables(database: &str) -> Self {
        SchemaKey::Tables {
            database: database.to_string(),
        }
    }

    pub fn columns(database: &str, table: &str) -> Self {
        SchemaKey::Columns {
            database: database.to_string(),
            table: table.to_string(),
        }
    }

    /// Database the listing belongs to; `None` for the database list itself.
    pub fn database(&self) -> Option<&str> {
        match self {
            SchemaKey::Databases => None,
            SchemaKey::Tables { database } | SchemaKey::Columns { database, .. } => {
                Some(database.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Listing {
    Names(Vec<String>),
    Columns(Vec<TableColumn>),
}

#[derive(Debug)]
struct Slot {
    listing: Listing,
    fetched_at: Instant,
    read_at: Instant,
}

#[derive(Debug)]
pub struct SchemaCache {
    slots: HashMap<SchemaKey, Slot>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::with_config(&SchemaCacheConfig::default())
    }
}

impl SchemaCache {
    pub fn with_config(config: &SchemaCacheConfig) -> Self {
        Self {
            slots: HashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            capacity: config.max_size,
        }
    }

    pub fn databases(&mut self) -> Option<Vec<String>> {
        match self.read(&SchemaKey::Databases)? {
            Listing::Names(names) => Some(names.clone()),
            Listing::Columns(_) => None,
        }
    }

    pub fn tables(&mut self, database: &str) -> Option<Vec<String>> {
        match self.read(&SchemaKey::tables(database))? {
            Listing::Names(names) => Some(names.clone()),
            Listing::Columns(_) => None,
        }
    }

    pub fn columns(&mut self, database: &str, table: &str) -> Option<Vec<TableColumn>> {
        match self.read(&SchemaKey::columns(database, table))? {
            Listing::Columns(columns) => Some(columns.clone()),
            Listing::Names(_) => None,
        }
    }

    pub fn store_databases(&mut self, databases: Vec<String>) {
        self.store(SchemaKey::Databases, Listing::Names(databases));
    }

    pub fn store_tables(&mut self, database: &str, tables: Vec<String>) {
        self.store(SchemaKey::tables(database), Listing::Names(tables));
    }

    pub fn store_columns(&mut self, database: &str, table: &str, columns: Vec<TableColumn>) {
        self.store(SchemaKey::columns(database, table), Listing::Columns(columns));
    }

    /// Forget every listing under `database`. The database list is kept.
    pub fn invalidate_database(&mut self, database: &str) {
        self.slots.retain(|key, _| key.database() != Some(database));
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn read(&mut self, key: &SchemaKey) -> Option<&Listing> {
        let ttl = self.ttl;
        if self.slots.get(key)?.fetched_at.elapsed() >= ttl {
            self.slots.remove(key);
            return None;
        }
        let slot = self.slots.get_mut(key)?;
        slot.read_at = Instant::now();
        Some(&slot.listing)
    }

    fn store(&mut self, key: SchemaKey, listing: Listing) {
        if self.capacity == 0 {
            return;
        }
        while !self.slots.contains_key(&key) && self.slots.len() >= self.capacity {
            let Some(coldest) = self
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.read_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            tracing::debug!(key = ?coldest, "schema cache full, dropping least recently read");
            self.slots.remove(&coldest);
        }
        let now = Instant::now();
        self.slots.insert(
            key,
            Slot {
                listing,
                fetched_at: now,
                read_at: now,
            },
        );
    }
}
