//! Persisted query document migration.
//!
//! Each schema step is a [`Migration`]; the [`Migrator`] runs them in order.
//! Documents no step applies to come back borrowed, so callers can tell an
//! untouched document by `Cow::Borrowed`.

use std::borrow::Cow;

use serde_json::Value;

use crate::config::{MigrationConfig, CURRENT_PLUGIN_VERSION};

mod v3;

pub use v3::{migrate_v3_query_builder_options, LegacyBuilderOptions, LegacyMetric, LegacyQuery, V3ToV4};

/// One schema upgrade step over raw JSON documents.
pub trait Migration: Send + Sync {
    fn name(&self) -> &'static str;
    fn applies(&self, doc: &Value) -> bool;
    fn migrate(&self, doc: &Value) -> Value;
}

/// Template of the placeholder document a fresh panel starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultQuery {
    pub raw_sql: Option<&'static str>,
}

/// Fresh panels carry no `rawSql` until an editor writes one.
pub const DEFAULT_QUERY: DefaultQuery = DefaultQuery { raw_sql: None };

impl DefaultQuery {
    /// Whether `doc` is still the untouched placeholder. A `rawSql` that is
    /// present but null or mistyped is not a placeholder.
    pub fn matches(&self, doc: &Value) -> bool {
        match (doc.get("rawSql"), self.raw_sql) {
            (None, None) => true,
            (Some(Value::String(sql)), Some(expected)) => sql == expected,
            _ => false,
        }
    }
}

pub struct Migrator {
    steps: Vec<Box<dyn Migration>>,
    defaults: DefaultQuery,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new(&MigrationConfig::default())
    }
}

impl Migrator {
    pub fn new(config: &MigrationConfig) -> Self {
        Self::with_defaults(config, DEFAULT_QUERY)
    }

    pub fn with_defaults(config: &MigrationConfig, defaults: DefaultQuery) -> Self {
        let plugin_version = if v3::predates_v4(&config.plugin_version)
            || semver::Version::parse(config.plugin_version.trim()).is_err()
        {
            tracing::warn!(
                configured = %config.plugin_version,
                fallback = CURRENT_PLUGIN_VERSION,
                "configured plugin version is not a v4 version, using fallback"
            );
            CURRENT_PLUGIN_VERSION.to_string()
        } else {
            config.plugin_version.clone()
        };
        Self {
            steps: vec![Box::new(V3ToV4::new(plugin_version))],
            defaults,
        }
    }

    /// Append a later schema step.
    pub fn with_step(mut self, step: Box<dyn Migration>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn migrate<'a>(&self, doc: &'a Value) -> Cow<'a, Value> {
        if self.defaults.matches(doc) {
            return Cow::Borrowed(doc);
        }
        let mut current = Cow::Borrowed(doc);
        for step in &self.steps {
            if step.applies(&current) {
                tracing::debug!(step = step.name(), "migrating query document");
                current = Cow::Owned(step.migrate(&current));
            }
        }
        current
    }
}

/// Migrate with the default chain and settings.
pub fn migrate_query(doc: &Value) -> Cow<'_, Value> {
    Migrator::default().migrate(doc)
}
