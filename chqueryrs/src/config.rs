//! Engine configuration.
//!
//! TOML sections for the generator, time-filter injection, migration and
//! schema cache, with optional per-datasource overrides.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChQueryError, Result};
use crate::time_filter::AutoTimeFilterOptions;

/// Schema version stamped on migrated documents.
pub const CURRENT_PLUGIN_VERSION: &str = "4.0.0";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChQueryConfig {
    pub generator: GeneratorConfig,
    /// Injection applied to hand-written SQL; disabled unless configured.
    pub time_filter: AutoTimeFilterOptions,
    pub migration: MigrationConfig,
    pub schema_cache: SchemaCacheConfig,

    /// Per-datasource overrides keyed by datasource name.
    pub datasources: HashMap<String, DatasourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// LIMIT used when a builder query does not set one (default: 1000).
    pub default_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Version written to `pluginVersion` on migrated documents.
    pub plugin_version: String,
}

/// Schema cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaCacheConfig {
    /// Cache TTL in seconds (default: 3600).
    pub ttl_secs: u64,
    /// Maximum cached schema listings (default: 1000).
    pub max_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasourceConfig {
    pub generator: Option<GeneratorConfig>,
    pub time_filter: Option<AutoTimeFilterOptions>,
    pub schema_cache: Option<SchemaCacheConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_limit: 1000,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            plugin_version: CURRENT_PLUGIN_VERSION.to_string(),
        }
    }
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_size: 1000,
        }
    }
}

impl ChQueryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ChQueryError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ChQueryError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `CHQUERY_CONFIG` environment variable
    /// 2. `./chquery.toml` (current directory)
    /// 3. `<user config dir>/chquery/config.toml`
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("CHQUERY_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from CHQUERY_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring CHQUERY_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("chquery.toml") {
            tracing::info!("loaded config from ./chquery.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("chquery").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Resolved config for a datasource, falling back to the top-level sections.
    pub fn for_datasource(&self, name: &str) -> ResolvedDatasourceConfig {
        ResolvedDatasourceConfig::merge(self, self.datasources.get(name))
    }
}

/// Fully resolved configuration for a datasource (no Option fields).
#[derive(Debug, Clone)]
pub struct ResolvedDatasourceConfig {
    pub generator: GeneratorConfig,
    pub time_filter: AutoTimeFilterOptions,
    pub migration: MigrationConfig,
    pub schema_cache: SchemaCacheConfig,
}

impl ResolvedDatasourceConfig {
    fn merge(root: &ChQueryConfig, override_cfg: Option<&DatasourceConfig>) -> Self {
        let ds = override_cfg.cloned().unwrap_or_default();
        Self {
            generator: ds.generator.unwrap_or_else(|| root.generator.clone()),
            time_filter: ds.time_filter.unwrap_or_else(|| root.time_filter.clone()),
            migration: root.migration.clone(),
            schema_cache: ds
                .schema_cache
                .unwrap_or_else(|| root.schema_cache.clone()),
        }
    }
}
