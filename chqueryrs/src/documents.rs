//! Persisted query documents in their current schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{QueryBuilderOptions, QueryType};
use crate::query_builder::SqlBuilder;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Builder state kept while the SQL editor is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_options: Option<QueryBuilderOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SqlQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub raw_sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<QueryMeta>,
    /// Panel-owned keys this engine does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuilderQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub raw_sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(default)]
    pub builder_options: QueryBuilderOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<QueryMeta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A current-schema query document, discriminated by `editorType`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "editorType", rename_all = "lowercase")]
pub enum QueryDocument {
    Sql(SqlQuery),
    Builder(BuilderQuery),
}

impl QueryDocument {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn plugin_version(&self) -> Option<&str> {
        match self {
            QueryDocument::Sql(q) => q.plugin_version.as_deref(),
            QueryDocument::Builder(q) => q.plugin_version.as_deref(),
        }
    }

    pub fn raw_sql(&self) -> &str {
        match self {
            QueryDocument::Sql(q) => &q.raw_sql,
            QueryDocument::Builder(q) => &q.raw_sql,
        }
    }

    /// Builder state, whichever editor is active.
    pub fn builder_options(&self) -> Option<&QueryBuilderOptions> {
        match self {
            QueryDocument::Sql(q) => q.meta.as_ref().and_then(|m| m.builder_options.as_ref()),
            QueryDocument::Builder(q) => Some(&q.builder_options),
        }
    }

    /// SQL to execute: regenerated for builder documents, verbatim otherwise.
    pub fn sql(&self, builder: &SqlBuilder) -> String {
        match self {
            QueryDocument::Sql(q) => q.raw_sql.clone(),
            QueryDocument::Builder(q) => builder.build(&q.builder_options),
        }
    }
}
