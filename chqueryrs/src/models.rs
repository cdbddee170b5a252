//! Structured query model edited by the query builder.
//!
//! `QueryBuilderOptions` is plain data: editors mutate it, the SQL builder
//! reads it, and the migrator produces it from older persisted documents.

use std::collections::HashSet;
use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ChQueryError, Result};
use crate::filters::Filter;

/// Generator shape. Every shape-specific field is interpreted relative to it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Table,
    Logs,
    TimeSeries,
    Traces,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BuilderMode {
    List,
    Aggregate,
    Trend,
}

/// Semantic role of a selected column, independent of its literal name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnHint {
    Time,
    LogLevel,
    LogMessage,
    LogLabels,
    TraceId,
    TraceSpanId,
    TraceParentSpanId,
    TraceServiceName,
    TraceOperationName,
    TraceDurationTime,
    TraceTags,
    TraceServiceTags,
    TraceStatusCode,
}

impl ColumnHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnHint::Time => "time",
            ColumnHint::LogLevel => "log_level",
            ColumnHint::LogMessage => "log_message",
            ColumnHint::LogLabels => "log_labels",
            ColumnHint::TraceId => "trace_id",
            ColumnHint::TraceSpanId => "trace_span_id",
            ColumnHint::TraceParentSpanId => "trace_parent_span_id",
            ColumnHint::TraceServiceName => "trace_service_name",
            ColumnHint::TraceOperationName => "trace_operation_name",
            ColumnHint::TraceDurationTime => "trace_duration_time",
            ColumnHint::TraceTags => "trace_tags",
            ColumnHint::TraceServiceTags => "trace_service_tags",
            ColumnHint::TraceStatusCode => "trace_status_code",
        }
    }
}

impl fmt::Display for ColumnHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectedColumn {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Set when the column is not part of the live table schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<ColumnHint>,
}

impl SelectedColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_hint(mut self, hint: ColumnHint) -> Self {
        self.hint = Some(hint);
        self
    }
}

/// Aggregate function applied to a column.
///
/// Unknown names are kept verbatim in `Other` so documents written by older
/// editors survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AggregateType {
    #[default]
    Count,
    Sum,
    Min,
    Max,
    Average,
    Any,
    Other(String),
}

impl AggregateType {
    pub fn as_str(&self) -> &str {
        match self {
            AggregateType::Count => "count",
            AggregateType::Sum => "sum",
            AggregateType::Min => "min",
            AggregateType::Max => "max",
            AggregateType::Average => "avg",
            AggregateType::Any => "any",
            AggregateType::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for AggregateType {
    fn from(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "count" => AggregateType::Count,
            "sum" => AggregateType::Sum,
            "min" => AggregateType::Min,
            "max" => AggregateType::Max,
            "avg" => AggregateType::Average,
            "any" => AggregateType::Any,
            _ => AggregateType::Other(name.to_string()),
        }
    }
}

impl Serialize for AggregateType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AggregateType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Err(de::Error::custom("aggregate type must not be empty"));
        }
        Ok(AggregateType::from(name.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateColumn {
    pub aggregate_type: AggregateType,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderByDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderByDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderByDirection::Asc => "ASC",
            OrderByDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderBy {
    pub name: String,
    #[serde(default)]
    pub dir: OrderByDirection,
    /// When set, the hinted column replaces `name` as the sort key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<ColumnHint>,
}

impl OrderBy {
    pub fn new(name: impl Into<String>, dir: OrderByDirection) -> Self {
        Self {
            name: name.into(),
            dir,
            hint: None,
        }
    }
}

/// Unit the trace duration column is stored in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    #[default]
    Nanoseconds,
}

/// Shape-specific side channel. Keys owned by other consumers are kept in
/// `extra` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryBuilderMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trace_id_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_duration_unit: Option<TimeUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otel_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otel_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryBuilderMeta {
    /// Trace id to look up, when trace-id lookup mode is on and an id is set.
    pub fn trace_id_lookup(&self) -> Option<&str> {
        if self.is_trace_id_mode != Some(true) {
            return None;
        }
        self.trace_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryBuilderOptions {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<BuilderMode>,
    #[serde(default)]
    pub columns: Vec<SelectedColumn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregates: Vec<AggregateColumn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default)]
    pub meta: QueryBuilderMeta,
}

impl QueryBuilderOptions {
    pub fn new(database: impl Into<String>, table: impl Into<String>, query_type: QueryType) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            query_type,
            ..Default::default()
        }
    }

    /// First selected column carrying `hint`.
    pub fn column_by_hint(&self, hint: ColumnHint) -> Option<&SelectedColumn> {
        self.columns.iter().find(|c| c.hint == Some(hint))
    }

    /// Whether grouped aggregation is active.
    ///
    /// An explicit `List` mode wins over stored aggregates.
    pub fn is_aggregate(&self) -> bool {
        match self.mode {
            Some(BuilderMode::Aggregate) | Some(BuilderMode::Trend) => true,
            Some(BuilderMode::List) => false,
            None => !self.aggregates.is_empty(),
        }
    }

    /// Check the model invariants that editors are expected to uphold.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if let Some(hint) = column.hint {
                if !seen.insert(hint) {
                    return Err(ChQueryError::Validation(format!(
                        "hint {hint} is set on more than one column"
                    )));
                }
            }
        }
        Ok(())
    }
}
