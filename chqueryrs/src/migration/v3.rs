//! Schema v3 records and the v3 to v4 rewrite.
//!
//! v3 documents use `queryType: "sql" | "builder"` as the editor discriminant
//! and a flat builder shape (`fields`, `timeField`, `metrics`, ...). They are
//! read leniently: missing or mistyped fields fall back to empty defaults.

use semver::Version;
use serde_json::{Map, Value};

use crate::documents::{BuilderQuery, QueryDocument, QueryMeta, SqlQuery};
use crate::filters::Filter;
use crate::models::{
    AggregateColumn, AggregateType, BuilderMode, ColumnHint, OrderBy, OrderByDirection,
    QueryBuilderOptions, QueryType, SelectedColumn,
};

use super::Migration;

/// First plugin version writing the v4 schema.
const V4_INTRODUCED: (u64, u64, u64) = (4, 0, 0);

/// Top-level keys rebuilt by the rewrite; everything else carries over.
const REWRITTEN_KEYS: [&str; 12] = [
    "queryType",
    "selectedFormat",
    "builderOptions",
    "meta",
    "expand",
    "editorType",
    "pluginVersion",
    "rawSql",
    "refId",
    "datasource",
    "key",
    "format",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyQuery {
    /// Legacy editor discriminant: `sql` or `builder`.
    pub query_type: Option<String>,
    pub plugin_version: Option<String>,
    pub ref_id: Option<String>,
    pub datasource: Option<Value>,
    pub key: Option<String>,
    pub raw_sql: String,
    pub format: Option<Value>,
    pub expand: Option<bool>,
    pub timezone: Option<String>,
    pub builder_options: Option<Value>,
    /// `meta.builderOptions` of a query toggled to the SQL editor.
    pub meta_builder_options: Option<Value>,
    pub extra: Map<String, Value>,
}

impl LegacyQuery {
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let meta = obj.get("meta");
        let extra = obj
            .iter()
            .filter(|(k, _)| !REWRITTEN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            query_type: string_field(value, "queryType"),
            plugin_version: string_field(value, "pluginVersion"),
            ref_id: string_field(value, "refId"),
            datasource: present(obj.get("datasource")),
            key: string_field(value, "key"),
            raw_sql: string_field(value, "rawSql").unwrap_or_default(),
            format: present(obj.get("format")),
            expand: obj.get("expand").and_then(Value::as_bool),
            timezone: meta.and_then(|m| string_field(m, "timezone")),
            builder_options: present(obj.get("builderOptions")),
            meta_builder_options: meta.and_then(|m| present(m.get("builderOptions"))),
            extra,
        }
    }

    pub fn is_builder(&self) -> bool {
        self.query_type.as_deref() == Some("builder")
    }

    /// Current shape for the legacy numeric `format` code.
    pub fn query_type_from_format(&self) -> Option<QueryType> {
        match self.format.as_ref().and_then(Value::as_i64)? {
            0 => Some(QueryType::TimeSeries),
            1 => Some(QueryType::Table),
            2 => Some(QueryType::Logs),
            3 => Some(QueryType::Traces),
            _ => None,
        }
    }

    fn meta(&self, builder_options: Option<QueryBuilderOptions>) -> Option<QueryMeta> {
        if self.timezone.is_none() && builder_options.is_none() {
            return None;
        }
        Some(QueryMeta {
            timezone: self.timezone.clone(),
            builder_options,
            extra: Map::new(),
        })
    }

    pub fn into_current(self, plugin_version: &str) -> QueryDocument {
        if self.is_builder() {
            let builder_options = migrate_v3_query_builder_options(
                self.builder_options.as_ref().unwrap_or(&Value::Null),
            );
            QueryDocument::Builder(BuilderQuery {
                plugin_version: Some(plugin_version.to_string()),
                meta: self.meta(None),
                ref_id: self.ref_id,
                datasource: self.datasource,
                key: self.key,
                raw_sql: self.raw_sql,
                format: self.format,
                builder_options,
                extra: self.extra,
            })
        } else {
            let meta_builder_options = self
                .meta_builder_options
                .as_ref()
                .map(migrate_v3_query_builder_options);
            QueryDocument::Sql(SqlQuery {
                plugin_version: Some(plugin_version.to_string()),
                query_type: self.query_type_from_format(),
                meta: self.meta(meta_builder_options),
                ref_id: self.ref_id,
                datasource: self.datasource,
                key: self.key,
                raw_sql: self.raw_sql,
                format: self.format,
                expand: self.expand,
                extra: self.extra,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyMetric {
    pub field: String,
    pub aggregation: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyBuilderOptions {
    pub database: String,
    pub table: String,
    pub mode: Option<BuilderMode>,
    pub fields: Vec<String>,
    pub time_field: Option<String>,
    pub time_field_type: Option<String>,
    pub log_level_field: Option<String>,
    pub metrics: Vec<LegacyMetric>,
    pub filters: Vec<Value>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
}

impl LegacyBuilderOptions {
    pub fn from_value(value: &Value) -> Self {
        let metrics = array_field(value, "metrics")
            .iter()
            .map(|m| LegacyMetric {
                field: string_field(m, "field").unwrap_or_default(),
                aggregation: string_field(m, "aggregation").filter(|a| !a.is_empty()),
                alias: string_field(m, "alias"),
            })
            .collect();

        let order_by = array_field(value, "orderBy").iter().map(legacy_order_by).collect();

        Self {
            database: string_field(value, "database").unwrap_or_default(),
            table: string_field(value, "table").unwrap_or_default(),
            mode: value
                .get("mode")
                .and_then(|m| serde_json::from_value(m.clone()).ok()),
            fields: array_field(value, "fields")
                .iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect(),
            time_field: string_field(value, "timeField").filter(|f| !f.is_empty()),
            time_field_type: string_field(value, "timeFieldType").filter(|t| !t.is_empty()),
            log_level_field: string_field(value, "logLevelField").filter(|f| !f.is_empty()),
            metrics,
            filters: array_field(value, "filters").to_vec(),
            group_by: array_field(value, "groupBy")
                .iter()
                .filter_map(|g| g.as_str().map(str::to_string))
                .collect(),
            order_by,
            limit: value
                .get("limit")
                .and_then(|l| l.as_i64().or_else(|| l.as_f64().map(|f| f as i64))),
        }
    }

    fn query_type(&self) -> QueryType {
        if self.time_field.is_some() {
            QueryType::TimeSeries
        } else if self.log_level_field.is_some() {
            QueryType::Logs
        } else {
            QueryType::Table
        }
    }

    fn filter_hint(&self, key: &str) -> Option<ColumnHint> {
        if self.time_field.as_deref() == Some(key) {
            Some(ColumnHint::Time)
        } else if self.log_level_field.as_deref() == Some(key) {
            Some(ColumnHint::LogLevel)
        } else {
            None
        }
    }

    pub fn into_current(self) -> QueryBuilderOptions {
        let mut columns: Vec<SelectedColumn> =
            self.fields.iter().map(SelectedColumn::new).collect();
        if let Some(time_field) = &self.time_field {
            let mut column = SelectedColumn::new(time_field.as_str()).with_hint(ColumnHint::Time);
            column.column_type = self.time_field_type.clone();
            columns.push(column);
        }
        if let Some(level_field) = &self.log_level_field {
            columns.push(SelectedColumn::new(level_field.as_str()).with_hint(ColumnHint::LogLevel));
        }

        let aggregates = self
            .metrics
            .iter()
            .map(|m| AggregateColumn {
                aggregate_type: match m.aggregation.as_deref() {
                    Some(name) => AggregateType::from(name),
                    None => {
                        tracing::warn!(field = %m.field, "legacy metric without aggregation, using count");
                        AggregateType::default()
                    }
                },
                column: m.field.clone(),
                alias: m.alias.clone(),
            })
            .collect();

        let filters = self
            .filters
            .iter()
            .filter_map(|raw| self.migrate_filter(raw))
            .collect();

        QueryBuilderOptions {
            database: self.database.clone(),
            table: self.table.clone(),
            query_type: self.query_type(),
            mode: self.mode,
            columns,
            aggregates,
            filters,
            group_by: self.group_by,
            order_by: self.order_by,
            limit: self.limit.filter(|l| *l >= 0),
            meta: Default::default(),
        }
    }

    /// Legacy filters carry over as-is; only a `hint` is added when the key
    /// names the time or log-level field.
    fn migrate_filter(&self, raw: &Value) -> Option<Filter> {
        let Some(mut filter) = Filter::from_value_lenient(raw) else {
            tracing::warn!(filter = %raw, "dropping legacy filter that is not an object");
            return None;
        };
        if let Some(hint) = self.filter_hint(&filter.key) {
            filter.hint = Some(hint);
        }
        Some(filter)
    }
}

/// Rewrite arbitrary v3 builder options into the current model.
pub fn migrate_v3_query_builder_options(value: &Value) -> QueryBuilderOptions {
    LegacyBuilderOptions::from_value(value).into_current()
}

/// The v3 to v4 step.
pub struct V3ToV4 {
    plugin_version: String,
}

impl V3ToV4 {
    pub fn new(plugin_version: impl Into<String>) -> Self {
        Self {
            plugin_version: plugin_version.into(),
        }
    }
}

impl Migration for V3ToV4 {
    fn name(&self) -> &'static str {
        "v3_to_v4"
    }

    fn applies(&self, doc: &Value) -> bool {
        if !doc.is_object() {
            return false;
        }
        if matches!(
            doc.get("queryType").and_then(Value::as_str),
            Some("sql") | Some("builder")
        ) {
            return true;
        }
        match doc.get("pluginVersion").and_then(Value::as_str) {
            None => true,
            Some(version) => predates_v4(version),
        }
    }

    fn migrate(&self, doc: &Value) -> Value {
        let current = LegacyQuery::from_value(doc).into_current(&self.plugin_version);
        serde_json::to_value(&current).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to encode migrated query, keeping original");
            doc.clone()
        })
    }
}

/// Whether `version` is older than the v4 schema. Unparseable versions are
/// not treated as legacy.
pub(crate) fn predates_v4(version: &str) -> bool {
    match Version::parse(version.trim()) {
        Ok(v) => (v.major, v.minor, v.patch) < V4_INTRODUCED,
        Err(_) => false,
    }
}

fn legacy_order_by(value: &Value) -> OrderBy {
    let dir = match string_field(value, "dir").map(|d| d.trim().to_ascii_uppercase()) {
        Some(d) if d == "DESC" => OrderByDirection::Desc,
        _ => OrderByDirection::Asc,
    };
    let mut order = OrderBy::new(string_field(value, "name").unwrap_or_default(), dir);
    order.hint = value
        .get("hint")
        .and_then(|h| serde_json::from_value(h.clone()).ok());
    order
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}
