//! Integration tests for persisted document migration.

use std::borrow::Cow;

use chquery::documents::QueryDocument;
use chquery::migration::{migrate_query, migrate_v3_query_builder_options};
use chquery::models::{AggregateType, ColumnHint, QueryType, SelectedColumn};
use serde_json::{json, Value};

fn migrated(doc: &Value) -> Value {
    migrate_query(doc).into_owned()
}

#[test]
fn current_documents_are_returned_by_reference() {
    let doc = json!({
        "editorType": "builder",
        "pluginVersion": "4.3.1",
        "refId": "A",
        "rawSql": "SELECT 1",
        "builderOptions": { "database": "db", "table": "t", "queryType": "table" }
    });
    match migrate_query(&doc) {
        Cow::Borrowed(same) => assert!(std::ptr::eq(same, &doc)),
        Cow::Owned(_) => panic!("current document was rewritten"),
    }
}

#[test]
fn migration_is_idempotent() {
    let legacy = json!({
        "queryType": "sql",
        "rawSql": "SELECT * FROM t",
        "format": 2,
        "refId": "B"
    });
    let once = migrated(&legacy);
    assert!(matches!(migrate_query(&once), Cow::Borrowed(_)));
}

#[test]
fn legacy_builder_query() {
    let legacy = json!({
        "queryType": "builder",
        "selectedFormat": 4,
        "rawSql": "SELECT timestamp, level FROM logs",
        "refId": "A",
        "format": 1,
        "datasource": { "type": "grafana-clickhouse-datasource", "uid": "ch" },
        "key": "Q-1",
        "hide": false,
        "meta": { "timezone": "UTC", "other": 1 },
        "builderOptions": {
            "database": "default",
            "table": "logs",
            "timeField": "timestamp",
            "timeFieldType": "DateTime",
            "logLevelField": "level"
        }
    });
    let doc = migrated(&legacy);

    assert_eq!(doc["editorType"], json!("builder"));
    assert_eq!(doc["pluginVersion"], json!("4.0.0"));
    assert_eq!(doc["rawSql"], legacy["rawSql"]);
    assert_eq!(doc["refId"], json!("A"));
    assert_eq!(doc["format"], json!(1));
    assert_eq!(doc["datasource"], legacy["datasource"]);
    assert_eq!(doc["key"], json!("Q-1"));
    assert_eq!(doc["hide"], json!(false));
    assert_eq!(doc["meta"], json!({ "timezone": "UTC" }));
    assert!(doc.get("queryType").is_none());
    assert!(doc.get("selectedFormat").is_none());

    let QueryDocument::Builder(query) = QueryDocument::from_value(&doc).unwrap() else {
        panic!("expected a builder document");
    };
    let options = query.builder_options;
    assert_eq!(options.query_type, QueryType::TimeSeries);
    assert_eq!(
        options.columns,
        vec![
            SelectedColumn::new("timestamp")
                .with_type("DateTime")
                .with_hint(ColumnHint::Time),
            SelectedColumn::new("level").with_hint(ColumnHint::LogLevel),
        ]
    );
}

#[test]
fn legacy_sql_query() {
    let legacy = json!({
        "queryType": "sql",
        "selectedFormat": 1,
        "rawSql": "SELECT * FROM spans",
        "format": 3,
        "expand": true,
        "builderOptions": { "table": "ignored" },
        "pluginVersion": "3.3.0"
    });
    let doc = migrated(&legacy);

    assert_eq!(doc["editorType"], json!("sql"));
    assert_eq!(doc["queryType"], json!("traces"));
    assert_eq!(doc["expand"], json!(true));
    assert_eq!(doc["pluginVersion"], json!("4.0.0"));
    assert!(doc.get("builderOptions").is_none());
    assert!(doc.get("selectedFormat").is_none());
    assert!(doc.get("meta").is_none());
}

#[test]
fn unknown_format_has_no_query_type() {
    let doc = migrated(&json!({ "rawSql": "SELECT 1", "format": 9 }));
    assert_eq!(doc["editorType"], json!("sql"));
    assert!(doc.get("queryType").is_none());
}

#[test]
fn embedded_builder_options_round_trip() {
    let builder_options = json!({
        "database": "db",
        "table": "events",
        "mode": "aggregate",
        "fields": ["host"],
        "metrics": [{ "field": "latency", "aggregation": "max", "alias": "worst" }],
        "groupBy": ["host"],
        "orderBy": [{ "name": "worst", "dir": "DESC" }],
        "filters": [
            { "filterType": "custom", "key": "host", "type": "String", "condition": "AND", "operator": "LIKE", "value": "web" }
        ],
        "limit": 25
    });
    let legacy = json!({
        "queryType": "sql",
        "rawSql": "SELECT max(latency) FROM events",
        "format": 1,
        "meta": { "timezone": "Europe/Paris", "builderOptions": builder_options }
    });

    let doc = migrated(&legacy);
    let direct = serde_json::to_value(migrate_v3_query_builder_options(&builder_options)).unwrap();
    assert_eq!(doc["meta"]["builderOptions"], direct);
    assert_eq!(doc["meta"]["timezone"], json!("Europe/Paris"));
    assert_eq!(doc["queryType"], json!("table"));
}

#[test]
fn legacy_filters_gain_hints() {
    let options = migrate_v3_query_builder_options(&json!({
        "timeField": "ts",
        "filters": [
            { "key": "ts", "type": "DateTime", "operator": "WITH IN DASHBOARD TIME RANGE", "condition": "AND" },
            { "key": "host", "type": "String", "operator": "=", "value": "a", "condition": "OR" }
        ]
    }));
    assert_eq!(options.filters[0].hint, Some(ColumnHint::Time));
    assert_eq!(options.filters[1].hint, None);
    assert_eq!(options.database, "");
    assert_eq!(options.limit, None);
}

#[test]
fn legacy_filters_are_copied_as_is() {
    let legacy_filters = json!([
        { "filterType": "custom", "key": "code", "type": "Int64", "condition": "AND", "operator": "=", "value": "042" },
        { "filterType": "custom", "key": "x", "type": "String", "condition": "AND" },
        { "filterType": "custom", "key": "ratio", "type": "Float64", "condition": "OR", "operator": ">", "value": "1.50" },
        { "filterType": "custom", "key": "ts", "type": "DateTime", "condition": "AND", "operator": "WITH IN DASHBOARD TIME RANGE" }
    ]);
    let options = migrate_v3_query_builder_options(&json!({
        "timeField": "ts",
        "filters": legacy_filters,
        "metrics": [{ "field": "a" }]
    }));

    let mut expected = legacy_filters.clone();
    expected[3]["hint"] = json!("time");
    assert_eq!(serde_json::to_value(&options.filters).unwrap(), expected);

    assert_eq!(options.aggregates.len(), 1);
    assert_eq!(options.aggregates[0].aggregate_type, AggregateType::Count);
    assert_eq!(options.aggregates[0].column, "a");
}

#[test]
fn null_raw_sql_is_still_migrated() {
    let legacy = json!({ "queryType": "sql", "rawSql": null, "format": 1 });
    let doc = migrated(&legacy);
    assert_eq!(doc["editorType"], json!("sql"));
    assert_eq!(doc["rawSql"], json!(""));
    assert_eq!(doc["pluginVersion"], json!("4.0.0"));
}

#[test]
fn input_is_never_mutated() {
    let legacy = json!({ "queryType": "builder", "rawSql": "", "builderOptions": {} });
    let copy = legacy.clone();
    let _ = migrated(&legacy);
    assert_eq!(legacy, copy);
}
