//! End-to-end: persisted document in, SQL out.

use chquery::config::ChQueryConfig;
use chquery::documents::QueryDocument;
use chquery::prepare_query;
use serde_json::json;

const CONFIG: &str = r#"
[generator]
default_limit = 100

[datasources.otel.time_filter]
enabled = true
time_column = "Timestamp"
time_column_type = "DateTime64"
"#;

#[test]
fn legacy_builder_document_generates_sql() {
    let config = ChQueryConfig::from_toml(CONFIG).unwrap().for_datasource("otel");
    let doc = json!({
        "queryType": "builder",
        "rawSql": "",
        "builderOptions": {
            "database": "default",
            "table": "requests",
            "fields": ["path", "status"]
        }
    });
    let (document, sql) = prepare_query(&doc, &config).unwrap();
    assert!(matches!(document, QueryDocument::Builder(_)));
    assert_eq!(sql, "SELECT \"path\", \"status\" FROM \"default\".\"requests\" LIMIT 100");
}

#[test]
fn sql_document_gets_datasource_time_filter() {
    let cfg = ChQueryConfig::from_toml(CONFIG).unwrap();
    let doc = json!({
        "editorType": "sql",
        "pluginVersion": "4.0.0",
        "rawSql": "SELECT * FROM otel_logs ORDER BY Timestamp DESC;"
    });

    let (_, sql) = prepare_query(&doc, &cfg.for_datasource("otel")).unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM otel_logs WHERE $__timeFilter_ms(\"Timestamp\") ORDER BY Timestamp DESC"
    );

    let (_, untouched) = prepare_query(&doc, &cfg.for_datasource("other")).unwrap();
    assert_eq!(untouched, "SELECT * FROM otel_logs ORDER BY Timestamp DESC;");
}

#[test]
fn undecodable_document_is_an_error() {
    let config = ChQueryConfig::default().for_datasource("");
    let doc = json!({ "editorType": "chart", "pluginVersion": "4.0.0", "rawSql": "" });
    assert!(prepare_query(&doc, &config).is_err());
}
