pub mod clause;
pub mod config;
pub mod dialect;
pub mod documents;
pub mod error;
pub mod filters;
pub mod migration;
pub mod models;
pub mod query_builder;
pub mod schema;
pub mod schema_cache;
pub mod sql_ast;
pub mod time_filter;

use serde_json::Value;

use crate::config::ResolvedDatasourceConfig;
use crate::documents::QueryDocument;
use crate::error::Result;

/// Load a persisted document for a datasource: migrate it, decode it and
/// produce the SQL to run, time filter applied to hand-written SQL.
pub fn prepare_query(doc: &Value, config: &ResolvedDatasourceConfig) -> Result<(QueryDocument, String)> {
    let migrated = migration::Migrator::new(&config.migration).migrate(doc);
    let document = QueryDocument::from_value(&migrated)?;
    let sql = match &document {
        QueryDocument::Builder(query) => {
            query_builder::SqlBuilder::new(config.generator.clone()).build(&query.builder_options)
        }
        QueryDocument::Sql(query) => {
            time_filter::inject_time_filter(&query.raw_sql, &config.time_filter).into_owned()
        }
    };
    Ok((document, sql))
}

pub use clause::find_main_clause_position;
pub use config::ChQueryConfig;
pub use dialect::{ClickHouseDialect, Dialect};
pub use documents::{BuilderQuery, SqlQuery};
pub use error::ChQueryError;
pub use filters::{Filter, FilterCondition, FilterOperator, FilterPredicate};
pub use migration::{migrate_query, migrate_v3_query_builder_options, Migrator};
pub use models::{
    AggregateColumn, AggregateType, BuilderMode, ColumnHint, OrderBy, OrderByDirection,
    QueryBuilderOptions, QueryType, SelectedColumn,
};
pub use query_builder::{generate_sql, SqlBuilder};
pub use schema::{mark_custom_columns, SchemaLookup, SchemaProvider, TableColumn};
pub use time_filter::{has_time_filter, inject_time_filter, AutoTimeFilterOptions, TimeColumnType};
