//! SQL generation from `QueryBuilderOptions`.
//!
//! Each query shape assembles a [`SelectQuery`]; [`SqlRenderer`] turns it
//! into text. Generation never fails: incomplete options simply produce
//! fewer fragments.

use crate::config::GeneratorConfig;
use crate::dialect::{ClickHouseDialect, Dialect};
use crate::models::{QueryBuilderOptions, QueryType, SelectedColumn};
use crate::sql_ast::{OrderItem, SelectItem, SelectQuery, SqlRenderer, TableRef};

mod filters;
mod logs;
mod table;
mod traces;

pub use filters::{compile_filter, compile_filters, resolve_filter_column, CompiledFilters, ResolvedColumn};

#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    config: GeneratorConfig,
}

impl SqlBuilder {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Build ClickHouse SQL.
    pub fn build(&self, options: &QueryBuilderOptions) -> String {
        self.build_with_dialect(options, &ClickHouseDialect)
    }

    /// Build SQL using a provided dialect (useful for tests).
    pub fn build_with_dialect(&self, options: &QueryBuilderOptions, dialect: &dyn Dialect) -> String {
        let query = self.plan(options, dialect);
        let sql = SqlRenderer::new(dialect).render_select(&query);
        tracing::trace!(query_type = ?options.query_type, sql = %sql, "generated sql");
        sql
    }

    /// Assemble the SELECT for the options' query shape without rendering it.
    pub fn plan(&self, options: &QueryBuilderOptions, dialect: &dyn Dialect) -> SelectQuery {
        match options.query_type {
            QueryType::Traces => traces::build_query(options, dialect, &self.config),
            QueryType::Logs => logs::build_query(options, dialect, &self.config),
            QueryType::Table | QueryType::TimeSeries => {
                table::build_query(options, dialect, &self.config)
            }
        }
    }
}

/// Generate ClickHouse SQL with the default generator settings.
pub fn generate_sql(options: &QueryBuilderOptions) -> String {
    SqlBuilder::default().build(options)
}

/// `None` falls back to `default`; negative limits floor at 0, and a zero
/// limit drops the clause.
pub(crate) fn resolve_limit(limit: Option<i64>, default: u64) -> Option<u64> {
    let resolved = match limit {
        Some(n) => u64::try_from(n).unwrap_or(0),
        None => default,
    };
    (resolved > 0).then_some(resolved)
}

pub(crate) fn table_ref(options: &QueryBuilderOptions) -> TableRef {
    TableRef {
        database: options.database.clone(),
        table: options.table.clone(),
    }
}

/// Plain selected column, with a quoted alias when one differs from the name.
pub(crate) fn select_column(column: &SelectedColumn, dialect: &dyn Dialect) -> SelectItem {
    let expr = dialect.column_ident(&column.name);
    match column.alias.as_deref() {
        Some(alias) if !alias.is_empty() && alias != column.name => {
            SelectItem::quoted_alias(expr, alias)
        }
        _ => SelectItem::new(expr),
    }
}

/// User ordering. A hinted entry sorts by the hinted column's alias or name.
pub(crate) fn user_order(options: &QueryBuilderOptions, dialect: &dyn Dialect) -> Vec<OrderItem> {
    options
        .order_by
        .iter()
        .filter_map(|o| {
            let expr = match o.hint.and_then(|h| options.column_by_hint(h)) {
                Some(column) => match column.alias.as_deref().filter(|a| !a.is_empty()) {
                    Some(alias) => dialect.quote_ident(alias),
                    None => dialect.column_ident(&column.name),
                },
                None if o.name.is_empty() => return None,
                None => o.name.clone(),
            };
            Some(OrderItem {
                expr,
                direction: o.dir,
            })
        })
        .collect()
}

/// Compiled user filters as a single conjunct.
pub(crate) fn filter_conjunct(options: &QueryBuilderOptions, dialect: &dyn Dialect) -> Option<String> {
    compile_filters(options, dialect).into_conjunct()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_follow_default_and_floor() {
        assert_eq!(resolve_limit(None, 1000), Some(1000));
        assert_eq!(resolve_limit(Some(25), 1000), Some(25));
        assert_eq!(resolve_limit(Some(-5), 1000), None);
        assert_eq!(resolve_limit(Some(0), 1000), None);
        assert_eq!(resolve_limit(None, 0), None);
    }
}
