//! SQL dialect abstractions.
//!
//! The query builder assembles clauses; the dialect only maps identifiers,
//! aggregates, literals and time macros to SQL fragments.

use crate::models::{AggregateType, TimeUnit};

pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;

    /// Quote a column reference unless it already looks like an expression.
    fn column_ident(&self, name: &str) -> String {
        if looks_like_expression(name) {
            name.to_string()
        } else {
            self.quote_ident(name)
        }
    }

    /// `"<database>"."<table>"`, dropping the separator when either is unset.
    fn qualify_table(&self, database: &str, table: &str) -> String {
        let sep = if database.is_empty() || table.is_empty() {
            ""
        } else {
            "."
        };
        format!(
            "{}{sep}{}",
            self.quote_ident(database),
            self.quote_ident(table)
        )
    }

    fn render_aggregation(&self, agg: &AggregateType, column: &str) -> String {
        format!("{}({column})", agg.as_str())
    }

    /// String literal, or a verbatim macro/variable reference when the value
    /// starts with `$`. Embedded quotes are not escaped.
    fn render_string(&self, value: &str) -> String {
        if value.starts_with('$') {
            value.to_string()
        } else {
            format!("'{value}'")
        }
    }

    fn render_duration(&self, column: &str, unit: TimeUnit) -> String;
    fn render_map_entries(&self, column: &str) -> String;
    fn time_interval(&self, column: &str) -> String;
    fn time_filter(&self, column: &str) -> String;
}

/// Function calls, quoted names, map subscripts and `*` are passed through
/// as-is.
pub(crate) fn looks_like_expression(name: &str) -> bool {
    name == "*"
        || name.contains('(')
        || name.contains(')')
        || name.contains('"')
        || name.contains('[')
}

mod clickhouse;
pub use clickhouse::{is_boolean_type, is_date_type, is_numeric_type, ClickHouseDialect};
