//! Generic tabular shape, including the time-series bucketing refinement.

use crate::config::GeneratorConfig;
use crate::dialect::Dialect;
use crate::models::{AggregateColumn, ColumnHint, OrderByDirection, QueryBuilderOptions, QueryType};
use crate::sql_ast::{OrderItem, SelectItem, SelectQuery};

use super::{filter_conjunct, resolve_limit, select_column, table_ref, user_order};

const TIME_ALIAS: &str = "time";

pub(super) fn build_query(
    options: &QueryBuilderOptions,
    dialect: &dyn Dialect,
    config: &GeneratorConfig,
) -> SelectQuery {
    let time_column = match options.query_type {
        QueryType::TimeSeries => options
            .column_by_hint(ColumnHint::Time)
            .filter(|c| !c.name.is_empty()),
        _ => None,
    };
    let time_ident = time_column.map(|c| dialect.column_ident(&c.name));
    let aggregate = options.is_aggregate();

    let mut select = Vec::new();
    let mut filters = Vec::new();
    let mut group_by = Vec::new();
    let mut order_by = Vec::new();

    if let Some(ident) = &time_ident {
        select.push(SelectItem::aliased(dialect.time_interval(ident), TIME_ALIAS));
        filters.push(dialect.time_filter(ident));
        order_by.push(OrderItem {
            expr: TIME_ALIAS.to_string(),
            direction: OrderByDirection::Asc,
        });
        if aggregate {
            group_by.push(TIME_ALIAS.to_string());
        }
    }

    if aggregate {
        let group_idents: Vec<String> = options
            .group_by
            .iter()
            .filter(|g| !g.is_empty())
            .map(|g| dialect.column_ident(g))
            .collect();
        select.extend(group_idents.iter().cloned().map(SelectItem::new));
        select.extend(options.aggregates.iter().map(|a| aggregate_item(a, dialect)));
        group_by.extend(group_idents);
    } else {
        select.extend(
            options
                .columns
                .iter()
                .filter(|c| !c.name.is_empty())
                .filter(|c| !(time_ident.is_some() && c.hint == Some(ColumnHint::Time)))
                .map(|c| select_column(c, dialect)),
        );
    }

    filters.extend(filter_conjunct(options, dialect));
    order_by.extend(user_order(options, dialect));

    tracing::debug!(
        table = %options.table,
        aggregate,
        time_series = time_ident.is_some(),
        "building tabular query"
    );

    SelectQuery {
        select,
        from: table_ref(options),
        filters,
        group_by,
        order_by,
        limit: resolve_limit(options.limit, config.default_limit),
    }
}

/// `<fn>(<column>)`, aliased with spaces replaced by `_`.
fn aggregate_item(aggregate: &AggregateColumn, dialect: &dyn Dialect) -> SelectItem {
    let expr = dialect.render_aggregation(
        &aggregate.aggregate_type,
        &dialect.column_ident(&aggregate.column),
    );
    match aggregate.alias.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(alias) => SelectItem::aliased(expr, alias.replace(' ', "_")),
        None => SelectItem::new(expr),
    }
}
