//! Trace shape: fixed trace-panel aliases for hinted columns.

use crate::config::GeneratorConfig;
use crate::dialect::Dialect;
use crate::models::{ColumnHint, OrderByDirection, QueryBuilderOptions};
use crate::sql_ast::{OrderItem, SelectItem, SelectQuery};

use super::{filter_conjunct, resolve_limit, table_ref, user_order};

/// Hint to output alias, in projection order. Duration and map-typed
/// columns are handled separately.
const TRACE_ALIASES: [(ColumnHint, &str); 10] = [
    (ColumnHint::TraceId, "traceID"),
    (ColumnHint::TraceSpanId, "spanID"),
    (ColumnHint::TraceParentSpanId, "parentSpanID"),
    (ColumnHint::TraceServiceName, "serviceName"),
    (ColumnHint::TraceOperationName, "operationName"),
    (ColumnHint::Time, "startTime"),
    (ColumnHint::TraceDurationTime, "duration"),
    (ColumnHint::TraceTags, "tags"),
    (ColumnHint::TraceServiceTags, "serviceTags"),
    (ColumnHint::TraceStatusCode, "statusCode"),
];

pub(super) fn build_query(
    options: &QueryBuilderOptions,
    dialect: &dyn Dialect,
    config: &GeneratorConfig,
) -> SelectQuery {
    let duration_unit = options.meta.trace_duration_unit.unwrap_or_default();

    let select = TRACE_ALIASES
        .iter()
        .filter_map(|(hint, alias)| {
            let column = options.column_by_hint(*hint)?;
            let ident = dialect.column_ident(&column.name);
            let expr = match hint {
                ColumnHint::TraceDurationTime => dialect.render_duration(&ident, duration_unit),
                ColumnHint::TraceTags | ColumnHint::TraceServiceTags => {
                    dialect.render_map_entries(&ident)
                }
                _ => ident,
            };
            Some(SelectItem::aliased(expr, *alias))
        })
        .collect();

    let mut filters = Vec::new();
    if let Some(trace_id) = options.meta.trace_id_lookup() {
        filters.push(format!("traceID = '{trace_id}'"));
    }
    filters.extend(filter_conjunct(options, dialect));

    let mut order_by = Vec::new();
    if options.column_by_hint(ColumnHint::Time).is_some() {
        order_by.push(OrderItem {
            expr: "startTime".to_string(),
            direction: OrderByDirection::Asc,
        });
    }
    order_by.extend(user_order(options, dialect));

    tracing::debug!(
        table = %options.table,
        trace_id_mode = options.meta.trace_id_lookup().is_some(),
        "building trace query"
    );

    SelectQuery {
        select,
        from: table_ref(options),
        filters,
        group_by: Vec::new(),
        order_by,
        limit: resolve_limit(options.limit, config.default_limit),
    }
}
