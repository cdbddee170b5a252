use crate::config::GeneratorConfig;
use crate::dialect::Dialect;
use crate::models::{ColumnHint, QueryBuilderOptions};
use crate::sql_ast::{SelectItem, SelectQuery};

use super::{filter_conjunct, resolve_limit, select_column, table_ref, user_order};

/// Leading log columns, always emitted first and in this order.
const LOG_ALIASES: [(ColumnHint, &str); 4] = [
    (ColumnHint::Time, "timestamp"),
    (ColumnHint::LogMessage, "body"),
    (ColumnHint::LogLevel, "level"),
    (ColumnHint::LogLabels, "labels"),
];

pub(super) fn build_query(
    options: &QueryBuilderOptions,
    dialect: &dyn Dialect,
    config: &GeneratorConfig,
) -> SelectQuery {
    let mut select: Vec<SelectItem> = LOG_ALIASES
        .iter()
        .filter_map(|(hint, alias)| {
            let column = options.column_by_hint(*hint)?;
            Some(SelectItem::aliased(dialect.column_ident(&column.name), *alias))
        })
        .collect();

    select.extend(
        options
            .columns
            .iter()
            .filter(|c| c.hint.is_none() && !c.name.is_empty())
            .map(|c| select_column(c, dialect)),
    );

    SelectQuery {
        select,
        from: table_ref(options),
        filters: filter_conjunct(options, dialect).into_iter().collect(),
        group_by: Vec::new(),
        order_by: user_order(options, dialect),
        limit: resolve_limit(options.limit, config.default_limit),
    }
}
