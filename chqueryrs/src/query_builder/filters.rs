use crate::dialect::{is_boolean_type, is_date_type, is_numeric_type, Dialect};
use crate::filters::{Filter, FilterOperator, FilterPredicate};
use crate::models::QueryBuilderOptions;

const START_TIME_SENTINEL: &str = "GRAFANA_START_TIME";
const END_TIME_SENTINEL: &str = "GRAFANA_END_TIME";

/// Column a filter applies to, after hint resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Rendered column reference, map subscript included.
    pub identifier: String,
    pub column_type: String,
}

/// Joined filter fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilters {
    pub sql: String,
    pub fragments: usize,
}

impl CompiledFilters {
    pub fn is_empty(&self) -> bool {
        self.fragments == 0
    }

    /// The filters as one conjunct of a larger `AND` chain.
    pub fn into_conjunct(self) -> Option<String> {
        match self.fragments {
            0 => None,
            1 => Some(self.sql),
            _ => Some(format!("( {} )", self.sql)),
        }
    }
}

/// Resolve the column a filter targets. A hinted filter takes name and type
/// from the hinted selected column; `None` means the filter is skipped.
pub fn resolve_filter_column(
    filter: &Filter,
    options: &QueryBuilderOptions,
    dialect: &dyn Dialect,
) -> Option<ResolvedColumn> {
    let (name, column_type) = match filter.hint {
        Some(hint) => {
            let column = options.column_by_hint(hint)?;
            let column_type = column
                .column_type
                .clone()
                .unwrap_or_else(|| filter.column_type.clone());
            (column.name.as_str(), column_type)
        }
        None => (filter.key.as_str(), filter.column_type.clone()),
    };
    if name.is_empty() {
        return None;
    }

    let mut identifier = dialect.column_ident(name);
    if let Some(map_key) = filter.map_key.as_deref().filter(|k| !k.is_empty()) {
        identifier.push_str(&format!("['{map_key}']"));
    }
    Some(ResolvedColumn {
        identifier,
        column_type,
    })
}

/// Compile one filter to a boolean fragment, unparenthesized.
///
/// Filters without a recognized operator, and dashboard range operators on a
/// column whose type is not date-like, compile to `None`.
pub fn compile_filter(
    filter: &Filter,
    column: &ResolvedColumn,
    dialect: &dyn Dialect,
) -> Option<String> {
    let operator = filter.operator()?;
    let column_type = column.column_type.as_str();

    let (operator_sql, negate) = match operator {
        FilterOperator::NotLike => ("LIKE", true),
        FilterOperator::WithinDashboardTimeRange => ("", false),
        FilterOperator::OutsideDashboardTimeRange => ("", true),
        other => (other.as_sql(), false),
    };

    let value = match operator {
        FilterOperator::IsNull
        | FilterOperator::IsNotNull
        | FilterOperator::IsEmpty
        | FilterOperator::IsNotEmpty => None,
        FilterOperator::WithinDashboardTimeRange | FilterOperator::OutsideDashboardTimeRange => {
            if !is_date_type(column_type) {
                return None;
            }
            Some(format!(
                ">= $__fromTime AND {} <= $__toTime",
                column.identifier
            ))
        }
        FilterOperator::In | FilterOperator::NotIn => {
            let values: Vec<String> = filter
                .predicate
                .value_list()
                .iter()
                .map(|v| dialect.render_string(v.trim()))
                .collect();
            Some(format!("({})", values.join(", ")))
        }
        _ if is_boolean_type(column_type) => Some(boolean_value(&filter.predicate)),
        _ if is_numeric_type(column_type) => Some(
            filter
                .predicate
                .value_text()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "0".to_string()),
        ),
        _ if is_date_type(column_type) => Some(date_value(&filter.predicate)),
        FilterOperator::Like | FilterOperator::NotLike => Some(format!(
            "'%{}%'",
            filter.predicate.value_text().unwrap_or_default()
        )),
        _ => Some(dialect.render_string(
            &filter.predicate.value_text().unwrap_or_default(),
        )),
    };

    let clause = [
        column.identifier.as_str(),
        operator_sql,
        value.as_deref().unwrap_or(""),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ");

    Some(if negate {
        format!("NOT ( {clause} )")
    } else {
        clause
    })
}

/// Compile every renderable filter, each parenthesized and chained with its
/// own joiner. Skipped filters never leave a dangling joiner.
pub fn compile_filters(options: &QueryBuilderOptions, dialect: &dyn Dialect) -> CompiledFilters {
    let mut compiled = CompiledFilters::default();
    for filter in &options.filters {
        let Some(column) = resolve_filter_column(filter, options, dialect) else {
            tracing::trace!(key = %filter.key, "skipping filter without a resolvable column");
            continue;
        };
        let Some(fragment) = compile_filter(filter, &column, dialect) else {
            tracing::trace!(key = %filter.key, "skipping filter with no renderable predicate");
            continue;
        };
        if compiled.fragments > 0 {
            compiled.sql.push(' ');
            compiled.sql.push_str(filter.condition.as_sql());
            compiled.sql.push(' ');
        }
        compiled.sql.push_str(&format!("( {fragment} )"));
        compiled.fragments += 1;
    }
    compiled
}

fn boolean_value(predicate: &FilterPredicate) -> String {
    match predicate {
        FilterPredicate::Boolean { value, .. } => value.to_string(),
        other => {
            let text = other.value_text().unwrap_or_default();
            (text.trim().eq_ignore_ascii_case("true")).to_string()
        }
    }
}

fn date_value(predicate: &FilterPredicate) -> String {
    match predicate.value_text().as_deref() {
        Some(START_TIME_SENTINEL) => "$__fromTime".to_string(),
        Some(END_TIME_SENTINEL) => "$__toTime".to_string(),
        Some(value) if !value.is_empty() => value.to_string(),
        _ => "TODAY".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::ClickHouseDialect;
    use crate::filters::FilterCondition;
    use crate::models::{ColumnHint, QueryType, SelectedColumn};
    use serde_json::json;

    fn compile_one(filter: Filter) -> Option<String> {
        let options = QueryBuilderOptions::default();
        let column = resolve_filter_column(&filter, &options, &ClickHouseDialect)?;
        compile_filter(&filter, &column, &ClickHouseDialect)
    }

    #[test]
    fn renders_values_by_column_type() {
        let number = Filter::new("n", "UInt64", FilterOperator::GreaterThan, Some(json!(3)));
        assert_eq!(compile_one(number).as_deref(), Some("\"n\" > 3"));

        let unset_number = Filter::new("n", "Float64", FilterOperator::Equals, None);
        assert_eq!(compile_one(unset_number).as_deref(), Some("\"n\" = 0"));

        let flag = Filter::new("ok", "Bool", FilterOperator::NotEquals, Some(json!(true)));
        assert_eq!(compile_one(flag).as_deref(), Some("\"ok\" != true"));

        let start = Filter::new(
            "ts",
            "DateTime",
            FilterOperator::GreaterThanOrEqual,
            Some(json!("GRAFANA_START_TIME")),
        );
        assert_eq!(compile_one(start).as_deref(), Some("\"ts\" >= $__fromTime"));

        let today = Filter::new("d", "Date", FilterOperator::Equals, None);
        assert_eq!(compile_one(today).as_deref(), Some("\"d\" = TODAY"));
    }

    #[test]
    fn renders_string_operators() {
        let eq = Filter::new("s", "String", FilterOperator::Equals, Some(json!("x")));
        assert_eq!(compile_one(eq).as_deref(), Some("\"s\" = 'x'"));

        let var = Filter::new("s", "String", FilterOperator::Equals, Some(json!("$service")));
        assert_eq!(compile_one(var).as_deref(), Some("\"s\" = $service"));

        let not_like = Filter::new("s", "String", FilterOperator::NotLike, Some(json!("err")));
        assert_eq!(compile_one(not_like).as_deref(), Some("NOT ( \"s\" LIKE '%err%' )"));

        let within = Filter::new("s", "String", FilterOperator::In, Some(json!(["a", " b "])));
        assert_eq!(compile_one(within).as_deref(), Some("\"s\" IN ('a', 'b')"));

        let null = Filter::new("s", "String", FilterOperator::IsNotNull, None);
        assert_eq!(compile_one(null).as_deref(), Some("\"s\" IS NOT NULL"));
    }

    #[test]
    fn renders_membership_and_emptiness() {
        let outside = Filter::new("s", "String", FilterOperator::NotIn, Some(json!(["a", "b"])));
        assert_eq!(compile_one(outside).as_deref(), Some("\"s\" NOT IN ('a', 'b')"));

        let scalar = Filter::new("s", "String", FilterOperator::In, Some(json!("a")));
        assert_eq!(compile_one(scalar).as_deref(), Some("\"s\" IN ('a')"));

        let empty = Filter::new("s", "String", FilterOperator::IsEmpty, None);
        assert_eq!(compile_one(empty).as_deref(), Some("\"s\" = ''"));

        let not_empty = Filter::new("s", "String", FilterOperator::IsNotEmpty, None);
        assert_eq!(compile_one(not_empty).as_deref(), Some("\"s\" != ''"));
    }

    #[test]
    fn filters_without_an_operator_are_skipped() {
        let filter: Filter =
            serde_json::from_value(json!({ "key": "s", "type": "String", "value": "x" })).unwrap();
        assert_eq!(compile_one(filter), None);
    }

    #[test]
    fn renders_dashboard_range_operators() {
        let inside = Filter::new("ts", "DateTime64(3)", FilterOperator::WithinDashboardTimeRange, None);
        assert_eq!(
            compile_one(inside).as_deref(),
            Some("\"ts\" >= $__fromTime AND \"ts\" <= $__toTime")
        );

        let outside = Filter::new("ts", "DateTime", FilterOperator::OutsideDashboardTimeRange, None);
        assert_eq!(
            compile_one(outside).as_deref(),
            Some("NOT ( \"ts\" >= $__fromTime AND \"ts\" <= $__toTime )")
        );

        let not_a_date = Filter::new("s", "String", FilterOperator::WithinDashboardTimeRange, None);
        assert_eq!(compile_one(not_a_date), None);
    }

    #[test]
    fn hint_overrides_key_and_type() {
        let mut options = QueryBuilderOptions::new("db", "logs", QueryType::Logs);
        options.columns = vec![SelectedColumn::new("SeverityText")
            .with_type("LowCardinality(String)")
            .with_hint(ColumnHint::LogLevel)];
        let filter = Filter::new("", "", FilterOperator::Equals, Some(json!("error")))
            .with_hint(ColumnHint::LogLevel);
        let column = resolve_filter_column(&filter, &options, &ClickHouseDialect).unwrap();
        assert_eq!(column.identifier, "\"SeverityText\"");
        assert_eq!(column.column_type, "LowCardinality(String)");
    }

    #[test]
    fn map_keys_become_subscripts() {
        let filter = Filter::new("LogAttributes", "Map(String, String)", FilterOperator::Equals, Some(json!("GET")))
            .with_map_key("http.method");
        assert_eq!(
            compile_one(filter).as_deref(),
            Some("\"LogAttributes\"['http.method'] = 'GET'")
        );
    }

    #[test]
    fn joiners_only_between_emitted_fragments() {
        let mut options = QueryBuilderOptions::default();
        options.filters = vec![
            Filter::new("", "String", FilterOperator::Equals, Some(json!("skip"))),
            Filter::new("a", "String", FilterOperator::Equals, Some(json!("x")))
                .with_condition(FilterCondition::Or),
            Filter::new("b", "Int32", FilterOperator::LessThan, Some(json!(2)))
                .with_condition(FilterCondition::Or),
            Filter::new("c", "String", FilterOperator::IsNull, None).with_hint(ColumnHint::TraceId),
        ];
        let compiled = compile_filters(&options, &ClickHouseDialect);
        assert_eq!(compiled.fragments, 2);
        assert_eq!(compiled.sql, "( \"a\" = 'x' ) OR ( \"b\" < 2 )");
        assert_eq!(
            compiled.into_conjunct().as_deref(),
            Some("( ( \"a\" = 'x' ) OR ( \"b\" < 2 ) )")
        );
    }
}
