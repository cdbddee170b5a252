//! ClickHouse dialect implementation.

use crate::models::TimeUnit;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct ClickHouseDialect;

impl Dialect for ClickHouseDialect {
    fn quote_ident(&self, ident: &str) -> String {
        if ident.is_empty() {
            return String::new();
        }
        format!("\"{ident}\"")
    }

    fn render_duration(&self, column: &str, unit: TimeUnit) -> String {
        match unit {
            TimeUnit::Seconds => format!("multiply({column}, 1000)"),
            TimeUnit::Milliseconds => column.to_string(),
            TimeUnit::Microseconds => format!("intDivOrZero({column}, 1000)"),
            TimeUnit::Nanoseconds => format!("intDivOrZero({column}, 1000000)"),
        }
    }

    fn render_map_entries(&self, column: &str) -> String {
        format!("arrayMap(key -> map('key', key, 'value',{column}[key]), mapKeys({column}))")
    }

    fn time_interval(&self, column: &str) -> String {
        format!("$__timeInterval({column})")
    }

    fn time_filter(&self, column: &str) -> String {
        format!("$__timeFilter({column})")
    }
}

/// Strip `Nullable(...)` and `LowCardinality(...)` wrappers, lowercased.
fn base_type(column_type: &str) -> String {
    let mut current = column_type.trim().to_ascii_lowercase();
    loop {
        let inner = ["nullable(", "lowcardinality("].iter().find_map(|prefix| {
            current
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::to_string)
        });
        match inner {
            Some(inner) => current = inner.trim().to_string(),
            None => return current,
        }
    }
}

pub fn is_boolean_type(column_type: &str) -> bool {
    matches!(base_type(column_type).as_str(), "bool" | "boolean")
}

pub fn is_numeric_type(column_type: &str) -> bool {
    let base = base_type(column_type);
    ["int", "uint", "float", "decimal"]
        .iter()
        .any(|prefix| base.starts_with(prefix))
}

pub fn is_date_type(column_type: &str) -> bool {
    base_type(column_type).starts_with("date")
}
