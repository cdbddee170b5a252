//! Dashboard time-range injection for hand-written SQL.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::clause::{find_main_clause_position, keyword_at, keyword_end};

static TIME_MACRO_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$__(timeFilter|timeFilter_ms|dateFilter|dateTimeFilter|dt)\(")
        .unwrap_or_else(|e| panic!("invalid time macro pattern: {e}"))
});

static TIME_RANGE_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$__(fromTime|toTime|fromTime_ms|toTime_ms)\b")
        .unwrap_or_else(|e| panic!("invalid time variable pattern: {e}"))
});

/// Clauses that may follow WHERE, in the order they are tried.
const TRAILING_CLAUSES: [&str; 5] = ["GROUP BY", "ORDER BY", "LIMIT", "SETTINGS", "FORMAT"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimeColumnType {
    #[default]
    DateTime,
    DateTime64,
}

impl TimeColumnType {
    fn filter_macro(&self) -> &'static str {
        match self {
            TimeColumnType::DateTime => "$__timeFilter",
            TimeColumnType::DateTime64 => "$__timeFilter_ms",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoTimeFilterOptions {
    pub enabled: bool,
    #[serde(alias = "time_column")]
    pub time_column: String,
    #[serde(alias = "time_column_type")]
    pub time_column_type: TimeColumnType,
}

impl AutoTimeFilterOptions {
    pub fn new(time_column: impl Into<String>, time_column_type: TimeColumnType) -> Self {
        Self {
            enabled: true,
            time_column: time_column.into(),
            time_column_type,
        }
    }
}

/// Whether `sql` already references the dashboard time range.
pub fn has_time_filter(sql: &str) -> bool {
    TIME_MACRO_CALL.is_match(sql) || TIME_RANGE_VARIABLE.is_match(sql)
}

/// Splice a time-range predicate on `options.time_column` into `sql`.
///
/// Returns the input borrowed when injection does not apply.
pub fn inject_time_filter<'a>(sql: &'a str, options: &AutoTimeFilterOptions) -> Cow<'a, str> {
    if !options.enabled || options.time_column.is_empty() || sql.is_empty() {
        return Cow::Borrowed(sql);
    }
    if keyword_at(sql, 0, &["SELECT"]).is_none() {
        tracing::trace!("time filter skipped: not a SELECT statement");
        return Cow::Borrowed(sql);
    }
    if has_time_filter(sql) {
        tracing::trace!("time filter skipped: query already filters on time");
        return Cow::Borrowed(sql);
    }

    let body = strip_terminator(sql);
    let condition = format!(
        "{}(\"{}\")",
        options.time_column_type.filter_macro(),
        options.time_column
    );

    let injected = if let Some(pos) = find_main_clause_position(body, "WHERE") {
        let end = keyword_end(body, pos, &["WHERE"]);
        format!("{} {condition} AND{}", &body[..end], &body[end..])
    } else if let Some(pos) = TRAILING_CLAUSES
        .iter()
        .find_map(|clause| find_main_clause_position(body, clause))
    {
        format!("{}WHERE {condition} {}", &body[..pos], &body[pos..])
    } else {
        format!("{body} WHERE {condition}")
    };

    tracing::debug!(
        time_column = %options.time_column,
        column_type = ?options.time_column_type,
        "injected dashboard time filter"
    );
    Cow::Owned(injected)
}

/// Drop one trailing `;` and the whitespace around it.
fn strip_terminator(sql: &str) -> &str {
    let trimmed = sql.trim_end();
    trimmed
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(trimmed)
}
