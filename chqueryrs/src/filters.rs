//! Filter model.
//!
//! Persisted filters are flat JSON objects (`key`, `type`, `operator`,
//! `value`, ...). In memory the operator/value pair becomes a
//! [`FilterPredicate`], one variant per filter shape, so the predicate
//! compiler matches every shape exhaustively.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::dialect::{is_boolean_type, is_date_type, is_numeric_type};
use crate::models::ColumnHint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
    #[serde(rename = "= ''")]
    IsEmpty,
    #[serde(rename = "!= ''")]
    IsNotEmpty,
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "WITH IN DASHBOARD TIME RANGE")]
    WithinDashboardTimeRange,
    #[serde(rename = "OUTSIDE DASHBOARD TIME RANGE")]
    OutsideDashboardTimeRange,
}

impl FilterOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
            FilterOperator::IsEmpty => "= ''",
            FilterOperator::IsNotEmpty => "!= ''",
            FilterOperator::Equals => "=",
            FilterOperator::NotEquals => "!=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::Like => "LIKE",
            FilterOperator::NotLike => "NOT LIKE",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT IN",
            FilterOperator::WithinDashboardTimeRange => "WITH IN DASHBOARD TIME RANGE",
            FilterOperator::OutsideDashboardTimeRange => "OUTSIDE DASHBOARD TIME RANGE",
        }
    }
}

/// Declares a subset of [`FilterOperator`] accepted by one filter shape.
macro_rules! operator_family {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl From<$name> for FilterOperator {
            fn from(op: $name) -> Self {
                match op {
                    $($name::$variant => FilterOperator::$variant),+
                }
            }
        }

        impl $name {
            pub fn from_operator(op: FilterOperator) -> Option<Self> {
                match op {
                    $(FilterOperator::$variant => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

operator_family!(
    /// Value-less checks.
    NullOperator { IsNull, IsNotNull, IsEmpty, IsNotEmpty }
);
operator_family!(EqualityOperator { Equals, NotEquals });
operator_family!(ComparisonOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
});
operator_family!(
    /// Membership in the active dashboard time range.
    RangeOperator { WithinDashboardTimeRange, OutsideDashboardTimeRange }
);
operator_family!(StringOperator { Equals, NotEquals, Like, NotLike });
operator_family!(MultiOperator { In, NotIn });

#[derive(Debug, Clone, PartialEq)]
pub enum FilterPredicate {
    Null {
        operator: NullOperator,
    },
    Boolean {
        operator: EqualityOperator,
        value: bool,
    },
    Number {
        operator: ComparisonOperator,
        value: Option<Number>,
    },
    DateWithValue {
        operator: ComparisonOperator,
        value: Option<String>,
    },
    DateWithoutValue {
        operator: RangeOperator,
    },
    String {
        operator: StringOperator,
        value: Option<String>,
    },
    Multi {
        operator: MultiOperator,
        value: Vec<String>,
    },
    /// Operator/value combinations outside the shapes above, kept verbatim.
    Other {
        operator: FilterOperator,
        value: Option<Value>,
    },
    /// Missing or unrecognized operator. Never compiled.
    Unrecognized { operator: Option<Value> },
}

impl FilterPredicate {
    /// Pick the filter shape from the column type, operator and value.
    pub fn classify(column_type: &str, operator: FilterOperator, value: Option<Value>) -> Self {
        if let Some(operator) = NullOperator::from_operator(operator) {
            return FilterPredicate::Null { operator };
        }
        if let Some(operator) = RangeOperator::from_operator(operator) {
            return FilterPredicate::DateWithoutValue { operator };
        }
        if let Some(multi) = MultiOperator::from_operator(operator) {
            return match string_list(value.as_ref()) {
                Some(values) => FilterPredicate::Multi {
                    operator: multi,
                    value: values,
                },
                None => FilterPredicate::Other { operator, value },
            };
        }

        let is_bool_value = matches!(value, Some(Value::Bool(_)));
        if is_boolean_type(column_type) || is_bool_value {
            if let (Some(eq), Some(Value::Bool(flag))) =
                (EqualityOperator::from_operator(operator), value.as_ref())
            {
                return FilterPredicate::Boolean {
                    operator: eq,
                    value: *flag,
                };
            }
            return FilterPredicate::Other { operator, value };
        }

        if let Some(cmp) = ComparisonOperator::from_operator(operator) {
            if is_numeric_type(column_type) {
                match number_value(value.as_ref()) {
                    Some(number) => {
                        return FilterPredicate::Number {
                            operator: cmp,
                            value: number,
                        }
                    }
                    None => return FilterPredicate::Other { operator, value },
                }
            }
            if is_date_type(column_type) {
                match text_value(value.as_ref()) {
                    Some(text) => {
                        return FilterPredicate::DateWithValue {
                            operator: cmp,
                            value: text,
                        }
                    }
                    None => return FilterPredicate::Other { operator, value },
                }
            }
        }

        if let Some(string_op) = StringOperator::from_operator(operator) {
            if let Some(text) = text_value(value.as_ref()) {
                return FilterPredicate::String {
                    operator: string_op,
                    value: text,
                };
            }
        }
        FilterPredicate::Other { operator, value }
    }

    /// Read a persisted operator/value pair. An operator that does not
    /// decode yields [`FilterPredicate::Unrecognized`].
    pub fn from_persisted(column_type: &str, operator: Option<&Value>, value: Option<Value>) -> Self {
        let known = operator.and_then(|op| serde_json::from_value::<FilterOperator>(op.clone()).ok());
        match known {
            Some(op) => Self::classify(column_type, op, value),
            None => FilterPredicate::Unrecognized {
                operator: operator.cloned(),
            },
        }
    }

    pub fn operator(&self) -> Option<FilterOperator> {
        Some(match self {
            FilterPredicate::Null { operator } => (*operator).into(),
            FilterPredicate::Boolean { operator, .. } => (*operator).into(),
            FilterPredicate::Number { operator, .. } => (*operator).into(),
            FilterPredicate::DateWithValue { operator, .. } => (*operator).into(),
            FilterPredicate::DateWithoutValue { operator } => (*operator).into(),
            FilterPredicate::String { operator, .. } => (*operator).into(),
            FilterPredicate::Multi { operator, .. } => (*operator).into(),
            FilterPredicate::Other { operator, .. } => *operator,
            FilterPredicate::Unrecognized { .. } => return None,
        })
    }

    /// The `operator` field as persisted.
    fn persisted_operator(&self) -> Option<Value> {
        match self {
            FilterPredicate::Unrecognized { operator } => operator.clone(),
            other => other
                .operator()
                .map(|op| Value::String(op.as_sql().to_string())),
        }
    }

    /// Scalar value as text, whatever shape holds it.
    pub fn value_text(&self) -> Option<String> {
        match self {
            FilterPredicate::Null { .. }
            | FilterPredicate::DateWithoutValue { .. }
            | FilterPredicate::Unrecognized { .. } => None,
            FilterPredicate::Boolean { value, .. } => Some(value.to_string()),
            FilterPredicate::Number { value, .. } => value.as_ref().map(Number::to_string),
            FilterPredicate::DateWithValue { value, .. } | FilterPredicate::String { value, .. } => {
                value.clone()
            }
            FilterPredicate::Multi { value, .. } => Some(value.join(",")),
            FilterPredicate::Other { value, .. } => match value {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            },
        }
    }

    /// List value for membership operators.
    pub fn value_list(&self) -> Vec<String> {
        match self {
            FilterPredicate::Multi { value, .. } => value.clone(),
            FilterPredicate::Other {
                value: Some(value), ..
            } => string_list(Some(value))
                .unwrap_or_else(|| self.value_text().into_iter().collect()),
            other => other.value_text().into_iter().collect(),
        }
    }
}

fn text_value(value: Option<&Value>) -> Option<Option<String>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some(Some(s.clone())),
        _ => None,
    }
}

fn number_value(value: Option<&Value>) -> Option<Option<Number>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::Number(n)) => Some(Some(n.clone())),
        Some(Value::String(s)) if s.trim().is_empty() => Some(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                return Some(Some(Number::from(int)));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Some)
        }
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterCondition {
    #[default]
    And,
    Or,
}

impl FilterCondition {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterCondition::And => "AND",
            FilterCondition::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name or map-subscript expression.
    pub key: String,
    /// Source column type as recorded by the editor.
    pub column_type: String,
    /// Joiner against the previous emitted filter.
    pub condition: FilterCondition,
    pub hint: Option<ColumnHint>,
    pub map_key: Option<String>,
    pub restrict_to_fields: Option<Value>,
    pub label: Option<String>,
    /// Persisted `value`, written back exactly as read.
    pub value: Option<Value>,
    /// Typed reading of the operator and `value`.
    pub predicate: FilterPredicate,
}

impl Filter {
    pub fn new(
        key: impl Into<String>,
        column_type: impl Into<String>,
        operator: FilterOperator,
        value: Option<Value>,
    ) -> Self {
        let column_type = column_type.into();
        let predicate = FilterPredicate::classify(&column_type, operator, value.clone());
        Self {
            key: key.into(),
            column_type,
            condition: FilterCondition::And,
            hint: None,
            map_key: None,
            restrict_to_fields: None,
            label: None,
            value,
            predicate,
        }
    }

    /// Read a persisted filter field by field. Mistyped fields fall back to
    /// their defaults instead of failing the whole filter; `None` only for
    /// entries that are not objects.
    pub fn from_value_lenient(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let condition = match text("condition").map(|c| c.trim().to_ascii_uppercase()) {
            Some(c) if c == "OR" => FilterCondition::Or,
            _ => FilterCondition::And,
        };
        Some(
            RawFilter {
                filter_type: text("filterType").unwrap_or_else(custom_filter_type),
                key: text("key").unwrap_or_default(),
                column_type: text("type").unwrap_or_default(),
                condition,
                operator: obj.get("operator").cloned(),
                value: obj.get("value").cloned(),
                hint: obj
                    .get("hint")
                    .and_then(|h| serde_json::from_value(h.clone()).ok()),
                map_key: text("mapKey"),
                restrict_to_fields: obj.get("restrictToFields").cloned(),
                label: text("label"),
            }
            .into(),
        )
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_hint(mut self, hint: ColumnHint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_map_key(mut self, map_key: impl Into<String>) -> Self {
        self.map_key = Some(map_key.into());
        self
    }

    /// `None` when the persisted operator is missing or unrecognized.
    pub fn operator(&self) -> Option<FilterOperator> {
        self.predicate.operator()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFilter {
    #[serde(default = "custom_filter_type")]
    filter_type: String,
    #[serde(default)]
    key: String,
    #[serde(rename = "type", default)]
    column_type: String,
    #[serde(default)]
    condition: FilterCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hint: Option<ColumnHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    map_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    restrict_to_fields: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

fn custom_filter_type() -> String {
    "custom".to_string()
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawFilter {
            filter_type: custom_filter_type(),
            key: self.key.clone(),
            column_type: self.column_type.clone(),
            condition: self.condition,
            operator: self.predicate.persisted_operator(),
            value: self.value.clone(),
            hint: self.hint,
            map_key: self.map_key.clone(),
            restrict_to_fields: self.restrict_to_fields.clone(),
            label: self.label.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawFilter::deserialize(deserializer).map(Filter::from)
    }
}

impl From<RawFilter> for Filter {
    fn from(raw: RawFilter) -> Self {
        let predicate =
            FilterPredicate::from_persisted(&raw.column_type, raw.operator.as_ref(), raw.value.clone());
        Filter {
            key: raw.key,
            column_type: raw.column_type,
            condition: raw.condition,
            hint: raw.hint,
            map_key: raw.map_key,
            restrict_to_fields: raw.restrict_to_fields,
            label: raw.label,
            value: raw.value,
            predicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Filter {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classifies_each_shape() {
        let null = parse(json!({ "key": "a", "type": "String", "operator": "IS NULL" }));
        assert!(matches!(null.predicate, FilterPredicate::Null { .. }));

        let boolean = parse(json!({ "key": "ok", "type": "boolean", "operator": "=", "value": true }));
        assert!(matches!(boolean.predicate, FilterPredicate::Boolean { value: true, .. }));

        let number = parse(json!({ "key": "n", "type": "UInt32", "operator": ">=", "value": 5 }));
        assert_eq!(number.predicate.value_text().as_deref(), Some("5"));

        let date = parse(json!({ "key": "d", "type": "DateTime", "operator": "<", "value": "GRAFANA_END_TIME" }));
        assert!(matches!(date.predicate, FilterPredicate::DateWithValue { .. }));

        let range = parse(json!({ "key": "d", "type": "Date", "operator": "OUTSIDE DASHBOARD TIME RANGE" }));
        assert!(matches!(
            range.predicate,
            FilterPredicate::DateWithoutValue {
                operator: RangeOperator::OutsideDashboardTimeRange
            }
        ));

        let string = parse(json!({ "key": "s", "type": "String", "operator": "NOT LIKE", "value": "err" }));
        assert!(matches!(
            string.predicate,
            FilterPredicate::String {
                operator: StringOperator::NotLike,
                ..
            }
        ));

        let multi = parse(json!({ "key": "s", "type": "String", "operator": "IN", "value": ["a", "b"] }));
        assert_eq!(multi.predicate.value_list(), vec!["a", "b"]);

        let other = parse(json!({ "key": "s", "type": "String", "operator": ">", "value": "m" }));
        assert!(matches!(other.predicate, FilterPredicate::Other { .. }));
    }

    #[test]
    fn numeric_strings_become_numbers() {
        let filter = parse(json!({ "key": "n", "type": "Int64", "operator": "=", "value": "42" }));
        assert!(matches!(filter.predicate, FilterPredicate::Number { .. }));
        assert_eq!(filter.predicate.value_text().as_deref(), Some("42"));
    }

    #[test]
    fn persisted_value_is_kept_verbatim() {
        let original = json!({
            "filterType": "custom",
            "key": "code",
            "type": "Int64",
            "condition": "AND",
            "operator": "=",
            "value": "042"
        });
        let filter = parse(original.clone());
        assert!(matches!(filter.predicate, FilterPredicate::Number { .. }));
        assert_eq!(serde_json::to_value(&filter).unwrap(), original);
    }

    #[test]
    fn missing_or_unknown_operator_is_kept() {
        let missing = parse(json!({ "key": "x", "type": "String" }));
        assert_eq!(missing.operator(), None);
        assert!(serde_json::to_value(&missing).unwrap().get("operator").is_none());

        let unknown = json!({
            "filterType": "custom",
            "key": "x",
            "type": "String",
            "condition": "OR",
            "operator": "MATCHES",
            "value": "a"
        });
        let filter = parse(unknown.clone());
        assert!(matches!(filter.predicate, FilterPredicate::Unrecognized { .. }));
        assert_eq!(serde_json::to_value(&filter).unwrap(), unknown);
    }

    #[test]
    fn scalar_membership_value_is_a_single_item() {
        let filter = parse(json!({ "key": "s", "type": "String", "operator": "IN", "value": "a" }));
        assert!(matches!(filter.predicate, FilterPredicate::Other { .. }));
        assert_eq!(filter.predicate.value_list(), vec!["a"]);
    }

    #[test]
    fn lenient_reading_defaults_mistyped_fields() {
        let filter = Filter::from_value_lenient(&json!({
            "key": 7,
            "type": "String",
            "condition": "or",
            "operator": "=",
            "value": "x",
            "hint": "not_a_hint"
        }))
        .unwrap();
        assert_eq!(filter.key, "");
        assert_eq!(filter.condition, FilterCondition::Or);
        assert_eq!(filter.hint, None);
        assert_eq!(filter.operator(), Some(FilterOperator::Equals));
        assert!(Filter::from_value_lenient(&json!("x")).is_none());
    }

    #[test]
    fn serializes_back_to_persisted_shape() {
        let original = json!({
            "filterType": "custom",
            "key": "SpanAttributes",
            "type": "Map(String, String)",
            "condition": "OR",
            "operator": "=",
            "value": "GET",
            "mapKey": "http.method",
            "label": "Method"
        });
        let filter = parse(original.clone());
        assert_eq!(filter.condition, FilterCondition::Or);
        assert_eq!(serde_json::to_value(&filter).unwrap(), original);
    }
}
