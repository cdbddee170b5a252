//! Minimal SELECT representation rendered to ClickHouse SQL text.
//!
//! Builders fill the clause lists with already-rendered fragments; the
//! renderer only decides clause order, separators and alias quoting.

use crate::dialect::Dialect;
use crate::models::OrderByDirection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alias {
    /// Fixed output name emitted as-is, e.g. `as traceID`.
    Bare(String),
    /// User-provided name, double-quoted.
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub expr: String,
    pub alias: Option<Alias>,
}

impl SelectItem {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn aliased(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(Alias::Bare(alias.into())),
        }
    }

    pub fn quoted_alias(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(Alias::Quoted(alias.into())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    pub fn is_empty(&self) -> bool {
        self.database.is_empty() && self.table.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub expr: String,
    pub direction: OrderByDirection,
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    /// Top-level conjuncts, joined with `AND`.
    pub filters: Vec<String>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let projection = if query.select.is_empty() {
            "*".to_string()
        } else {
            query
                .select
                .iter()
                .map(|item| self.render_item(item))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {projection}");

        if !query.from.is_empty() {
            sql.push_str(&format!(
                " FROM {}",
                self.dialect
                    .qualify_table(&query.from.database, &query.from.table)
            ));
        }

        let filters: Vec<&str> = query
            .filters
            .iter()
            .map(String::as_str)
            .filter(|f| !f.trim().is_empty())
            .collect();
        if !filters.is_empty() {
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", query.group_by.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.expr, o.direction.as_str()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        sql
    }

    fn render_item(&self, item: &SelectItem) -> String {
        match &item.alias {
            Some(Alias::Bare(alias)) => format!("{} as {alias}", item.expr),
            Some(Alias::Quoted(alias)) => {
                format!("{} as {}", item.expr, self.dialect.quote_ident(alias))
            }
            None => item.expr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::ClickHouseDialect;

    #[test]
    fn renders_clauses_in_order() {
        let query = SelectQuery {
            select: vec![
                SelectItem::new("\"a\""),
                SelectItem::aliased("count(\"b\")", "n"),
                SelectItem::quoted_alias("\"c\"", "Column C"),
            ],
            from: TableRef {
                database: "db".into(),
                table: "t".into(),
            },
            filters: vec!["( \"a\" = 1 )".into(), String::new()],
            group_by: vec!["\"a\"".into()],
            order_by: vec![OrderItem {
                expr: "n".into(),
                direction: OrderByDirection::Desc,
            }],
            limit: Some(10),
        };
        let sql = SqlRenderer::new(&ClickHouseDialect).render_select(&query);
        assert_eq!(
            sql,
            "SELECT \"a\", count(\"b\") as n, \"c\" as \"Column C\" FROM \"db\".\"t\" \
             WHERE ( \"a\" = 1 ) GROUP BY \"a\" ORDER BY n DESC LIMIT 10"
        );
    }

    #[test]
    fn empty_projection_selects_everything() {
        let query = SelectQuery {
            from: TableRef {
                database: String::new(),
                table: "t".into(),
            },
            ..Default::default()
        };
        assert_eq!(
            SqlRenderer::new(&ClickHouseDialect).render_select(&query),
            "SELECT * FROM \"t\""
        );
    }
}
