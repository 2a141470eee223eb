//! PostgREST query composition.
//!
//! Builds the `select` / filter / `order` / `limit` query pairs for a table
//! request. Pure and order-preserving so callers can assert on the exact
//! pairs sent over the wire.

use std::fmt::Display;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Column list, including embedded resources (`*,profiles:supplier_id(full_name)`).
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        let compact: String = columns.split_whitespace().collect();
        self.select = Some(compact);
        self
    }

    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("eq.{value}"))
    }

    #[must_use]
    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("gte.{value}"))
    }

    #[must_use]
    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("lte.{value}"))
    }

    /// Case-insensitive substring match.
    #[must_use]
    pub fn contains(self, column: &str, text: &str) -> Self {
        self.filter(column, format!("ilike.*{}*", sanitize_term(text)))
    }

    /// Disjunction of raw filter expressions (`col.op.value`).
    #[must_use]
    pub fn or(self, expressions: &[String]) -> Self {
        self.filter("or", format!("({})", expressions.join(",")))
    }

    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{dir}"));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn filter(mut self, column: &str, expr: String) -> Self {
        self.filters.push((column.to_owned(), expr));
        self
    }

    /// Query-string pairs in wire order: select, filters, order, limit.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 3);
        if let Some(select) = &self.select {
            pairs.push(("select".to_owned(), select.clone()));
        }
        pairs.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            pairs.push(("order".to_owned(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_owned(), limit.to_string()));
        }
        pairs
    }
}

/// `column.ilike.*term*` for use inside [`Query::or`].
#[must_use]
pub fn ilike_expr(column: &str, text: &str) -> String {
    format!("{column}.ilike.*{}*", sanitize_term(text))
}

/// Strip characters that carry meaning in PostgREST filter syntax.
#[must_use]
pub fn sanitize_term(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%' | '"' | '\\'))
        .collect()
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
