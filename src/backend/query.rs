//! Read-query builder for PostgREST tables.
//!
//! A `Query` is plain data: the REST backend turns it into URL parameters and
//! headers, test doubles inspect it directly.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
    Gte(String, String),
    Lt(String, String),
    NotNull(String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::Gte(c, _)
            | Filter::Lt(c, _)
            | Filter::NotNull(c) => c,
        }
    }

    fn operand(&self) -> String {
        match self {
            Filter::Eq(_, v) => format!("eq.{}", v),
            Filter::Neq(_, v) => format!("neq.{}", v),
            Filter::Gte(_, v) => format!("gte.{}", v),
            Filter::Lt(_, v) => format!("lt.{}", v),
            Filter::NotNull(_) => "not.is.null".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("asc"),
            Direction::Desc => f.write_str("desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub select: String,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    /// Inclusive row range `(from, to)`.
    pub range: Option<(u64, u64)>,
    pub exact_count: bool,
    /// Expect exactly one row back.
    pub single: bool,
    /// Count only; no rows are transferred.
    pub head: bool,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            range: None,
            exact_count: false,
            single: false,
            head: false,
        }
    }

    pub fn select(mut self, expr: &str) -> Self {
        self.select = expr.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Neq(column.to_string(), value.to_string()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Gte(column.to_string(), value.to_string()));
        self
    }

    pub fn lt(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Lt(column.to_string(), value.to_string()));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull(column.to_string()));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn exact_count(mut self) -> Self {
        self.exact_count = true;
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn head(mut self) -> Self {
        self.head = true;
        self.exact_count = true;
        self
    }

    pub fn has_filter(&self, filter: &Filter) -> bool {
        self.filters.iter().any(|f| f == filter)
    }

    /// URL query parameters in PostgREST syntax.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        for filter in &self.filters {
            pairs.push((filter.column().to_string(), filter.operand()));
        }
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(col, dir)| format!("{}.{}", col, dir))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        match (self.range, self.limit) {
            (Some((from, to)), _) => {
                pairs.push(("offset".to_string(), from.to_string()));
                pairs.push(("limit".to_string(), (to.saturating_sub(from) + 1).to_string()));
            }
            (None, Some(limit)) => pairs.push(("limit".to_string(), limit.to_string())),
            (None, None) => {}
        }
        pairs
    }
}
