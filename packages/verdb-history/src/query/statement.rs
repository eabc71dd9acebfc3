use serde::{Deserialize, Serialize};

use crate::shared::models::Expr;

/// `SELECT <columns> FROM <table> [WHERE <filter>] [LIMIT <n>]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    /// `None` selects every column
    pub columns: Option<Vec<String>>,
    pub filter: Option<Expr>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn select_all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            filter: None,
            limit: None,
        }
    }

    pub fn select(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
            ..Self::select_all(table)
        }
    }

    /// AND-ed with an existing filter
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(Expr::And(mut parts)) => {
                parts.push(expr);
                Expr::And(parts)
            }
            Some(existing) => Expr::And(vec![existing, expr]),
            None => expr,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
