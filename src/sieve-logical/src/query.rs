//! The query shape the optimizer rewrites.

use std::fmt;

use crate::expr::Expr;

/// A SELECT over one table with an optional WHERE expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Table the query reads from.
    pub table: String,
    /// WHERE expression; `None` means no filter.
    pub selection: Option<Expr>,
}

impl SelectQuery {
    /// A query without a WHERE clause.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            selection: None,
        }
    }

    /// Set the WHERE expression.
    #[must_use]
    pub fn with_selection(mut self, selection: Expr) -> Self {
        self.selection = Some(selection);
        self
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT * FROM {}", self.table)?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {selection}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let query = SelectQuery::new("t");
        assert_eq!(query.to_string(), "SELECT * FROM t");

        let query = query.with_selection(Expr::build(|a| {
            let x = a.column("x");
            let one = a.literal(1i64);
            a.eq(x, one)
        }));
        assert_eq!(query.to_string(), "SELECT * FROM t WHERE (x = 1)");
    }
}
