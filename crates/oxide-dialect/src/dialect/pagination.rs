//! Limit/offset rewriting.

use std::sync::LazyLock;

use regex::Regex;

/// Requested row window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Limit {
    pub first_row: Option<u32>,
    pub max_rows: Option<u32>,
}

impl Limit {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_row.is_none() && self.max_rows.is_none()
    }
}

/// A value to bind for a pagination placeholder, in SQL order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitBind {
    MaxRows(u32),
    FirstRow(u32),
}

/// Result of applying a limit to a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitedSql {
    pub sql: String,
    /// Appended after all other parameters.
    pub binds: Vec<LimitBind>,
}

/// Pagination strategy of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitHandler {
    /// No pagination support; the statement is left alone.
    None,
    /// `limit ? offset ?`, inserted before a trailing `for update`.
    LimitOffset,
}

// A row-lock clause must stay last.
static FOR_UPDATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\s+for\s+update\b").ok());

impl LimitHandler {
    #[must_use]
    pub fn apply(&self, sql: &str, limit: &Limit) -> LimitedSql {
        if matches!(self, Self::None) || limit.is_empty() {
            return LimitedSql {
                sql: sql.to_string(),
                binds: Vec::new(),
            };
        }

        let max_rows = limit.max_rows.unwrap_or(i32::MAX.unsigned_abs());
        let (clause, binds) = match limit.first_row {
            Some(first) if first > 0 => (
                " limit ? offset ?",
                vec![LimitBind::MaxRows(max_rows), LimitBind::FirstRow(first)],
            ),
            _ => (" limit ?", vec![LimitBind::MaxRows(max_rows)]),
        };

        let insert_at = FOR_UPDATE
            .as_ref()
            .and_then(|re| re.find_iter(sql).last())
            .map_or(sql.len(), |m| m.start());

        let mut rewritten = String::with_capacity(sql.len() + clause.len());
        rewritten.push_str(&sql[..insert_at]);
        rewritten.push_str(clause);
        rewritten.push_str(&sql[insert_at..]);
        LimitedSql {
            sql: rewritten,
            binds,
        }
    }
}
