//! Driver error classification.
//!
//! Each product carries a table from vendor codes (or SQLSTATEs) to an
//! [`ErrorKind`]. Classification never inspects message text; only the
//! constraint name is scraped from the message, best effort.

use std::fmt;

use regex::Regex;

/// A raw error reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdbcError {
    pub vendor_code: i32,
    pub sql_state: Option<String>,
    pub message: String,
}

impl JdbcError {
    #[must_use]
    pub fn new(vendor_code: i32, message: impl Into<String>) -> Self {
        Self {
            vendor_code,
            sql_state: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

impl fmt::Display for JdbcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "[{}/{state}] {}", self.vendor_code, self.message),
            None => write!(f, "[{}] {}", self.vendor_code, self.message),
        }
    }
}

impl std::error::Error for JdbcError {}

/// Outcome of classifying a driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LockTimeout,
    LockAcquisition,
    SqlGrammar,
    ConstraintViolation,
    Unclassified,
}

/// Key of one classification table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Vendor(i32),
    VendorRange(i32, i32),
    SqlState(&'static str),
    /// Matches every SQLSTATE in the class, e.g. `"23"`.
    SqlStateClass(&'static str),
}

impl ErrorCode {
    fn matches(self, error: &JdbcError) -> bool {
        match self {
            Self::Vendor(code) => error.vendor_code == code,
            Self::VendorRange(lo, hi) => (lo..=hi).contains(&error.vendor_code),
            Self::SqlState(state) => error.sql_state.as_deref() == Some(state),
            Self::SqlStateClass(class) => error
                .sql_state
                .as_deref()
                .is_some_and(|state| state.starts_with(class)),
        }
    }
}

/// Classification table: the first matching row wins.
pub type ErrorCodeTable = &'static [(ErrorCode, ErrorKind)];

pub(crate) fn classify(table: ErrorCodeTable, error: &JdbcError) -> ErrorKind {
    table
        .iter()
        .find(|(code, _)| code.matches(error))
        .map_or(ErrorKind::Unclassified, |(_, kind)| *kind)
}

/// Returns the first capture group of the first matching pattern.
pub(crate) fn extract_constraint_name(patterns: &[Regex], message: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// A classified persistence error, wrapping the driver error exactly once.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("lock timeout: {source} [{sql}]")]
    LockTimeout {
        source: JdbcError,
        sql: String,
    },

    #[error("could not acquire lock: {source} [{sql}]")]
    LockAcquisition {
        source: JdbcError,
        sql: String,
    },

    #[error("SQL grammar error: {source} [{sql}]")]
    SqlGrammar {
        source: JdbcError,
        sql: String,
    },

    #[error("constraint violation ({}): {source} [{sql}]", .constraint_name.as_deref().unwrap_or("unknown"))]
    ConstraintViolation {
        source: JdbcError,
        sql: String,
        constraint_name: Option<String>,
    },

    #[error("JDBC error: {source} [{sql}]")]
    Generic {
        source: JdbcError,
        sql: String,
    },
}

impl PersistenceError {
    /// The wrapped driver error.
    #[must_use]
    pub const fn jdbc_error(&self) -> &JdbcError {
        match self {
            Self::LockTimeout { source, .. }
            | Self::LockAcquisition { source, .. }
            | Self::SqlGrammar { source, .. }
            | Self::ConstraintViolation { source, .. }
            | Self::Generic { source, .. } => source,
        }
    }

    /// The statement that failed.
    #[must_use]
    pub fn sql(&self) -> &str {
        match self {
            Self::LockTimeout { sql, .. }
            | Self::LockAcquisition { sql, .. }
            | Self::SqlGrammar { sql, .. }
            | Self::ConstraintViolation { sql, .. }
            | Self::Generic { sql, .. } => sql,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::LockTimeout { .. } => ErrorKind::LockTimeout,
            Self::LockAcquisition { .. } => ErrorKind::LockAcquisition,
            Self::SqlGrammar { .. } => ErrorKind::SqlGrammar,
            Self::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Self::Generic { .. } => ErrorKind::Unclassified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: ErrorCodeTable = &[
        (ErrorCode::Vendor(131), ErrorKind::LockTimeout),
        (ErrorCode::VendorRange(259, 263), ErrorKind::SqlGrammar),
        (ErrorCode::SqlState("40P01"), ErrorKind::LockAcquisition),
        (ErrorCode::SqlStateClass("23"), ErrorKind::ConstraintViolation),
    ];

    #[test]
    fn test_classify_by_code() {
        assert_eq!(classify(TABLE, &JdbcError::new(131, "x")), ErrorKind::LockTimeout);
        assert_eq!(classify(TABLE, &JdbcError::new(261, "x")), ErrorKind::SqlGrammar);
        assert_eq!(classify(TABLE, &JdbcError::new(264, "x")), ErrorKind::Unclassified);
        assert_eq!(
            classify(TABLE, &JdbcError::new(0, "x").with_sql_state("23505")),
            ErrorKind::ConstraintViolation
        );
        assert_eq!(
            classify(TABLE, &JdbcError::new(0, "x").with_sql_state("40P01")),
            ErrorKind::LockAcquisition
        );
    }

    #[test]
    fn test_message_is_ignored_for_classification() {
        let error = JdbcError::new(999, "lock wait timeout exceeded");
        assert_eq!(classify(TABLE, &error), ErrorKind::Unclassified);
    }

    #[test]
    fn test_extract_constraint_name() {
        let patterns = [Regex::new(r"Index\(([^)]+)\)").unwrap()];
        assert_eq!(
            extract_constraint_name(&patterns, "unique constraint violated: Table(T), Index(UK_MAIL)"),
            Some("UK_MAIL".to_string())
        );
        assert_eq!(extract_constraint_name(&patterns, "nothing here"), None);
    }

    #[test]
    fn test_persistence_error_accessors() {
        let error = PersistenceError::ConstraintViolation {
            source: JdbcError::new(301, "dup"),
            sql: "insert into t values (?)".into(),
            constraint_name: Some("UK".into()),
        };
        assert_eq!(error.kind(), ErrorKind::ConstraintViolation);
        assert_eq!(error.jdbc_error().vendor_code, 301);
        assert_eq!(error.sql(), "insert into t values (?)");
        assert!(error.to_string().contains("(UK)"));
    }
}
