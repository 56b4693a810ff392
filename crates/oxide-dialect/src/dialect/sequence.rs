//! Sequence and identity column support.

/// Sequence DDL and access strings. `{seq}` stands for the sequence name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSupport {
    pub supported: bool,
    pub query_sequences: Option<&'static str>,
    next_value: &'static str,
    select_next_value: &'static str,
    create: &'static str,
    drop: &'static str,
}

impl SequenceSupport {
    pub const NONE: Self = Self {
        supported: false,
        query_sequences: None,
        next_value: "",
        select_next_value: "",
        create: "",
        drop: "",
    };

    #[must_use]
    pub const fn new(
        query_sequences: Option<&'static str>,
        next_value: &'static str,
        select_next_value: &'static str,
        create: &'static str,
        drop: &'static str,
    ) -> Self {
        Self {
            supported: true,
            query_sequences,
            next_value,
            select_next_value,
            create,
            drop,
        }
    }

    /// Expression yielding the next value, for use inside other statements.
    #[must_use]
    pub fn next_value_expression(&self, sequence: &str) -> Option<String> {
        self.supported
            .then(|| self.next_value.replace("{seq}", sequence))
    }

    /// Standalone select of the next value.
    #[must_use]
    pub fn select_next_value(&self, sequence: &str) -> Option<String> {
        self.supported
            .then(|| self.select_next_value.replace("{seq}", sequence))
    }

    #[must_use]
    pub fn create_sequence(&self, sequence: &str, initial: i64, increment: i64) -> Option<String> {
        self.supported.then(|| {
            format!(
                "{} start with {initial} increment by {increment}",
                self.create.replace("{seq}", sequence)
            )
        })
    }

    #[must_use]
    pub fn drop_sequence(&self, sequence: &str) -> Option<String> {
        self.supported.then(|| self.drop.replace("{seq}", sequence))
    }
}

/// How generated identifiers are read back after an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRetrieval {
    /// The driver returns generated keys from the insert.
    GeneratedKeys,
    /// A separate select returns the last generated value.
    Select(String),
}

/// Identity column support. `{table}` and `{column}` are substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityColumnSupport {
    pub supported: bool,
    pub column_clause: &'static str,
    identity_select: &'static str,
    pub supports_get_generated_keys: bool,
}

impl IdentityColumnSupport {
    #[must_use]
    pub const fn new(
        column_clause: &'static str,
        identity_select: &'static str,
        supports_get_generated_keys: bool,
    ) -> Self {
        Self {
            supported: true,
            column_clause,
            identity_select,
            supports_get_generated_keys,
        }
    }

    #[must_use]
    pub fn identity_select(&self, table: &str, column: &str) -> String {
        self.identity_select
            .replace("{table}", table)
            .replace("{column}", column)
    }

    /// Preferred retrieval strategy for generated keys.
    #[must_use]
    pub fn retrieval(&self, table: &str, column: &str) -> IdentityRetrieval {
        if self.supports_get_generated_keys {
            IdentityRetrieval::GeneratedKeys
        } else {
            IdentityRetrieval::Select(self.identity_select(table, column))
        }
    }
}
