//! Type code to DDL column type registry.
//!
//! Registrations are declarative [`ColumnTypeEntry`] tables. An entry either
//! acts as the default template for a type code, or is bounded by a
//! capacity: the smallest registered capacity that fits the requested length
//! wins, and the default template is used beyond every capacity.
//!
//! Templates may reference `$l` (length), `$p` (precision) and `$s` (scale).

use std::collections::{BTreeMap, HashMap};

use crate::error::{DialectError, Result};
use crate::types::TypeCode;

/// Length used when the caller does not supply one.
pub const DEFAULT_LENGTH: u32 = 255;
/// Precision used when the caller does not supply one.
pub const DEFAULT_PRECISION: u32 = 19;
/// Scale used when the caller does not supply one.
pub const DEFAULT_SCALE: u32 = 2;

/// One row of a column type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnTypeEntry {
    pub code: TypeCode,
    pub capacity: Option<u32>,
    pub template: &'static str,
}

impl ColumnTypeEntry {
    /// Default template for `code`.
    #[must_use]
    pub const fn unbounded(code: TypeCode, template: &'static str) -> Self {
        Self {
            code,
            capacity: None,
            template,
        }
    }

    /// Template for lengths up to and including `capacity`.
    #[must_use]
    pub const fn bounded(code: TypeCode, capacity: u32, template: &'static str) -> Self {
        Self {
            code,
            capacity: Some(capacity),
            template,
        }
    }
}

/// Column type templates registered for the ANSI baseline.
///
/// Product tables are layered on top and override individual codes.
pub const STANDARD_COLUMN_TYPES: &[ColumnTypeEntry] = &[
    ColumnTypeEntry::unbounded(TypeCode::Bit, "bit"),
    ColumnTypeEntry::unbounded(TypeCode::Boolean, "boolean"),
    ColumnTypeEntry::unbounded(TypeCode::TinyInt, "tinyint"),
    ColumnTypeEntry::unbounded(TypeCode::SmallInt, "smallint"),
    ColumnTypeEntry::unbounded(TypeCode::Integer, "integer"),
    ColumnTypeEntry::unbounded(TypeCode::BigInt, "bigint"),
    ColumnTypeEntry::unbounded(TypeCode::Float, "float($p)"),
    ColumnTypeEntry::unbounded(TypeCode::Real, "real"),
    ColumnTypeEntry::unbounded(TypeCode::Double, "double precision"),
    ColumnTypeEntry::unbounded(TypeCode::Numeric, "numeric($p,$s)"),
    ColumnTypeEntry::unbounded(TypeCode::Decimal, "decimal($p,$s)"),
    ColumnTypeEntry::unbounded(TypeCode::Char, "char($l)"),
    ColumnTypeEntry::unbounded(TypeCode::Varchar, "varchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::LongVarchar, "varchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::Clob, "clob"),
    ColumnTypeEntry::unbounded(TypeCode::NChar, "nchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::NVarchar, "nvarchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::LongNVarchar, "nvarchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::NClob, "nclob"),
    ColumnTypeEntry::unbounded(TypeCode::Date, "date"),
    ColumnTypeEntry::unbounded(TypeCode::Time, "time"),
    ColumnTypeEntry::unbounded(TypeCode::Timestamp, "timestamp"),
    ColumnTypeEntry::unbounded(TypeCode::TimestampWithTimezone, "timestamp with time zone"),
    ColumnTypeEntry::unbounded(TypeCode::Binary, "binary($l)"),
    ColumnTypeEntry::unbounded(TypeCode::Varbinary, "varbinary($l)"),
    ColumnTypeEntry::unbounded(TypeCode::LongVarbinary, "varbinary($l)"),
    ColumnTypeEntry::unbounded(TypeCode::Blob, "blob"),
];

/// Resolved registry of column type templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypeRegistry {
    defaults: HashMap<TypeCode, String>,
    bounded: HashMap<TypeCode, BTreeMap<u32, String>>,
}

impl ColumnTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from tables applied in order; later tables win.
    #[must_use]
    pub fn from_tables(tables: &[&[ColumnTypeEntry]]) -> Self {
        let mut registry = Self::new();
        for table in tables {
            for entry in *table {
                registry.register(*entry);
            }
        }
        registry
    }

    /// Registers one entry, replacing any previous entry for the same slot.
    pub fn register(&mut self, entry: ColumnTypeEntry) {
        self.register_template(entry.code, entry.capacity, entry.template);
    }

    /// Registers a template that need not be `'static`.
    pub fn register_template(&mut self, code: TypeCode, capacity: Option<u32>, template: &str) {
        match capacity {
            Some(cap) => {
                self.bounded
                    .entry(code)
                    .or_default()
                    .insert(cap, template.to_string());
            }
            None => {
                self.defaults.insert(code, template.to_string());
            }
        }
    }

    /// Returns the DDL column type for `code`.
    ///
    /// Missing length, precision and scale fall back to [`DEFAULT_LENGTH`],
    /// [`DEFAULT_PRECISION`] and [`DEFAULT_SCALE`].
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::NoColumnType`] when nothing is registered for
    /// the code, or when the length exceeds every capacity and no default
    /// template exists.
    pub fn get(
        &self,
        code: TypeCode,
        length: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Result<String> {
        let length = length.unwrap_or(DEFAULT_LENGTH);
        let precision = precision.unwrap_or(DEFAULT_PRECISION);
        let scale = scale.unwrap_or(DEFAULT_SCALE);

        let bounded = self
            .bounded
            .get(&code)
            .and_then(|by_capacity| by_capacity.range(length..).next())
            .map(|(_, template)| template);

        bounded
            .or_else(|| self.defaults.get(&code))
            .map(|template| substitute(template, length, precision, scale))
            .ok_or(DialectError::NoColumnType { code, length })
    }

    /// Returns the raw default template for `code`, without substitution.
    #[must_use]
    pub fn default_template(&self, code: TypeCode) -> Option<&str> {
        self.defaults.get(&code).map(String::as_str)
    }

    /// Returns true when any template is registered for `code`.
    #[must_use]
    pub fn contains(&self, code: TypeCode) -> bool {
        self.defaults.contains_key(&code) || self.bounded.contains_key(&code)
    }
}

fn substitute(template: &str, length: u32, precision: u32, scale: u32) -> String {
    template
        .replace("$l", &length.to_string())
        .replace("$p", &precision.to_string())
        .replace("$s", &scale.to_string())
}
