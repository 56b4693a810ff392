//! Driver-level type codes.
//!
//! Every column type, codec and binding is keyed by a [`TypeCode`]. The
//! numeric values follow the JDBC `java.sql.Types` constants so that codes
//! reported by drivers can be mapped back with [`TypeCode::from_code`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DialectError;

/// A driver-level SQL type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeCode {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Binary,
    Varbinary,
    LongVarbinary,
    Blob,
    Clob,
    Boolean,
    NChar,
    NVarchar,
    LongNVarchar,
    NClob,
}

impl TypeCode {
    /// All known type codes, in declaration order.
    pub const ALL: [Self; 27] = [
        Self::Bit,
        Self::TinyInt,
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Float,
        Self::Real,
        Self::Double,
        Self::Numeric,
        Self::Decimal,
        Self::Char,
        Self::Varchar,
        Self::LongVarchar,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::TimestampWithTimezone,
        Self::Binary,
        Self::Varbinary,
        Self::LongVarbinary,
        Self::Blob,
        Self::Clob,
        Self::Boolean,
        Self::NChar,
        Self::NVarchar,
        Self::LongNVarchar,
        Self::NClob,
    ];

    /// Returns the numeric code reported by drivers.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Bit => -7,
            Self::TinyInt => -6,
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Float => 6,
            Self::Real => 7,
            Self::Double => 8,
            Self::Numeric => 2,
            Self::Decimal => 3,
            Self::Char => 1,
            Self::Varchar => 12,
            Self::LongVarchar => -1,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::TimestampWithTimezone => 2014,
            Self::Binary => -2,
            Self::Varbinary => -3,
            Self::LongVarbinary => -4,
            Self::Blob => 2004,
            Self::Clob => 2005,
            Self::Boolean => 16,
            Self::NChar => -15,
            Self::NVarchar => -9,
            Self::LongNVarchar => -16,
            Self::NClob => 2011,
        }
    }

    /// Maps a driver-reported numeric code back to a type code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Returns the canonical upper-case name, e.g. `VARCHAR`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bit => "BIT",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Numeric => "NUMERIC",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::LongVarchar => "LONGVARCHAR",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            Self::Binary => "BINARY",
            Self::Varbinary => "VARBINARY",
            Self::LongVarbinary => "LONGVARBINARY",
            Self::Blob => "BLOB",
            Self::Clob => "CLOB",
            Self::Boolean => "BOOLEAN",
            Self::NChar => "NCHAR",
            Self::NVarchar => "NVARCHAR",
            Self::LongNVarchar => "LONGNVARCHAR",
            Self::NClob => "NCLOB",
        }
    }

    /// Character-data codes, national variants included.
    #[must_use]
    pub const fn is_character(self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::Varchar
                | Self::LongVarchar
                | Self::NChar
                | Self::NVarchar
                | Self::LongNVarchar
                | Self::Clob
                | Self::NClob
        )
    }

    /// Returns true for national (unicode) character codes.
    #[must_use]
    pub const fn is_nationalized(self) -> bool {
        matches!(
            self,
            Self::NChar | Self::NVarchar | Self::LongNVarchar | Self::NClob
        )
    }

    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Binary | Self::Varbinary | Self::LongVarbinary | Self::Blob
        )
    }

    #[must_use]
    pub const fn is_lob(self) -> bool {
        matches!(self, Self::Blob | Self::Clob | Self::NClob)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::TinyInt
                | Self::SmallInt
                | Self::Integer
                | Self::BigInt
                | Self::Float
                | Self::Real
                | Self::Double
                | Self::Numeric
                | Self::Decimal
        )
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::Timestamp | Self::TimestampWithTimezone
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeCode {
    type Err = DialectError;

    /// Parses a name (`varchar`, `NVARCHAR`) or a numeric code (`12`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i32>() {
            return Self::from_code(code).ok_or_else(|| DialectError::UnknownTypeCode(code));
        }
        let upper = trimmed.to_ascii_uppercase().replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.name() == upper)
            .ok_or_else(|| DialectError::UnknownTypeName(trimmed.to_string()))
    }
}
