//! SQL values.
//!
//! [`SqlValue`] is the domain-side representation of a column or parameter
//! value. Codecs translate it to driver [`Binding`](crate::codec::Binding)s
//! and back from [`RawValue`](crate::codec::RawValue)s.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::lob::{BlobValue, ClobValue, MaterializedBlob, MaterializedClob};
use crate::types::TypeCode;

/// A SQL value that can be bound as a parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Exact numeric, kept as its decimal text.
    Decimal(String),
    /// Text value.
    Text(String),
    /// Binary value.
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// Binary large object.
    Blob(BlobValue),
    /// Character large object.
    Clob(ClobValue),
}

impl SqlValue {
    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: Prefer parameter binding. LOBs render as `NULL` here.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null | Self::Blob(_) | Self::Clob(_) => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Decimal(d) => d.clone(),
            Self::Text(s) => {
                // Escape single quotes by doubling them
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Date(d) => format!("DATE '{d}'"),
            Self::Time(t) => format!("TIME '{t}'"),
            Self::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }

    /// The type code a value binds with when no explicit type is given.
    #[must_use]
    pub const fn natural_type_code(&self) -> TypeCode {
        match self {
            Self::Null => TypeCode::Varchar,
            Self::Bool(_) => TypeCode::Boolean,
            Self::Int(_) => TypeCode::BigInt,
            Self::Float(_) => TypeCode::Double,
            Self::Decimal(_) => TypeCode::Decimal,
            Self::Text(_) => TypeCode::Varchar,
            Self::Bytes(_) => TypeCode::Varbinary,
            Self::Date(_) => TypeCode::Date,
            Self::Time(_) => TypeCode::Time,
            Self::Timestamp(_) => TypeCode::Timestamp,
            Self::Blob(_) => TypeCode::Blob,
            Self::Clob(ClobValue::Materialized(c)) if c.is_nationalized() => TypeCode::NClob,
            Self::Clob(_) => TypeCode::Clob,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short description used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Blob(_) => "blob",
            Self::Clob(_) => "clob",
        }
    }

    /// Returns the parameter placeholder.
    #[must_use]
    pub const fn placeholder() -> &'static str {
        "?"
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

macro_rules! int_to_sql_value {
    ($($t:ty),*) => {
        $(
            impl ToSqlValue for $t {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }
        )*
    };
}

int_to_sql_value!(i64, i32, i16, i8, u32, u16, u8);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bytes(self)
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Date(self)
    }
}

impl ToSqlValue for NaiveTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Time(self)
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self)
    }
}

impl ToSqlValue for MaterializedBlob {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(BlobValue::Materialized(self))
    }
}

impl ToSqlValue for MaterializedClob {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Clob(ClobValue::Materialized(self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_escaping() {
        assert_eq!(SqlValue::Text("it's".into()).to_sql_inline(), "'it''s'");
        assert_eq!(SqlValue::Bytes(vec![0xAB, 0x01]).to_sql_inline(), "X'AB01'");
        assert_eq!(SqlValue::Null.to_sql_inline(), "NULL");
        assert_eq!(SqlValue::Decimal("1.50".into()).to_sql_inline(), "1.50");
    }

    #[test]
    fn test_natural_type_codes() {
        assert_eq!(5_i32.to_sql_value().natural_type_code(), TypeCode::BigInt);
        assert_eq!("x".to_sql_value().natural_type_code(), TypeCode::Varchar);
        assert_eq!(
            MaterializedClob::nationalized("x".into())
                .to_sql_value()
                .natural_type_code(),
            TypeCode::NClob
        );
        assert_eq!(None::<i64>.to_sql_value(), SqlValue::Null);
    }
}
