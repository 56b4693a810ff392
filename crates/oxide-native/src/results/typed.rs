//! Conversion of result values into Rust types.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use oxide_dialect::{BlobValue, ClobValue, MaterializedBlob, MaterializedClob, SqlValue, TypeCode};

use super::tuple::Tuple;
use super::value::{EntityInstance, ResultValue};
use crate::error::{QueryError, Result};

/// What a single result builder produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultShape {
    /// A column value; the type is known when declared or mapped.
    Scalar(Option<TypeCode>),
    Entity(String),
    Instantiation(String),
}

impl ResultShape {
    /// Type name used in incompatible-type errors.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Scalar(Some(code)) => code.name().to_string(),
            Self::Scalar(None) => "scalar".to_string(),
            Self::Entity(name) | Self::Instantiation(name) => name.clone(),
        }
    }
}

/// Types a result value can be converted into.
pub trait FromResultValue: Sized {
    /// # Errors
    ///
    /// Returns [`QueryError::Conversion`] when the value has another shape.
    fn from_result_value(value: ResultValue) -> Result<Self>;

    /// Name reported when a typed query is rejected.
    fn result_type_name() -> String;

    /// Whether a query with a single result of `shape` can produce `Self`.
    fn accepts(shape: &ResultShape) -> bool;

    /// Tuple types take every result of a row, whatever the mapping.
    #[must_use]
    fn is_tuple() -> bool {
        false
    }
}

fn mismatch(target: &str, value: &ResultValue) -> QueryError {
    QueryError::Conversion {
        target: target.to_string(),
        value: value.describe(),
    }
}

fn scalar_accepts(shape: &ResultShape, accepts: fn(TypeCode) -> bool) -> bool {
    match shape {
        ResultShape::Scalar(None) => true,
        ResultShape::Scalar(Some(code)) => accepts(*code),
        ResultShape::Entity(_) | ResultShape::Instantiation(_) => false,
    }
}

impl FromResultValue for ResultValue {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        Ok(value)
    }

    fn result_type_name() -> String {
        "ResultValue".to_string()
    }

    fn accepts(_shape: &ResultShape) -> bool {
        true
    }
}

impl FromResultValue for SqlValue {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Null => Ok(Self::Null),
            ResultValue::Scalar(v) => Ok(v),
            other => Err(mismatch("SqlValue", &other)),
        }
    }

    fn result_type_name() -> String {
        "SqlValue".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, |_| true)
    }
}

impl FromResultValue for i64 {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match &value {
            ResultValue::Scalar(SqlValue::Int(n)) => Ok(*n),
            ResultValue::Scalar(SqlValue::Bool(b)) => Ok(Self::from(*b)),
            ResultValue::Scalar(SqlValue::Decimal(d) | SqlValue::Text(d)) => {
                d.trim().parse().map_err(|_| mismatch("i64", &value))
            }
            _ => Err(mismatch("i64", &value)),
        }
    }

    fn result_type_name() -> String {
        "i64".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, TypeCode::is_numeric)
    }
}

macro_rules! narrow_integers {
    ($($ty:ty),*) => {
        $(impl FromResultValue for $ty {
            fn from_result_value(value: ResultValue) -> Result<Self> {
                let wide = i64::from_result_value(value)?;
                <$ty>::try_from(wide).map_err(|_| QueryError::Conversion {
                    target: stringify!($ty).to_string(),
                    value: wide.to_string(),
                })
            }

            fn result_type_name() -> String {
                stringify!($ty).to_string()
            }

            fn accepts(shape: &ResultShape) -> bool {
                scalar_accepts(shape, TypeCode::is_numeric)
            }
        })*
    };
}

narrow_integers!(i32, i16);

impl FromResultValue for f64 {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match &value {
            ResultValue::Scalar(SqlValue::Float(f)) => Ok(*f),
            ResultValue::Scalar(SqlValue::Int(n)) => i32::try_from(*n)
                .map(Self::from)
                .or_else(|_| n.to_string().parse())
                .map_err(|_| mismatch("f64", &value)),
            ResultValue::Scalar(SqlValue::Decimal(d)) => {
                d.parse().map_err(|_| mismatch("f64", &value))
            }
            _ => Err(mismatch("f64", &value)),
        }
    }

    fn result_type_name() -> String {
        "f64".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, TypeCode::is_numeric)
    }
}

impl FromResultValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_result_value(value: ResultValue) -> Result<Self> {
        f64::from_result_value(value).map(|f| f as Self)
    }

    fn result_type_name() -> String {
        "f32".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, TypeCode::is_numeric)
    }
}

impl FromResultValue for bool {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Scalar(SqlValue::Bool(b)) => Ok(b),
            ResultValue::Scalar(SqlValue::Int(0)) => Ok(false),
            ResultValue::Scalar(SqlValue::Int(1)) => Ok(true),
            other => Err(mismatch("bool", &other)),
        }
    }

    fn result_type_name() -> String {
        "bool".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, |code| {
            matches!(code, TypeCode::Boolean | TypeCode::Bit | TypeCode::TinyInt)
        })
    }
}

impl FromResultValue for String {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Scalar(SqlValue::Text(s) | SqlValue::Decimal(s)) => Ok(s),
            ResultValue::Scalar(SqlValue::Clob(clob)) => Ok(clob.to_string_value()?),
            other => Err(mismatch("String", &other)),
        }
    }

    fn result_type_name() -> String {
        "String".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, TypeCode::is_character)
    }
}

impl FromResultValue for Vec<u8> {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Scalar(SqlValue::Bytes(b)) => Ok(b),
            ResultValue::Scalar(SqlValue::Blob(blob)) => Ok(blob.to_bytes()?),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }

    fn result_type_name() -> String {
        "Vec<u8>".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, TypeCode::is_binary)
    }
}

impl FromResultValue for NaiveDate {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match &value {
            ResultValue::Scalar(SqlValue::Date(d)) => Ok(*d),
            ResultValue::Scalar(SqlValue::Text(s)) => {
                s.parse().map_err(|_| mismatch("NaiveDate", &value))
            }
            _ => Err(mismatch("NaiveDate", &value)),
        }
    }

    fn result_type_name() -> String {
        "NaiveDate".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, |code| code == TypeCode::Date)
    }
}

impl FromResultValue for NaiveTime {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match &value {
            ResultValue::Scalar(SqlValue::Time(t)) => Ok(*t),
            ResultValue::Scalar(SqlValue::Text(s)) => {
                s.parse().map_err(|_| mismatch("NaiveTime", &value))
            }
            _ => Err(mismatch("NaiveTime", &value)),
        }
    }

    fn result_type_name() -> String {
        "NaiveTime".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, |code| code == TypeCode::Time)
    }
}

impl FromResultValue for NaiveDateTime {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match &value {
            ResultValue::Scalar(SqlValue::Timestamp(ts)) => Ok(*ts),
            ResultValue::Scalar(SqlValue::Text(s)) => s
                .parse()
                .or_else(|_| Self::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .map_err(|_| mismatch("NaiveDateTime", &value)),
            _ => Err(mismatch("NaiveDateTime", &value)),
        }
    }

    fn result_type_name() -> String {
        "NaiveDateTime".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, |code| {
            matches!(code, TypeCode::Timestamp | TypeCode::TimestampWithTimezone)
        })
    }
}

impl FromResultValue for MaterializedClob {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Scalar(SqlValue::Clob(ClobValue::Materialized(clob))) => Ok(clob),
            ResultValue::Scalar(SqlValue::Clob(ClobValue::Locator(locator))) => {
                Ok(Self::from_locator(locator.as_ref(), false)?)
            }
            ResultValue::Scalar(SqlValue::Text(s)) => Ok(Self::new(s)),
            other => Err(mismatch("MaterializedClob", &other)),
        }
    }

    fn result_type_name() -> String {
        "MaterializedClob".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, TypeCode::is_character)
    }
}

impl FromResultValue for MaterializedBlob {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Scalar(SqlValue::Blob(BlobValue::Materialized(blob))) => Ok(blob),
            ResultValue::Scalar(SqlValue::Blob(BlobValue::Locator(locator))) => {
                Ok(Self::from_locator(locator.as_ref())?)
            }
            ResultValue::Scalar(SqlValue::Bytes(b)) => Ok(Self::new(b)),
            other => Err(mismatch("MaterializedBlob", &other)),
        }
    }

    fn result_type_name() -> String {
        "MaterializedBlob".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        scalar_accepts(shape, TypeCode::is_binary)
    }
}

impl<T: FromResultValue> FromResultValue for Option<T> {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_result_value(value).map(Some)
        }
    }

    fn result_type_name() -> String {
        format!("Option<{}>", T::result_type_name())
    }

    fn accepts(shape: &ResultShape) -> bool {
        T::accepts(shape)
    }
}

impl FromResultValue for Arc<EntityInstance> {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Entity(instance) => Ok(instance),
            other => Err(mismatch("entity", &other)),
        }
    }

    fn result_type_name() -> String {
        "EntityInstance".to_string()
    }

    fn accepts(shape: &ResultShape) -> bool {
        matches!(shape, ResultShape::Entity(_))
    }
}

impl FromResultValue for Tuple {
    fn from_result_value(value: ResultValue) -> Result<Self> {
        match value {
            ResultValue::Tuple(tuple) => Ok(tuple),
            other => Err(mismatch("Tuple", &other)),
        }
    }

    fn result_type_name() -> String {
        "Tuple".to_string()
    }

    fn accepts(_shape: &ResultShape) -> bool {
        true
    }

    fn is_tuple() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(value: SqlValue) -> ResultValue {
        ResultValue::Scalar(value)
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(i64::from_result_value(scalar(SqlValue::Int(5))).unwrap(), 5);
        assert_eq!(
            i64::from_result_value(scalar(SqlValue::Decimal("12".to_string()))).unwrap(),
            12
        );
        assert!(matches!(
            i16::from_result_value(scalar(SqlValue::Int(70_000))),
            Err(QueryError::Conversion { .. })
        ));
        assert!(i64::from_result_value(ResultValue::Null).is_err());
        assert_eq!(
            Option::<i64>::from_result_value(ResultValue::Null).unwrap(),
            None
        );
    }

    #[test]
    fn test_text_and_lobs() {
        let clob = SqlValue::Clob(ClobValue::Materialized(MaterializedClob::new(
            "long text".to_string(),
        )));
        assert_eq!(String::from_result_value(scalar(clob)).unwrap(), "long text");
        let blob = SqlValue::Blob(BlobValue::Materialized(MaterializedBlob::new(vec![1, 2])));
        assert_eq!(Vec::<u8>::from_result_value(scalar(blob)).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_temporal_from_text() {
        let ts = NaiveDateTime::from_result_value(scalar(SqlValue::Text(
            "2024-03-01 10:30:00".to_string(),
        )))
        .unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 10:30:00");
        let d = NaiveDate::from_result_value(scalar(SqlValue::Text("2024-03-01".to_string())));
        assert!(d.is_ok());
    }

    #[test]
    fn test_accepts() {
        assert!(i64::accepts(&ResultShape::Scalar(Some(TypeCode::Integer))));
        assert!(!i64::accepts(&ResultShape::Scalar(Some(TypeCode::Varchar))));
        assert!(String::accepts(&ResultShape::Scalar(None)));
        assert!(!String::accepts(&ResultShape::Entity("Book".to_string())));
        assert!(Arc::<EntityInstance>::accepts(&ResultShape::Entity(
            "Book".to_string()
        )));
        assert!(Tuple::is_tuple());
        assert!(!ResultValue::is_tuple());
    }
}
