//! Type codecs: binding values to statements and extracting them from rows.
//!
//! A [`TypeCodec`] is a small, immutable, `Copy` description of how one type
//! code travels through the driver. The standard codecs are returned by
//! [`TypeCodec::standard`]; dialects register replacements in a
//! [`CodecRegistry`]. Codecs are never mutated: a dialect reconfiguration
//! builds a new registry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{DialectError, Result};
use crate::lob::{BlobValue, ClobValue, LobLocator, MaterializedBlob, MaterializedClob};
use crate::types::TypeCode;
use crate::value::SqlValue;

/// Per-session options consulted by codecs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapperOptions {
    /// Bind LOB values as streams instead of LOB handles.
    pub use_stream_for_lob_binding: bool,
    /// Bind character data with the national variants.
    pub use_nationalized_character_data: bool,
}

/// A value as handed to the driver for one parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Null(TypeCode),
    Boolean(bool),
    Short(i16),
    Int(i32),
    Long(i64),
    Double(f64),
    BigDecimal(String),
    String(String),
    NString(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Blob(BlobValue),
    Clob(ClobValue),
    NClob(ClobValue),
    /// Stream binding; `close_suppressed` keeps the source value readable
    /// after the driver closes the stream.
    BinaryStream {
        data: Vec<u8>,
        close_suppressed: bool,
    },
    CharacterStream {
        data: String,
        close_suppressed: bool,
    },
    NCharacterStream {
        data: String,
        close_suppressed: bool,
    },
}

/// A column value as produced by the driver.
#[derive(Debug, Clone)]
pub enum RawValue {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    Decimal(String),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Blob(Arc<dyn LobLocator>),
    Clob(Arc<dyn LobLocator>),
    NClob(Arc<dyn LobLocator>),
}

impl RawValue {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Blob(_) => "blob",
            Self::Clob(_) => "clob",
            Self::NClob(_) => "nclob",
        }
    }
}

/// How a codec moves values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Boolean,
    /// Booleans stored as 0/1 in a numeric column.
    NumericBoolean,
    /// Integers narrowed to the given bit width on binding.
    Integral { bits: u8 },
    Double,
    Decimal,
    Varchar,
    NVarchar,
    Varbinary,
    Date,
    Time,
    Timestamp,
    Blob,
    Clob,
    NClob,
    /// Materializes LOBs whose reported size is at or above `threshold`.
    PrefetchBlob { threshold: u32 },
    PrefetchClob { threshold: u32, unicode: bool },
    PrefetchNClob { threshold: u32 },
}

/// Binds and extracts values for one type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCodec {
    code: TypeCode,
    name: &'static str,
    remappable: bool,
    kind: CodecKind,
}

impl TypeCodec {
    #[must_use]
    pub const fn new(code: TypeCode, name: &'static str, remappable: bool, kind: CodecKind) -> Self {
        Self {
            code,
            name,
            remappable,
            kind,
        }
    }

    /// The standard codec for `code`.
    #[must_use]
    pub const fn standard(code: TypeCode) -> Self {
        let (name, kind) = match code {
            TypeCode::Bit | TypeCode::Boolean => ("boolean", CodecKind::Boolean),
            TypeCode::TinyInt => ("tinyint", CodecKind::Integral { bits: 8 }),
            TypeCode::SmallInt => ("smallint", CodecKind::Integral { bits: 16 }),
            TypeCode::Integer => ("integer", CodecKind::Integral { bits: 32 }),
            TypeCode::BigInt => ("bigint", CodecKind::Integral { bits: 64 }),
            TypeCode::Float | TypeCode::Real | TypeCode::Double => ("double", CodecKind::Double),
            TypeCode::Numeric | TypeCode::Decimal => ("decimal", CodecKind::Decimal),
            TypeCode::Char | TypeCode::Varchar | TypeCode::LongVarchar => {
                ("varchar", CodecKind::Varchar)
            }
            TypeCode::NChar | TypeCode::NVarchar | TypeCode::LongNVarchar => {
                ("nvarchar", CodecKind::NVarchar)
            }
            TypeCode::Date => ("date", CodecKind::Date),
            TypeCode::Time => ("time", CodecKind::Time),
            TypeCode::Timestamp | TypeCode::TimestampWithTimezone => {
                ("timestamp", CodecKind::Timestamp)
            }
            TypeCode::Binary | TypeCode::Varbinary | TypeCode::LongVarbinary => {
                ("varbinary", CodecKind::Varbinary)
            }
            TypeCode::Blob => ("blob", CodecKind::Blob),
            TypeCode::Clob => ("clob", CodecKind::Clob),
            TypeCode::NClob => ("nclob", CodecKind::NClob),
        };
        Self::new(code, name, true, kind)
    }

    #[must_use]
    pub const fn code(&self) -> TypeCode {
        self.code
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a dialect may replace this codec.
    #[must_use]
    pub const fn is_remappable(&self) -> bool {
        self.remappable
    }

    #[must_use]
    pub const fn kind(&self) -> CodecKind {
        self.kind
    }

    fn mismatch(&self, value: &str) -> DialectError {
        DialectError::Codec {
            codec: self.name,
            value: value.to_string(),
        }
    }

    /// Converts a domain value into a driver binding.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::Codec`] when the value does not fit the codec.
    pub fn bind(&self, value: &SqlValue, options: &WrapperOptions) -> Result<Binding> {
        if value.is_null() {
            return Ok(Binding::Null(self.code));
        }
        match self.kind {
            CodecKind::Boolean => match value {
                SqlValue::Bool(b) => Ok(Binding::Boolean(*b)),
                SqlValue::Int(i) => Ok(Binding::Boolean(*i != 0)),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::NumericBoolean => match value {
                SqlValue::Bool(b) => Ok(Binding::Short(i16::from(*b))),
                SqlValue::Int(i) => Ok(Binding::Short(i16::from(*i != 0))),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Integral { bits } => self.bind_integral(value, bits),
            CodecKind::Double => match value {
                SqlValue::Float(f) => Ok(Binding::Double(*f)),
                SqlValue::Decimal(d) => d
                    .parse::<f64>()
                    .map(Binding::Double)
                    .map_err(|_| self.mismatch(d)),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Decimal => match value {
                SqlValue::Decimal(d) => Ok(Binding::BigDecimal(d.clone())),
                SqlValue::Int(i) => Ok(Binding::BigDecimal(i.to_string())),
                SqlValue::Float(f) => Ok(Binding::BigDecimal(f.to_string())),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Varchar => match value {
                SqlValue::Text(s) if options.use_nationalized_character_data => {
                    Ok(Binding::NString(s.clone()))
                }
                SqlValue::Text(s) => Ok(Binding::String(s.clone())),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::NVarchar => match value {
                SqlValue::Text(s) => Ok(Binding::NString(s.clone())),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Varbinary => match value {
                SqlValue::Bytes(b) => Ok(Binding::Bytes(b.clone())),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Date => match value {
                SqlValue::Date(d) => Ok(Binding::Date(*d)),
                SqlValue::Timestamp(ts) => Ok(Binding::Date(ts.date())),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Time => match value {
                SqlValue::Time(t) => Ok(Binding::Time(*t)),
                SqlValue::Timestamp(ts) => Ok(Binding::Time(ts.time())),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Timestamp => match value {
                SqlValue::Timestamp(ts) => Ok(Binding::Timestamp(*ts)),
                SqlValue::Date(d) => Ok(Binding::Timestamp(d.and_time(NaiveTime::MIN))),
                other => Err(self.mismatch(other.kind())),
            },
            CodecKind::Blob | CodecKind::PrefetchBlob { .. } => self.bind_blob(value, options),
            CodecKind::Clob => self.bind_clob(value, options, false),
            CodecKind::NClob | CodecKind::PrefetchNClob { .. } => {
                self.bind_clob(value, options, true)
            }
            CodecKind::PrefetchClob { unicode, .. } => self.bind_clob(value, options, unicode),
        }
    }

    fn bind_integral(&self, value: &SqlValue, bits: u8) -> Result<Binding> {
        let n = match value {
            SqlValue::Int(i) => *i,
            SqlValue::Bool(b) => i64::from(*b),
            other => return Err(self.mismatch(other.kind())),
        };
        let out_of_range = || self.mismatch(&format!("{n} (out of range)"));
        match bits {
            8 | 16 => i16::try_from(n)
                .map(Binding::Short)
                .map_err(|_| out_of_range()),
            32 => i32::try_from(n)
                .map(Binding::Int)
                .map_err(|_| out_of_range()),
            _ => Ok(Binding::Long(n)),
        }
    }

    fn bind_blob(&self, value: &SqlValue, options: &WrapperOptions) -> Result<Binding> {
        match value {
            SqlValue::Bytes(b) => Ok(Binding::Bytes(b.clone())),
            // Streaming out of an owned copy must not end its life.
            SqlValue::Blob(BlobValue::Materialized(blob))
                if matches!(self.kind, CodecKind::PrefetchBlob { .. })
                    || options.use_stream_for_lob_binding =>
            {
                Ok(Binding::BinaryStream {
                    data: blob.bytes()?.to_vec(),
                    close_suppressed: true,
                })
            }
            SqlValue::Blob(blob) if options.use_stream_for_lob_binding => {
                Ok(Binding::BinaryStream {
                    data: blob.to_bytes()?,
                    close_suppressed: false,
                })
            }
            SqlValue::Blob(blob) => Ok(Binding::Blob(blob.clone())),
            other => Err(self.mismatch(other.kind())),
        }
    }

    fn bind_clob(
        &self,
        value: &SqlValue,
        options: &WrapperOptions,
        nationalized: bool,
    ) -> Result<Binding> {
        let stream = |data: String, close_suppressed: bool| {
            if nationalized {
                Binding::NCharacterStream {
                    data,
                    close_suppressed,
                }
            } else {
                Binding::CharacterStream {
                    data,
                    close_suppressed,
                }
            }
        };
        match value {
            SqlValue::Text(s) if nationalized => Ok(Binding::NString(s.clone())),
            SqlValue::Text(s) => Ok(Binding::String(s.clone())),
            SqlValue::Clob(ClobValue::Materialized(clob))
                if matches!(
                    self.kind,
                    CodecKind::PrefetchClob { .. } | CodecKind::PrefetchNClob { .. }
                ) || options.use_stream_for_lob_binding =>
            {
                Ok(stream(clob.as_str()?.to_string(), true))
            }
            SqlValue::Clob(clob) if options.use_stream_for_lob_binding => {
                Ok(stream(clob.to_string_value()?, false))
            }
            SqlValue::Clob(clob) if nationalized => Ok(Binding::NClob(clob.clone())),
            SqlValue::Clob(clob) => Ok(Binding::Clob(clob.clone())),
            other => Err(self.mismatch(other.kind())),
        }
    }

    /// Converts a driver column value into a domain value.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::Codec`] when the raw value does not fit the
    /// codec, and propagates LOB locator errors.
    pub fn extract(&self, raw: RawValue) -> Result<SqlValue> {
        if matches!(raw, RawValue::Null) {
            return Ok(SqlValue::Null);
        }
        match (self.kind, raw) {
            (CodecKind::Boolean | CodecKind::NumericBoolean, RawValue::Boolean(b)) => {
                Ok(SqlValue::Bool(b))
            }
            (CodecKind::Boolean | CodecKind::NumericBoolean, RawValue::Long(i)) => {
                Ok(SqlValue::Bool(i != 0))
            }
            (CodecKind::Integral { .. }, RawValue::Long(i)) => Ok(SqlValue::Int(i)),
            (CodecKind::Integral { .. }, RawValue::Boolean(b)) => Ok(SqlValue::Int(i64::from(b))),
            (CodecKind::Integral { .. }, RawValue::Decimal(d)) => d
                .parse::<i64>()
                .map(SqlValue::Int)
                .map_err(|_| self.mismatch(&d)),
            (CodecKind::Double, RawValue::Double(f)) => Ok(SqlValue::Float(f)),
            (CodecKind::Double, RawValue::Decimal(d)) => d
                .parse::<f64>()
                .map(SqlValue::Float)
                .map_err(|_| self.mismatch(&d)),
            (CodecKind::Decimal, RawValue::Decimal(d)) => Ok(SqlValue::Decimal(d)),
            (CodecKind::Decimal, RawValue::Long(i)) => Ok(SqlValue::Decimal(i.to_string())),
            (CodecKind::Decimal, RawValue::Double(f)) => Ok(SqlValue::Decimal(f.to_string())),
            (CodecKind::Varchar | CodecKind::NVarchar, RawValue::String(s)) => Ok(SqlValue::Text(s)),
            (
                CodecKind::Varchar | CodecKind::NVarchar,
                RawValue::Clob(locator) | RawValue::NClob(locator),
            ) => Ok(SqlValue::Text(locator.read_string()?)),
            (CodecKind::Varbinary, RawValue::Bytes(b)) => Ok(SqlValue::Bytes(b)),
            (CodecKind::Varbinary, RawValue::Blob(locator)) => {
                Ok(SqlValue::Bytes(locator.read_bytes()?))
            }
            (CodecKind::Date, RawValue::Date(d)) => Ok(SqlValue::Date(d)),
            (CodecKind::Time, RawValue::Time(t)) => Ok(SqlValue::Time(t)),
            (CodecKind::Timestamp, RawValue::Timestamp(ts)) => Ok(SqlValue::Timestamp(ts)),
            (CodecKind::Blob, RawValue::Blob(locator)) => {
                Ok(SqlValue::Blob(BlobValue::Locator(locator)))
            }
            (CodecKind::Blob | CodecKind::PrefetchBlob { .. }, RawValue::Bytes(b)) => Ok(
                SqlValue::Blob(BlobValue::Materialized(MaterializedBlob::new(b))),
            ),
            (CodecKind::Clob | CodecKind::NClob, RawValue::Clob(locator) | RawValue::NClob(locator)) => {
                Ok(SqlValue::Clob(ClobValue::Locator(locator)))
            }
            (CodecKind::Clob, RawValue::String(s)) => Ok(SqlValue::Clob(ClobValue::Materialized(
                MaterializedClob::new(s),
            ))),
            (CodecKind::NClob | CodecKind::PrefetchNClob { .. }, RawValue::String(s)) => Ok(
                SqlValue::Clob(ClobValue::Materialized(MaterializedClob::nationalized(s))),
            ),
            (CodecKind::PrefetchBlob { threshold }, RawValue::Blob(locator)) => {
                if below_threshold(locator.as_ref(), threshold)? {
                    Ok(SqlValue::Blob(BlobValue::Locator(locator)))
                } else {
                    let blob = MaterializedBlob::from_locator(locator.as_ref())?;
                    Ok(SqlValue::Blob(BlobValue::Materialized(blob)))
                }
            }
            (CodecKind::PrefetchClob { threshold, unicode }, RawValue::Clob(locator)) => {
                extract_prefetched_clob(locator, threshold, unicode)
            }
            (CodecKind::PrefetchClob { threshold, .. }, RawValue::NClob(locator)) => {
                extract_prefetched_clob(locator, threshold, true)
            }
            (CodecKind::PrefetchClob { unicode, .. }, RawValue::String(s)) => {
                let clob = if unicode {
                    MaterializedClob::nationalized(s)
                } else {
                    MaterializedClob::new(s)
                };
                Ok(SqlValue::Clob(ClobValue::Materialized(clob)))
            }
            (CodecKind::PrefetchNClob { threshold }, RawValue::Clob(locator) | RawValue::NClob(locator)) => {
                extract_prefetched_clob(locator, threshold, true)
            }
            (_, other) => Err(self.mismatch(other.kind())),
        }
    }
}

fn below_threshold(locator: &dyn LobLocator, threshold: u32) -> Result<bool> {
    Ok(locator.length()? < u64::from(threshold))
}

fn extract_prefetched_clob(
    locator: Arc<dyn LobLocator>,
    threshold: u32,
    nationalized: bool,
) -> Result<SqlValue> {
    if below_threshold(locator.as_ref(), threshold)? {
        return Ok(SqlValue::Clob(ClobValue::Locator(locator)));
    }
    let clob = MaterializedClob::from_locator(locator.as_ref(), nationalized)?;
    Ok(SqlValue::Clob(ClobValue::Materialized(clob)))
}

/// Dialect-specific codec replacements layered over the standard codecs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecRegistry {
    overrides: HashMap<TypeCode, TypeCodec>,
}

impl CodecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a replacement for the codec's type code.
    pub fn register(&mut self, codec: TypeCodec) {
        self.overrides.insert(codec.code(), codec);
    }

    /// Returns the override for `code`, if any.
    #[must_use]
    pub fn override_for(&self, code: TypeCode) -> Option<TypeCodec> {
        self.overrides.get(&code).copied()
    }

    /// Resolves the codec for `code`: the dialect override when the standard
    /// codec is remappable, otherwise the standard codec.
    #[must_use]
    pub fn resolve(&self, code: TypeCode) -> TypeCodec {
        let standard = TypeCodec::standard(code);
        if !standard.is_remappable() {
            return standard;
        }
        self.override_for(code).unwrap_or(standard)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
