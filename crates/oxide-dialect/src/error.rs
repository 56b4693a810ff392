//! Error types for dialect operations.

use crate::types::TypeCode;

/// Errors raised by dialects, codecs and LOB wrappers.
#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    /// A driver reported a type code this crate does not know.
    #[error("Unknown type code: {0}")]
    UnknownTypeCode(i32),

    /// A type name could not be parsed.
    #[error("Unknown type name: '{0}'")]
    UnknownTypeName(String),

    /// No column type is registered for the code.
    #[error("No column type mapping for {code} (length {length})")]
    NoColumnType {
        /// The requested type code.
        code: TypeCode,
        /// The requested length.
        length: u32,
    },

    /// A database product name could not be resolved.
    #[error("Unknown database product: '{0}'")]
    UnknownProduct(String),

    /// A configuration property carried an unusable value.
    #[error("Invalid value '{value}' for setting '{key}': {reason}")]
    InvalidSetting {
        /// The property key.
        key: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Settings document could not be deserialized.
    #[error("Invalid settings document: {0}")]
    Settings(#[from] serde_json::Error),

    /// Error reported by the environment probe's connection.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The LOB was freed; its content is gone.
    #[error("LOB has been freed")]
    LobFreed,

    /// A positional LOB access fell outside the content.
    #[error("LOB position {position} out of range for length {length}")]
    LobPosition {
        /// One-based position requested.
        position: u64,
        /// Current content length.
        length: u64,
    },

    /// Truncation to a length beyond the current content.
    #[error("Cannot truncate LOB of length {length} to {requested}")]
    LobTruncate {
        /// Requested length.
        requested: u64,
        /// Current content length.
        length: u64,
    },

    /// A value could not be bound or extracted by a codec.
    #[error("Codec {codec} cannot handle {value}")]
    Codec {
        /// Codec name.
        codec: &'static str,
        /// Short description of the offending value.
        value: String,
    },

    /// The operation is not supported by this dialect or wrapper.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Result type for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;
