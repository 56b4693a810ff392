//! Error types for native queries.

use oxide_dialect::{DialectError, PersistenceError};
use thiserror::Error;

/// Errors raised while preparing, planning or reading a native query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A mapping feature this crate deliberately does not support.
    #[error("not yet implemented: {0}")]
    NotYetImplemented(String),

    /// The requested result type does not match the mapping.
    #[error("type specified for typed query [{requested}] is incompatible with query return type [{actual}]")]
    IncompatibleResultType { requested: String, actual: String },

    /// A typed query was requested for a mapping with more than one result.
    #[error("cannot create typed query for query with more than one return")]
    MultipleResultsForTypedQuery,

    /// A typed query was requested for a mapping with no results.
    #[error("query exists but its result type is not compatible: no result builders")]
    NoResultsForTypedQuery,

    /// A unique result was requested but several rows came back.
    #[error("query did not return a unique result: {0} rows")]
    NonUniqueResult(usize),

    #[error("unknown table alias: {0}")]
    UnknownAlias(String),

    #[error("duplicate table alias: {0}")]
    DuplicateAlias(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown attribute '{attribute}' of {entity}")]
    UnknownAttribute { entity: String, attribute: String },

    /// A join was declared on an attribute that is not an association.
    #[error("attribute '{attribute}' of {entity} is not an association")]
    NotAnAssociation { entity: String, attribute: String },

    #[error("column not found in result set: {0}")]
    UnknownColumn(String),

    #[error("not a property path: {0}")]
    NotAPropertyPath(String),

    #[error("unknown named query: {0}")]
    UnknownNamedQuery(String),

    #[error("unknown result set mapping: {0}")]
    UnknownResultSetMapping(String),

    #[error("no parameter {0} in query")]
    UnknownParameter(String),

    #[error("no value bound for parameter {0}")]
    MissingBinding(String),

    /// A list was bound to a placeholder that cannot be expanded in place.
    #[error("parameter {0} cannot take a list of values at this position")]
    ListNotExpandable(String),

    #[error("result set mapping has no name and cannot be registered")]
    UnnamedResultSetMapping,

    /// The statement combines `?`, `?1` and `:name` placeholders.
    #[error("mixed parameter styles: {0}")]
    MixedParameterStyles(String),

    #[error("SQL syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A value could not be converted to the requested type.
    #[error("cannot convert {value} to {target}")]
    Conversion { target: String, value: String },

    /// An attribute converter rejected a column value.
    #[error("attribute converter for '{attribute}' failed: {message}")]
    AttributeConversion { attribute: String, message: String },

    /// A tuple element was requested by an alias no element carries.
    #[error("unknown tuple alias: {0}")]
    UnknownTupleAlias(String),

    /// The surrounding context cancelled the row loop.
    #[error("query execution was cancelled")]
    Cancelled,

    /// An update was requested for a statement that returns rows.
    #[error("cannot execute an update for a select statement")]
    NotAnUpdate,

    #[error("invalid engine options: {0}")]
    Options(#[from] serde_json::Error),

    #[error(transparent)]
    Dialect(#[from] DialectError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type alias for native query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
