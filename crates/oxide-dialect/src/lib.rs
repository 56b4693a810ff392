//! # oxide-dialect
//!
//! Database dialects as immutable, data-driven snapshots.
//!
//! This crate provides:
//! - Abstract type codes and a column-type registry with length-bounded
//!   templates (`varchar($l)` up to a capacity, a LOB type beyond it)
//! - Type codecs that describe how values are bound and extracted,
//!   including LOB prefetching and materialized LOB wrappers
//! - Row-lock clauses, pagination, sequences and identity support
//! - Classification of driver errors into persistence errors
//! - Startup contribution that probes the live database once
//!
//! ## Column types
//!
//! ```rust
//! use oxide_dialect::{Dialect, Product, TypeCode};
//!
//! let hana = Dialect::new(Product::Hana);
//! assert_eq!(
//!     hana.column_type(TypeCode::Varchar, Some(100), None, None).unwrap(),
//!     "varchar(100)"
//! );
//! assert_eq!(
//!     hana.column_type(TypeCode::Varchar, Some(6000), None, None).unwrap(),
//!     "clob"
//! );
//! ```
//!
//! ## Locking
//!
//! ```rust
//! use oxide_dialect::{Dialect, LockMode, Product};
//!
//! let hana = Dialect::new(Product::Hana);
//! assert_eq!(
//!     hana.for_update_clause(&["c"], LockMode::PessimisticWrite, 3000),
//!     "for update of c wait 3"
//! );
//! ```
//!
//! ## Settings
//!
//! Settings are layered: product defaults, then a value probed from the
//! database, then user settings.
//!
//! ```rust
//! use oxide_dialect::{Dialect, DialectSettings, Product, TypeCode};
//!
//! let settings = DialectSettings::from_properties([(
//!     "oxide.dialect.hana.use_legacy_boolean_type",
//!     "true",
//! )])
//! .unwrap();
//! let hana = Dialect::configured(Product::Hana, &settings);
//! assert_eq!(hana.to_boolean_literal(true), "1");
//! assert_eq!(
//!     hana.column_type(TypeCode::Boolean, None, None, None).unwrap(),
//!     "tinyint"
//! );
//! ```

pub mod codec;
pub mod column_types;
pub mod contribute;
pub mod dialect;
pub mod error;
pub mod lob;
pub mod resolver;
pub mod settings;
pub mod types;
pub mod value;

pub use codec::{Binding, CodecKind, CodecRegistry, RawValue, TypeCodec, WrapperOptions};
pub use column_types::ColumnTypeRegistry;
pub use contribute::{EnvironmentProbe, NoProbe, SqlxProbe, PROBE_TIMEOUT};
pub use dialect::exception::{ErrorKind, JdbcError, PersistenceError};
pub use dialect::identifier::{Identifier, IdentifierHelper};
pub use dialect::lock::{LockMode, LockOptions};
pub use dialect::pagination::{Limit, LimitBind, LimitHandler, LimitedSql};
pub use dialect::{Dialect, Features, Product, ResolvedSettings};
pub use error::{DialectError, Result};
pub use lob::{BlobValue, ClobValue, LobLocator, MaterializedBlob, MaterializedClob};
pub use resolver::DialectResolver;
pub use settings::DialectSettings;
pub use types::TypeCode;
pub use value::{SqlValue, ToSqlValue};
