//! Database dialects.
//!
//! A [`Dialect`] is an immutable snapshot assembled from a per-product
//! profile (static tables for column types, keywords, lock syntax, error
//! codes and SQL fragments) plus resolved [`DialectSettings`]. Products do
//! not subclass each other; they differ only in the data they supply.
//!
//! Reconfiguration never mutates a dialect: [`Dialect::reconfigured`] and
//! [`Dialect::contribute`](crate::contribute) return a new snapshot.

mod hana;
mod postgres;
mod sqlite;

pub mod exception;
pub mod identifier;
pub mod lock;
pub mod pagination;
pub mod sequence;

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::codec::{CodecRegistry, TypeCodec};
use crate::column_types::{ColumnTypeEntry, ColumnTypeRegistry, STANDARD_COLUMN_TYPES};
use crate::error::{DialectError, Result};
use crate::settings::DialectSettings;
use crate::types::TypeCode;

use exception::{ErrorCodeTable, ErrorKind, JdbcError, PersistenceError};
use identifier::{Identifier, IdentifierCasing, IdentifierHelper, SQL_2003_KEYWORDS};
use lock::{LockMode, LockOptions, LockSyntax};
use pagination::LimitHandler;
use sequence::{IdentityColumnSupport, SequenceSupport};

/// Supported database products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// SAP HANA (on-premise column store).
    Hana,
    /// SAP HANA Cloud; no ASCII string types.
    HanaCloud,
    PostgreSql,
    Sqlite,
}

impl Product {
    pub const ALL: [Self; 4] = [Self::Hana, Self::HanaCloud, Self::PostgreSql, Self::Sqlite];

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.profile().name
    }

    const fn profile(self) -> &'static Profile {
        match self {
            Self::Hana => &hana::HANA,
            Self::HanaCloud => &hana::HANA_CLOUD,
            Self::PostgreSql => &postgres::POSTGRESQL,
            Self::Sqlite => &sqlite::SQLITE,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Product {
    type Err = DialectError;

    /// Accepts product names as reported by drivers and common aliases.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "hana" | "hdb" | "sap_hana" | "hana_column_store" => Ok(Self::Hana),
            "hana_cloud" | "sap_hana_cloud" => Ok(Self::HanaCloud),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(DialectError::UnknownProduct(s.to_string())),
        }
    }
}

/// Settings after defaults, probing and user overrides have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedSettings {
    pub max_lob_prefetch_size: u32,
    pub use_legacy_boolean_type: bool,
    pub use_unicode_string_types: bool,
    pub treat_double_typed_fields_as_decimal: bool,
    /// Zero means unlimited.
    pub in_expression_count_limit: u32,
}

/// Default LOB prefetch threshold in bytes.
pub const DEFAULT_MAX_LOB_PREFETCH_SIZE: u32 = 1024;

/// Product SQL fragments and capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub from_dual: Option<&'static str>,
    pub current_timestamp_select: &'static str,
    pub current_schema_command: Option<&'static str>,
    pub select_guid: Option<&'static str>,
    pub supports_query_hints: bool,
    /// Inline `comment '<text>'` on tables and columns.
    pub supports_inline_comments: bool,
    pub add_column: &'static str,
    pub add_column_suffix: &'static str,
    pub cascade_constraints: &'static str,
    pub max_alias_length: usize,
    pub default_decimal_precision: u32,
    pub supports_select_without_from: bool,
    pub supports_row_value_constructor_in_list: bool,
    pub supports_window_functions: bool,
    pub supports_no_columns_insert: bool,
    /// Tables named `TYPE` must be quoted in DDL.
    pub quote_type_table: bool,
}

/// Static description of one product.
#[derive(Debug)]
struct Profile {
    name: &'static str,
    column_types: &'static [ColumnTypeEntry],
    keywords: &'static [&'static str],
    casing: IdentifierCasing,
    lock: LockSyntax,
    error_codes: ErrorCodeTable,
    constraint_patterns: &'static [&'static str],
    sequences: SequenceSupport,
    identity: IdentityColumnSupport,
    limit: LimitHandler,
    features: Features,
    default_properties: &'static [(&'static str, &'static str)],
    probe_query: Option<&'static str>,
    defaults: ResolvedSettings,
    supports_ascii_string_types: bool,
    configure: fn(&ResolvedSettings, &mut ColumnTypeRegistry, &mut CodecRegistry),
}

/// An immutable, fully configured dialect.
#[derive(Debug, Clone)]
pub struct Dialect {
    product: Product,
    profile: &'static Profile,
    settings: ResolvedSettings,
    column_types: ColumnTypeRegistry,
    codecs: CodecRegistry,
    identifiers: IdentifierHelper,
    constraint_patterns: Vec<Regex>,
}

impl Dialect {
    /// The dialect with product defaults and no user settings.
    #[must_use]
    pub fn new(product: Product) -> Self {
        Self::build(product, product.profile().defaults)
    }

    /// Applies user settings without consulting the database.
    #[must_use]
    pub fn configured(product: Product, settings: &DialectSettings) -> Self {
        let base = Self::new(product);
        let resolved = base.resolve_settings(settings, None);
        base.reconfigured(resolved)
    }

    fn build(product: Product, settings: ResolvedSettings) -> Self {
        let profile = product.profile();
        let mut column_types =
            ColumnTypeRegistry::from_tables(&[STANDARD_COLUMN_TYPES, profile.column_types]);
        let mut codecs = CodecRegistry::new();
        (profile.configure)(&settings, &mut column_types, &mut codecs);

        let identifiers =
            IdentifierHelper::new(profile.casing, &[SQL_2003_KEYWORDS, profile.keywords]);
        let constraint_patterns = profile
            .constraint_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            product,
            profile,
            settings,
            column_types,
            codecs,
            identifiers,
            constraint_patterns,
        }
    }

    /// A new snapshot of this product with `settings` applied.
    #[must_use]
    pub fn reconfigured(&self, settings: ResolvedSettings) -> Self {
        Self::build(self.product, settings)
    }

    /// Layers user settings and an optionally probed prefetch size over the
    /// product defaults. User settings win over the probed value.
    #[must_use]
    pub fn resolve_settings(
        &self,
        user: &DialectSettings,
        probed_max_lob_prefetch_size: Option<u32>,
    ) -> ResolvedSettings {
        let defaults = self.profile.defaults;
        let use_unicode_string_types = if self.profile.supports_ascii_string_types {
            user.use_unicode_string_types
                .unwrap_or(defaults.use_unicode_string_types)
        } else {
            defaults.use_unicode_string_types
        };
        ResolvedSettings {
            max_lob_prefetch_size: user
                .max_lob_prefetch_size
                .or(probed_max_lob_prefetch_size)
                .unwrap_or(defaults.max_lob_prefetch_size),
            use_legacy_boolean_type: user
                .use_legacy_boolean_type
                .unwrap_or(defaults.use_legacy_boolean_type),
            use_unicode_string_types,
            treat_double_typed_fields_as_decimal: user
                .treat_double_typed_fields_as_decimal
                .unwrap_or(defaults.treat_double_typed_fields_as_decimal),
            in_expression_count_limit: user
                .in_expression_count_limit
                .unwrap_or(defaults.in_expression_count_limit),
        }
    }

    #[must_use]
    pub const fn product(&self) -> Product {
        self.product
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.profile.name
    }

    #[must_use]
    pub const fn settings(&self) -> &ResolvedSettings {
        &self.settings
    }

    #[must_use]
    pub const fn features(&self) -> &Features {
        &self.profile.features
    }

    /// Query run against the live database during contribution, if any.
    #[must_use]
    pub const fn probe_query(&self) -> Option<&'static str> {
        self.profile.probe_query
    }

    #[must_use]
    pub const fn supports_ascii_string_types(&self) -> bool {
        self.profile.supports_ascii_string_types
    }

    #[must_use]
    pub const fn default_properties(&self) -> &'static [(&'static str, &'static str)] {
        self.profile.default_properties
    }

    // ---- types ------------------------------------------------------------

    /// DDL column type for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::NoColumnType`] when nothing fits.
    pub fn column_type(
        &self,
        code: TypeCode,
        length: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Result<String> {
        let precision = precision.or_else(|| {
            matches!(code, TypeCode::Decimal | TypeCode::Numeric)
                .then_some(self.profile.features.default_decimal_precision)
        });
        self.column_types.get(code, length, precision, scale)
    }

    #[must_use]
    pub const fn column_types(&self) -> &ColumnTypeRegistry {
        &self.column_types
    }

    /// Codec used to bind and extract values of `code`.
    #[must_use]
    pub fn codec(&self, code: TypeCode) -> TypeCodec {
        self.codecs.resolve(code)
    }

    /// The dialect's replacement for `code`, when it has one.
    #[must_use]
    pub fn codec_override(&self, code: TypeCode) -> Option<TypeCodec> {
        self.codecs.override_for(code)
    }

    #[must_use]
    pub const fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    #[must_use]
    pub const fn to_boolean_literal(&self, value: bool) -> &'static str {
        match (self.settings.use_legacy_boolean_type, value) {
            (true, true) => "1",
            (true, false) => "0",
            (false, true) => "true",
            (false, false) => "false",
        }
    }

    // ---- locking ----------------------------------------------------------

    /// Row-lock clause for `mode` over `aliases`, with a timeout in
    /// milliseconds.
    #[must_use]
    pub fn for_update_clause(&self, aliases: &[&str], mode: LockMode, timeout_millis: i64) -> String {
        self.profile.lock.render(mode, aliases, timeout_millis)
    }

    #[must_use]
    pub fn for_update_string(&self, aliases: &[&str], options: &LockOptions) -> String {
        self.for_update_clause(aliases, options.mode, options.timeout_millis)
    }

    #[must_use]
    pub const fn supports_nowait(&self) -> bool {
        self.profile.lock.nowait.is_some()
    }

    #[must_use]
    pub const fn supports_skip_locked(&self) -> bool {
        self.profile.lock.skip_locked.is_some()
    }

    // ---- errors -----------------------------------------------------------

    #[must_use]
    pub fn classify(&self, error: &JdbcError) -> ErrorKind {
        exception::classify(self.profile.error_codes, error)
    }

    #[must_use]
    pub fn extract_constraint_name(&self, error: &JdbcError) -> Option<String> {
        exception::extract_constraint_name(&self.constraint_patterns, &error.message)
    }

    /// Wraps a driver error into its classified persistence error.
    #[must_use]
    pub fn convert(&self, error: JdbcError, sql: &str) -> PersistenceError {
        let sql = sql.to_string();
        match self.classify(&error) {
            ErrorKind::LockTimeout => PersistenceError::LockTimeout { source: error, sql },
            ErrorKind::LockAcquisition => PersistenceError::LockAcquisition { source: error, sql },
            ErrorKind::SqlGrammar => PersistenceError::SqlGrammar { source: error, sql },
            ErrorKind::ConstraintViolation => {
                let constraint_name = self.extract_constraint_name(&error);
                PersistenceError::ConstraintViolation {
                    source: error,
                    sql,
                    constraint_name,
                }
            }
            ErrorKind::Unclassified => PersistenceError::Generic { source: error, sql },
        }
    }

    // ---- identifiers ------------------------------------------------------

    #[must_use]
    pub const fn identifier_helper(&self) -> &IdentifierHelper {
        &self.identifiers
    }

    #[must_use]
    pub fn is_keyword(&self, word: &str) -> bool {
        self.identifiers.is_reserved_word(word)
    }

    #[must_use]
    pub fn to_identifier(&self, text: &str) -> Identifier {
        self.identifiers.to_identifier(text)
    }

    /// Renders `text`, quoting it when the product requires.
    #[must_use]
    pub fn quote_if_needed(&self, text: &str) -> String {
        self.identifiers.to_identifier(text).render()
    }

    // ---- sequences, identity, pagination ----------------------------------

    #[must_use]
    pub const fn sequences(&self) -> &SequenceSupport {
        &self.profile.sequences
    }

    #[must_use]
    pub const fn identity(&self) -> &IdentityColumnSupport {
        &self.profile.identity
    }

    #[must_use]
    pub const fn limit_handler(&self) -> LimitHandler {
        self.profile.limit
    }

    /// Maximum number of expressions in an `IN` list; zero means unlimited.
    #[must_use]
    pub const fn in_expression_count_limit(&self) -> u32 {
        self.settings.in_expression_count_limit
    }

    // ---- SQL fragments ----------------------------------------------------

    #[must_use]
    pub const fn from_dual(&self) -> Option<&'static str> {
        self.profile.features.from_dual
    }

    #[must_use]
    pub const fn current_timestamp_select(&self) -> &'static str {
        self.profile.features.current_timestamp_select
    }

    #[must_use]
    pub const fn current_schema_command(&self) -> Option<&'static str> {
        self.profile.features.current_schema_command
    }

    #[must_use]
    pub const fn select_guid(&self) -> Option<&'static str> {
        self.profile.features.select_guid
    }

    /// Appends query hints; products without hint support return `query`.
    #[must_use]
    pub fn query_hint(&self, query: &str, hints: &[&str]) -> String {
        if !self.profile.features.supports_query_hints || hints.is_empty() {
            return query.to_string();
        }
        format!("{query} with hint ({})", hints.join(","))
    }

    #[must_use]
    pub fn table_comment(&self, comment: &str) -> Option<String> {
        self.inline_comment(comment)
    }

    #[must_use]
    pub fn column_comment(&self, comment: &str) -> Option<String> {
        self.inline_comment(comment)
    }

    fn inline_comment(&self, comment: &str) -> Option<String> {
        self.profile
            .features
            .supports_inline_comments
            .then(|| format!("comment '{comment}'"))
    }

    #[must_use]
    pub const fn add_column_string(&self) -> &'static str {
        self.profile.features.add_column
    }

    #[must_use]
    pub const fn add_column_suffix(&self) -> &'static str {
        self.profile.features.add_column_suffix
    }

    #[must_use]
    pub const fn cascade_constraints_string(&self) -> &'static str {
        self.profile.features.cascade_constraints
    }

    #[must_use]
    pub fn not_expression(&self, expression: &str) -> String {
        format!("not ({expression})")
    }

    #[must_use]
    pub const fn max_alias_length(&self) -> usize {
        self.profile.features.max_alias_length
    }

    #[must_use]
    pub const fn default_decimal_precision(&self) -> u32 {
        self.profile.features.default_decimal_precision
    }

    /// Quotes an unquoted table named `TYPE` (any case) in DDL statements
    /// that start with `prefix` or are `comment on table` statements.
    #[must_use]
    pub fn quote_type_table(&self, table: &str, statements: Vec<String>, prefix: &str) -> Vec<String> {
        if !self.profile.features.quote_type_table
            || identifier::unquote(table).is_some()
            || !table.eq_ignore_ascii_case("type")
        {
            return statements;
        }
        let patterns: Vec<Regex> = [regex::escape(prefix), r"comment\s+on\s+table".to_string()]
            .iter()
            .filter_map(|head| {
                Regex::new(&format!(r"^({head}\s+)({})(.+)$", regex::escape(table))).ok()
            })
            .collect();
        statements
            .into_iter()
            .map(|statement| {
                patterns
                    .iter()
                    .find_map(|re| {
                        re.captures(&statement)
                            .map(|caps| format!("{}\"TYPE\"{}", &caps[1], &caps[3]))
                    })
                    .unwrap_or(statement)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_parsing() {
        assert_eq!("HDB".parse::<Product>().unwrap(), Product::Hana);
        assert_eq!("SAP HANA Cloud".parse::<Product>().unwrap(), Product::HanaCloud);
        assert_eq!("postgres".parse::<Product>().unwrap(), Product::PostgreSql);
        assert!("oracle".parse::<Product>().is_err());
    }

    #[test]
    fn test_all_constraint_patterns_compile() {
        for product in Product::ALL {
            let dialect = Dialect::new(product);
            assert_eq!(
                dialect.constraint_patterns.len(),
                product.profile().constraint_patterns.len(),
                "{product}"
            );
        }
    }

    #[test]
    fn test_every_product_resolves_every_type_code() {
        for product in Product::ALL {
            let dialect = Dialect::new(product);
            for code in TypeCode::ALL {
                assert!(
                    dialect.column_type(code, None, None, None).is_ok(),
                    "{product}: {code}"
                );
            }
        }
    }

    #[test]
    fn test_reconfigured_is_a_new_snapshot() {
        let base = Dialect::new(Product::Hana);
        let settings = base.resolve_settings(
            &DialectSettings {
                use_legacy_boolean_type: Some(true),
                ..DialectSettings::default()
            },
            None,
        );
        let next = base.reconfigured(settings);
        assert_eq!(base.column_type(TypeCode::Boolean, None, None, None).unwrap(), "boolean");
        assert_eq!(next.column_type(TypeCode::Boolean, None, None, None).unwrap(), "tinyint");
        assert_eq!(base.to_boolean_literal(true), "true");
        assert_eq!(next.to_boolean_literal(true), "1");
    }

    #[test]
    fn test_user_setting_beats_probe() {
        let dialect = Dialect::new(Product::Hana);
        let from_probe = dialect.resolve_settings(&DialectSettings::default(), Some(4096));
        assert_eq!(from_probe.max_lob_prefetch_size, 4096);
        let user = dialect.resolve_settings(
            &DialectSettings {
                max_lob_prefetch_size: Some(10),
                ..DialectSettings::default()
            },
            Some(4096),
        );
        assert_eq!(user.max_lob_prefetch_size, 10);
        let neither = dialect.resolve_settings(&DialectSettings::default(), None);
        assert_eq!(neither.max_lob_prefetch_size, DEFAULT_MAX_LOB_PREFETCH_SIZE);
    }
}
