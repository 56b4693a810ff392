//! PostgreSQL.

use super::exception::{ErrorCode, ErrorCodeTable, ErrorKind};
use super::identifier::{CaseStrategy, IdentifierCasing};
use super::lock::LockSyntax;
use super::pagination::LimitHandler;
use super::sequence::{IdentityColumnSupport, SequenceSupport};
use super::{Features, Profile, ResolvedSettings, DEFAULT_MAX_LOB_PREFETCH_SIZE};
use crate::codec::{CodecKind, CodecRegistry, TypeCodec};
use crate::column_types::{ColumnTypeEntry, ColumnTypeRegistry};
use crate::types::TypeCode;

const COLUMN_TYPES: &[ColumnTypeEntry] = &[
    ColumnTypeEntry::unbounded(TypeCode::TinyInt, "smallint"),
    ColumnTypeEntry::unbounded(TypeCode::Float, "float8"),
    ColumnTypeEntry::unbounded(TypeCode::Double, "float8"),
    ColumnTypeEntry::unbounded(TypeCode::Real, "float4"),
    ColumnTypeEntry::unbounded(TypeCode::LongVarchar, "text"),
    ColumnTypeEntry::unbounded(TypeCode::Clob, "text"),
    ColumnTypeEntry::unbounded(TypeCode::NChar, "char($l)"),
    ColumnTypeEntry::unbounded(TypeCode::NVarchar, "varchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::LongNVarchar, "text"),
    ColumnTypeEntry::unbounded(TypeCode::NClob, "text"),
    ColumnTypeEntry::unbounded(TypeCode::Binary, "bytea"),
    ColumnTypeEntry::unbounded(TypeCode::Varbinary, "bytea"),
    ColumnTypeEntry::unbounded(TypeCode::LongVarbinary, "bytea"),
    ColumnTypeEntry::unbounded(TypeCode::Blob, "bytea"),
];

const KEYWORDS: &[&str] = &[
    "analyse", "analyze", "asc", "cast", "collate", "column", "concurrently", "constraint",
    "create", "current_catalog", "current_role", "deferrable", "desc", "do", "fetch", "freeze",
    "grant", "ilike", "initially", "isnull", "lateral", "limit", "localtime", "localtimestamp",
    "notnull", "offset", "only", "placing", "primary", "references", "returning", "similar",
    "symmetric", "table", "user", "variadic", "verbose", "window",
];

const ERROR_CODES: ErrorCodeTable = &[
    // lock_not_available, raised by nowait and lock_timeout
    (ErrorCode::SqlState("55P03"), ErrorKind::LockTimeout),
    (ErrorCode::SqlState("40P01"), ErrorKind::LockAcquisition),
    (ErrorCode::SqlState("40001"), ErrorKind::LockAcquisition),
    (ErrorCode::SqlStateClass("42"), ErrorKind::SqlGrammar),
    (ErrorCode::SqlStateClass("23"), ErrorKind::ConstraintViolation),
];

const CONSTRAINT_PATTERNS: &[&str] = &[
    r#"violates (?:unique|foreign key|check|not-null|exclusion) constraint "([^"]+)""#,
    r#"constraint "([^"]+)""#,
];

pub(super) const POSTGRESQL: Profile = Profile {
    name: "postgresql",
    column_types: COLUMN_TYPES,
    keywords: KEYWORDS,
    casing: IdentifierCasing {
        unquoted: CaseStrategy::Lower,
        quoted: CaseStrategy::Mixed,
    },
    lock: LockSyntax {
        for_update: "for update",
        for_share: Some("for share"),
        of_aliases: true,
        nowait: Some(" nowait"),
        skip_locked: Some(" skip locked"),
        wait: None,
    },
    error_codes: ERROR_CODES,
    constraint_patterns: CONSTRAINT_PATTERNS,
    sequences: SequenceSupport::new(
        Some("select * from information_schema.sequences"),
        "nextval('{seq}')",
        "select nextval('{seq}')",
        "create sequence {seq}",
        "drop sequence if exists {seq}",
    ),
    identity: IdentityColumnSupport::new(
        "generated by default as identity",
        "select currval(pg_get_serial_sequence('{table}','{column}'))",
        true,
    ),
    limit: LimitHandler::LimitOffset,
    features: Features {
        from_dual: None,
        current_timestamp_select: "select now()",
        current_schema_command: Some("select current_schema()"),
        select_guid: Some("select gen_random_uuid()"),
        supports_query_hints: false,
        supports_inline_comments: false,
        add_column: "add column",
        add_column_suffix: "",
        cascade_constraints: " cascade",
        max_alias_length: 63,
        default_decimal_precision: 1000,
        supports_select_without_from: true,
        supports_row_value_constructor_in_list: true,
        supports_window_functions: true,
        supports_no_columns_insert: true,
        quote_type_table: false,
    },
    default_properties: &[],
    probe_query: None,
    defaults: ResolvedSettings {
        max_lob_prefetch_size: DEFAULT_MAX_LOB_PREFETCH_SIZE,
        use_legacy_boolean_type: false,
        use_unicode_string_types: false,
        treat_double_typed_fields_as_decimal: false,
        in_expression_count_limit: 0,
    },
    supports_ascii_string_types: false,
    configure,
};

fn configure(_: &ResolvedSettings, _: &mut ColumnTypeRegistry, codecs: &mut CodecRegistry) {
    // bytea and text columns travel as plain values, not LOB locators
    codecs.register(TypeCodec::new(TypeCode::Blob, "bytea", false, CodecKind::Varbinary));
    codecs.register(TypeCodec::new(TypeCode::Clob, "text", false, CodecKind::Varchar));
    codecs.register(TypeCodec::new(TypeCode::NClob, "text", false, CodecKind::Varchar));
}
