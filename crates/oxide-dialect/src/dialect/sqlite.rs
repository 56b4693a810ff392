//! SQLite.

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
    ColumnTypeEntry::unbounded(TypeCode::Bit, "boolean"),
    ColumnTypeEntry::unbounded(TypeCode::Float, "float"),
    ColumnTypeEntry::unbounded(TypeCode::Double, "double"),
    ColumnTypeEntry::unbounded(TypeCode::Numeric, "numeric"),
    ColumnTypeEntry::unbounded(TypeCode::Decimal, "decimal"),
    ColumnTypeEntry::unbounded(TypeCode::Char, "char"),
    ColumnTypeEntry::unbounded(TypeCode::Varchar, "varchar"),
    ColumnTypeEntry::unbounded(TypeCode::LongVarchar, "longvarchar"),
    ColumnTypeEntry::unbounded(TypeCode::NChar, "nchar"),
    ColumnTypeEntry::unbounded(TypeCode::NVarchar, "nvarchar"),
    ColumnTypeEntry::unbounded(TypeCode::LongNVarchar, "nvarchar"),
    ColumnTypeEntry::unbounded(TypeCode::Timestamp, "datetime"),
    ColumnTypeEntry::unbounded(TypeCode::TimestampWithTimezone, "datetime"),
    ColumnTypeEntry::unbounded(TypeCode::Binary, "blob"),
    ColumnTypeEntry::unbounded(TypeCode::Varbinary, "blob"),
    ColumnTypeEntry::unbounded(TypeCode::LongVarbinary, "blob"),
];

const KEYWORDS: &[&str] = &[
    "abort", "autoincrement", "attach", "detach", "explain", "glob", "indexed", "isnull",
    "notnull", "pragma", "raise", "regexp", "reindex", "vacuum", "virtual",
];

// Extended result codes are the primary code plus a multiple of 256.
const ERROR_CODES: ErrorCodeTable = &[
    (ErrorCode::Vendor(5), ErrorKind::LockAcquisition),
    (ErrorCode::Vendor(6), ErrorKind::LockAcquisition),
    (ErrorCode::Vendor(261), ErrorKind::LockAcquisition),
    (ErrorCode::Vendor(517), ErrorKind::LockAcquisition),
    (ErrorCode::Vendor(19), ErrorKind::ConstraintViolation),
    (ErrorCode::Vendor(275), ErrorKind::ConstraintViolation),
    (ErrorCode::Vendor(787), ErrorKind::ConstraintViolation),
    (ErrorCode::Vendor(1299), ErrorKind::ConstraintViolation),
    (ErrorCode::Vendor(1555), ErrorKind::ConstraintViolation),
    (ErrorCode::Vendor(2067), ErrorKind::ConstraintViolation),
    (ErrorCode::Vendor(2579), ErrorKind::ConstraintViolation),
];

const CONSTRAINT_PATTERNS: &[&str] = &[r"constraint failed: (.+)$"];

pub(super) const SQLITE: Profile = Profile {
    name: "sqlite",
    column_types: COLUMN_TYPES,
    keywords: KEYWORDS,
    casing: IdentifierCasing {
        unquoted: CaseStrategy::Mixed,
        quoted: CaseStrategy::Mixed,
    },
    lock: LockSyntax::NONE,
    error_codes: ERROR_CODES,
    constraint_patterns: CONSTRAINT_PATTERNS,
    sequences: SequenceSupport::NONE,
    identity: IdentityColumnSupport::new(
        "primary key autoincrement",
        "select last_insert_rowid()",
        true,
    ),
    limit: LimitHandler::LimitOffset,
    features: Features {
        from_dual: None,
        current_timestamp_select: "select current_timestamp",
        current_schema_command: None,
        select_guid: None,
        supports_query_hints: false,
        supports_inline_comments: false,
        add_column: "add column",
        add_column_suffix: "",
        cascade_constraints: "",
        max_alias_length: 128,
        default_decimal_precision: 19,
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
    // booleans are stored as integers
    codecs.register(TypeCodec::new(
        TypeCode::Boolean,
        "integer boolean",
        false,
        CodecKind::NumericBoolean,
    ));
    codecs.register(TypeCodec::new(TypeCode::Blob, "blob", false, CodecKind::Varbinary));
    codecs.register(TypeCodec::new(TypeCode::Clob, "text", false, CodecKind::Varchar));
}
