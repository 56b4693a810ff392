//! SAP HANA.

use super::exception::{ErrorCode, ErrorCodeTable, ErrorKind};
use super::identifier::{CaseStrategy, IdentifierCasing};
use super::lock::LockSyntax;
use super::pagination::LimitHandler;
use super::sequence::{IdentityColumnSupport, SequenceSupport};
use super::{Features, Profile, ResolvedSettings, DEFAULT_MAX_LOB_PREFETCH_SIZE};
use crate::codec::{CodecKind, CodecRegistry, TypeCodec};
use crate::column_types::{ColumnTypeEntry, ColumnTypeRegistry};
use crate::types::TypeCode;

/// Largest in-row length for VARCHAR/NVARCHAR/VARBINARY; longer becomes a LOB.
const MAX_IN_ROW_LENGTH: u32 = 5000;

const COLUMN_TYPES: &[ColumnTypeEntry] = &[
    ColumnTypeEntry::unbounded(TypeCode::Decimal, "decimal($p, $s)"),
    ColumnTypeEntry::unbounded(TypeCode::Numeric, "decimal($p, $s)"),
    ColumnTypeEntry::unbounded(TypeCode::Double, "double"),
    ColumnTypeEntry::unbounded(TypeCode::Timestamp, "timestamp"),
    ColumnTypeEntry::unbounded(TypeCode::TimestampWithTimezone, "timestamp"),
    ColumnTypeEntry::bounded(TypeCode::Binary, MAX_IN_ROW_LENGTH, "varbinary($l)"),
    ColumnTypeEntry::bounded(TypeCode::Varbinary, MAX_IN_ROW_LENGTH, "varbinary($l)"),
    ColumnTypeEntry::unbounded(TypeCode::Binary, "blob"),
    ColumnTypeEntry::unbounded(TypeCode::Varbinary, "blob"),
    ColumnTypeEntry::unbounded(TypeCode::Char, "varchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::NChar, "nvarchar($l)"),
    ColumnTypeEntry::bounded(TypeCode::Varchar, MAX_IN_ROW_LENGTH, "varchar($l)"),
    ColumnTypeEntry::bounded(TypeCode::NVarchar, MAX_IN_ROW_LENGTH, "nvarchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::Varchar, "clob"),
    ColumnTypeEntry::unbounded(TypeCode::NVarchar, "nclob"),
    ColumnTypeEntry::unbounded(TypeCode::TinyInt, "smallint"),
];

const UNICODE_COLUMN_TYPES: &[ColumnTypeEntry] = &[
    ColumnTypeEntry::unbounded(TypeCode::Char, "nvarchar($l)"),
    ColumnTypeEntry::bounded(TypeCode::Varchar, MAX_IN_ROW_LENGTH, "nvarchar($l)"),
    ColumnTypeEntry::unbounded(TypeCode::Varchar, "nclob"),
    ColumnTypeEntry::unbounded(TypeCode::Clob, "nclob"),
];

const KEYWORDS: &[&str] = &[
    "all", "alter", "as", "before", "begin", "both", "case", "char", "condition", "connect",
    "cross", "cube", "current_connection", "current_date", "current_schema", "current_time",
    "current_timestamp", "current_transaction_isolation_level", "current_user",
    "current_utcdate", "current_utctime", "current_utctimestamp", "currval", "cursor",
    "declare", "deferred", "distinct", "else", "elseif", "end", "except", "exception", "exec",
    "false", "for", "from", "full", "group", "having", "if", "in", "inner", "inout",
    "intersect", "into", "is", "join", "leading", "left", "limit", "loop", "minus", "natural",
    "nchar", "nextval", "null", "on", "order", "out", "prior", "return", "returns", "reverse",
    "right", "rollup", "rowid", "select", "session_user", "set", "sql", "start", "sysuuid",
    "tablesample", "top", "trailing", "true", "union", "unknown", "using", "utctimestamp",
    "values", "when", "where", "while", "with",
];

const ERROR_CODES: ErrorCodeTable = &[
    // transaction rolled back by lock wait timeout
    (ErrorCode::Vendor(131), ErrorKind::LockTimeout),
    // resource busy and NOWAIT specified
    (ErrorCode::Vendor(146), ErrorKind::LockTimeout),
    // unavailable resource
    (ErrorCode::Vendor(132), ErrorKind::LockAcquisition),
    // deadlock
    (ErrorCode::Vendor(133), ErrorKind::LockAcquisition),
    (ErrorCode::Vendor(257), ErrorKind::SqlGrammar),
    // invalid table, column, index, query or alias name
    (ErrorCode::VendorRange(259, 263), ErrorKind::SqlGrammar),
    // not null
    (ErrorCode::Vendor(287), ErrorKind::ConstraintViolation),
    // unique
    (ErrorCode::Vendor(301), ErrorKind::ConstraintViolation),
    // foreign key
    (ErrorCode::Vendor(461), ErrorKind::ConstraintViolation),
    (ErrorCode::Vendor(462), ErrorKind::ConstraintViolation),
];

const CONSTRAINT_PATTERNS: &[&str] = &[
    r"Index\(([^)]+)\)",
    r#"(?i)constraint(?:\s+name)?\s*:?\s*"?([\w$#]+)"?"#,
];

const LOB_PREFETCH_PROBE: &str = "SELECT TOP 1 VALUE, MAP(LAYER_NAME, 'DEFAULT', 1, 'SYSTEM', 2, \
     'DATABASE', 3, 4) AS LAYER FROM SYS.M_INIFILE_CONTENTS WHERE FILE_NAME='indexserver.ini' \
     AND SECTION='session' AND KEY='max_lob_prefetch_size' ORDER BY LAYER DESC";

const fn profile(
    name: &'static str,
    supports_ascii_string_types: bool,
    use_unicode_string_types: bool,
) -> Profile {
    Profile {
        name,
        column_types: COLUMN_TYPES,
        keywords: KEYWORDS,
        casing: IdentifierCasing {
            unquoted: CaseStrategy::Upper,
            quoted: CaseStrategy::Mixed,
        },
        lock: LockSyntax {
            for_update: "for update",
            for_share: None,
            of_aliases: true,
            nowait: Some(" nowait"),
            skip_locked: None,
            wait: Some(" wait "),
        },
        error_codes: ERROR_CODES,
        constraint_patterns: CONSTRAINT_PATTERNS,
        sequences: SequenceSupport::new(
            Some("select * from sys.sequences"),
            "{seq}.nextval",
            "select {seq}.nextval from sys.dummy",
            "create sequence {seq}",
            "drop sequence {seq}",
        ),
        identity: IdentityColumnSupport::new(
            "generated by default as identity",
            "select current_identity_value() from sys.dummy",
            false,
        ),
        limit: LimitHandler::LimitOffset,
        features: Features {
            from_dual: Some("from sys.dummy"),
            current_timestamp_select: "select current_timestamp from sys.dummy",
            current_schema_command: Some("select current_schema from sys.dummy"),
            select_guid: Some("select sysuuid from sys.dummy"),
            supports_query_hints: true,
            supports_inline_comments: true,
            add_column: "add (",
            add_column_suffix: ")",
            cascade_constraints: " cascade",
            max_alias_length: 128,
            default_decimal_precision: 34,
            supports_select_without_from: false,
            supports_row_value_constructor_in_list: true,
            supports_window_functions: true,
            supports_no_columns_insert: false,
            quote_type_table: true,
        },
        default_properties: &[
            // the driver cannot create LOBs from the connection
            ("oxide.jdbc.lob.non_contextual_creation", "true"),
            // nor return generated keys
            ("oxide.jdbc.use_get_generated_keys", "false"),
        ],
        probe_query: Some(LOB_PREFETCH_PROBE),
        defaults: ResolvedSettings {
            max_lob_prefetch_size: DEFAULT_MAX_LOB_PREFETCH_SIZE,
            use_legacy_boolean_type: false,
            use_unicode_string_types,
            treat_double_typed_fields_as_decimal: false,
            in_expression_count_limit: 0,
        },
        supports_ascii_string_types,
        configure,
    }
}

pub(super) const HANA: Profile = profile("hana", true, false);
pub(super) const HANA_CLOUD: Profile = profile("hana_cloud", false, true);

fn configure(
    settings: &ResolvedSettings,
    column_types: &mut ColumnTypeRegistry,
    codecs: &mut CodecRegistry,
) {
    let threshold = settings.max_lob_prefetch_size;
    let unicode = settings.use_unicode_string_types;

    codecs.register(TypeCodec::new(
        TypeCode::Blob,
        "blob (hana)",
        false,
        CodecKind::PrefetchBlob { threshold },
    ));
    codecs.register(TypeCodec::new(
        TypeCode::Clob,
        "clob (hana)",
        false,
        CodecKind::PrefetchClob { threshold, unicode },
    ));
    codecs.register(TypeCodec::new(
        TypeCode::NClob,
        "nclob (hana)",
        false,
        CodecKind::PrefetchNClob { threshold },
    ));
    // HANA's tinyint is unsigned
    codecs.register(TypeCodec::new(
        TypeCode::TinyInt,
        "smallint",
        false,
        CodecKind::Integral { bits: 16 },
    ));

    if unicode {
        for entry in UNICODE_COLUMN_TYPES {
            column_types.register(*entry);
        }
        for code in [TypeCode::Char, TypeCode::Varchar] {
            codecs.register(TypeCodec::new(code, "nvarchar", false, CodecKind::NVarchar));
        }
    }

    if settings.use_legacy_boolean_type {
        column_types.register(ColumnTypeEntry::unbounded(TypeCode::Boolean, "tinyint"));
        codecs.register(TypeCodec::new(
            TypeCode::Boolean,
            "tinyint boolean",
            false,
            CodecKind::NumericBoolean,
        ));
    }

    if settings.treat_double_typed_fields_as_decimal {
        for code in [TypeCode::Float, TypeCode::Real, TypeCode::Double] {
            codecs.register(TypeCodec::new(code, "decimal", false, CodecKind::Decimal));
        }
    }
}
