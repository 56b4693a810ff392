//! Identifier casing, keywords and quoting.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// How a product folds identifier case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseStrategy {
    Upper,
    Lower,
    Mixed,
}

/// Casing applied to quoted and unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierCasing {
    pub unquoted: CaseStrategy,
    pub quoted: CaseStrategy,
}

/// A normalized identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub text: String,
    pub quoted: bool,
}

impl Identifier {
    /// Renders the identifier for use in SQL.
    #[must_use]
    pub fn render(&self) -> String {
        if self.quoted {
            quote(&self.text)
        } else {
            self.text.clone()
        }
    }
}

static PLAIN_WORD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").ok());

fn is_plain_word(text: &str) -> bool {
    PLAIN_WORD.as_ref().map_or_else(
        || text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        |re| re.is_match(text),
    ) && !text.is_empty()
}

/// Wraps `text` in double quotes, doubling embedded quotes.
#[must_use]
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Returns the unquoted text when `text` is already quoted.
#[must_use]
pub fn unquote(text: &str) -> Option<String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| text.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')))?;
    Some(inner.replace("\"\"", "\""))
}

/// Reserved words plus casing rules for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierHelper {
    casing: IdentifierCasing,
    reserved: HashSet<String>,
}

impl IdentifierHelper {
    #[must_use]
    pub fn new(casing: IdentifierCasing, keyword_lists: &[&[&str]]) -> Self {
        let reserved = keyword_lists
            .iter()
            .flat_map(|list| list.iter())
            .map(|word| word.to_ascii_lowercase())
            .collect();
        Self { casing, reserved }
    }

    #[must_use]
    pub const fn casing(&self) -> IdentifierCasing {
        self.casing
    }

    #[must_use]
    pub fn is_reserved_word(&self, word: &str) -> bool {
        self.reserved.contains(&word.to_ascii_lowercase())
    }

    #[must_use]
    pub fn reserved_word_count(&self) -> usize {
        self.reserved.len()
    }

    /// Whether `text` must be quoted to survive as written: it is reserved,
    /// is not a plain word, or mixes case under a folding strategy.
    #[must_use]
    pub fn needs_quoting(&self, text: &str) -> bool {
        if unquote(text).is_some() {
            return false;
        }
        if !is_plain_word(text) || self.is_reserved_word(text) {
            return true;
        }
        match self.casing.unquoted {
            CaseStrategy::Mixed => false,
            CaseStrategy::Upper | CaseStrategy::Lower => {
                text.chars().any(char::is_uppercase) && text.chars().any(char::is_lowercase)
            }
        }
    }

    /// Normalizes `text` into an [`Identifier`], quoting automatically.
    #[must_use]
    pub fn to_identifier(&self, text: &str) -> Identifier {
        if let Some(inner) = unquote(text) {
            return Identifier {
                text: inner,
                quoted: true,
            };
        }
        Identifier {
            text: text.to_string(),
            quoted: self.needs_quoting(text),
        }
    }

    /// The name as stored in the catalog: unquoted names are folded.
    #[must_use]
    pub fn to_metadata_name(&self, identifier: &Identifier) -> String {
        let strategy = if identifier.quoted {
            self.casing.quoted
        } else {
            self.casing.unquoted
        };
        match strategy {
            CaseStrategy::Upper => identifier.text.to_uppercase(),
            CaseStrategy::Lower => identifier.text.to_lowercase(),
            CaseStrategy::Mixed => identifier.text.clone(),
        }
    }
}

/// SQL:2003 reserved words.
pub const SQL_2003_KEYWORDS: &[&str] = &[
    "add", "all", "allocate", "alter", "and", "any", "are", "array", "as", "asensitive",
    "asymmetric", "at", "atomic", "authorization", "begin", "between", "bigint", "binary",
    "blob", "boolean", "both", "by", "call", "called", "cascaded", "case", "cast", "char",
    "character", "check", "clob", "close", "collate", "column", "commit", "condition",
    "connect", "constraint", "continue", "corresponding", "create", "cross", "cube",
    "current", "current_date", "current_default_transform_group", "current_path",
    "current_role", "current_time", "current_timestamp", "current_transform_group_for_type",
    "current_user", "cursor", "cycle", "date", "day", "deallocate", "dec", "decimal",
    "declare", "default", "delete", "deref", "describe", "deterministic", "disconnect",
    "distinct", "do", "double", "drop", "dynamic", "each", "element", "else", "elseif",
    "end", "escape", "except", "exec", "execute", "exists", "exit", "external", "false",
    "fetch", "filter", "float", "for", "foreign", "free", "from", "full", "function", "get",
    "global", "grant", "group", "grouping", "handler", "having", "hold", "hour", "identity",
    "if", "immediate", "in", "indicator", "inner", "inout", "input", "insensitive", "insert",
    "int", "integer", "intersect", "interval", "into", "is", "iterate", "join", "language",
    "large", "lateral", "leading", "leave", "left", "like", "local", "localtime",
    "localtimestamp", "loop", "match", "member", "merge", "method", "minute", "modifies",
    "module", "month", "multiset", "national", "natural", "nchar", "nclob", "new", "no",
    "none", "not", "null", "numeric", "of", "old", "on", "only", "open", "or", "order",
    "out", "outer", "output", "over", "overlaps", "parameter", "partition", "precision",
    "prepare", "primary", "procedure", "range", "reads", "real", "recursive", "ref",
    "references", "referencing", "release", "repeat", "resignal", "result", "return",
    "returns", "revoke", "right", "rollback", "rollup", "row", "rows", "savepoint", "scroll",
    "search", "second", "select", "sensitive", "session_user", "set", "signal", "similar",
    "smallint", "some", "specific", "specifictype", "sql", "sqlexception", "sqlstate",
    "sqlwarning", "start", "static", "submultiset", "symmetric", "system", "system_user",
    "table", "tablesample", "then", "time", "timestamp", "timezone_hour", "timezone_minute",
    "to", "trailing", "translation", "treat", "trigger", "true", "undo", "union", "unique",
    "unknown", "unnest", "until", "update", "user", "using", "value", "values", "varchar",
    "varying", "when", "whenever", "where", "while", "window", "with", "within", "without",
    "year",
];
