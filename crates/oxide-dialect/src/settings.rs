//! User-facing dialect configuration.
//!
//! Settings arrive either as flat string properties (the keys below) or as
//! a JSON document with the short field names. Unset fields fall back to the
//! dialect defaults when the dialect is contributed.

use serde::{Deserialize, Serialize};

use crate::error::{DialectError, Result};

/// Property key for the LOB prefetch threshold, in bytes.
pub const MAX_LOB_PREFETCH_SIZE: &str = "oxide.dialect.hana.max_lob_prefetch_size";
/// Property key selecting `tinyint` storage for booleans.
pub const USE_LEGACY_BOOLEAN_TYPE: &str = "oxide.dialect.hana.use_legacy_boolean_type";
/// Property key selecting national character types for all strings.
pub const USE_UNICODE_STRING_TYPES: &str = "oxide.dialect.hana.use_unicode_string_types";
/// Property key binding double-typed fields through the decimal codec.
pub const TREAT_DOUBLE_TYPED_FIELDS_AS_DECIMAL: &str =
    "oxide.dialect.hana.treat_double_typed_fields_as_decimal";
/// Property key overriding the `IN` list size limit.
pub const IN_EXPRESSION_COUNT_LIMIT: &str = "oxide.dialect.in_expression_count_limit";

/// Dialect settings supplied by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialectSettings {
    pub max_lob_prefetch_size: Option<u32>,
    pub use_legacy_boolean_type: Option<bool>,
    pub use_unicode_string_types: Option<bool>,
    pub treat_double_typed_fields_as_decimal: Option<bool>,
    pub in_expression_count_limit: Option<u32>,
}

impl DialectSettings {
    /// Parses flat properties. Keys outside the dialect namespace are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidSetting`] for unparseable values.
    pub fn from_properties<'a, I>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Self::default();
        for (key, value) in properties {
            match key {
                MAX_LOB_PREFETCH_SIZE => settings.max_lob_prefetch_size = Some(parse_u32(key, value)?),
                USE_LEGACY_BOOLEAN_TYPE => {
                    settings.use_legacy_boolean_type = Some(parse_bool(key, value)?);
                }
                USE_UNICODE_STRING_TYPES => {
                    settings.use_unicode_string_types = Some(parse_bool(key, value)?);
                }
                TREAT_DOUBLE_TYPED_FIELDS_AS_DECIMAL => {
                    settings.treat_double_typed_fields_as_decimal = Some(parse_bool(key, value)?);
                }
                IN_EXPRESSION_COUNT_LIMIT => {
                    settings.in_expression_count_limit = Some(parse_u32(key, value)?);
                }
                _ => {}
            }
        }
        Ok(settings)
    }

    /// Parses a JSON settings document.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::Settings`] when the document is malformed or
    /// names unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fields set in `other` replace those set here.
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        if other.max_lob_prefetch_size.is_some() {
            self.max_lob_prefetch_size = other.max_lob_prefetch_size;
        }
        if other.use_legacy_boolean_type.is_some() {
            self.use_legacy_boolean_type = other.use_legacy_boolean_type;
        }
        if other.use_unicode_string_types.is_some() {
            self.use_unicode_string_types = other.use_unicode_string_types;
        }
        if other.treat_double_typed_fields_as_decimal.is_some() {
            self.treat_double_typed_fields_as_decimal = other.treat_double_typed_fields_as_decimal;
        }
        if other.in_expression_count_limit.is_some() {
            self.in_expression_count_limit = other.in_expression_count_limit;
        }
        self
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> DialectError {
    DialectError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "expected a non-negative integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_properties() {
        let settings = DialectSettings::from_properties([
            (MAX_LOB_PREFETCH_SIZE, "2048"),
            (USE_UNICODE_STRING_TYPES, "TRUE"),
            ("unrelated.key", "whatever"),
        ])
        .unwrap();
        assert_eq!(settings.max_lob_prefetch_size, Some(2048));
        assert_eq!(settings.use_unicode_string_types, Some(true));
        assert_eq!(settings.use_legacy_boolean_type, None);
    }

    #[test]
    fn test_invalid_property_value() {
        let err = DialectSettings::from_properties([(USE_LEGACY_BOOLEAN_TYPE, "maybe")]).unwrap_err();
        assert!(matches!(err, DialectError::InvalidSetting { ref key, .. } if key == USE_LEGACY_BOOLEAN_TYPE));
        assert!(DialectSettings::from_properties([(MAX_LOB_PREFETCH_SIZE, "-1")]).is_err());
    }

    #[test]
    fn test_from_json() {
        let settings =
            DialectSettings::from_json(r#"{"treat_double_typed_fields_as_decimal": true}"#).unwrap();
        assert_eq!(settings.treat_double_typed_fields_as_decimal, Some(true));
        assert!(DialectSettings::from_json(r#"{"bogus": 1}"#).is_err());
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = DialectSettings {
            max_lob_prefetch_size: Some(1),
            use_legacy_boolean_type: Some(true),
            ..DialectSettings::default()
        };
        let merged = base.merge(&DialectSettings {
            max_lob_prefetch_size: Some(2),
            ..DialectSettings::default()
        });
        assert_eq!(merged.max_lob_prefetch_size, Some(2));
        assert_eq!(merged.use_legacy_boolean_type, Some(true));
    }
}
