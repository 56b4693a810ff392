//! Settings layering and snapshot behavior of the HANA dialects.

mod common;

use common::{column_type, hana, hana_with};
use oxide_dialect::{
    Binding, Dialect, DialectSettings, MaterializedClob, Product, SqlValue, TypeCode,
    WrapperOptions,
};

#[test]
fn test_length_threshold_switches_to_lob() {
    let dialect = hana();
    assert_eq!(column_type(&dialect, TypeCode::Varchar, Some(5000)), "varchar(5000)");
    assert_eq!(column_type(&dialect, TypeCode::Varchar, Some(5001)), "clob");
    assert_eq!(column_type(&dialect, TypeCode::Varbinary, Some(5001)), "blob");
    assert_eq!(column_type(&dialect, TypeCode::NVarchar, Some(5001)), "nclob");
}

#[test]
fn test_column_types_are_idempotent() {
    let dialect = hana();
    for code in TypeCode::ALL {
        let first = dialect.column_type(code, Some(42), Some(10), Some(3)).unwrap();
        let second = dialect.column_type(code, Some(42), Some(10), Some(3)).unwrap();
        assert_eq!(first, second, "{code}");
    }
}

#[test]
fn test_unicode_switches_string_types() {
    let dialect = hana_with(&[("oxide.dialect.hana.use_unicode_string_types", "true")]);
    assert_eq!(column_type(&dialect, TypeCode::Varchar, Some(10)), "nvarchar(10)");
    assert_eq!(column_type(&dialect, TypeCode::Clob, None), "nclob");
    assert_eq!(dialect.codec(TypeCode::Varchar).name(), "nvarchar");
}

#[test]
fn test_hana_cloud_is_always_unicode() {
    let settings = DialectSettings::from_properties([(
        "oxide.dialect.hana.use_unicode_string_types",
        "false",
    )])
    .unwrap();
    let cloud = Dialect::configured(Product::HanaCloud, &settings);
    assert!(cloud.settings().use_unicode_string_types);
    assert_eq!(column_type(&cloud, TypeCode::Varchar, Some(10)), "nvarchar(10)");
}

#[test]
fn test_invalid_setting_is_rejected() {
    let err = DialectSettings::from_properties([(
        "oxide.dialect.hana.max_lob_prefetch_size",
        "lots",
    )])
    .unwrap_err();
    assert!(err.to_string().contains("max_lob_prefetch_size"));
}

#[test]
fn test_json_settings_match_properties() {
    let json = DialectSettings::from_json(r#"{"use_legacy_boolean_type": true}"#).unwrap();
    let props = DialectSettings::from_properties([(
        "oxide.dialect.hana.use_legacy_boolean_type",
        "true",
    )])
    .unwrap();
    assert_eq!(json, props);
}

#[test]
fn test_materialized_clob_binds_as_stream() {
    let dialect = hana();
    let value = SqlValue::Clob(oxide_dialect::ClobValue::Materialized(MaterializedClob::new(
        "hello".to_string(),
    )));
    let binding = dialect
        .codec(TypeCode::Clob)
        .bind(&value, &WrapperOptions::default())
        .unwrap();
    assert!(matches!(
        binding,
        Binding::CharacterStream {
            close_suppressed: true,
            ..
        }
    ));
}
