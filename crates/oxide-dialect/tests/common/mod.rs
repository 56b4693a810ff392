#![allow(dead_code)]

use oxide_dialect::{Dialect, DialectSettings, Product, TypeCode};

pub fn hana() -> Dialect {
    Dialect::new(Product::Hana)
}

pub fn hana_with(properties: &[(&str, &str)]) -> Dialect {
    let settings = DialectSettings::from_properties(properties.iter().copied())
        .unwrap_or_else(|e| panic!("Invalid properties {properties:?}: {e}"));
    Dialect::configured(Product::Hana, &settings)
}

pub fn column_type(dialect: &Dialect, code: TypeCode, length: Option<u32>) -> String {
    dialect
        .column_type(code, length, None, None)
        .unwrap_or_else(|e| panic!("No column type for {code}: {e}"))
}
