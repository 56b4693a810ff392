//! Entity and embeddable descriptions consumed by result-set mappings.
//!
//! A [`Metamodel`] is built once, usually from types deriving `Entity`
//! with `oxide-native-derive`, and shared read-only by every query of an
//! engine.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use oxide_dialect::{MaterializedBlob, MaterializedClob, SqlValue, ToSqlValue, TypeCode};

use crate::error::{QueryError, Result};
use crate::results::FromResultValue;

/// Role name of an identifier that has no attribute of its own.
pub const ID_ROLE: &str = "{id}";

/// How an entity is identified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierMapping {
    /// One basic attribute mapped to one column.
    Basic {
        attribute: String,
        column: String,
        type_code: TypeCode,
    },
    /// One attribute holding an embeddable, one column per component.
    Embedded {
        attribute: String,
        embeddable: EmbeddableMapping,
    },
    /// Several identifier columns with no owning attribute.
    Virtual(EmbeddableMapping),
}

impl IdentifierMapping {
    /// The identifier attribute, if the entity declares one.
    #[must_use]
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Self::Basic { attribute, .. } | Self::Embedded { attribute, .. } => Some(attribute),
            Self::Virtual(_) => None,
        }
    }

    /// Name under which the identifier is addressed in a fetch path.
    #[must_use]
    pub fn role_name(&self) -> &str {
        self.attribute_name().unwrap_or(ID_ROLE)
    }

    /// Whether a fetch declared under `name` designates the identifier.
    #[must_use]
    pub fn is_addressed_by(&self, name: &str) -> bool {
        name == ID_ROLE || self.attribute_name() == Some(name)
    }

    /// Columns read for the identifier, in declaration order.
    #[must_use]
    pub fn columns(&self) -> Vec<(String, &str, TypeCode)> {
        match self {
            Self::Basic {
                attribute,
                column,
                type_code,
            } => vec![(attribute.clone(), column.as_str(), *type_code)],
            Self::Embedded { embeddable, .. } | Self::Virtual(embeddable) => {
                embeddable.basic_columns(None)
            }
        }
    }
}

/// A component type embedded in an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddableMapping {
    name: String,
    attributes: Vec<AttributeMapping>,
}

impl EmbeddableMapping {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_basic(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        type_code: TypeCode,
    ) -> Self {
        self.attributes.push(AttributeMapping::basic(name, column, type_code));
        self
    }

    #[must_use]
    pub fn with_embedded(mut self, name: impl Into<String>, embeddable: Self) -> Self {
        self.attributes.push(AttributeMapping {
            name: name.into(),
            kind: AttributeKind::Embedded(embeddable),
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attributes(&self) -> &[AttributeMapping] {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeMapping> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Flattened `(path, column, type)` triples of the basic components.
    fn basic_columns(&self, prefix: Option<&str>) -> Vec<(String, &str, TypeCode)> {
        let mut columns = Vec::new();
        for attribute in &self.attributes {
            let path = prefix.map_or_else(
                || attribute.name.clone(),
                |p| format!("{p}.{}", attribute.name),
            );
            match &attribute.kind {
                AttributeKind::Basic { column, type_code } => {
                    columns.push((path, column.as_str(), *type_code));
                }
                AttributeKind::Embedded(inner) => {
                    columns.extend(inner.basic_columns(Some(&path)));
                }
                AttributeKind::ToOne { .. } | AttributeKind::Collection { .. } => {}
            }
        }
        columns
    }
}

/// One persistent attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeMapping {
    pub name: String,
    pub kind: AttributeKind,
}

impl AttributeMapping {
    fn basic(name: impl Into<String>, column: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Basic {
                column: column.into(),
                type_code,
            },
        }
    }
}

/// The shape of an attribute's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Basic { column: String, type_code: TypeCode },
    Embedded(EmbeddableMapping),
    /// A single-valued association stored as a foreign key column.
    ToOne { target: String, column: String },
    /// A plural association; never read from a native result set.
    Collection { target: String },
}

impl AttributeKind {
    #[must_use]
    pub const fn is_association(&self) -> bool {
        matches!(self, Self::ToOne { .. } | Self::Collection { .. })
    }
}

/// Mapping of one entity type to a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityMapping {
    name: String,
    table: String,
    identifier: IdentifierMapping,
    attributes: Vec<AttributeMapping>,
}

impl EntityMapping {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        identifier: IdentifierMapping,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identifier,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_basic(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        type_code: TypeCode,
    ) -> Self {
        self.attributes.push(AttributeMapping::basic(name, column, type_code));
        self
    }

    #[must_use]
    pub fn with_embedded(mut self, name: impl Into<String>, embeddable: EmbeddableMapping) -> Self {
        self.attributes.push(AttributeMapping {
            name: name.into(),
            kind: AttributeKind::Embedded(embeddable),
        });
        self
    }

    #[must_use]
    pub fn with_to_one(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.attributes.push(AttributeMapping {
            name: name.into(),
            kind: AttributeKind::ToOne {
                target: target.into(),
                column: column.into(),
            },
        });
        self
    }

    #[must_use]
    pub fn with_collection(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.attributes.push(AttributeMapping {
            name: name.into(),
            kind: AttributeKind::Collection {
                target: target.into(),
            },
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity name without any module qualifier.
    #[must_use]
    pub fn unqualified_name(&self) -> &str {
        unqualify(&self.name)
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn identifier(&self) -> &IdentifierMapping {
        &self.identifier
    }

    /// Non-identifier attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeMapping] {
        &self.attributes
    }

    /// Looks up a non-identifier attribute.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownAttribute`] when the entity has no such
    /// attribute.
    pub fn attribute(&self, name: &str) -> Result<&AttributeMapping> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| QueryError::UnknownAttribute {
                entity: self.name.clone(),
                attribute: name.to_string(),
            })
    }
}

fn unqualify(name: &str) -> &str {
    let tail = name.rsplit("::").next().unwrap_or(name);
    tail.rsplit('.').next().unwrap_or(tail)
}

/// The set of known entities.
#[derive(Debug, Clone, Default)]
pub struct Metamodel {
    entities: HashMap<String, Arc<EntityMapping>>,
}

impl Metamodel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity; a later registration under the same name wins.
    pub fn register(&mut self, mapping: EntityMapping) -> Arc<EntityMapping> {
        let mapping = Arc::new(mapping);
        self.entities
            .insert(mapping.name().to_string(), Arc::clone(&mapping));
        mapping
    }

    pub fn register_entity<E: Entity>(&mut self) -> Arc<EntityMapping> {
        self.register(E::entity_mapping())
    }

    #[must_use]
    pub fn with_entity<E: Entity>(mut self) -> Self {
        self.register_entity::<E>();
        self
    }

    /// Finds an entity by its full or unqualified name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownEntity`] when nothing matches.
    pub fn entity(&self, name: &str) -> Result<Arc<EntityMapping>> {
        if let Some(mapping) = self.entities.get(name) {
            return Ok(Arc::clone(mapping));
        }
        let short = unqualify(name);
        self.entities
            .values()
            .find(|m| m.unqualified_name() == short)
            .cloned()
            .ok_or_else(|| QueryError::UnknownEntity(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entity(name).is_ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// A type stored as an entity.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Entity)]
/// #[entity(table = "books")]
/// struct Book {
///     #[id]
///     id: i64,
///     title: String,
///     #[to_one(column = "author_id")]
///     author: Option<Author>,
/// }
/// ```
pub trait Entity: FromResultValue {
    /// Name used by mappings and `add_entity`.
    const ENTITY_NAME: &'static str;

    fn entity_mapping() -> EntityMapping;
}

/// A type embedded in an entity as a group of columns.
pub trait Embeddable: FromResultValue {
    fn embeddable_mapping() -> EmbeddableMapping;
}

/// Rust field types with a fixed column type code.
pub trait FieldType {
    const TYPE_CODE: TypeCode;
}

macro_rules! field_types {
    ($($ty:ty => $code:ident),* $(,)?) => {
        $(impl FieldType for $ty {
            const TYPE_CODE: TypeCode = TypeCode::$code;
        })*
    };
}

field_types! {
    bool => Boolean,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    String => Varchar,
    Vec<u8> => Varbinary,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    MaterializedBlob => Blob,
    MaterializedClob => Clob,
}

impl<T: FieldType> FieldType for Option<T> {
    const TYPE_CODE: TypeCode = T::TYPE_CODE;
}

/// Converts an attribute between its domain type and a column type.
///
/// ```ignore
/// struct UpperCase;
///
/// impl AttributeConverter for UpperCase {
///     type Domain = String;
///     type Relational = String;
///
///     fn to_database(value: &String) -> String {
///         value.to_lowercase()
///     }
///
///     fn to_domain(value: String) -> Result<String, String> {
///         Ok(value.to_uppercase())
///     }
/// }
/// ```
pub trait AttributeConverter {
    type Domain;
    type Relational: FieldType + FromResultValue + ToSqlValue;

    fn to_database(value: &Self::Domain) -> Self::Relational;

    /// # Errors
    ///
    /// Returns a message when the column value has no domain counterpart.
    fn to_domain(value: Self::Relational) -> std::result::Result<Self::Domain, String>;
}

/// Binds a domain value through its converter.
pub fn convert_to_database<C: AttributeConverter>(value: &C::Domain) -> SqlValue {
    C::to_database(value).to_sql_value()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> EntityMapping {
        EntityMapping::new(
            "library::Author",
            "authors",
            IdentifierMapping::Basic {
                attribute: "id".to_string(),
                column: "id".to_string(),
                type_code: TypeCode::BigInt,
            },
        )
        .with_basic("name", "name", TypeCode::Varchar)
        .with_collection("books", "Book")
    }

    #[test]
    fn test_lookup_by_unqualified_name() {
        let mut metamodel = Metamodel::new();
        metamodel.register(author());
        assert_eq!(metamodel.entity("Author").unwrap().table(), "authors");
        assert_eq!(
            metamodel.entity("library::Author").unwrap().unqualified_name(),
            "Author"
        );
        assert!(matches!(
            metamodel.entity("Book"),
            Err(QueryError::UnknownEntity(name)) if name == "Book"
        ));
    }

    #[test]
    fn test_identifier_addressing() {
        let basic = author().identifier().clone();
        assert!(basic.is_addressed_by("id"));
        assert!(basic.is_addressed_by(ID_ROLE));
        assert!(!basic.is_addressed_by("name"));
        assert_eq!(basic.role_name(), "id");

        let virtual_id = IdentifierMapping::Virtual(
            EmbeddableMapping::new("OrderLineId")
                .with_basic("order", "order_id", TypeCode::BigInt)
                .with_basic("line", "line_no", TypeCode::Integer),
        );
        assert_eq!(virtual_id.role_name(), ID_ROLE);
        assert_eq!(virtual_id.attribute_name(), None);
        let columns: Vec<&str> = virtual_id.columns().iter().map(|c| c.1).collect();
        assert_eq!(columns, vec!["order_id", "line_no"]);
    }

    #[test]
    fn test_nested_embeddable_columns() {
        let id = IdentifierMapping::Embedded {
            attribute: "key".to_string(),
            embeddable: EmbeddableMapping::new("Key")
                .with_basic("region", "region", TypeCode::Varchar)
                .with_embedded(
                    "code",
                    EmbeddableMapping::new("Code").with_basic("value", "code", TypeCode::Integer),
                ),
        };
        let paths: Vec<String> = id.columns().into_iter().map(|c| c.0).collect();
        assert_eq!(paths, vec!["region", "code.value"]);
    }

    #[test]
    fn test_unknown_attribute() {
        let mapping = author();
        assert!(mapping.attribute("name").is_ok());
        assert!(mapping.attribute("books").unwrap().kind.is_association());
        assert!(matches!(
            mapping.attribute("age"),
            Err(QueryError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_field_type_codes() {
        assert_eq!(<Option<i32> as FieldType>::TYPE_CODE, TypeCode::Integer);
        assert_eq!(<MaterializedClob as FieldType>::TYPE_CODE, TypeCode::Clob);
    }
}
