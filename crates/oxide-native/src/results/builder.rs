//! Declarative result and fetch builders.
//!
//! Builders only name things: aliases, attribute paths and column labels.
//! They are checked against the metamodel when a [`ResultSetMapping`] is
//! resolved.
//!
//! [`ResultSetMapping`]: super::ResultSetMapping

use std::sync::Arc;

use oxide_dialect::{LockMode, TypeCode};

use super::typed::ResultShape;

/// Explicit column labels for one attribute path of an entity.
///
/// Shared by reference so a resolved mapping can hand back the exact
/// builder it promoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyFetch {
    /// Dotted attribute path relative to the owning entity.
    pub path: String,
    /// Column labels, one per column of the attribute.
    pub columns: Vec<String>,
}

impl PropertyFetch {
    /// Last segment of the path.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
}

fn push_property(fetches: &mut Vec<Arc<PropertyFetch>>, path: &str, columns: &[&str]) {
    let columns = columns.iter().map(ToString::to_string).collect();
    match fetches.iter_mut().find(|f| f.path == path) {
        Some(existing) => {
            *existing = Arc::new(PropertyFetch {
                path: path.to_string(),
                columns,
            });
        }
        None => fetches.push(Arc::new(PropertyFetch {
            path: path.to_string(),
            columns,
        })),
    }
}

/// An entity result read under a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootBuilder {
    pub(crate) entity: String,
    pub(crate) alias: String,
    pub(crate) lock_mode: Option<LockMode>,
    pub(crate) fetches: Vec<Arc<PropertyFetch>>,
}

impl RootBuilder {
    pub(crate) fn new(alias: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            alias: alias.into(),
            lock_mode: None,
            fetches: Vec::new(),
        }
    }

    /// Reads `path` from the given column; a later call for the same path
    /// replaces the earlier one.
    pub fn add_property(&mut self, path: &str, column: &str) -> &mut Self {
        push_property(&mut self.fetches, path, &[column]);
        self
    }

    /// Reads a multi-column attribute such as an embedded identifier.
    pub fn add_property_columns(&mut self, path: &str, columns: &[&str]) -> &mut Self {
        push_property(&mut self.fetches, path, columns);
        self
    }

    /// Labels the identifier columns explicitly.
    pub fn add_id_column_aliases(&mut self, columns: &[&str]) -> &mut Self {
        push_property(&mut self.fetches, crate::metamodel::ID_ROLE, columns);
        self
    }

    pub fn set_lock_mode(&mut self, mode: LockMode) -> &mut Self {
        self.lock_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[must_use]
    pub const fn lock_mode(&self) -> Option<LockMode> {
        self.lock_mode
    }

    /// Explicit fetches in declaration order.
    #[must_use]
    pub fn fetches(&self) -> &[Arc<PropertyFetch>] {
        &self.fetches
    }
}

/// A to-one association fetched under its own alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinBuilder {
    pub(crate) alias: String,
    pub(crate) owner_alias: String,
    pub(crate) property: String,
    pub(crate) lock_mode: Option<LockMode>,
    pub(crate) fetches: Vec<Arc<PropertyFetch>>,
}

impl JoinBuilder {
    pub(crate) fn new(
        alias: impl Into<String>,
        owner_alias: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            owner_alias: owner_alias.into(),
            property: property.into(),
            lock_mode: None,
            fetches: Vec::new(),
        }
    }

    pub fn add_property(&mut self, path: &str, column: &str) -> &mut Self {
        push_property(&mut self.fetches, path, &[column]);
        self
    }

    pub fn add_property_columns(&mut self, path: &str, columns: &[&str]) -> &mut Self {
        push_property(&mut self.fetches, path, columns);
        self
    }

    pub fn set_lock_mode(&mut self, mode: LockMode) -> &mut Self {
        self.lock_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[must_use]
    pub fn owner_alias(&self) -> &str {
        &self.owner_alias
    }

    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[must_use]
    pub fn fetches(&self) -> &[Arc<PropertyFetch>] {
        &self.fetches
    }
}

/// One argument of an instantiation result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstantiationArgument {
    pub column: String,
    pub type_code: Option<TypeCode>,
    /// Name the argument is known by, if any.
    pub alias: Option<String>,
}

/// One result of each row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultBuilder {
    /// A single column.
    Scalar {
        column: String,
        type_code: Option<TypeCode>,
    },
    /// An entity, with its identifier and attributes.
    Entity(RootBuilder),
    /// Several columns handed to a constructor.
    Instantiation {
        target: String,
        arguments: Vec<InstantiationArgument>,
    },
    /// A column read with the type of an entity attribute.
    Attribute {
        entity: String,
        path: String,
        column: String,
    },
}

impl ResultBuilder {
    /// Alias the result is selected under, used for tuple elements.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Scalar { column, .. } | Self::Attribute { column, .. } => Some(column),
            Self::Entity(root) => Some(&root.alias),
            Self::Instantiation { .. } => None,
        }
    }

    /// Declared shape; an attribute result's type is only known after
    /// resolution.
    #[must_use]
    pub fn shape(&self) -> ResultShape {
        match self {
            Self::Scalar { type_code, .. } => ResultShape::Scalar(*type_code),
            Self::Entity(root) => ResultShape::Entity(root.entity.clone()),
            Self::Instantiation { target, .. } => ResultShape::Instantiation(target.clone()),
            Self::Attribute { .. } => ResultShape::Scalar(None),
        }
    }
}
