//! Result-set mappings and their resolution against the metamodel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use oxide_dialect::{LockMode, TypeCode};
use tracing::trace;

use super::builder::{InstantiationArgument, JoinBuilder, PropertyFetch, ResultBuilder, RootBuilder};
use super::typed::ResultShape;
use crate::error::{QueryError, Result};
use crate::metamodel::{
    AttributeKind, AttributeMapping, EmbeddableMapping, EntityMapping, IdentifierMapping, Metamodel,
};

/// Declared results and fetches of a native query.
///
/// Equality and hashing are structural, so two mappings built the same way
/// share cached plans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResultSetMapping {
    name: Option<String>,
    results: Vec<ResultBuilder>,
    joins: Vec<JoinBuilder>,
}

impl ResultSetMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping registered under `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn results(&self) -> &[ResultBuilder] {
        &self.results
    }

    #[must_use]
    pub fn joins(&self) -> &[JoinBuilder] {
        &self.joins
    }

    #[must_use]
    pub fn number_of_results(&self) -> usize {
        self.results.len()
    }

    pub fn add_result(&mut self, builder: ResultBuilder) -> &mut Self {
        self.results.push(builder);
        self
    }

    pub fn add_scalar(&mut self, column: &str, type_code: Option<TypeCode>) -> &mut Self {
        self.add_result(ResultBuilder::Scalar {
            column: column.to_string(),
            type_code,
        })
    }

    /// Adds an entity result and returns it for further configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DuplicateAlias`] when `alias` is taken.
    pub fn add_root(&mut self, alias: &str, entity: &str) -> Result<&mut RootBuilder> {
        self.check_alias_free(alias)?;
        self.results
            .push(ResultBuilder::Entity(RootBuilder::new(alias, entity)));
        self.root_mut(alias)
    }

    /// Adds a to-one fetch of `owner_alias.property` under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DuplicateAlias`] when `alias` is taken.
    pub fn add_join(
        &mut self,
        alias: &str,
        owner_alias: &str,
        property: &str,
    ) -> Result<&mut JoinBuilder> {
        self.check_alias_free(alias)?;
        self.joins.push(JoinBuilder::new(alias, owner_alias, property));
        self.join_mut(alias)
    }

    /// # Errors
    ///
    /// Returns [`QueryError::UnknownAlias`] when no root uses `alias`.
    pub fn root_mut(&mut self, alias: &str) -> Result<&mut RootBuilder> {
        self.results
            .iter_mut()
            .find_map(|r| match r {
                ResultBuilder::Entity(root) if root.alias == alias => Some(root),
                _ => None,
            })
            .ok_or_else(|| QueryError::UnknownAlias(alias.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`QueryError::UnknownAlias`] when no join uses `alias`.
    pub fn join_mut(&mut self, alias: &str) -> Result<&mut JoinBuilder> {
        self.joins
            .iter_mut()
            .find(|j| j.alias == alias)
            .ok_or_else(|| QueryError::UnknownAlias(alias.to_string()))
    }

    fn check_alias_free(&self, alias: &str) -> Result<()> {
        let taken = self.results.iter().any(|r| match r {
            ResultBuilder::Entity(root) => root.alias == alias,
            _ => false,
        }) || self.joins.iter().any(|j| j.alias == alias);
        if taken {
            Err(QueryError::DuplicateAlias(alias.to_string()))
        } else {
            Ok(())
        }
    }

    /// Links every builder to the metamodel.
    ///
    /// # Errors
    ///
    /// Fails on unknown entities, attributes or aliases, joins on
    /// attributes that are not associations, duplicate aliases, and
    /// [`QueryError::NotYetImplemented`] for to-one attributes without a
    /// join and for collection fetches.
    pub fn resolve(&self, metamodel: &Metamodel) -> Result<ResolvedMapping> {
        Resolver::new(self, metamodel)?.run()
    }
}

/// Candidate labels of one result-set column, tried in order, ignoring
/// case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    candidates: Vec<String>,
}

impl ColumnRef {
    /// A column with exactly this label.
    #[must_use]
    pub fn exact(label: &str) -> Self {
        Self {
            candidates: vec![label.to_string()],
        }
    }

    /// An entity column: `{alias}_{column}` first, then the bare column.
    fn implicit(alias: &str, column: &str) -> Self {
        Self {
            candidates: vec![format!("{alias}_{column}"), column.to_string()],
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Label used in error messages.
    #[must_use]
    pub fn label(&self) -> &str {
        self.candidates.last().map_or("", String::as_str)
    }
}

/// How to read one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarRead {
    pub column: ColumnRef,
    /// Codec selection; `None` reads the driver's natural type.
    pub type_code: Option<TypeCode>,
}

/// How to read an attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRead {
    Basic(ScalarRead),
    Composite {
        name: String,
        parts: Vec<(String, ValueRead)>,
    },
    /// A joined to-one association.
    Entity(Box<EntityRead>),
    /// A plural association; left unloaded.
    Unloaded,
}

/// Where an identifier read came from.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifierSource {
    /// A declared fetch promoted to identifier.
    Explicit(Arc<PropertyFetch>),
    /// Derived from the entity's identifier mapping.
    Implicit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierRead {
    pub source: IdentifierSource,
    pub value: ValueRead,
}

/// One non-identifier attribute of an entity read.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRead {
    pub attribute: String,
    /// The declared fetch this read came from, if any.
    pub source: Option<Arc<PropertyFetch>>,
    pub value: ValueRead,
}

/// How to read one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRead {
    pub entity: Arc<EntityMapping>,
    pub alias: String,
    pub lock_mode: Option<LockMode>,
    pub identifier: IdentifierRead,
    pub fetches: Vec<FetchRead>,
}

impl EntityRead {
    #[must_use]
    pub fn fetch(&self, attribute: &str) -> Option<&FetchRead> {
        self.fetches.iter().find(|f| f.attribute == attribute)
    }
}

/// One resolved result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedResult {
    Scalar(ScalarRead),
    Entity(EntityRead),
    Instantiation {
        target: String,
        arguments: Vec<ScalarRead>,
    },
}

impl ResolvedResult {
    #[must_use]
    pub fn shape(&self) -> ResultShape {
        match self {
            Self::Scalar(read) => ResultShape::Scalar(read.type_code),
            Self::Entity(read) => ResultShape::Entity(read.entity.name().to_string()),
            Self::Instantiation { target, .. } => ResultShape::Instantiation(target.clone()),
        }
    }
}

/// A mapping linked to the metamodel; immutable and shareable.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMapping {
    results: Vec<ResolvedResult>,
    aliases: Vec<Option<String>>,
}

impl ResolvedMapping {
    #[must_use]
    pub fn results(&self) -> &[ResolvedResult] {
        &self.results
    }

    /// Tuple alias of each result.
    #[must_use]
    pub fn aliases(&self) -> &[Option<String>] {
        &self.aliases
    }

    #[must_use]
    pub fn shapes(&self) -> Vec<ResultShape> {
        self.results.iter().map(ResolvedResult::shape).collect()
    }

    /// No declared results: every column is read as a scalar.
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.results.is_empty()
    }

    /// Row-lock modes declared per alias.
    #[must_use]
    pub fn lock_modes(&self) -> Vec<(&str, LockMode)> {
        let mut modes = Vec::new();
        for result in &self.results {
            if let ResolvedResult::Entity(read) = result {
                collect_lock_modes(read, &mut modes);
            }
        }
        modes
    }
}

fn collect_lock_modes<'a>(read: &'a EntityRead, modes: &mut Vec<(&'a str, LockMode)>) {
    if let Some(mode) = read.lock_mode {
        modes.push((&read.alias, mode));
    }
    for fetch in &read.fetches {
        if let ValueRead::Entity(joined) = &fetch.value {
            collect_lock_modes(joined, modes);
        }
    }
}

struct Resolver<'m> {
    mapping: &'m ResultSetMapping,
    metamodel: &'m Metamodel,
    /// Joins by owner alias.
    joins_by_owner: HashMap<&'m str, Vec<&'m JoinBuilder>>,
    consumed: HashSet<&'m str>,
}

impl<'m> Resolver<'m> {
    fn new(mapping: &'m ResultSetMapping, metamodel: &'m Metamodel) -> Result<Self> {
        let mut seen = HashSet::new();
        let aliases = mapping
            .results
            .iter()
            .filter_map(|r| match r {
                ResultBuilder::Entity(root) => Some(root.alias.as_str()),
                _ => None,
            })
            .chain(mapping.joins.iter().map(|j| j.alias.as_str()));
        for alias in aliases {
            if !seen.insert(alias) {
                return Err(QueryError::DuplicateAlias(alias.to_string()));
            }
        }

        let mut joins_by_owner: HashMap<&str, Vec<&JoinBuilder>> = HashMap::new();
        for join in &mapping.joins {
            if !seen.contains(join.owner_alias.as_str()) {
                return Err(QueryError::UnknownAlias(join.owner_alias.clone()));
            }
            joins_by_owner
                .entry(join.owner_alias.as_str())
                .or_default()
                .push(join);
        }

        Ok(Self {
            mapping,
            metamodel,
            joins_by_owner,
            consumed: HashSet::new(),
        })
    }

    fn run(mut self) -> Result<ResolvedMapping> {
        let mapping = self.mapping;
        let mut results = Vec::with_capacity(mapping.results.len());
        let mut aliases = Vec::with_capacity(mapping.results.len());
        for builder in &mapping.results {
            aliases.push(builder.alias().map(str::to_string));
            results.push(self.resolve_result(builder)?);
        }

        // a join reachable from no root names an alias that never resolves
        if let Some(join) = self
            .mapping
            .joins
            .iter()
            .find(|j| !self.consumed.contains(j.alias.as_str()))
        {
            return Err(QueryError::UnknownAlias(join.owner_alias.clone()));
        }

        trace!(
            mapping = self.mapping.name.as_deref().unwrap_or("<dynamic>"),
            results = results.len(),
            "Resolved result set mapping"
        );
        Ok(ResolvedMapping { results, aliases })
    }

    fn resolve_result(&mut self, builder: &'m ResultBuilder) -> Result<ResolvedResult> {
        match builder {
            ResultBuilder::Scalar { column, type_code } => Ok(ResolvedResult::Scalar(ScalarRead {
                column: ColumnRef::exact(column),
                type_code: *type_code,
            })),
            ResultBuilder::Entity(root) => {
                let entity = self.metamodel.entity(&root.entity)?;
                let read = self.entity_read(entity, &root.alias, root.lock_mode, &root.fetches)?;
                Ok(ResolvedResult::Entity(read))
            }
            ResultBuilder::Instantiation { target, arguments } => {
                Ok(ResolvedResult::Instantiation {
                    target: target.clone(),
                    arguments: arguments.iter().map(instantiation_argument).collect(),
                })
            }
            ResultBuilder::Attribute {
                entity,
                path,
                column,
            } => {
                let mapping = self.metamodel.entity(entity)?;
                let type_code = basic_type_at(&mapping, path)?;
                Ok(ResolvedResult::Scalar(ScalarRead {
                    column: ColumnRef::exact(column),
                    type_code: Some(type_code),
                }))
            }
        }
    }

    fn entity_read(
        &mut self,
        entity: Arc<EntityMapping>,
        alias: &str,
        lock_mode: Option<LockMode>,
        declared: &[Arc<PropertyFetch>],
    ) -> Result<EntityRead> {
        let identifier_mapping = entity.identifier();
        let mut fetches: Vec<Arc<PropertyFetch>> = declared.to_vec();

        // a declared identifier fetch becomes the identifier; never also a fetch
        let promoted = fetches
            .iter()
            .position(|f| identifier_mapping.is_addressed_by(&f.path))
            .map(|i| fetches.remove(i));

        let role = identifier_mapping.role_name().to_string();
        let (component_fetches, plain): (Vec<_>, Vec<_>) = fetches
            .into_iter()
            .partition(|f| f.path.starts_with(&format!("{role}.")));

        let identifier = IdentifierRead {
            value: identifier_value(identifier_mapping, alias, promoted.as_deref(), &component_fetches),
            source: promoted.map_or(IdentifierSource::Implicit, IdentifierSource::Explicit),
        };

        for fetch in &plain {
            let head = fetch.path.split('.').next().unwrap_or(&fetch.path);
            entity.attribute(head)?;
        }
        if let Some(joins) = self.joins_by_owner.get(alias) {
            for join in joins {
                if !entity.attribute(&join.property)?.kind.is_association() {
                    return Err(QueryError::NotAnAssociation {
                        entity: entity.name().to_string(),
                        attribute: join.property.clone(),
                    });
                }
            }
        }

        let mut reads = Vec::with_capacity(entity.attributes().len());
        for attribute in entity.attributes() {
            reads.push(self.fetch_read(&entity, alias, attribute, &plain)?);
        }

        Ok(EntityRead {
            entity,
            alias: alias.to_string(),
            lock_mode,
            identifier,
            fetches: reads,
        })
    }

    fn fetch_read(
        &mut self,
        entity: &EntityMapping,
        alias: &str,
        attribute: &AttributeMapping,
        declared: &[Arc<PropertyFetch>],
    ) -> Result<FetchRead> {
        let explicit = declared.iter().find(|f| f.path == attribute.name).cloned();
        let value = match &attribute.kind {
            AttributeKind::Basic { column, type_code } => ValueRead::Basic(ScalarRead {
                column: explicit
                    .as_ref()
                    .and_then(|f| f.columns.first())
                    .map_or_else(|| ColumnRef::implicit(alias, column), |c| ColumnRef::exact(c)),
                type_code: Some(*type_code),
            }),
            AttributeKind::Embedded(embeddable) => {
                let nested: Vec<&PropertyFetch> = declared
                    .iter()
                    .filter(|f| f.path.starts_with(&format!("{}.", attribute.name)))
                    .map(AsRef::as_ref)
                    .collect();
                composite_value(
                    embeddable,
                    alias,
                    &attribute.name,
                    explicit.as_deref().map(|f| f.columns.as_slice()),
                    &nested,
                )
            }
            AttributeKind::ToOne { target, .. } => {
                let join = self
                    .joins_by_owner
                    .get(alias)
                    .and_then(|joins| joins.iter().find(|j| j.property == attribute.name))
                    .copied();
                let Some(join) = join else {
                    return Err(QueryError::NotYetImplemented(format!(
                        "implicit entity-valued fetch of {}.{}; declare a join for alias '{alias}'",
                        entity.name(),
                        attribute.name
                    )));
                };
                self.consumed.insert(join.alias.as_str());
                let target = self.metamodel.entity(target)?;
                let read = self.entity_read(target, &join.alias, join.lock_mode, &join.fetches)?;
                ValueRead::Entity(Box::new(read))
            }
            AttributeKind::Collection { .. } => {
                let joined = self
                    .joins_by_owner
                    .get(alias)
                    .is_some_and(|joins| joins.iter().any(|j| j.property == attribute.name));
                if joined {
                    return Err(QueryError::NotYetImplemented(format!(
                        "collection-valued fetch of {}.{}",
                        entity.name(),
                        attribute.name
                    )));
                }
                ValueRead::Unloaded
            }
        };

        Ok(FetchRead {
            attribute: attribute.name.clone(),
            source: explicit,
            value,
        })
    }
}

fn instantiation_argument(argument: &InstantiationArgument) -> ScalarRead {
    ScalarRead {
        column: ColumnRef::exact(&argument.column),
        type_code: argument.type_code,
    }
}

fn identifier_value(
    identifier: &IdentifierMapping,
    alias: &str,
    promoted: Option<&PropertyFetch>,
    components: &[Arc<PropertyFetch>],
) -> ValueRead {
    match identifier {
        IdentifierMapping::Basic {
            column, type_code, ..
        } => ValueRead::Basic(ScalarRead {
            column: promoted
                .and_then(|f| f.columns.first())
                .map_or_else(|| ColumnRef::implicit(alias, column), |c| ColumnRef::exact(c)),
            type_code: Some(*type_code),
        }),
        IdentifierMapping::Embedded { embeddable, .. } | IdentifierMapping::Virtual(embeddable) => {
            let nested: Vec<&PropertyFetch> = components.iter().map(AsRef::as_ref).collect();
            composite_value(
                embeddable,
                alias,
                identifier.role_name(),
                promoted.map(|f| f.columns.as_slice()),
                &nested,
            )
        }
    }
}

/// Reads an embeddable from positional labels, per-component fetches, or
/// the mapped column names, in that order.
fn composite_value(
    embeddable: &EmbeddableMapping,
    alias: &str,
    path: &str,
    positional: Option<&[String]>,
    nested: &[&PropertyFetch],
) -> ValueRead {
    let mut index = 0;
    composite_at(embeddable, alias, path, positional, nested, &mut index)
}

fn composite_at(
    embeddable: &EmbeddableMapping,
    alias: &str,
    path: &str,
    positional: Option<&[String]>,
    nested: &[&PropertyFetch],
    index: &mut usize,
) -> ValueRead {
    let mut parts = Vec::with_capacity(embeddable.attributes().len());
    for attribute in embeddable.attributes() {
        let part_path = format!("{path}.{}", attribute.name);
        let read = match &attribute.kind {
            AttributeKind::Basic { column, type_code } => {
                let label = positional
                    .and_then(|labels| labels.get(*index))
                    .or_else(|| {
                        nested
                            .iter()
                            .find(|f| f.path == part_path)
                            .and_then(|f| f.columns.first())
                    });
                *index += 1;
                ValueRead::Basic(ScalarRead {
                    column: label.map_or_else(|| ColumnRef::implicit(alias, column), |c| ColumnRef::exact(c)),
                    type_code: Some(*type_code),
                })
            }
            AttributeKind::Embedded(inner) => {
                composite_at(inner, alias, &part_path, positional, nested, index)
            }
            AttributeKind::ToOne { .. } | AttributeKind::Collection { .. } => ValueRead::Unloaded,
        };
        parts.push((attribute.name.clone(), read));
    }
    ValueRead::Composite {
        name: embeddable.name().to_string(),
        parts,
    }
}

/// Type code of the basic attribute at a dotted path.
fn basic_type_at(entity: &EntityMapping, path: &str) -> Result<TypeCode> {
    let unknown = || QueryError::UnknownAttribute {
        entity: entity.name().to_string(),
        attribute: path.to_string(),
    };
    let mut segments = path.split('.');
    let head = segments.next().ok_or_else(unknown)?;
    if entity.identifier().attribute_name() == Some(head) {
        if let IdentifierMapping::Basic { type_code, .. } = entity.identifier() {
            return Ok(*type_code);
        }
    }
    let mut kind = &entity.attribute(head)?.kind;
    for segment in segments {
        let AttributeKind::Embedded(embeddable) = kind else {
            return Err(unknown());
        };
        kind = &embeddable.attribute(segment).ok_or_else(unknown)?.kind;
    }
    match kind {
        AttributeKind::Basic { type_code, .. } => Ok(*type_code),
        _ => Err(unknown()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::ID_ROLE;

    fn metamodel() -> Metamodel {
        let mut metamodel = Metamodel::new();
        metamodel.register(
            EntityMapping::new(
                "Author",
                "authors",
                IdentifierMapping::Basic {
                    attribute: "id".to_string(),
                    column: "id".to_string(),
                    type_code: TypeCode::BigInt,
                },
            )
            .with_basic("name", "name", TypeCode::Varchar)
            .with_collection("books", "Book"),
        );
        metamodel.register(
            EntityMapping::new(
                "Book",
                "books",
                IdentifierMapping::Basic {
                    attribute: "isbn".to_string(),
                    column: "isbn".to_string(),
                    type_code: TypeCode::Varchar,
                },
            )
            .with_basic("title", "title", TypeCode::Varchar)
            .with_embedded(
                "published",
                EmbeddableMapping::new("Edition")
                    .with_basic("year", "pub_year", TypeCode::Integer)
                    .with_basic("publisher", "publisher", TypeCode::Varchar),
            )
            .with_to_one("author", "Author", "author_id"),
        );
        metamodel
    }

    fn entity(resolved: &ResolvedMapping, index: usize) -> &EntityRead {
        match &resolved.results()[index] {
            ResolvedResult::Entity(read) => read,
            other => panic!("not an entity: {other:?}"),
        }
    }

    #[test]
    fn test_declared_identifier_fetch_is_promoted() {
        let mut mapping = ResultSetMapping::new();
        mapping
            .add_root("a", "Author")
            .unwrap()
            .add_property("id", "author_key")
            .add_property("name", "author_name");
        let declared = Arc::clone(&mapping.root_mut("a").unwrap().fetches()[0]);

        let resolved = mapping.resolve(&metamodel()).unwrap();
        let author = entity(&resolved, 0);
        match &author.identifier.source {
            IdentifierSource::Explicit(fetch) => assert!(Arc::ptr_eq(fetch, &declared)),
            IdentifierSource::Implicit => panic!("identifier was not promoted"),
        }
        assert!(author
            .fetches
            .iter()
            .all(|f| !f.source.as_ref().is_some_and(|s| Arc::ptr_eq(s, &declared))));
        assert!(author.fetch("id").is_none());
        assert_eq!(
            author.identifier.value,
            ValueRead::Basic(ScalarRead {
                column: ColumnRef::exact("author_key"),
                type_code: Some(TypeCode::BigInt),
            })
        );
    }

    #[test]
    fn test_role_name_promotes_identifier() {
        let mut mapping = ResultSetMapping::new();
        mapping
            .add_root("a", "Author")
            .unwrap()
            .add_id_column_aliases(&["pk"]);
        let resolved = mapping.resolve(&metamodel()).unwrap();
        assert!(matches!(
            &entity(&resolved, 0).identifier.source,
            IdentifierSource::Explicit(f) if f.path == ID_ROLE
        ));
    }

    #[test]
    fn test_implicit_identifier_and_fetches() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_root("a", "Author").unwrap();
        let resolved = mapping.resolve(&metamodel()).unwrap();
        let author = entity(&resolved, 0);
        assert_eq!(author.identifier.source, IdentifierSource::Implicit);
        let ValueRead::Basic(read) = &author.identifier.value else {
            panic!("basic identifier expected");
        };
        assert_eq!(read.column.candidates(), ["a_id", "id"]);
        assert_eq!(author.fetch("books").unwrap().value, ValueRead::Unloaded);
    }

    #[test]
    fn test_implicit_entity_valued_fetch_is_not_implemented() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_root("b", "Book").unwrap();
        assert!(matches!(
            mapping.resolve(&metamodel()),
            Err(QueryError::NotYetImplemented(_))
        ));
    }

    #[test]
    fn test_join_resolves_target_entity() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_root("b", "Book").unwrap();
        mapping
            .add_join("a", "b", "author")
            .unwrap()
            .add_property("name", "author_name");
        let resolved = mapping.resolve(&metamodel()).unwrap();
        let book = entity(&resolved, 0);
        let ValueRead::Entity(author) = &book.fetch("author").unwrap().value else {
            panic!("joined entity expected");
        };
        assert_eq!(author.alias, "a");
        assert_eq!(author.entity.name(), "Author");
    }

    #[test]
    fn test_embedded_columns() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_root("b", "Book").unwrap().add_property("published.year", "yr");
        mapping.add_join("a", "b", "author").unwrap();
        let resolved = mapping.resolve(&metamodel()).unwrap();
        let ValueRead::Composite { parts, .. } = &entity(&resolved, 0).fetch("published").unwrap().value
        else {
            panic!("composite expected");
        };
        let ValueRead::Basic(year) = &parts[0].1 else {
            panic!("basic component expected");
        };
        assert_eq!(year.column, ColumnRef::exact("yr"));
        let ValueRead::Basic(publisher) = &parts[1].1 else {
            panic!("basic component expected");
        };
        assert_eq!(publisher.column.candidates(), ["b_publisher", "publisher"]);
    }

    #[test]
    fn test_alias_errors() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_root("b", "Book").unwrap();
        assert!(matches!(
            mapping.add_root("b", "Author"),
            Err(QueryError::DuplicateAlias(_))
        ));

        let mut mapping = ResultSetMapping::new();
        mapping.add_root("b", "Book").unwrap();
        mapping.add_join("a", "x", "author").unwrap();
        assert!(matches!(
            mapping.resolve(&metamodel()),
            Err(QueryError::UnknownAlias(alias)) if alias == "x"
        ));
    }

    #[test]
    fn test_join_on_basic_or_collection() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_root("b", "Book").unwrap();
        mapping.add_join("a", "b", "author").unwrap();
        mapping.add_join("t", "b", "title").unwrap();
        assert!(matches!(
            mapping.resolve(&metamodel()),
            Err(QueryError::NotAnAssociation { .. })
        ));

        let mut mapping = ResultSetMapping::new();
        mapping.add_root("a", "Author").unwrap();
        mapping.add_join("bk", "a", "books").unwrap();
        assert!(matches!(
            mapping.resolve(&metamodel()),
            Err(QueryError::NotYetImplemented(_))
        ));
    }

    #[test]
    fn test_unknown_declared_property() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_root("a", "Author").unwrap().add_property("age", "age");
        assert!(matches!(
            mapping.resolve(&metamodel()),
            Err(QueryError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_attribute_result_takes_attribute_type() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_result(ResultBuilder::Attribute {
            entity: "Book".to_string(),
            path: "published.year".to_string(),
            column: "y".to_string(),
        });
        let resolved = mapping.resolve(&metamodel()).unwrap();
        assert_eq!(
            resolved.shapes(),
            vec![ResultShape::Scalar(Some(TypeCode::Integer))]
        );
    }

    #[test]
    fn test_structural_equality() {
        let build = || {
            let mut mapping = ResultSetMapping::new();
            mapping.add_scalar("n", Some(TypeCode::BigInt));
            mapping.add_root("a", "Author").unwrap().add_property("name", "nm");
            mapping
        };
        assert_eq!(build(), build());
        let mut other = build();
        other.add_scalar("m", None);
        assert_ne!(build(), other);
    }
}
