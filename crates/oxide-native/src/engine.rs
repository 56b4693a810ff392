//! The query engine: shared state behind every native query.

use std::collections::HashMap;
use std::sync::Arc;

use oxide_dialect::Dialect;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::metamodel::{Entity, Metamodel};
use crate::plan::QueryPlanCache;
use crate::query::{NativeQuery, TypedNativeQuery};
use crate::results::{FromResultValue, ResultSetMapping};

/// Engine-wide query settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Pad list parameters to the next power of two so fewer distinct
    /// statements reach the database.
    pub in_clause_parameter_padding: bool,
    pub plan_cache_enabled: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            in_clause_parameter_padding: false,
            plan_cache_enabled: true,
        }
    }
}

impl EngineOptions {
    /// Parses options from JSON; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Options`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A native query registered under a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedNativeQuery {
    pub name: String,
    pub sql: String,
    /// Name of a registered result-set mapping.
    #[serde(default)]
    pub result_set_mapping: Option<String>,
    /// Entity read implicitly when no mapping is named.
    #[serde(default)]
    pub result_entity: Option<String>,
    #[serde(default)]
    pub query_spaces: Vec<String>,
}

impl NamedNativeQuery {
    #[must_use]
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            result_set_mapping: None,
            result_entity: None,
            query_spaces: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_result_set_mapping(mut self, mapping: impl Into<String>) -> Self {
        self.result_set_mapping = Some(mapping.into());
        self
    }

    #[must_use]
    pub fn with_result_entity(mut self, entity: impl Into<String>) -> Self {
        self.result_entity = Some(entity.into());
        self
    }

    #[must_use]
    pub fn with_query_space(mut self, table: impl Into<String>) -> Self {
        self.query_spaces.push(table.into());
        self
    }
}

/// Creates native queries against one dialect and metamodel.
///
/// Registration happens while the engine is still exclusively owned;
/// afterwards it is shared read-only and only the plan cache changes.
#[derive(Debug)]
pub struct QueryEngine {
    dialect: Arc<Dialect>,
    metamodel: Arc<Metamodel>,
    options: EngineOptions,
    plans: QueryPlanCache,
    named_queries: HashMap<String, NamedNativeQuery>,
    mappings: HashMap<String, ResultSetMapping>,
}

impl QueryEngine {
    #[must_use]
    pub fn new(dialect: Arc<Dialect>, metamodel: Arc<Metamodel>, options: EngineOptions) -> Self {
        debug!(
            dialect = dialect.name(),
            entities = metamodel.len(),
            padding = options.in_clause_parameter_padding,
            plan_cache = options.plan_cache_enabled,
            "Query engine created"
        );
        Self {
            dialect,
            metamodel,
            options,
            plans: QueryPlanCache::new(options.plan_cache_enabled),
            named_queries: HashMap::new(),
            mappings: HashMap::new(),
        }
    }

    #[must_use]
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    #[must_use]
    pub fn metamodel(&self) -> &Metamodel {
        &self.metamodel
    }

    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub const fn plans(&self) -> &QueryPlanCache {
        &self.plans
    }

    /// Registers a mapping under its name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnnamedResultSetMapping`] for a mapping built
    /// without a name.
    pub fn register_result_set_mapping(&mut self, mapping: ResultSetMapping) -> Result<()> {
        let name = mapping
            .name()
            .ok_or(QueryError::UnnamedResultSetMapping)?
            .to_string();
        self.mappings.insert(name, mapping);
        Ok(())
    }

    pub fn register_named_query(&mut self, query: NamedNativeQuery) {
        self.named_queries.insert(query.name.clone(), query);
    }

    /// # Errors
    ///
    /// Returns [`QueryError::UnknownResultSetMapping`].
    pub fn result_set_mapping(&self, name: &str) -> Result<&ResultSetMapping> {
        self.mappings
            .get(name)
            .ok_or_else(|| QueryError::UnknownResultSetMapping(name.to_string()))
    }

    /// A query with no declared results yet.
    ///
    /// # Errors
    ///
    /// Returns parameter recognition errors.
    pub fn create_native_query(&self, sql: &str) -> Result<NativeQuery<'_>> {
        let interpretation = self.plans.interpretation(sql)?;
        Ok(NativeQuery::new(self, sql, interpretation, ResultSetMapping::new()))
    }

    /// A query reading its rows through the mapping registered as
    /// `mapping_name`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownResultSetMapping`] and parameter
    /// recognition errors.
    pub fn create_native_query_with_mapping(
        &self,
        sql: &str,
        mapping_name: &str,
    ) -> Result<NativeQuery<'_>> {
        let mapping = self.result_set_mapping(mapping_name)?.clone();
        let interpretation = self.plans.interpretation(sql)?;
        Ok(NativeQuery::new(self, sql, interpretation, mapping))
    }

    /// A query reading each row as an `E`, with every column labelled by
    /// its mapped name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownEntity`] when `E` is not registered and
    /// parameter recognition errors.
    pub fn create_entity_query<E: Entity>(&self, sql: &str) -> Result<TypedNativeQuery<'_, E>> {
        let mut query = self.create_native_query(sql)?;
        query.add_entity(None, E::ENTITY_NAME, None)?;
        query.typed()
    }

    /// Instantiates a registered named query.
    ///
    /// A named mapping wins over a result entity; a result entity becomes
    /// an implicit entity result aliased by its unqualified name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownNamedQuery`],
    /// [`QueryError::UnknownResultSetMapping`],
    /// [`QueryError::UnknownEntity`] and parameter recognition errors.
    pub fn create_named_query(&self, name: &str) -> Result<NativeQuery<'_>> {
        let named = self
            .named_queries
            .get(name)
            .ok_or_else(|| QueryError::UnknownNamedQuery(name.to_string()))?;

        let mut query = match (&named.result_set_mapping, &named.result_entity) {
            (Some(mapping), _) => self.create_native_query_with_mapping(&named.sql, mapping)?,
            (None, Some(entity)) => {
                let mut query = self.create_native_query(&named.sql)?;
                query.add_entity(None, entity, None)?;
                query
            }
            (None, None) => self.create_native_query(&named.sql)?,
        };
        for space in &named.query_spaces {
            query.add_synchronized_query_space(space);
        }
        Ok(query)
    }

    /// Typed variant of [`create_named_query`](Self::create_named_query).
    ///
    /// # Errors
    ///
    /// Everything [`create_named_query`](Self::create_named_query) and
    /// [`NativeQuery::typed`] return.
    pub fn create_named_query_typed<T: FromResultValue>(
        &self,
        name: &str,
    ) -> Result<TypedNativeQuery<'_, T>> {
        self.create_named_query(name)?.typed()
    }
}

#[cfg(test)]
mod tests {
    use oxide_dialect::{Product, TypeCode};

    use super::*;
    use crate::metamodel::{EntityMapping, IdentifierMapping};

    fn engine() -> QueryEngine {
        let mut metamodel = Metamodel::new();
        metamodel.register(
            EntityMapping::new(
                "library.Book",
                "books",
                IdentifierMapping::Basic {
                    attribute: "id".to_string(),
                    column: "id".to_string(),
                    type_code: TypeCode::BigInt,
                },
            )
            .with_basic("title", "title", TypeCode::Varchar),
        );
        QueryEngine::new(
            Arc::new(Dialect::new(Product::Sqlite)),
            Arc::new(metamodel),
            EngineOptions::default(),
        )
    }

    #[test]
    fn test_options_from_json() {
        let options = EngineOptions::from_json(r#"{"in_clause_parameter_padding": true}"#).unwrap();
        assert!(options.in_clause_parameter_padding);
        assert!(options.plan_cache_enabled);
        assert!(matches!(
            EngineOptions::from_json("{not json"),
            Err(QueryError::Options(_))
        ));
    }

    #[test]
    fn test_named_query_with_result_entity() {
        let mut engine = engine();
        engine.register_named_query(
            NamedNativeQuery::new("allBooks", "select * from books").with_result_entity("Book"),
        );

        let query = engine.create_named_query("allBooks").unwrap();
        let [crate::results::ResultBuilder::Entity(root)] = query.mapping().results() else {
            panic!("expected one entity result");
        };
        assert_eq!(root.alias(), "Book");
        assert_eq!(root.entity(), "library.Book");
        assert!(matches!(
            engine.create_named_query("missing"),
            Err(QueryError::UnknownNamedQuery(_))
        ));
    }

    #[test]
    fn test_named_query_with_mapping() {
        let mut engine = engine();
        let mut mapping = ResultSetMapping::named("titles");
        mapping.add_scalar("title", Some(TypeCode::Varchar));
        engine.register_result_set_mapping(mapping).unwrap();
        engine.register_named_query(
            NamedNativeQuery::new("titles", "select title from books")
                .with_result_set_mapping("titles")
                .with_query_space("books"),
        );

        let query = engine.create_named_query_typed::<String>("titles").unwrap();
        assert_eq!(query.query().mapping().number_of_results(), 1);
        assert!(query.query().synchronized_query_spaces().contains("books"));

        assert!(matches!(
            engine.register_result_set_mapping(ResultSetMapping::new()),
            Err(QueryError::UnnamedResultSetMapping)
        ));
        assert!(matches!(
            engine.create_native_query_with_mapping("select 1", "missing"),
            Err(QueryError::UnknownResultSetMapping(name)) if name == "missing"
        ));
    }
}
