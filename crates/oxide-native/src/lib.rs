//! # oxide-native
//!
//! Native SQL queries with declarative result mapping.
//!
//! This crate provides:
//! - Parameter recognition for `?`, `?N` and `:name` placeholders, with
//!   list expansion and optional power-of-two padding
//! - A metamodel of entities, embeddables and to-one associations
//! - Result-set mappings (scalars, entities, fetches, instantiations) that
//!   are resolved against the metamodel and read row by row
//! - A plan cache that builds each distinct plan at most once
//! - A `NativeQuery` facade executed through a [`StatementExecutor`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use oxide_dialect::{Dialect, Product};
//! use oxide_native::{EngineOptions, Metamodel, QueryEngine, SqlxExecutor};
//! use oxide_native_derive::Entity;
//!
//! #[derive(Entity)]
//! #[entity(table = "books")]
//! struct Book {
//!     #[id]
//!     id: i64,
//!     title: String,
//! }
//!
//! async fn example(executor: &SqlxExecutor) -> oxide_native::Result<()> {
//!     let metamodel = Metamodel::new().with_entity::<Book>();
//!     let engine = QueryEngine::new(
//!         Arc::new(Dialect::new(Product::Sqlite)),
//!         Arc::new(metamodel),
//!         EngineOptions::default(),
//!     );
//!
//!     let mut query = engine.create_entity_query::<Book>("select * from books where id in (:ids)")?;
//!     query.set_parameter_list("ids", [1_i64, 2, 3])?;
//!     let books = query.list(executor).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Explicit mappings
//!
//! ```ignore
//! let mut query = engine.create_native_query(
//!     "select b.id as b_id, b.title, a.id as a_id, a.name as a_name \
//!      from books b join authors a on a.id = b.author_id",
//! )?;
//! query.add_root("b", "Book")?;
//! query.add_join("a", "b.author")?;
//! let rows = query.list(executor).await?;
//! ```

pub mod engine;
pub mod error;
pub mod executor;
pub mod metamodel;
pub mod parameter;
pub mod plan;
pub mod query;
pub mod results;

pub use engine::{EngineOptions, NamedNativeQuery, QueryEngine};
pub use error::{QueryError, Result};
pub use executor::{SqlxExecutor, StatementExecutor};
pub use metamodel::{
    convert_to_database, AttributeConverter, AttributeKind, AttributeMapping, Embeddable,
    EmbeddableMapping, Entity, EntityMapping, FieldType, IdentifierMapping, Metamodel, ID_ROLE,
};
pub use parameter::{ParameterBindings, ParameterInterpretation, ParameterKey};
pub use plan::{QueryPlanCache, ResultListTransformer, TupleTransformer};
pub use query::{NativeQuery, SelectKind, TypedNativeQuery};
pub use results::{
    expect_composite, expect_entity, Composite, EntityInstance, FromResultValue,
    InstantiationArgument, ResultSetMapping, ResultShape, ResultValue, ScrollableResults, Tuple,
};
