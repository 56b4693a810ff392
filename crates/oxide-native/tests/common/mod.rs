#![allow(dead_code)]

use std::sync::Arc;

use oxide_dialect::{Dialect, Product};
use oxide_native::{AttributeConverter, EngineOptions, Metamodel, QueryEngine, SqlxExecutor};
use oxide_native_derive::{Embeddable, Entity};
use sqlx::SqlitePool;

/// Stores nicknames lower-cased and reads them back upper-cased.
pub struct Shouting;

impl AttributeConverter for Shouting {
    type Domain = String;
    type Relational = String;

    fn to_database(value: &String) -> String {
        value.to_lowercase()
    }

    fn to_domain(value: String) -> Result<String, String> {
        if value.is_empty() {
            return Err("empty nickname".to_string());
        }
        Ok(value.to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Embeddable)]
pub struct Address {
    pub street: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Entity)]
#[entity(name = "library.Author", table = "authors")]
pub struct Author {
    #[id]
    pub id: i64,
    pub name: String,
    #[embedded]
    pub address: Option<Address>,
    #[convert(with = Shouting)]
    pub nickname: String,
    #[transient]
    pub visits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Entity)]
#[entity(table = "books")]
pub struct Book {
    #[id]
    pub id: i64,
    pub title: String,
    #[column(name = "published")]
    pub year: i32,
    pub available: bool,
    #[to_one]
    pub author: Option<Author>,
}

/// A book without its association, for queries that select only `books`.
#[derive(Debug, Clone, PartialEq, Eq, Entity)]
#[entity(name = "BookSummary", table = "books")]
pub struct BookSummary {
    #[id]
    pub id: i64,
    pub title: String,
    #[column(name = "published")]
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Embeddable)]
#[embeddable(name = "EditionKey")]
pub struct EditionKey {
    pub isbn: String,
    pub printing: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Entity)]
#[entity(table = "editions")]
pub struct Edition {
    #[embedded_id]
    pub key: EditionKey,
    pub copies: i64,
}

pub fn metamodel() -> Metamodel {
    Metamodel::new()
        .with_entity::<Author>()
        .with_entity::<Book>()
        .with_entity::<BookSummary>()
        .with_entity::<Edition>()
}

pub fn engine_with(options: EngineOptions) -> QueryEngine {
    QueryEngine::new(
        Arc::new(Dialect::new(Product::Sqlite)),
        Arc::new(metamodel()),
        options,
    )
}

pub fn engine() -> QueryEngine {
    engine_with(EngineOptions::default())
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL, \
     street TEXT, city TEXT, nickname TEXT NOT NULL)",
    "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL UNIQUE, \
     published INTEGER NOT NULL, available BOOLEAN NOT NULL DEFAULT 1, \
     author_id INTEGER REFERENCES authors(id))",
    "CREATE TABLE editions (isbn TEXT NOT NULL, printing INTEGER NOT NULL, \
     copies INTEGER NOT NULL, PRIMARY KEY (isbn, printing))",
    "INSERT INTO authors VALUES (1, 'Ernest Hemingway', '907 Whitehead St', 'Key West', 'papa')",
    "INSERT INTO authors VALUES (2, 'Virginia Woolf', NULL, NULL, 'ginny')",
    "INSERT INTO books VALUES (1, 'The Sun Also Rises', 1926, 1, 1)",
    "INSERT INTO books VALUES (2, 'A Farewell to Arms', 1929, 0, 1)",
    "INSERT INTO books VALUES (3, 'Mrs Dalloway', 1925, 1, 2)",
    "INSERT INTO books VALUES (4, 'Orlando', 1928, 1, 2)",
    "INSERT INTO books VALUES (5, 'Beowulf', 1000, 1, NULL)",
    "INSERT INTO editions VALUES ('978-0684800714', 1, 5000)",
    "INSERT INTO editions VALUES ('978-0684800714', 2, 12000)",
];

/// An executor over a fresh in-memory library.
pub async fn library() -> SqlxExecutor {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .unwrap_or_else(|e| panic!("Failed to open database: {e}"));
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to run {statement}: {e}"));
    }
    SqlxExecutor::new(pool)
}
