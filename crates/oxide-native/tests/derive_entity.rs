//! Derived entities and embeddables read through native queries.

mod common;

use std::sync::Arc;

use common::{engine, library, Address, Author, Book, BookSummary, Edition, EditionKey, Shouting};
use oxide_dialect::{SqlValue, TypeCode};
use oxide_native::{
    convert_to_database, AttributeKind, Embeddable, Entity, IdentifierMapping, QueryError,
    ResultValue,
};

#[test]
fn test_derived_mappings_describe_tables_and_columns() {
    let author = Author::entity_mapping();
    assert_eq!(Author::ENTITY_NAME, "library.Author");
    assert_eq!(author.table(), "authors");
    assert_eq!(author.unqualified_name(), "Author");
    assert_eq!(
        author.identifier(),
        &IdentifierMapping::Basic {
            attribute: "id".to_string(),
            column: "id".to_string(),
            type_code: TypeCode::BigInt,
        }
    );

    let names: Vec<&str> = author.attributes().iter().map(|a| a.name.as_str()).collect();
    // transient fields are not mapped
    assert_eq!(names, ["name", "address", "nickname"]);
    assert!(matches!(
        &author.attribute("address").unwrap().kind,
        AttributeKind::Embedded(address) if address.name() == "Address"
    ));

    let book = Book::entity_mapping();
    assert_eq!(book.name(), "Book");
    assert_eq!(book.table(), "books");
    assert_eq!(
        book.attribute("year").unwrap().kind,
        AttributeKind::Basic {
            column: "published".to_string(),
            type_code: TypeCode::Integer,
        }
    );
    assert_eq!(
        book.attribute("author").unwrap().kind,
        AttributeKind::ToOne {
            target: "library.Author".to_string(),
            column: "author_id".to_string(),
        }
    );
}

#[test]
fn test_derived_embeddable_and_composite_identifier() {
    let address = Address::embeddable_mapping();
    assert_eq!(address.attributes().len(), 2);
    assert!(address.attribute("city").is_some());

    let edition = Edition::entity_mapping();
    assert_eq!(edition.identifier().attribute_name(), Some("key"));
    let columns: Vec<&str> = edition
        .identifier()
        .columns()
        .into_iter()
        .map(|(_, column, _)| column)
        .collect();
    assert_eq!(columns, ["isbn", "printing"]);
}

#[test]
fn test_converter_writes_relational_values() {
    assert_eq!(
        convert_to_database::<Shouting>(&"Papa".to_string()),
        SqlValue::Text("papa".to_string())
    );
}

#[test]
fn test_metamodel_resolves_unqualified_names() {
    let engine = engine();
    let metamodel = engine.metamodel();
    assert_eq!(metamodel.entity("Author").unwrap().name(), "library.Author");
    assert_eq!(metamodel.entity("library.Author").unwrap().table(), "authors");
    assert!(matches!(
        metamodel.entity("Publisher"),
        Err(QueryError::UnknownEntity(_))
    ));
}

#[tokio::test]
async fn test_entity_query_reads_bare_columns() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine
        .create_entity_query::<BookSummary>("select * from books where published < :year order by id")
        .unwrap();
    query.set_parameter("year", 1927_i64).unwrap();
    let books = query.list(&executor).await.unwrap();

    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["The Sun Also Rises", "Mrs Dalloway", "Beowulf"]);
    assert_eq!(books[0].year, 1926);
}

#[tokio::test]
async fn test_embedded_and_converted_attributes() {
    let executor = library().await;
    let engine = engine();

    let query = engine
        .create_entity_query::<Author>("select * from authors order by id")
        .unwrap();
    let authors = query.list(&executor).await.unwrap();

    assert_eq!(
        authors[0],
        Author {
            id: 1,
            name: "Ernest Hemingway".to_string(),
            address: Some(Address {
                street: "907 Whitehead St".to_string(),
                city: "Key West".to_string(),
            }),
            nickname: "PAPA".to_string(),
            visits: 0,
        }
    );
    // an embeddable whose columns are all null reads as None
    assert_eq!(authors[1].address, None);
    assert_eq!(authors[1].nickname, "GINNY");
}

#[tokio::test]
async fn test_rejected_conversion_names_the_attribute() {
    let executor = library().await;
    let engine = engine();
    sqlx::query("UPDATE authors SET nickname = '' WHERE id = 2")
        .execute(executor.pool())
        .await
        .unwrap();

    let mut query = engine
        .create_entity_query::<Author>("select * from authors where id = ?")
        .unwrap();
    query.set_parameter(1_u32, 2_i64).unwrap();
    match query.list(&executor).await {
        Err(QueryError::AttributeConversion { attribute, message }) => {
            assert_eq!(attribute, "nickname");
            assert_eq!(message, "empty nickname");
        }
        other => panic!("expected a conversion failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_joined_association_is_shared_per_identifier() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine
        .create_native_query(
            "select b.id, b.title, b.published, b.available, \
             a.id as a_id, a.name as a_name, a.street as a_street, a.city as a_city, \
             a.nickname as a_nickname \
             from books b left join authors a on a.id = b.author_id order by b.id",
        )
        .unwrap();
    query.add_root("b", "Book").unwrap();
    query.add_join("a", "b.author").unwrap();

    let rows = query.list(&executor).await.unwrap();
    assert_eq!(rows.len(), 5);
    let author_of = |row: &ResultValue| {
        row.as_entity()
            .and_then(|book| book.value("author"))
            .and_then(ResultValue::as_entity)
            .map(Arc::clone)
    };
    let first = author_of(&rows[0]).unwrap();
    let second = author_of(&rows[1]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(author_of(&rows[4]).is_none());

    let books: Vec<Book> = rows
        .into_iter()
        .map(ResultValue::get::<Book>)
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(!books[1].available);
    assert_eq!(books[2].author.as_ref().unwrap().name, "Virginia Woolf");
    assert_eq!(books[4].author, None);
}

#[tokio::test]
async fn test_unjoined_association_is_rejected() {
    let executor = library().await;
    let engine = engine();

    let query = engine
        .create_entity_query::<Book>("select * from books")
        .unwrap();
    assert!(matches!(
        query.list(&executor).await,
        Err(QueryError::NotYetImplemented(_))
    ));
}

#[tokio::test]
async fn test_composite_identifier_round_trip() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine
        .create_entity_query::<Edition>("select * from editions where isbn = :isbn order by printing")
        .unwrap();
    query.set_parameter("isbn", "978-0684800714").unwrap();
    let editions = query.list(&executor).await.unwrap();

    assert_eq!(
        editions,
        [
            Edition {
                key: EditionKey {
                    isbn: "978-0684800714".to_string(),
                    printing: 1,
                },
                copies: 5000,
            },
            Edition {
                key: EditionKey {
                    isbn: "978-0684800714".to_string(),
                    printing: 2,
                },
                copies: 12000,
            },
        ]
    );
}
