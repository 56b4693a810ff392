//! Native queries executed against SQLite.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{engine, engine_with, library, BookSummary};
use oxide_dialect::{LockMode, LockOptions, PersistenceError, SqlValue, TypeCode};
use oxide_native::results::CancellationCheck;
use oxide_native::{
    EngineOptions, InstantiationArgument, NamedNativeQuery, QueryError, ResultListTransformer,
    ResultSetMapping, ResultValue, SelectKind, Tuple, TupleTransformer,
};

const TITLES_BY_ID: &str = "select title from books where id in (:ids) order by id";

#[tokio::test]
async fn test_list_parameter_expands_and_pads() {
    let executor = library().await;
    let engine = engine_with(EngineOptions {
        in_clause_parameter_padding: true,
        ..EngineOptions::default()
    });

    let mut query = engine.create_native_query(TITLES_BY_ID).unwrap();
    query.add_scalar("title");
    let mut query = query.typed::<String>().unwrap();
    query.set_parameter_list("ids", [1_i64, 3, 4]).unwrap();

    let titles = query.list(&executor).await.unwrap();
    assert_eq!(titles, ["The Sun Also Rises", "Mrs Dalloway", "Orlando"]);
    // the expanded statement depends on the list size, so no plan is kept
    assert_eq!(engine.plans().select_plan_count(), 0);
}

#[tokio::test]
async fn test_empty_list_matches_nothing() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine.create_native_query(TITLES_BY_ID).unwrap();
    query.add_scalar("title");
    query.set_parameter_list("ids", Vec::<i64>::new()).unwrap();
    assert!(query.list(&executor).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bindings_are_checked_before_execution() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine.create_native_query(TITLES_BY_ID).unwrap();
    assert!(matches!(
        query.set_parameter("isbn", "x"),
        Err(QueryError::UnknownParameter(_))
    ));
    assert!(matches!(
        query.list(&executor).await,
        Err(QueryError::MissingBinding(name)) if name == ":ids"
    ));
}

#[tokio::test]
async fn test_implicit_mapping_reads_natural_types() {
    let executor = library().await;
    let engine = engine();

    let query = engine
        .create_native_query("select count(*) as n from books")
        .unwrap();
    assert_eq!(query.is_select_query(), SelectKind::Undetermined);
    let rows = query.list(&executor).await.unwrap();
    assert_eq!(rows, [ResultValue::Scalar(SqlValue::Int(5))]);
}

#[test]
fn test_typed_query_checks_declared_results() {
    let engine = engine();

    let query = engine.create_native_query("select 1").unwrap();
    assert!(matches!(
        query.typed::<String>(),
        Err(QueryError::NoResultsForTypedQuery)
    ));

    let mut query = engine.create_native_query("select id, title from books").unwrap();
    query.add_scalar("id").add_scalar("title");
    assert!(matches!(
        query.typed::<String>(),
        Err(QueryError::MultipleResultsForTypedQuery)
    ));

    let mut query = engine.create_native_query("select title from books").unwrap();
    query.add_scalar_typed("title", TypeCode::Varchar);
    match query.typed::<i64>() {
        Err(QueryError::IncompatibleResultType { requested, actual }) => {
            assert_eq!(requested, "i64");
            assert_eq!(actual, "VARCHAR");
        }
        other => panic!("expected incompatible result type, got {other:?}"),
    }

    let mut query = engine.create_native_query("select * from books").unwrap();
    query.add_root("b", "BookSummary").unwrap();
    assert!(matches!(
        query.typed::<String>(),
        Err(QueryError::IncompatibleResultType { .. })
    ));
}

#[tokio::test]
async fn test_attribute_result_uses_attribute_type() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine
        .create_native_query("select published from books where id = ?")
        .unwrap();
    query
        .add_attribute_result("published", "Book", "year")
        .unwrap();
    let mut query = query.typed::<i32>().unwrap();
    query.set_parameter(1_u32, 3_i64).unwrap();
    assert_eq!(query.unique_result(&executor).await.unwrap(), Some(1925));
}

#[tokio::test]
async fn test_tuples_are_addressed_by_alias() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine
        .create_native_query("select b.id as b_id, b.title, b.published, a.name as author from books b \
                              join authors a on a.id = b.author_id order by b.id")
        .unwrap();
    query.add_root("b", "BookSummary").unwrap();
    query.add_scalar("author");
    let query = query.typed::<Tuple>().unwrap();
    assert_eq!(
        query.tuple_aliases(),
        [Some("b".to_string()), Some("author".to_string())]
    );

    let rows = query.list(&executor).await.unwrap();
    assert_eq!(rows.len(), 4);
    let book: BookSummary = rows[0].get_as("b").unwrap();
    assert_eq!(book.title, "The Sun Also Rises");
    assert_eq!(rows[2].get_as::<String>("AUTHOR").unwrap(), "Virginia Woolf");
    assert!(matches!(
        rows[0].get_as::<String>("publisher"),
        Err(QueryError::UnknownTupleAlias(_))
    ));
}

#[tokio::test]
async fn test_instantiation_collects_arguments() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine
        .create_native_query("select title, published from books where id = 4")
        .unwrap();
    query.add_instantiation(
        "BookCard",
        vec![
            InstantiationArgument {
                column: "title".to_string(),
                type_code: None,
                alias: None,
            },
            InstantiationArgument {
                column: "published".to_string(),
                type_code: Some(TypeCode::Integer),
                alias: Some("year".to_string()),
            },
        ],
    );
    let row = query.unique_result(&executor).await.unwrap();
    assert_eq!(
        row,
        Some(ResultValue::Instantiation {
            target: "BookCard".to_string(),
            arguments: vec![
                ResultValue::Scalar(SqlValue::Text("Orlando".to_string())),
                ResultValue::Scalar(SqlValue::Int(1928)),
            ],
        })
    );
}

#[tokio::test]
async fn test_pagination_and_scrolling() {
    let executor = library().await;
    let engine = engine();

    let mut query = engine
        .create_entity_query::<BookSummary>("select * from books order by id")
        .unwrap();
    query.set_first_result(1).set_max_results(3);

    let mut cursor = query.scroll(&executor).await.unwrap();
    assert_eq!(cursor.len(), 3);
    assert!(cursor.get().is_none());
    assert!(cursor.next());
    assert_eq!(cursor.get().map(|b| b.id), Some(2));
    assert!(cursor.last());
    assert_eq!(cursor.get().map(|b| b.id), Some(4));
    assert!(!cursor.next());
    assert_eq!(cursor.position(), None);
    assert!(cursor.previous());
    assert_eq!(cursor.position(), Some(2));
}

#[tokio::test]
async fn test_unique_result_rejects_several_rows() {
    let executor = library().await;
    let engine = engine();

    let query = engine
        .create_entity_query::<BookSummary>("select * from books")
        .unwrap();
    assert!(matches!(
        query.unique_result(&executor).await,
        Err(QueryError::NonUniqueResult(5))
    ));

    let query = engine
        .create_entity_query::<BookSummary>("select * from books where id = 42")
        .unwrap();
    assert_eq!(query.unique_result(&executor).await.unwrap(), None);
}

#[tokio::test]
async fn test_execute_update_reports_row_count() {
    let executor = library().await;
    let engine = engine();

    let mut update = engine
        .create_native_query("update books set available = :flag where author_id in (:authors)")
        .unwrap();
    update
        .add_synchronized_entity_name("Book")
        .unwrap()
        .set_parameter("flag", false)
        .unwrap()
        .set_parameter_list("authors", [2_i64])
        .unwrap();
    assert_eq!(update.synchronized_query_spaces().len(), 1);
    assert_eq!(update.execute_update(&executor).await.unwrap(), 2);

    let mut count = engine
        .create_native_query("select count(*) as n from books where available = ?")
        .unwrap();
    count.add_scalar("n");
    count.set_parameter(1_u32, false).unwrap();
    let count = count.typed::<i64>().unwrap();
    assert_eq!(count.unique_result(&executor).await.unwrap(), Some(3));

    let mut select = engine.create_native_query("select title from books").unwrap();
    select.add_scalar("title");
    assert!(matches!(
        select.execute_update(&executor).await,
        Err(QueryError::NotAnUpdate)
    ));
}

#[tokio::test]
async fn test_constraint_violation_is_converted() {
    let executor = library().await;
    let engine = engine();

    let mut insert = engine
        .create_native_query("insert into books (id, title, published) values (?1, ?2, ?3)")
        .unwrap();
    insert
        .set_parameter(1_u32, 6_i64)
        .unwrap()
        .set_parameter(2_u32, "Orlando")
        .unwrap()
        .set_parameter(3_u32, 1928_i64)
        .unwrap();

    match insert.execute_update(&executor).await {
        Err(QueryError::Persistence(PersistenceError::ConstraintViolation {
            constraint_name,
            sql,
            ..
        })) => {
            assert_eq!(constraint_name.as_deref(), Some("books.title"));
            assert!(sql.starts_with("insert into books"));
        }
        other => panic!("expected a constraint violation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_stops_the_row_loop() {
    let executor = library().await;
    let engine = engine();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let check: CancellationCheck = Arc::new(move || counter.fetch_add(1, Ordering::SeqCst) >= 2);

    let mut query = engine
        .create_native_query("select id from books order by id")
        .unwrap();
    query.add_scalar("id").set_cancellation_check(check);
    assert!(matches!(
        query.list(&executor).await,
        Err(QueryError::Cancelled)
    ));
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_plans_are_shared_between_equal_queries() {
    let executor = library().await;
    let engine = engine();

    for _ in 0..2 {
        let query = engine
            .create_entity_query::<BookSummary>("select * from books where id = :id")
            .map(|mut q| {
                q.set_parameter("id", 1_i64).unwrap();
                q
            })
            .unwrap();
        assert_eq!(query.list(&executor).await.unwrap().len(), 1);
    }
    assert_eq!(engine.plans().select_plan_count(), 1);
    assert_eq!(engine.plans().interpretation_count(), 1);

    let mut other = engine
        .create_entity_query::<BookSummary>("select * from books where id = :id")
        .unwrap();
    other.query_mut().add_synchronized_query_space("authors");
    other.set_parameter("id", 2_i64).unwrap();
    other.list(&executor).await.unwrap();
    assert_eq!(engine.plans().select_plan_count(), 2);

    engine.plans().clear();
    assert_eq!(engine.plans().select_plan_count(), 0);
}

#[tokio::test]
async fn test_disabled_cache_keeps_nothing() {
    let executor = library().await;
    let engine = engine_with(EngineOptions {
        plan_cache_enabled: false,
        ..EngineOptions::default()
    });

    let query = engine
        .create_entity_query::<BookSummary>("select * from books")
        .unwrap();
    query.list(&executor).await.unwrap();
    assert_eq!(engine.plans().select_plan_count(), 0);
    assert_eq!(engine.plans().interpretation_count(), 0);
}

#[tokio::test]
async fn test_transformers_reshape_rows() {
    let executor = library().await;
    let engine = engine();

    let join: Arc<TupleTransformer> = Arc::new(|values: Vec<ResultValue>, aliases: &[Option<String>]| {
        let text = values
            .iter()
            .zip(aliases)
            .map(|(value, alias)| format!("{}={value}", alias.as_deref().unwrap_or("?")))
            .collect::<Vec<_>>()
            .join(" ");
        ResultValue::Scalar(SqlValue::Text(text))
    });
    let reverse: Arc<ResultListTransformer> = Arc::new(|mut rows: Vec<ResultValue>| {
        rows.reverse();
        rows
    });

    let mut query = engine
        .create_native_query("select id, published from books where id <= 2 order by id")
        .unwrap();
    query
        .add_scalar("id")
        .add_scalar("published")
        .set_tuple_transformer(join)
        .set_result_list_transformer(reverse);

    let rows = query.list(&executor).await.unwrap();
    assert_eq!(
        rows,
        [
            ResultValue::Scalar(SqlValue::Text("id=2 published=1929".to_string())),
            ResultValue::Scalar(SqlValue::Text("id=1 published=1926".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_named_query_with_registered_mapping() {
    let executor = library().await;
    let mut engine = engine();

    let mut mapping = ResultSetMapping::named("bookWithYear");
    mapping
        .add_root("b", "BookSummary")
        .unwrap()
        .add_property("year", "released");
    mapping.add_scalar("author", Some(TypeCode::Varchar));
    engine.register_result_set_mapping(mapping).unwrap();
    engine.register_named_query(
        NamedNativeQuery::new(
            "booksByAuthor",
            "select b.id, b.title, b.published as released, a.name as author \
             from books b join authors a on a.id = b.author_id \
             where a.name = :name order by b.id",
        )
        .with_result_set_mapping("bookWithYear")
        .with_query_space("books"),
    );

    let mut query = engine.create_named_query("booksByAuthor").unwrap();
    query
        .set_comment("books by author")
        .set_read_only(true)
        .set_lock_options(LockOptions {
            mode: LockMode::PessimisticRead,
            timeout_millis: 0,
        })
        .set_parameter("name", "Virginia Woolf")
        .unwrap();
    assert_eq!(query.is_select_query(), SelectKind::Select);
    assert_eq!(query.lock_options().map(|o| o.mode), Some(LockMode::PessimisticRead));

    let rows = query.list(&executor).await.unwrap();
    let ResultValue::Row(first) = &rows[0] else {
        panic!("expected a row of two results, got {:?}", rows[0]);
    };
    let book: BookSummary = first[0].clone().get().unwrap();
    assert_eq!((book.id, book.year), (3, 1925));
    assert_eq!(first[1], ResultValue::Scalar(SqlValue::Text("Virginia Woolf".to_string())));
}
