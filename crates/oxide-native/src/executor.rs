//! Statement execution against a live connection.
//!
//! The query layer hands over SQL with `?` placeholders plus one driver
//! [`Binding`] per placeholder, and gets back rows as [`RawValue`]s. Driver
//! failures come back unclassified as [`JdbcError`]; the dialect converts
//! them.

use oxide_dialect::{Binding, JdbcError, RawValue};
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use tracing::debug;

use crate::results::VecRowSource;

/// Runs statements for native queries.
#[allow(async_fn_in_trait)]
pub trait StatementExecutor {
    /// Runs a select and returns all of its rows.
    async fn query(&self, sql: &str, bindings: &[Binding]) -> Result<VecRowSource, JdbcError>;

    /// Runs an insert, update or delete and returns the affected row count.
    async fn update(&self, sql: &str, bindings: &[Binding]) -> Result<u64, JdbcError>;
}

/// Executor over a `sqlx` SQLite pool.
#[derive(Debug, Clone)]
pub struct SqlxExecutor {
    pool: SqlitePool,
}

impl SqlxExecutor {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StatementExecutor for SqlxExecutor {
    async fn query(&self, sql: &str, bindings: &[Binding]) -> Result<VecRowSource, JdbcError> {
        debug!(sql = %sql, parameters = bindings.len(), "Executing query");
        let rows = bind_all(sqlx::query(sql), bindings)?
            .fetch_all(&self.pool)
            .await
            .map_err(driver_error)?;

        let labels = rows.first().map_or_else(Vec::new, |row| {
            row.columns().iter().map(|c| c.name().to_string()).collect()
        });
        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw = (0..row.len())
                .map(|index| raw_value(row, index))
                .collect::<Result<Vec<_>, _>>()
                .map_err(driver_error)?;
            values.push(raw);
        }
        Ok(VecRowSource::new(labels, values))
    }

    async fn update(&self, sql: &str, bindings: &[Binding]) -> Result<u64, JdbcError> {
        debug!(sql = %sql, parameters = bindings.len(), "Executing update");
        let result = bind_all(sqlx::query(sql), bindings)?
            .execute(&self.pool)
            .await
            .map_err(driver_error)?;
        Ok(result.rows_affected())
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_all<'q>(
    mut query: SqliteQuery<'q>,
    bindings: &[Binding],
) -> Result<SqliteQuery<'q>, JdbcError> {
    for binding in bindings {
        query = match binding {
            Binding::Null(_) => query.bind(None::<i64>),
            Binding::Boolean(b) => query.bind(*b),
            Binding::Short(i) => query.bind(i64::from(*i)),
            Binding::Int(i) => query.bind(i64::from(*i)),
            Binding::Long(i) => query.bind(*i),
            Binding::Double(f) => query.bind(*f),
            Binding::BigDecimal(s) | Binding::String(s) | Binding::NString(s) => {
                query.bind(s.clone())
            }
            Binding::Bytes(b) => query.bind(b.clone()),
            Binding::Date(d) => query.bind(*d),
            Binding::Time(t) => query.bind(*t),
            Binding::Timestamp(ts) => query.bind(*ts),
            Binding::Blob(blob) => query.bind(blob.to_bytes().map_err(lob_error)?),
            Binding::Clob(clob) | Binding::NClob(clob) => {
                query.bind(clob.to_string_value().map_err(lob_error)?)
            }
            Binding::BinaryStream { data, .. } => query.bind(data.clone()),
            Binding::CharacterStream { data, .. } | Binding::NCharacterStream { data, .. } => {
                query.bind(data.clone())
            }
        };
    }
    Ok(query)
}

/// Reads a column by its storage class, refined by the declared type.
fn raw_value(row: &SqliteRow, index: usize) -> Result<RawValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(RawValue::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();
    let declared = row.column(index).type_info().name().to_ascii_uppercase();

    let value = match (declared.as_str(), storage.as_str()) {
        ("BOOLEAN", "INTEGER") => RawValue::Boolean(row.try_get(index)?),
        ("DATE", "TEXT") => RawValue::Date(row.try_get(index)?),
        ("TIME", "TEXT") => RawValue::Time(row.try_get(index)?),
        ("DATETIME", "TEXT") => RawValue::Timestamp(row.try_get(index)?),
        (_, "INTEGER") => RawValue::Long(row.try_get(index)?),
        (_, "REAL") => RawValue::Double(row.try_get(index)?),
        (_, "BLOB") => RawValue::Bytes(row.try_get(index)?),
        _ => RawValue::String(row.try_get(index)?),
    };
    Ok(value)
}

/// SQLite reports its extended result code as the error code.
fn driver_error(error: sqlx::Error) -> JdbcError {
    match &error {
        sqlx::Error::Database(db) => {
            let code = db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .unwrap_or_default();
            JdbcError::new(code, db.message())
        }
        other => JdbcError::new(0, other.to_string()),
    }
}

fn lob_error(error: oxide_dialect::DialectError) -> JdbcError {
    JdbcError::new(0, error.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::results::RowSource;

    async fn executor() -> SqlxExecutor {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, \
             published DATE, available BOOLEAN, price REAL, cover BLOB)",
        )
        .execute(&pool)
        .await
        .unwrap();
        SqlxExecutor::new(pool)
    }

    #[tokio::test]
    async fn test_round_trip_bindings() {
        let executor = executor().await;
        let date = NaiveDate::from_ymd_opt(2020, 5, 17).unwrap();
        let inserted = executor
            .update(
                "INSERT INTO books (id, title, published, available, price, cover) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    Binding::Long(1),
                    Binding::String("Dune".to_string()),
                    Binding::Date(date),
                    Binding::Boolean(true),
                    Binding::Double(9.5),
                    Binding::Bytes(vec![1, 2, 3]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let mut rows = executor
            .query(
                "SELECT id, title, published, available, price, cover FROM books WHERE id = ?",
                &[Binding::Long(1)],
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.column_labels()[1], "title");
        assert!(rows.next_row().unwrap());
        assert!(matches!(rows.raw_value(0).unwrap(), RawValue::Long(1)));
        assert!(matches!(rows.raw_value(1).unwrap(), RawValue::String(s) if s == "Dune"));
        assert!(matches!(rows.raw_value(2).unwrap(), RawValue::Date(d) if d == date));
        assert!(matches!(rows.raw_value(3).unwrap(), RawValue::Boolean(true)));
        assert!(matches!(rows.raw_value(5).unwrap(), RawValue::Bytes(b) if b == vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_null_binding_and_column() {
        let executor = executor().await;
        executor
            .update(
                "INSERT INTO books (id, title, published) VALUES (?, ?, ?)",
                &[
                    Binding::Long(2),
                    Binding::String("Emma".to_string()),
                    Binding::Null(oxide_dialect::TypeCode::Date),
                ],
            )
            .await
            .unwrap();
        let mut rows = executor
            .query("SELECT published FROM books", &[])
            .await
            .unwrap();
        assert!(rows.next_row().unwrap());
        assert!(matches!(rows.raw_value(0).unwrap(), RawValue::Null));
    }

    #[tokio::test]
    async fn test_constraint_violation_carries_result_code() {
        let executor = executor().await;
        let insert = "INSERT INTO books (id, title) VALUES (?, ?)";
        let bindings = [Binding::Long(3), Binding::String("Ulysses".to_string())];
        executor.update(insert, &bindings).await.unwrap();

        let error = executor.update(insert, &bindings).await.unwrap_err();
        // SQLITE_CONSTRAINT_PRIMARYKEY
        assert_eq!(error.vendor_code, 1555);
        assert!(error.message.contains("UNIQUE constraint failed"));
    }
}
