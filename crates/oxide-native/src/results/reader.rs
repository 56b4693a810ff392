//! Turning raw rows into result values.

use std::collections::HashMap;
use std::sync::Arc;

use oxide_dialect::{Dialect, RawValue, TypeCode};
use tracing::trace;

use super::mapping::{ColumnRef, EntityRead, ResolvedMapping, ResolvedResult, ScalarRead, ValueRead};
use super::tuple::{Tuple, TupleElement};
use super::value::{Composite, EntityInstance, ResultValue};
use crate::error::{QueryError, Result};

/// A cursor over driver rows with per-column raw access.
pub trait RowSource {
    /// Column labels in select-list order.
    fn column_labels(&self) -> &[String];

    /// Moves to the next row; `false` once the rows are exhausted.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    fn next_row(&mut self) -> Result<bool>;

    /// Column `index` of the current row.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownColumn`] for an index past the last
    /// column, or when no row is current.
    fn raw_value(&self, index: usize) -> Result<RawValue>;
}

/// Rows already fetched into memory.
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    labels: Vec<String>,
    rows: Vec<Vec<RawValue>>,
    current: Option<usize>,
}

impl VecRowSource {
    #[must_use]
    pub const fn new(labels: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            labels,
            rows,
            current: None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for VecRowSource {
    fn column_labels(&self) -> &[String] {
        &self.labels
    }

    fn next_row(&mut self) -> Result<bool> {
        let next = self.current.map_or(0, |i| i + 1);
        self.current = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn raw_value(&self, index: usize) -> Result<RawValue> {
        self.current
            .and_then(|row| self.rows.get(row))
            .and_then(|row| row.get(index))
            .cloned()
            .ok_or_else(|| QueryError::UnknownColumn(format!("#{index}")))
    }
}

/// Checked once per row; returning `true` aborts the read.
pub type CancellationCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Reads every row of a source through a resolved mapping.
pub struct RowReader<'a> {
    dialect: &'a Dialect,
    mapping: &'a ResolvedMapping,
    tuples: bool,
    cancellation: Option<&'a CancellationCheck>,
}

impl<'a> RowReader<'a> {
    #[must_use]
    pub const fn new(dialect: &'a Dialect, mapping: &'a ResolvedMapping) -> Self {
        Self {
            dialect,
            mapping,
            tuples: false,
            cancellation: None,
        }
    }

    /// Produces a [`Tuple`] per row.
    #[must_use]
    pub const fn with_tuples(mut self, tuples: bool) -> Self {
        self.tuples = tuples;
        self
    }

    #[must_use]
    pub const fn with_cancellation(mut self, check: Option<&'a CancellationCheck>) -> Self {
        self.cancellation = check;
        self
    }

    /// Materializes all rows.
    ///
    /// Rows referencing the same entity identifier share one
    /// [`EntityInstance`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Cancelled`] when the cancellation check fires,
    /// [`QueryError::UnknownColumn`] for a label missing from the result
    /// set, and codec or driver errors.
    pub fn read_all(&self, source: &mut dyn RowSource) -> Result<Vec<ResultValue>> {
        let mut context = ReadContext::new(self.dialect, source.column_labels());
        let mut rows = Vec::new();
        while source.next_row()? {
            if self.cancellation.is_some_and(|check| check()) {
                return Err(QueryError::Cancelled);
            }
            rows.push(self.read_row(&mut context, source)?);
        }
        trace!(
            rows = rows.len(),
            entities = context.identity_map.len(),
            "Read result set"
        );
        Ok(rows)
    }

    fn read_row(
        &self,
        context: &mut ReadContext<'_>,
        source: &dyn RowSource,
    ) -> Result<ResultValue> {
        let mut values = Vec::new();
        let mut aliases = Vec::new();

        if self.mapping.is_implicit() {
            for (index, label) in source.column_labels().iter().enumerate() {
                values.push(context.natural(source.raw_value(index)?)?);
                aliases.push(Some(label.clone()));
            }
        } else {
            for (result, alias) in self.mapping.results().iter().zip(self.mapping.aliases()) {
                values.push(context.result(result, source)?);
                aliases.push(alias.clone());
            }
        }

        if self.tuples {
            let elements = aliases
                .into_iter()
                .zip(values)
                .map(|(alias, value)| TupleElement { alias, value })
                .collect();
            return Ok(ResultValue::Tuple(Tuple::new(elements)));
        }
        if values.len() == 1 {
            return Ok(values.pop().unwrap_or(ResultValue::Null));
        }
        Ok(ResultValue::Row(values))
    }
}

/// Per-execution state; dropped when the read finishes.
struct ReadContext<'d> {
    dialect: &'d Dialect,
    /// Lower-cased label to first column index.
    columns: HashMap<String, usize>,
    identity_map: HashMap<(String, String), Arc<EntityInstance>>,
}

impl<'d> ReadContext<'d> {
    fn new(dialect: &'d Dialect, labels: &[String]) -> Self {
        let mut columns = HashMap::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            columns.entry(label.to_lowercase()).or_insert(index);
        }
        Self {
            dialect,
            columns,
            identity_map: HashMap::new(),
        }
    }

    fn index_of(&self, column: &ColumnRef) -> Result<usize> {
        column
            .candidates()
            .iter()
            .find_map(|label| self.columns.get(&label.to_lowercase()).copied())
            .ok_or_else(|| QueryError::UnknownColumn(column.label().to_string()))
    }

    fn natural(&self, raw: RawValue) -> Result<ResultValue> {
        let code = natural_type_code(&raw);
        let value = self.dialect.codec(code).extract(raw)?;
        Ok(ResultValue::from_sql(value))
    }

    fn scalar(&self, read: &ScalarRead, source: &dyn RowSource) -> Result<ResultValue> {
        let raw = source.raw_value(self.index_of(&read.column)?)?;
        match read.type_code {
            Some(code) => {
                let value = self.dialect.codec(code).extract(raw)?;
                Ok(ResultValue::from_sql(value))
            }
            None => self.natural(raw),
        }
    }

    fn result(&mut self, result: &ResolvedResult, source: &dyn RowSource) -> Result<ResultValue> {
        match result {
            ResolvedResult::Scalar(read) => self.scalar(read, source),
            ResolvedResult::Entity(read) => self.entity(read, source),
            ResolvedResult::Instantiation { target, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(|a| self.scalar(a, source))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ResultValue::Instantiation {
                    target: target.clone(),
                    arguments,
                })
            }
        }
    }

    fn value(&mut self, read: &ValueRead, source: &dyn RowSource) -> Result<ResultValue> {
        match read {
            ValueRead::Basic(scalar) => self.scalar(scalar, source),
            ValueRead::Composite { name, parts } => {
                let mut values = Vec::with_capacity(parts.len());
                for (part, read) in parts {
                    if matches!(read, ValueRead::Unloaded) {
                        continue;
                    }
                    values.push((part.clone(), self.value(read, source)?));
                }
                // an embeddable with only null columns is itself null
                if values.iter().all(|(_, v)| v.is_null()) {
                    return Ok(ResultValue::Null);
                }
                Ok(ResultValue::Composite(Composite {
                    name: name.clone(),
                    values,
                }))
            }
            ValueRead::Entity(read) => self.entity(read, source),
            ValueRead::Unloaded => Ok(ResultValue::Null),
        }
    }

    fn entity(&mut self, read: &EntityRead, source: &dyn RowSource) -> Result<ResultValue> {
        let id = self.value(&read.identifier.value, source)?;
        if id.is_null() {
            return Ok(ResultValue::Null);
        }

        let key = (read.entity.name().to_string(), id.identity_key());
        if let Some(existing) = self.identity_map.get(&key) {
            return Ok(ResultValue::Entity(Arc::clone(existing)));
        }

        let mut attributes = Vec::with_capacity(read.fetches.len());
        for fetch in &read.fetches {
            if matches!(fetch.value, ValueRead::Unloaded) {
                continue;
            }
            attributes.push((fetch.attribute.clone(), self.value(&fetch.value, source)?));
        }

        let instance = Arc::new(EntityInstance {
            entity: read.entity.name().to_string(),
            id,
            id_attribute: read
                .entity
                .identifier()
                .attribute_name()
                .map(str::to_string),
            attributes,
        });
        self.identity_map.insert(key, Arc::clone(&instance));
        Ok(ResultValue::Entity(instance))
    }
}

/// Type code whose codec reads a raw value without conversion.
const fn natural_type_code(raw: &RawValue) -> TypeCode {
    match raw {
        RawValue::Null | RawValue::String(_) => TypeCode::Varchar,
        RawValue::Boolean(_) => TypeCode::Boolean,
        RawValue::Long(_) => TypeCode::BigInt,
        RawValue::Double(_) => TypeCode::Double,
        RawValue::Decimal(_) => TypeCode::Decimal,
        RawValue::Bytes(_) => TypeCode::Varbinary,
        RawValue::Date(_) => TypeCode::Date,
        RawValue::Time(_) => TypeCode::Time,
        RawValue::Timestamp(_) => TypeCode::Timestamp,
        RawValue::Blob(_) => TypeCode::Blob,
        RawValue::Clob(_) => TypeCode::Clob,
        RawValue::NClob(_) => TypeCode::NClob,
    }
}
