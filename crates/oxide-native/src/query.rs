//! The native query facade.
//!
//! A [`NativeQuery`] couples SQL text with a [`ResultSetMapping`], parameter
//! bindings and execution options. Executing it resolves a cached plan,
//! expands list parameters, applies pagination, hints and comments, and
//! reads the rows through the resolved mapping.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use oxide_dialect::{
    Binding, Limit, LimitBind, LockMode, LockOptions, SqlValue, ToSqlValue, TypeCode,
    WrapperOptions,
};
use tracing::debug;

use crate::engine::QueryEngine;
use crate::error::{QueryError, Result};
use crate::executor::StatementExecutor;
use crate::parameter::{
    expand_parameter_lists, ExpansionOptions, ParameterBindings, ParameterInterpretation,
    ParameterKey,
};
use crate::plan::{
    ByAddress, NonSelectPlan, NonSelectPlanKey, ResultListTransformer, SelectPlan, SelectPlanKey,
    TupleTransformer,
};
use crate::results::{
    CancellationCheck, FromResultValue, InstantiationArgument, JoinBuilder, ResultBuilder,
    ResultSetMapping, ResultShape, ResultValue, RootBuilder, RowReader, ScrollableResults, Tuple,
};

/// Whether a statement returns rows.
///
/// `Undetermined` means nothing declared on the query decides it and the
/// SQL text has to be inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectKind {
    Select,
    NonSelect,
    Undetermined,
}

impl SelectKind {
    /// Decides from the leading keyword of `sql`.
    #[must_use]
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match keyword.as_str() {
            "select" | "with" | "values" | "call" => Self::Select,
            "" => Self::Undetermined,
            _ => Self::NonSelect,
        }
    }
}

/// A native SQL query bound to an engine.
#[derive(Clone)]
pub struct NativeQuery<'e> {
    engine: &'e QueryEngine,
    sql: String,
    interpretation: Arc<ParameterInterpretation>,
    bindings: ParameterBindings,
    mapping: ResultSetMapping,
    spaces: BTreeSet<String>,
    tuple_transformer: Option<Arc<TupleTransformer>>,
    list_transformer: Option<Arc<ResultListTransformer>>,
    limit: Limit,
    lock_options: Option<LockOptions>,
    hints: Vec<String>,
    comment: Option<String>,
    read_only: bool,
    tuples: bool,
    cancellation: Option<CancellationCheck>,
}

impl std::fmt::Debug for NativeQuery<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeQuery")
            .field("sql", &self.sql)
            .field("mapping", &self.mapping)
            .field("spaces", &self.spaces)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<'e> NativeQuery<'e> {
    pub(crate) fn new(
        engine: &'e QueryEngine,
        sql: impl Into<String>,
        interpretation: Arc<ParameterInterpretation>,
        mapping: ResultSetMapping,
    ) -> Self {
        let bindings = ParameterBindings::new(interpretation.parameters().clone());
        Self {
            engine,
            sql: sql.into(),
            interpretation,
            bindings,
            mapping,
            spaces: BTreeSet::new(),
            tuple_transformer: None,
            list_transformer: None,
            limit: Limit::default(),
            lock_options: None,
            hints: Vec::new(),
            comment: None,
            read_only: false,
            tuples: false,
            cancellation: None,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub const fn mapping(&self) -> &ResultSetMapping {
        &self.mapping
    }

    #[must_use]
    pub fn parameters(&self) -> &BTreeSet<ParameterKey> {
        self.interpretation.parameters()
    }

    // ----- result builders -----

    /// Reads `column` as a scalar, typed by its value.
    pub fn add_scalar(&mut self, column: &str) -> &mut Self {
        self.mapping.add_scalar(column, None);
        self
    }

    /// Reads `column` as a scalar through the codec for `type_code`.
    pub fn add_scalar_typed(&mut self, column: &str, type_code: TypeCode) -> &mut Self {
        self.mapping.add_scalar(column, Some(type_code));
        self
    }

    /// Adds an entity result under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownEntity`] for an unregistered entity and
    /// [`QueryError::DuplicateAlias`] when `alias` is taken.
    pub fn add_root(&mut self, alias: &str, entity: &str) -> Result<&mut RootBuilder> {
        let mapping = self.engine.metamodel().entity(entity)?;
        self.mapping.add_root(alias, mapping.name())
    }

    /// Adds an entity result; the alias defaults to the unqualified entity
    /// name.
    ///
    /// # Errors
    ///
    /// Same as [`add_root`](Self::add_root).
    pub fn add_entity(
        &mut self,
        alias: Option<&str>,
        entity: &str,
        lock_mode: Option<LockMode>,
    ) -> Result<&mut Self> {
        let mapping = self.engine.metamodel().entity(entity)?;
        let alias = alias.unwrap_or_else(|| mapping.unqualified_name());
        let root = self.mapping.add_root(alias, mapping.name())?;
        if let Some(mode) = lock_mode {
            root.set_lock_mode(mode);
        }
        Ok(self)
    }

    /// Fetches the association at `path` (`owner_alias.property`) under
    /// `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotAPropertyPath`] when `path` has no owner
    /// alias, and [`QueryError::DuplicateAlias`] when `alias` is taken.
    pub fn add_join(&mut self, alias: &str, path: &str) -> Result<&mut JoinBuilder> {
        let (owner, property) = path
            .split_once('.')
            .filter(|(owner, property)| !owner.is_empty() && !property.is_empty())
            .ok_or_else(|| QueryError::NotAPropertyPath(path.to_string()))?;
        self.mapping.add_join(alias, owner, property)
    }

    /// Fetches `owner_alias.property` under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DuplicateAlias`] when `alias` is taken.
    pub fn add_fetch(
        &mut self,
        alias: &str,
        owner_alias: &str,
        property: &str,
    ) -> Result<&mut JoinBuilder> {
        self.mapping.add_join(alias, owner_alias, property)
    }

    /// Hands several columns to `target` per row.
    pub fn add_instantiation(
        &mut self,
        target: &str,
        arguments: Vec<InstantiationArgument>,
    ) -> &mut Self {
        self.mapping.add_result(ResultBuilder::Instantiation {
            target: target.to_string(),
            arguments,
        });
        self
    }

    /// Reads `column` typed like the attribute at `path` of `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownEntity`] for an unregistered entity.
    pub fn add_attribute_result(
        &mut self,
        column: &str,
        entity: &str,
        path: &str,
    ) -> Result<&mut Self> {
        let mapping = self.engine.metamodel().entity(entity)?;
        self.mapping.add_result(ResultBuilder::Attribute {
            entity: mapping.name().to_string(),
            path: path.to_string(),
            column: column.to_string(),
        });
        Ok(self)
    }

    // ----- synchronization -----

    /// Declares a table this query reads or writes.
    pub fn add_synchronized_query_space(&mut self, table: &str) -> &mut Self {
        self.spaces.insert(table.to_string());
        self
    }

    /// Declares the table of `entity` as a query space.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownEntity`] for an unregistered entity.
    pub fn add_synchronized_entity_name(&mut self, entity: &str) -> Result<&mut Self> {
        let mapping = self.engine.metamodel().entity(entity)?;
        self.spaces.insert(mapping.table().to_string());
        Ok(self)
    }

    #[must_use]
    pub const fn synchronized_query_spaces(&self) -> &BTreeSet<String> {
        &self.spaces
    }

    // ----- transformers -----

    pub fn set_tuple_transformer(&mut self, transformer: Arc<TupleTransformer>) -> &mut Self {
        self.tuple_transformer = Some(transformer);
        self
    }

    pub fn set_result_list_transformer(
        &mut self,
        transformer: Arc<ResultListTransformer>,
    ) -> &mut Self {
        self.list_transformer = Some(transformer);
        self
    }

    // ----- parameters -----

    /// # Errors
    ///
    /// Returns [`QueryError::UnknownParameter`] when the SQL does not
    /// declare `key`.
    pub fn set_parameter(
        &mut self,
        key: impl Into<ParameterKey>,
        value: impl ToSqlValue,
    ) -> Result<&mut Self> {
        self.bindings.bind(key, value)?;
        Ok(self)
    }

    /// Binds a list; the placeholder expands to one slot per value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownParameter`] when the SQL does not
    /// declare `key`.
    pub fn set_parameter_list<I, V>(
        &mut self,
        key: impl Into<ParameterKey>,
        values: I,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.bindings.bind_list(key, values)?;
        Ok(self)
    }

    // ----- options -----

    pub fn set_first_result(&mut self, first: u32) -> &mut Self {
        self.limit.first_row = Some(first);
        self
    }

    pub fn set_max_results(&mut self, max: u32) -> &mut Self {
        self.limit.max_rows = Some(max);
        self
    }

    /// Lock options are recorded but not rendered into the SQL; native SQL
    /// carries its own locking clause.
    pub fn set_lock_options(&mut self, options: LockOptions) -> &mut Self {
        self.lock_options = Some(options);
        self
    }

    #[must_use]
    pub const fn lock_options(&self) -> Option<LockOptions> {
        self.lock_options
    }

    pub fn add_query_hint(&mut self, hint: &str) -> &mut Self {
        self.hints.push(hint.to_string());
        self
    }

    pub fn set_comment(&mut self, comment: &str) -> &mut Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn set_read_only(&mut self, read_only: bool) -> &mut Self {
        self.read_only = read_only;
        self
    }

    /// Checked once per row while reading.
    pub fn set_cancellation_check(&mut self, check: CancellationCheck) -> &mut Self {
        self.cancellation = Some(check);
        self
    }

    /// Declared results or read-only mode make this a select; otherwise the
    /// caller has to look at the SQL.
    #[must_use]
    pub fn is_select_query(&self) -> SelectKind {
        if self.mapping.number_of_results() > 0 || self.read_only {
            SelectKind::Select
        } else {
            SelectKind::Undetermined
        }
    }

    /// Converts into a query producing `T` per row.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoResultsForTypedQuery`] when nothing is
    /// declared, [`QueryError::MultipleResultsForTypedQuery`] for more than
    /// one result, and [`QueryError::IncompatibleResultType`] when the single
    /// result cannot produce `T`. Tuple types accept any mapping.
    pub fn typed<T: FromResultValue>(mut self) -> Result<TypedNativeQuery<'e, T>> {
        if T::is_tuple() {
            self.tuples = true;
        } else {
            match self.mapping.results() {
                [] => return Err(QueryError::NoResultsForTypedQuery),
                [single] => {
                    let shape = match single {
                        ResultBuilder::Attribute { .. } => {
                            let resolved = self.mapping.resolve(self.engine.metamodel())?;
                            resolved
                                .shapes()
                                .into_iter()
                                .next()
                                .unwrap_or(ResultShape::Scalar(None))
                        }
                        other => other.shape(),
                    };
                    if !T::accepts(&shape) {
                        return Err(QueryError::IncompatibleResultType {
                            requested: T::result_type_name(),
                            actual: shape.type_name(),
                        });
                    }
                }
                _ => return Err(QueryError::MultipleResultsForTypedQuery),
            }
        }
        Ok(TypedNativeQuery {
            query: self,
            marker: PhantomData,
        })
    }

    // ----- execution -----

    /// Runs the query and returns one value per row.
    ///
    /// A row with a single result yields that result; several results
    /// yield a [`ResultValue::Row`].
    ///
    /// # Errors
    ///
    /// Returns binding, plan, driver and conversion errors.
    pub async fn list<X: StatementExecutor>(&self, executor: &X) -> Result<Vec<ResultValue>> {
        self.bindings.validate()?;
        let dialect = self.engine.dialect();
        let options = self.expansion_options();
        let plan = self.select_plan(options)?;

        let mut values = self.bindings.flatten(self.interpretation.occurrences(), options)?;
        let limited = dialect.limit_handler().apply(&plan.sql, &self.limit);
        values.extend(limited.binds.iter().map(|bind| match bind {
            LimitBind::MaxRows(n) | LimitBind::FirstRow(n) => SqlValue::Int(i64::from(*n)),
        }));
        let sql = self.decorate(limited.sql);
        let bindings = self.bind_values(&values)?;

        let mut source = executor
            .query(&sql, &bindings)
            .await
            .map_err(|error| dialect.convert(error, &sql))?;

        let tuples = self.tuples || self.tuple_transformer.is_some();
        let mut rows = RowReader::new(dialect, &plan.mapping)
            .with_tuples(tuples)
            .with_cancellation(self.cancellation.as_ref())
            .read_all(&mut source)?;

        if let Some(transformer) = &self.tuple_transformer {
            rows = rows
                .into_iter()
                .map(|row| match row {
                    ResultValue::Tuple(tuple) => {
                        let (aliases, values): (Vec<_>, Vec<_>) = tuple
                            .elements()
                            .iter()
                            .map(|e| (e.alias.clone(), e.value.clone()))
                            .unzip();
                        transformer(values, &aliases)
                    }
                    other => transformer(vec![other], &[None]),
                })
                .collect();
        }
        if let Some(transformer) = &self.list_transformer {
            rows = transformer(rows);
        }
        debug!(sql = %sql, rows = rows.len(), "Native query listed");
        Ok(rows)
    }

    /// Runs the query and returns its single row, if any.
    ///
    /// Several rows that are all the same entity count as one.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NonUniqueResult`] for more than one distinct
    /// row, plus everything [`list`](Self::list) returns.
    pub async fn unique_result<X: StatementExecutor>(
        &self,
        executor: &X,
    ) -> Result<Option<ResultValue>> {
        unique(self.list(executor).await?)
    }

    /// Runs the query and returns a cursor over the materialized rows.
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list).
    pub async fn scroll<X: StatementExecutor>(
        &self,
        executor: &X,
    ) -> Result<ScrollableResults<ResultValue>> {
        Ok(ScrollableResults::new(self.list(executor).await?))
    }

    /// Runs an insert, update or delete.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotAnUpdate`] when the query declares results,
    /// plus binding, plan and driver errors.
    pub async fn execute_update<X: StatementExecutor>(&self, executor: &X) -> Result<u64> {
        if self.mapping.number_of_results() > 0 {
            return Err(QueryError::NotAnUpdate);
        }
        self.bindings.validate()?;
        let dialect = self.engine.dialect();
        let options = self.expansion_options();

        let key = (!self.bindings.has_any_multi_valued()).then(|| NonSelectPlanKey {
            sql: self.sql.clone(),
            spaces: self.spaces.clone(),
        });
        let plan = self.engine.plans().resolve_non_select_plan(key, || {
            Ok(NonSelectPlan {
                sql: self.expanded_sql(options),
                affected_spaces: self.spaces.clone(),
            })
        })?;

        let values = self.bindings.flatten(self.interpretation.occurrences(), options)?;
        let sql = self.decorate(plan.sql.clone());
        let bindings = self.bind_values(&values)?;
        let count = executor
            .update(&sql, &bindings)
            .await
            .map_err(|error| dialect.convert(error, &sql))?;
        debug!(sql = %sql, count, spaces = ?plan.affected_spaces, "Native update executed");
        Ok(count)
    }

    fn expansion_options(&self) -> ExpansionOptions {
        ExpansionOptions {
            padding: self.engine.options().in_clause_parameter_padding,
            in_expression_limit: self.engine.dialect().in_expression_count_limit(),
        }
    }

    fn expanded_sql(&self, options: ExpansionOptions) -> String {
        expand_parameter_lists(
            self.interpretation.adjusted_sql(),
            self.interpretation.occurrences(),
            &self.bindings,
            options,
        )
        .into_owned()
    }

    /// List bindings rewrite the SQL, so such plans are never shared.
    fn select_plan(&self, options: ExpansionOptions) -> Result<Arc<SelectPlan>> {
        let key = (!self.bindings.has_any_multi_valued()).then(|| SelectPlanKey {
            sql: self.sql.clone(),
            mapping: self.mapping.clone(),
            spaces: self.spaces.clone(),
            tuple_transformer: self.tuple_transformer.clone().map(ByAddress),
            list_transformer: self.list_transformer.clone().map(ByAddress),
        });
        self.engine.plans().resolve_select_plan(key, || {
            Ok(SelectPlan {
                sql: self.expanded_sql(options),
                mapping: Arc::new(self.mapping.resolve(self.engine.metamodel())?),
                affected_spaces: self.spaces.clone(),
            })
        })
    }

    fn decorate(&self, sql: String) -> String {
        let sql = if self.hints.is_empty() {
            sql
        } else {
            let hints: Vec<&str> = self.hints.iter().map(String::as_str).collect();
            self.engine.dialect().query_hint(&sql, &hints)
        };
        if let Some(comment) = &self.comment {
            return format!("/* {} */ {sql}", comment.replace("*/", "* /"));
        }
        sql
    }

    fn bind_values(&self, values: &[SqlValue]) -> Result<Vec<Binding>> {
        let dialect = self.engine.dialect();
        let options = WrapperOptions::default();
        values
            .iter()
            .map(|value| {
                dialect
                    .codec(value.natural_type_code())
                    .bind(value, &options)
                    .map_err(QueryError::from)
            })
            .collect()
    }
}

fn unique(mut rows: Vec<ResultValue>) -> Result<Option<ResultValue>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let same = rows.iter().all(|row| match (row, first) {
        (ResultValue::Entity(a), ResultValue::Entity(b)) => Arc::ptr_eq(a, b),
        _ => false,
    });
    if rows.len() > 1 && !same {
        return Err(QueryError::NonUniqueResult(rows.len()));
    }
    Ok(Some(rows.swap_remove(0)))
}

/// A native query producing `T` per row.
#[derive(Debug, Clone)]
pub struct TypedNativeQuery<'e, T> {
    query: NativeQuery<'e>,
    marker: PhantomData<fn() -> T>,
}

impl<'e, T: FromResultValue> TypedNativeQuery<'e, T> {
    #[must_use]
    pub const fn query(&self) -> &NativeQuery<'e> {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut NativeQuery<'e> {
        &mut self.query
    }

    /// # Errors
    ///
    /// Returns [`QueryError::UnknownParameter`] when the SQL does not
    /// declare `key`.
    pub fn set_parameter(
        &mut self,
        key: impl Into<ParameterKey>,
        value: impl ToSqlValue,
    ) -> Result<&mut Self> {
        self.query.set_parameter(key, value)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`QueryError::UnknownParameter`] when the SQL does not
    /// declare `key`.
    pub fn set_parameter_list<I, V>(
        &mut self,
        key: impl Into<ParameterKey>,
        values: I,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.query.set_parameter_list(key, values)?;
        Ok(self)
    }

    pub fn set_first_result(&mut self, first: u32) -> &mut Self {
        self.query.set_first_result(first);
        self
    }

    pub fn set_max_results(&mut self, max: u32) -> &mut Self {
        self.query.set_max_results(max);
        self
    }

    /// # Errors
    ///
    /// Same as [`NativeQuery::list`], plus conversion errors.
    pub async fn list<X: StatementExecutor>(&self, executor: &X) -> Result<Vec<T>> {
        self.query
            .list(executor)
            .await?
            .into_iter()
            .map(T::from_result_value)
            .collect()
    }

    /// # Errors
    ///
    /// Same as [`NativeQuery::unique_result`], plus conversion errors.
    pub async fn unique_result<X: StatementExecutor>(&self, executor: &X) -> Result<Option<T>> {
        self.query
            .unique_result(executor)
            .await?
            .map(T::from_result_value)
            .transpose()
    }

    /// # Errors
    ///
    /// Same as [`NativeQuery::scroll`], plus conversion errors.
    pub async fn scroll<X: StatementExecutor>(&self, executor: &X) -> Result<ScrollableResults<T>> {
        Ok(ScrollableResults::new(self.list(executor).await?))
    }
}

impl TypedNativeQuery<'_, Tuple> {
    /// Aliases the tuple elements will carry, in order.
    #[must_use]
    pub fn tuple_aliases(&self) -> Vec<Option<String>> {
        self.query
            .mapping
            .results()
            .iter()
            .map(|r| r.alias().map(str::to_string))
            .collect()
    }
}
