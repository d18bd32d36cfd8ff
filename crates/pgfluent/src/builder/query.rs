//! The fluent query builder.

use crate::builder::assemble::{self, Statement};
use crate::builder::clause::{Clauses, Condition, Connector, Direction, split_columns};
use crate::builder::diff;
use crate::builder::instance::{Instance, Materialized};
use crate::builder::operator::prepare_value_and_operator;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::executor;
use crate::logging::{LogSink, default_sink, report};
use crate::model::{Model, ModelMeta};
use crate::row::{FromRecord, Record};
use crate::value::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Column selection accepted by [`QueryBuilder::only`].
///
/// Strings are split on commas; sequences are taken element-wise. Blank
/// entries are dropped either way.
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        split_columns(self)
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        split_columns(&self)
    }
}

impl IntoColumns for &[&str] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|c| c.to_string()).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|c| c.to_string()).collect()
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

/// Builder for one logical query against one table.
///
/// Methods take `self` by value and return it, so calls chain. Clause
/// errors do not surface from the chain: they are logged and remembered, and
/// the terminal call then yields nothing.
///
/// ```ignore
/// let adults = User::where_op("age", ">", 18)
///     .order_by_desc("name")
///     .limit(10)
///     .get(&db, &[])
///     .await;
/// ```
pub struct QueryBuilder<M = Record> {
    meta: ModelMeta,
    clauses: Clauses,
    build_error: Option<OrmError>,
    sink: Arc<dyn LogSink>,
    timeout: Option<Duration>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            clauses: self.clauses.clone(),
            build_error: self.build_error.clone(),
            sink: Arc::clone(&self.sink),
            timeout: self.timeout,
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for QueryBuilder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("meta", &self.meta)
            .field("clauses", &self.clauses)
            .field("build_error", &self.build_error)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder over a bare table, keyed by `id`, yielding plain records.
pub fn table(name: &str) -> QueryBuilder<Record> {
    QueryBuilder::new(ModelMeta::table(name, "id"))
}

impl<M: Model> QueryBuilder<M> {
    /// Builder for `M`'s table, carrying its fillable columns and defaults.
    pub fn for_model() -> Self {
        Self::new(M::meta())
    }
}

impl<M> QueryBuilder<M> {
    pub fn new(meta: ModelMeta) -> Self {
        Self {
            meta,
            clauses: Clauses::default(),
            build_error: None,
            sink: default_sink(),
            timeout: None,
            _model: PhantomData,
        }
    }

    /// Retarget the builder at another table and primary key.
    pub fn set_data(mut self, table: &str, primary_key: &str) -> Self {
        self.meta.table = table.to_string();
        self.meta.primary_key = primary_key.to_string();
        self
    }

    /// Route warnings and errors to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Per-statement timeout, overriding the client's.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    /// The first clause error recorded on this builder, if any.
    pub fn build_error(&self) -> Option<&OrmError> {
        self.build_error.as_ref()
    }

    fn record_error(&mut self, err: OrmError) {
        report(self.sink.as_ref(), &err);
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    // ==================== WHERE ====================

    /// Append a predicate without validating it.
    pub fn add_predicate(
        mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
        connector: Connector,
    ) -> Self {
        self.clauses
            .add_predicate(column, operator, value.into(), connector);
        self
    }

    fn push_where(
        mut self,
        column: &str,
        operator: &str,
        value: Value,
        connector: Connector,
        used_default_equality: bool,
    ) -> Self {
        match prepare_value_and_operator(value, operator, used_default_equality) {
            Ok((value, operator)) => {
                self.clauses
                    .add_predicate(column, &operator, value, connector)
            }
            Err(err) => self.record_error(err),
        }
        self
    }

    /// `column = value`
    pub fn where_(self, column: &str, value: impl Into<Value>) -> Self {
        self.push_where(column, "=", value.into(), Connector::And, true)
    }

    /// `column <operator> value`
    pub fn where_op(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_where(column, operator, value.into(), Connector::And, false)
    }

    /// `column <operator> value`, joined with `connector`.
    pub fn where_with(
        self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
        connector: Connector,
    ) -> Self {
        self.push_where(column, operator, value.into(), connector, false)
    }

    /// `OR column = value`
    pub fn or_where(self, column: &str, value: impl Into<Value>) -> Self {
        self.push_where(column, "=", value.into(), Connector::Or, true)
    }

    /// `OR column <operator> value`
    pub fn or_where_op(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_where(column, operator, value.into(), Connector::Or, false)
    }

    /// Several predicates at once, each joined with `connector`.
    pub fn where_map<I>(self, conditions: I, connector: Connector) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        conditions
            .into_iter()
            .fold(self, |builder, condition| match condition {
                Condition::Eq(column, value) => {
                    builder.push_where(&column, "=", value, connector, true)
                }
                Condition::Op(column, operator, value) => {
                    builder.push_where(&column, &operator, value, connector, false)
                }
            })
    }

    /// Several `AND` predicates at once.
    pub fn where_conditions(self, conditions: Vec<Condition>) -> Self {
        self.where_map(conditions, Connector::And)
    }

    /// Several `OR` predicates at once.
    pub fn or_where_conditions(self, conditions: Vec<Condition>) -> Self {
        self.where_map(conditions, Connector::Or)
    }

    /// Compose predicates on a scoped builder for the same table.
    ///
    /// The predicates are appended as-is; they are not parenthesized.
    pub fn where_group<F>(mut self, group: F) -> Self
    where
        F: FnOnce(QueryBuilder<M>) -> QueryBuilder<M>,
    {
        let scoped = QueryBuilder::new(self.meta.clone()).with_sink(Arc::clone(&self.sink));
        let scoped = group(scoped);
        self.clauses.predicates.extend(scoped.clauses.predicates);
        if self.build_error.is_none() {
            self.build_error = scoped.build_error;
        }
        self
    }

    // ==================== ORDER BY ====================

    /// Order by `column`; `direction` is `asc` or `desc` in any case.
    ///
    /// Any other direction is logged as a warning and the term is skipped.
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        match Direction::parse(direction) {
            Ok(direction) => self.clauses.add_order(column, direction),
            Err(err) => report(self.sink.as_ref(), &err),
        }
        self
    }

    pub fn order_by_asc(mut self, column: &str) -> Self {
        self.clauses.add_order(column, Direction::Asc);
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.clauses.add_order(column, Direction::Desc);
        self
    }

    /// Newest first, by `column` or the primary key.
    pub fn latest(self, column: Option<&str>) -> Self {
        let column = column.map_or_else(|| self.meta.primary_key.clone(), str::to_string);
        self.order_by_desc(&column)
    }

    /// Oldest first, by `column` or the primary key.
    pub fn oldest(self, column: Option<&str>) -> Self {
        let column = column.map_or_else(|| self.meta.primary_key.clone(), str::to_string);
        self.order_by_asc(&column)
    }

    // ==================== LIMIT / OFFSET / columns ====================

    /// Negative values are ignored.
    pub fn limit(mut self, n: i64) -> Self {
        self.clauses.set_limit(n);
        self
    }

    pub fn take(self, n: i64) -> Self {
        self.limit(n)
    }

    /// Negative values are ignored.
    pub fn offset(mut self, n: i64) -> Self {
        self.clauses.set_offset(n);
        self
    }

    pub fn skip(self, n: i64) -> Self {
        self.offset(n)
    }

    /// Select only `columns`; an empty selection means `*`.
    pub fn only(mut self, columns: impl IntoColumns) -> Self {
        self.clauses.set_columns(columns.into_columns());
        self
    }

    // ==================== Rendering ====================

    fn check(&self) -> OrmResult<()> {
        match &self.build_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// The SELECT this builder would run.
    pub fn to_statement(&self) -> OrmResult<Statement> {
        self.check()?;
        Ok(assemble::select(&self.meta.table, &self.clauses))
    }

    /// SELECT text with `?` placeholders.
    pub fn to_sql(&self) -> String {
        assemble::select(&self.meta.table, &self.clauses).sql
    }

    // ==================== Execution ====================

    /// Log `err` unless it is the clause error already logged by the chain.
    fn settle<T>(&self, result: OrmResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                if self.build_error.is_none() {
                    report(self.sink.as_ref(), &err);
                }
                None
            }
        }
    }

    fn select_columns(&mut self, columns: &[&str]) {
        if !columns.is_empty() {
            self.clauses.set_columns(columns.iter().copied());
        }
    }

    async fn try_fetch(&self, conn: &impl GenericClient) -> OrmResult<Vec<Record>> {
        self.check()?;
        let statement = assemble::select(&self.meta.table, &self.clauses);
        executor::fetch(conn, &statement, self.timeout).await
    }

    fn instance(&self, row: Record) -> Instance<M> {
        Instance::fetched(self.meta.clone(), row, Arc::clone(&self.sink), self.timeout)
    }

    async fn try_first(
        &mut self,
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> OrmResult<Option<Instance<M>>> {
        self.select_columns(columns);
        self.clauses.set_limit(1);
        let rows = self.try_fetch(conn).await?;
        Ok(rows.into_iter().next().map(|row| self.instance(row)))
    }

    /// All matching rows as records.
    ///
    /// `Some(Materialized::Empty)` when nothing matched; `None` when the
    /// statement could not be built or run.
    pub async fn get(
        mut self,
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> Option<Materialized<Record>> {
        self.select_columns(columns);
        let result = self.try_fetch(conn).await.map(Materialized::from_vec);
        self.settle(result)
    }

    /// All matching rows decoded into `T`.
    pub async fn get_as<T: FromRecord>(
        mut self,
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> Option<Materialized<T>> {
        self.select_columns(columns);
        let result = match self.try_fetch(conn).await {
            Ok(rows) => Materialized::from_vec(rows).try_map(|row| T::from_record(&row)),
            Err(err) => Err(err),
        };
        self.settle(result)
    }

    /// All matching rows as change-tracking instances.
    pub async fn get_instances(
        mut self,
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> Option<Materialized<Instance<M>>> {
        self.select_columns(columns);
        let result = self
            .try_fetch(conn)
            .await
            .map(|rows| Materialized::from_vec(rows).map(|row| self.instance(row)));
        self.settle(result)
    }

    /// First matching row.
    pub async fn first(
        mut self,
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> Option<Instance<M>> {
        let result = self.try_first(conn, columns).await;
        self.settle(result).flatten()
    }

    /// First matching row decoded into `T`.
    pub async fn first_as<T: FromRecord>(
        mut self,
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> Option<T> {
        let result = match self.try_first(conn, columns).await {
            Ok(Some(found)) => T::from_record(found.attributes()).map(Some),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };
        self.settle(result).flatten()
    }

    /// First matching row, or whatever `fallback` produces.
    pub async fn first_or<F>(
        self,
        conn: &impl GenericClient,
        columns: &[&str],
        fallback: F,
    ) -> Option<Instance<M>>
    where
        F: FnOnce() -> Option<Instance<M>>,
    {
        match self.first(conn, columns).await {
            Some(found) => Some(found),
            None => fallback(),
        }
    }

    /// First matching row, or [`OrmError::RecordNotFound`].
    ///
    /// Execution failures are logged and returned as well.
    pub async fn first_or_fail(
        mut self,
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> OrmResult<Instance<M>> {
        match self.try_first(conn, columns).await {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(OrmError::RecordNotFound(self.meta.table.clone())),
            Err(err) => {
                if self.build_error.is_none() {
                    report(self.sink.as_ref(), &err);
                }
                Err(err)
            }
        }
    }

    /// Row whose primary key equals `id`.
    pub async fn find(
        self,
        conn: &impl GenericClient,
        id: impl Into<Value>,
        columns: &[&str],
    ) -> Option<Instance<M>> {
        let primary_key = self.meta.primary_key.clone();
        self.where_(&primary_key, id).first(conn, columns).await
    }

    /// Row by primary key, or `fallback` given a fresh builder for the same table.
    pub async fn find_or<F>(
        self,
        conn: &impl GenericClient,
        id: impl Into<Value>,
        columns: &[&str],
        fallback: F,
    ) -> Option<Instance<M>>
    where
        F: FnOnce(QueryBuilder<M>) -> Option<Instance<M>>,
    {
        let fresh = QueryBuilder::new(self.meta.clone()).with_sink(Arc::clone(&self.sink));
        match self.find(conn, id, columns).await {
            Some(found) => Some(found),
            None => fallback(fresh),
        }
    }

    /// Row by primary key, or [`OrmError::RecordNotFound`].
    pub async fn find_or_fail(
        self,
        conn: &impl GenericClient,
        id: impl Into<Value>,
        columns: &[&str],
    ) -> OrmResult<Instance<M>> {
        let primary_key = self.meta.primary_key.clone();
        self.where_(&primary_key, id)
            .first_or_fail(conn, columns)
            .await
    }

    /// Number of matching rows, honoring limit and offset.
    pub async fn count(self, conn: &impl GenericClient) -> Option<u64> {
        let result = async {
            self.check()?;
            let statement = assemble::count(&self.meta.table, &self.clauses);
            let rows = executor::fetch(conn, &statement, self.timeout).await?;
            let counted = rows
                .first()
                .and_then(|row| row.values().next())
                .and_then(Value::as_i64)
                .unwrap_or(0);
            Ok::<_, OrmError>(u64::try_from(counted).unwrap_or(0))
        }
        .await;
        self.settle(result)
    }

    /// Insert `data` restricted to the fillable columns, with defaults filled in.
    ///
    /// Returns the affected row count.
    pub async fn create(self, conn: &impl GenericClient, data: Record) -> Option<u64> {
        let result = async {
            self.check()?;
            let payload = diff::insert_payload(data, &self.meta)?;
            let statement = assemble::insert(&self.meta.table, payload);
            executor::execute(conn, &statement, self.timeout).await
        }
        .await;
        self.settle(result)
    }

    /// Delete the row whose primary key is `id`, within the current predicates.
    ///
    /// Without a key nothing is executed and
    /// [`OrmError::MissingPrimaryKeyForDelete`] is logged.
    pub async fn destroy(mut self, conn: &impl GenericClient, id: Option<Value>) -> Option<u64> {
        let result = async {
            self.check()?;
            let id = id
                .filter(|v| !v.is_null())
                .ok_or_else(|| OrmError::MissingPrimaryKeyForDelete(self.meta.table.clone()))?;
            self.clauses
                .add_predicate(&self.meta.primary_key.clone(), "=", id, Connector::And);
            let statement = assemble::delete(&self.meta.table, &self.clauses.predicates);
            executor::execute(conn, &statement, self.timeout).await
        }
        .await;
        self.settle(result)
    }
}
