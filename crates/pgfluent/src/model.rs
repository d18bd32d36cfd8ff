//! Model metadata and the static entry points built on it.

use crate::builder::{Condition, Instance, Materialized, QueryBuilder};
use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::row::{FromRecord, Record};
use crate::value::Value;

/// Table metadata declared once per entity type.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Model)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: i64,
///     #[orm(fillable)]
///     name: String,
///     #[orm(fillable, default = "active")]
///     status: String,
/// }
/// ```
pub trait Model: FromRecord + Send + Sync + 'static {
    /// Table name
    const TABLE: &'static str;

    /// Primary key column
    const PRIMARY_KEY: &'static str = "id";

    /// Columns callers may populate through `create`. `None` means inserts are refused.
    fn fillable() -> Option<&'static [&'static str]> {
        None
    }

    /// Attributes merged into insert payloads when the caller leaves them out.
    fn defaults() -> Option<Record> {
        None
    }

    /// Resolved metadata for builders.
    fn meta() -> ModelMeta {
        ModelMeta {
            table: Self::TABLE.to_string(),
            primary_key: Self::PRIMARY_KEY.to_string(),
            fillable: Self::fillable().map(|cols| cols.iter().map(|c| c.to_string()).collect()),
            defaults: Self::defaults(),
        }
    }

    /// Fresh builder for this model's table.
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::for_model()
    }

    /// Builder against an ad-hoc table, materializing into this model.
    fn table(name: &str, primary_key: &str) -> QueryBuilder<Self> {
        QueryBuilder::for_model().set_data(name, primary_key)
    }

    /// All rows, optionally restricted to `columns`.
    fn all(
        conn: &impl GenericClient,
        columns: &[&str],
    ) -> impl std::future::Future<Output = Option<Materialized<Record>>> + Send {
        async move { Self::query().get(conn, columns).await }
    }

    /// Row by primary key.
    fn find(
        conn: &impl GenericClient,
        id: impl Into<Value> + Send,
    ) -> impl std::future::Future<Output = Option<Instance<Self>>> + Send {
        async move { Self::query().find(conn, id, &[]).await }
    }

    /// Row by primary key, or the fallback's result.
    fn find_or<F>(
        conn: &impl GenericClient,
        id: impl Into<Value> + Send,
        fallback: F,
    ) -> impl std::future::Future<Output = Option<Instance<Self>>> + Send
    where
        F: FnOnce(QueryBuilder<Self>) -> Option<Instance<Self>> + Send,
    {
        async move {
            match Self::find(conn, id).await {
                Some(found) => Some(found),
                None => fallback(Self::query()),
            }
        }
    }

    /// Row by primary key, or [`OrmError::RecordNotFound`](crate::OrmError::RecordNotFound).
    fn find_or_fail(
        conn: &impl GenericClient,
        id: impl Into<Value> + Send,
    ) -> impl std::future::Future<Output = OrmResult<Instance<Self>>> + Send {
        async move { Self::query().find_or_fail(conn, id, &[]).await }
    }

    /// Builder with one equality predicate.
    fn where_(column: &str, value: impl Into<Value>) -> QueryBuilder<Self> {
        Self::query().where_(column, value)
    }

    /// Builder with one predicate using `operator`.
    fn where_op(column: &str, operator: &str, value: impl Into<Value>) -> QueryBuilder<Self> {
        Self::query().where_op(column, operator, value)
    }

    /// First row matching a single condition.
    fn first_where(
        conn: &impl GenericClient,
        condition: Condition,
    ) -> impl std::future::Future<Output = Option<Instance<Self>>> + Send {
        async move {
            Self::query()
                .where_conditions(vec![condition])
                .first(conn, &[])
                .await
        }
    }

    /// Builder ordered by `column` (default: primary key) descending.
    fn latest(column: Option<&str>) -> QueryBuilder<Self> {
        Self::query().latest(column)
    }

    /// Insert `data`, filtered by the fillable columns; returns affected rows.
    fn create(
        conn: &impl GenericClient,
        data: Record,
    ) -> impl std::future::Future<Output = Option<u64>> + Send {
        async move { Self::query().create(conn, data).await }
    }

    /// Delete by primary key; returns affected rows.
    fn delete(
        conn: &impl GenericClient,
        id: impl Into<Value> + Send,
    ) -> impl std::future::Future<Output = Option<u64>> + Send {
        async move { Self::query().destroy(conn, Some(id.into())).await }
    }
}

/// Metadata resolved from a [`Model`], carried by builders and instances.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMeta {
    pub table: String,
    pub primary_key: String,
    pub fillable: Option<Vec<String>>,
    pub defaults: Option<Record>,
}

impl ModelMeta {
    /// Metadata for a bare table with no fillable columns or defaults.
    pub fn table(table: &str, primary_key: &str) -> Self {
        Self {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            fillable: None,
            defaults: None,
        }
    }
}
