//! Generic client trait for unified database access.

use crate::error::{OrmError, OrmResult};
use crate::executor::with_timeout;
use crate::row::{Record, record_from_row};
use crate::value::Value;
use std::time::Duration;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients, transactions and the pooled [`Database`](crate::Database).
///
/// SQL handed to a client is already numbered (`$1, $2, ...`) and `params`
/// line up with those placeholders.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows as records.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Return a cancellation token for the underlying connection, if supported.
    ///
    /// Used for best-effort server-side cancellation when a timeout triggers.
    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        None
    }

    /// Timeout applied to statements that do not set their own.
    fn query_timeout(&self) -> Option<Duration> {
        None
    }

    /// [`query`](Self::query) bounded by `timeout`, cancelling on the server when it expires.
    ///
    /// Handles that check out a connection per call override this so the
    /// cancel reaches the connection actually running the statement.
    fn query_with_timeout(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send {
        with_timeout(self, timeout, self.query(sql, params))
    }

    /// [`execute`](Self::execute) bounded by `timeout`.
    fn execute_with_timeout(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        with_timeout(self, timeout, self.execute(sql, params))
    }
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        let rows = tokio_postgres::Client::query(self, sql, &param_refs(params))
            .await
            .map_err(OrmError::from_db_error)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Client::execute(self, sql, &param_refs(params))
            .await
            .map_err(OrmError::from_db_error)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Client::cancel_token(self))
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        let rows = tokio_postgres::Transaction::query(self, sql, &param_refs(params))
            .await
            .map_err(OrmError::from_db_error)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, &param_refs(params))
            .await
            .map_err(OrmError::from_db_error)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Transaction::cancel_token(self))
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        GenericClient::query(&***self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        GenericClient::execute(&***self, sql, params).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        GenericClient::cancel_token(&***self)
    }
}

impl<C: GenericClient> GenericClient for &C {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        (**self).query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        (**self).execute(sql, params).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        (**self).cancel_token()
    }

    fn query_timeout(&self) -> Option<Duration> {
        (**self).query_timeout()
    }

    async fn query_with_timeout(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> OrmResult<Vec<Record>> {
        (**self).query_with_timeout(sql, params, timeout).await
    }

    async fn execute_with_timeout(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> OrmResult<u64> {
        (**self).execute_with_timeout(sql, params, timeout).await
    }
}
