//! Statement execution: placeholder rewrite, timeout and tracing.

use crate::builder::{Params, Statement};
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::value::{ParamKind, Value};
use std::future::Future;
use std::time::Duration;

/// Run `future`, bounded by `timeout` when one is set.
///
/// On expiry a server-side cancel is sent in the background through the
/// client's cancel token, if it has one.
pub async fn with_timeout<C, T, F>(conn: &C, timeout: Option<Duration>, future: F) -> OrmResult<T>
where
    C: GenericClient + ?Sized,
    F: Future<Output = OrmResult<T>> + Send,
{
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, future).await.map_err(|_| {
            if let Some(cancel_token) = conn.cancel_token() {
                tokio::spawn(async move {
                    let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                });
            }
            OrmError::Timeout(timeout)
        })?,
        None => future.await,
    }
}

fn bind(statement: &Statement) -> OrmResult<(String, Vec<Value>)> {
    let (sql, values) = statement.to_postgres()?;
    let kinds: Vec<ParamKind> = match &statement.params {
        Params::Positional(_) => values.iter().map(Value::kind).collect(),
        Params::Named(_) => Vec::new(),
    };
    tracing::debug!(
        target: "pgfluent.sql",
        kind = %statement.kind,
        sql = %sql,
        param_count = values.len(),
        param_kinds = ?kinds,
        "executing statement"
    );
    Ok((sql, values))
}

/// Run a row-returning statement.
pub async fn fetch<C>(conn: &C, statement: &Statement, timeout: Option<Duration>) -> OrmResult<Vec<Record>>
where
    C: GenericClient + ?Sized,
{
    let (sql, values) = bind(statement)?;
    let timeout = timeout.or_else(|| conn.query_timeout());
    conn.query_with_timeout(&sql, &values, timeout).await
}

/// Run a statement and return the affected row count.
pub async fn execute<C>(conn: &C, statement: &Statement, timeout: Option<Duration>) -> OrmResult<u64>
where
    C: GenericClient + ?Sized,
{
    let (sql, values) = bind(statement)?;
    let timeout = timeout.or_else(|| conn.query_timeout());
    conn.execute_with_timeout(&sql, &values, timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StatementKind;

    struct SlowClient;

    impl GenericClient for SlowClient {
        async fn query(&self, _: &str, _: &[Value]) -> OrmResult<Vec<Record>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }

        async fn execute(&self, _: &str, _: &[Value]) -> OrmResult<u64> {
            Ok(1)
        }

        fn query_timeout(&self) -> Option<Duration> {
            Some(Duration::from_millis(10))
        }
    }

    /// Runs statements on a connection it picks per call, like the pooled handle.
    #[derive(Default)]
    struct PerCallClient {
        timeouts: std::sync::Mutex<Vec<Option<Duration>>>,
    }

    impl GenericClient for PerCallClient {
        async fn query(&self, _: &str, _: &[Value]) -> OrmResult<Vec<Record>> {
            Ok(vec![])
        }

        async fn execute(&self, _: &str, _: &[Value]) -> OrmResult<u64> {
            Ok(0)
        }

        fn query_timeout(&self) -> Option<Duration> {
            Some(Duration::from_secs(2))
        }

        async fn query_with_timeout(
            &self,
            sql: &str,
            params: &[Value],
            timeout: Option<Duration>,
        ) -> OrmResult<Vec<Record>> {
            self.timeouts.lock().unwrap().push(timeout);
            self.query(sql, params).await
        }
    }

    fn statement() -> Statement {
        Statement {
            kind: StatementKind::Select,
            sql: "SELECT * FROM t WHERE id = ?".to_string(),
            params: Params::Positional(vec![Value::Int(1)]),
        }
    }

    #[tokio::test]
    async fn client_timeout_applies_when_statement_has_none() {
        let err = fetch(&SlowClient, &statement(), None).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn explicit_timeout_wins() {
        let err = fetch(&SlowClient, &statement(), Some(Duration::from_millis(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::Timeout(d) if d == Duration::from_millis(1)));
    }

    #[tokio::test]
    async fn execute_returns_affected_rows() {
        assert_eq!(execute(&SlowClient, &statement(), None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn timeout_is_handed_to_the_client_that_runs_the_statement() {
        let client = PerCallClient::default();
        fetch(&&client, &statement(), None).await.unwrap();
        fetch(&client, &statement(), Some(Duration::from_millis(5))).await.unwrap();
        assert_eq!(
            *client.timeouts.lock().unwrap(),
            vec![Some(Duration::from_secs(2)), Some(Duration::from_millis(5))]
        );
    }
}
