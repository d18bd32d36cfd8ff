//! Fetched rows bound to their model, and result shaping.

use crate::builder::{assemble, clause::Connector, clause::Predicate, diff};
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::executor;
use crate::logging::{LogSink, report};
use crate::model::ModelMeta;
use crate::row::{FromRecord, Record, RecordExt};
use crate::value::{FromValue, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Shape of a fetch result: nothing, exactly one row, or several.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized<T> {
    Empty,
    One(T),
    Many(Vec<T>),
}

impl<T> Materialized<T> {
    pub fn from_vec(mut items: Vec<T>) -> Self {
        match items.len() {
            0 => Materialized::Empty,
            1 => match items.pop() {
                Some(item) => Materialized::One(item),
                None => Materialized::Empty,
            },
            _ => Materialized::Many(items),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Materialized::Empty => 0,
            Materialized::One(_) => 1,
            Materialized::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            Materialized::Empty => None,
            Materialized::One(item) => Some(item),
            Materialized::Many(items) => items.first(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Materialized::Empty => Vec::new(),
            Materialized::One(item) => vec![item],
            Materialized::Many(items) => items,
        }
    }

    /// Convert every item, stopping at the first failure.
    pub fn try_map<U, F>(self, f: F) -> OrmResult<Materialized<U>>
    where
        F: FnMut(T) -> OrmResult<U>,
    {
        let items = self.into_vec().into_iter().map(f).collect::<OrmResult<Vec<_>>>()?;
        Ok(Materialized::from_vec(items))
    }

    pub fn map<U, F>(self, f: F) -> Materialized<U>
    where
        F: FnMut(T) -> U,
    {
        Materialized::from_vec(self.into_vec().into_iter().map(f).collect())
    }
}

impl<T> IntoIterator for Materialized<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

/// A fetched row, tracking its changes against the state it was fetched in.
///
/// ```ignore
/// let mut user = User::find(&db, 5).await?;
/// user.set("name", "bob");
/// user.save(&db).await;
/// ```
pub struct Instance<M = Record> {
    meta: ModelMeta,
    current: Record,
    original: Record,
    sink: Arc<dyn LogSink>,
    timeout: Option<Duration>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Instance<M> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            current: self.current.clone(),
            original: self.original.clone(),
            sink: Arc::clone(&self.sink),
            timeout: self.timeout,
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Instance<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("table", &self.meta.table)
            .field("current", &self.current)
            .field("original", &self.original)
            .finish()
    }
}

impl<M> Instance<M> {
    /// Wrap a freshly fetched row; the snapshot is taken here.
    pub(crate) fn fetched(
        meta: ModelMeta,
        row: Record,
        sink: Arc<dyn LogSink>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            meta,
            original: row.clone(),
            current: row,
            sink,
            timeout,
            _model: PhantomData,
        }
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.current.get(column)
    }

    /// Typed column access.
    pub fn get_as<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        self.current.try_get_column(column)
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.current.insert(column.to_string(), value.into());
        self
    }

    /// Current attributes, including unsaved changes.
    pub fn attributes(&self) -> &Record {
        &self.current
    }

    /// Attributes as last fetched or saved.
    pub fn original(&self) -> &Record {
        &self.original
    }

    pub fn into_attributes(self) -> Record {
        self.current
    }

    /// Primary key value from the snapshot.
    pub fn key(&self) -> Option<&Value> {
        self.original
            .get(&self.meta.primary_key)
            .filter(|v| !v.is_null())
    }

    /// Changed columns.
    pub fn dirty(&self) -> Record {
        diff::dirty_fields(&self.current, &self.original)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    /// Write changed columns back.
    ///
    /// Returns the affected row count; `Some(0)` without touching the database
    /// when nothing changed. Failures are logged and yield `None`.
    pub async fn save(&mut self, conn: &impl GenericClient) -> Option<u64> {
        match self.try_save(conn).await {
            Ok(affected) => Some(affected),
            Err(err) => {
                report(self.sink.as_ref(), &err);
                None
            }
        }
    }

    async fn try_save(&mut self, conn: &impl GenericClient) -> OrmResult<u64> {
        let key = self
            .key()
            .cloned()
            .ok_or_else(|| OrmError::NoAssociatedRecord(self.meta.table.clone()))?;
        let payload = diff::update_payload(&self.current, &self.original, &self.meta.primary_key);
        if payload.is_empty() {
            return Ok(0);
        }

        let statement = assemble::update(&self.meta.table, &self.meta.primary_key, &key, payload);
        let affected = executor::execute(conn, &statement, self.timeout).await?;
        let mut snapshot = self.current.clone();
        snapshot.insert(self.meta.primary_key.clone(), key);
        self.original = snapshot;
        Ok(affected)
    }

    /// Delete this row by its primary key.
    pub async fn destroy(&self, conn: &impl GenericClient) -> Option<u64> {
        let result = match self.key() {
            Some(key) => {
                let by_key = [Predicate {
                    column: self.meta.primary_key.clone(),
                    operator: "=".to_string(),
                    value: key.clone(),
                    connector: Connector::And,
                }];
                let statement = assemble::delete(&self.meta.table, &by_key);
                executor::execute(conn, &statement, self.timeout).await
            }
            None => Err(OrmError::MissingPrimaryKeyForDelete(self.meta.table.clone())),
        };
        match result {
            Ok(affected) => Some(affected),
            Err(err) => {
                report(self.sink.as_ref(), &err);
                None
            }
        }
    }
}

impl<M: FromRecord> Instance<M> {
    /// Decode the current attributes into the model type.
    pub fn model(&self) -> OrmResult<M> {
        M::from_record(&self.current)
    }
}
