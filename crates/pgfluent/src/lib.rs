//! # pgfluent
//!
//! A fluent query builder and row mapper for Postgres.
//!
//! ## Features
//!
//! - **Fluent clauses**: filters, ordering and pagination chain on a [`QueryBuilder`]
//! - **Validated operators**: unknown operators and NULL comparisons that can never match are refused
//! - **Change tracking**: fetched rows remember their original state and `save()` writes only dirty columns
//! - **Guarded inserts**: `create()` only writes the columns a model declares fillable
//! - **Quiet failures**: builder errors are logged through a [`LogSink`] and surface as `None`
//! - **Lazy pooling**: [`Database`] builds its pool once, on first use
//!
//! ## Models
//!
//! ```ignore
//! use pgfluent::{Database, Model, record};
//!
//! #[derive(Model)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     id: i64,
//!     #[orm(fillable)]
//!     name: String,
//!     #[orm(fillable, default = "active")]
//!     status: String,
//! }
//!
//! let db = Database::from_env()?;
//!
//! // SELECT * FROM users WHERE id = $1 LIMIT 1
//! let mut user = User::find(&db, 5).await.ok_or("missing")?;
//!
//! // UPDATE users SET name = $1 WHERE id = 5
//! user.set("name", "bob");
//! user.save(&db).await;
//!
//! // INSERT INTO users (name, status) VALUES ($1, $2)
//! User::create(&db, record! { "name" => "alice" }).await;
//!
//! // SELECT * FROM users WHERE status = $1 ORDER BY name DESC LIMIT 10
//! let page = User::where_("status", "active")
//!     .order_by_desc("name")
//!     .limit(10)
//!     .get(&db, &[])
//!     .await;
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod model;
pub mod row;
pub mod value;

pub use builder::{
    Condition, Connector, Direction, Instance, Materialized, QueryBuilder, Statement,
    StatementKind, table,
};
pub use client::GenericClient;
pub use config::DatabaseConfig;
pub use error::{OrmError, OrmResult, Severity};
pub use logging::{LogSink, TracingSink, init_file_logging};
pub use model::{Model, ModelMeta};
pub use row::{FromRecord, Record, RecordExt};
pub use value::{FromValue, ParamKind, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{Database, create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use pgfluent_derive::Model;
