//! Fluent query builder.
//!
//! Clauses accumulate on a [`QueryBuilder`]; a terminal call renders them
//! into a [`Statement`], runs it and shapes the rows.
//!
//! ```ignore
//! use pgfluent::builder::table;
//!
//! let rows = table("users")
//!     .where_op("age", ">", 18)
//!     .order_by_desc("name")
//!     .limit(10)
//!     .get(&db, &[])
//!     .await;
//! ```
//!
//! ## Rendering
//!
//! - WHERE and DELETE use `?` placeholders bound in predicate order.
//! - INSERT and UPDATE use `:column` placeholders.
//! - Adjacent ORDER BY terms with the same direction share one keyword.
//! - LIMIT and OFFSET are only rendered when greater than zero.

pub mod assemble;
pub mod clause;
pub mod diff;
pub mod instance;
pub mod operator;
pub mod query;

pub use assemble::{Params, Statement, StatementKind};
pub use clause::{Condition, Connector, Direction, OrderTerm, Predicate};
pub use instance::{Instance, Materialized};
pub use query::{IntoColumns, QueryBuilder, table};
