//! Derive macros for pgfluent
//!
//! Provides `#[derive(Model)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod model;

/// Derive `Model` and `FromRecord` for a struct.
///
/// # Example
///
/// ```ignore
/// use pgfluent::Model;
///
/// #[derive(Model)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     user_id: i64,
///     #[orm(fillable)]
///     username: String,
///     #[orm(fillable, column = "email_address")]
///     email: Option<String>,
///     #[orm(fillable, default = "active")]
///     status: String,
/// }
/// ```
///
/// # Generated
///
/// - `TABLE` and `PRIMARY_KEY`
/// - `fn fillable()` when at least one field is fillable
/// - `fn defaults()` when at least one field has a default
/// - `FromRecord::from_record`, reading each field by column name
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (default: snake case type name plus `s`)
/// - `#[orm(primary_key = "name")]` - Primary key column on the struct
/// - `#[orm(id)]` - Mark field as primary key
/// - `#[orm(column = "name")]` - Map field to different column name
/// - `#[orm(fillable)]` - Allow `create()` to write this column
/// - `#[orm(default = <literal>)]` - Inserted when `create()` data leaves the column out
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
