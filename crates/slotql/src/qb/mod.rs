//! Slot-based query builder.
//!
//! A statement is a fixed set of clause slots (SELECT, FROM, WHERE, GROUP,
//! HAVING, ORDER, LIMIT, OFFSET) plus a map of named `:placeholder` binds.
//! Slots always render in that order, whatever order the setters ran in.
//!
//! # Usage
//!
//! ```ignore
//! use slotql::qb::{self, Fields, raw};
//!
//! // SELECT
//! let built = qb::select("*")
//!     .from("users")
//!     .filter(Fields::new().set("status", "active").cmp("age", ">", 18))?
//!     .order("created_at DESC")
//!     .limit(20)
//!     .build();
//!
//! // INSERT with created_at/updated_at
//! let built = qb::insert_with_timestamps(
//!     "users",
//!     Fields::new().set("username", "alice").set("email", "alice@example.com"),
//! )?
//! .build();
//!
//! // UPDATE
//! let built = qb::update(
//!     "users",
//!     Fields::new().set("status", "inactive").set("seen_at", raw("NOW()")),
//!     Fields::new().set("id", 7),
//! )?
//! .build();
//!
//! // COUNT over an existing select
//! let built = qb::select("id, name").from("users").limit(10).to_count()?.build();
//! assert_eq!(built.sql, "SELECT COUNT(*) FROM users");
//! ```

mod bind;
mod builder;
mod classify;
mod parts;
mod prepare;

pub use bind::{BindMap, placeholder_for};
pub use builder::{Built, CREATED_AT, Method, QueryBuilder, UPDATED_AT};
pub use classify::{
    Arg, Classified, RAW_CLOSE, RAW_OPEN, classify, cmp, decode_raw, raw,
};
pub use parts::{IntoClause, Part, Parts, replace_prefix};
pub use prepare::{Fields, Key, Prepared, prepare};

use crate::batch::BatchInsert;
use crate::error::QbResult;

/// Create a SELECT builder. `"*"` and `"SELECT *"` are equivalent.
///
/// # Example
/// ```ignore
/// let qb = slotql::qb::select("SELECT * FROM users").filter(Fields::new().set("id", 110))?;
/// ```
pub fn select(sql: &str) -> QueryBuilder {
    QueryBuilder::select(sql)
}

/// Create a builder for hand-written SQL, used verbatim.
///
/// Bind its `:name` placeholders with [`QueryBuilder::bind`].
pub fn query(sql: &str) -> QueryBuilder {
    QueryBuilder::query(sql)
}

/// Create an INSERT builder from a column mapping.
pub fn insert(table: &str, data: Fields) -> QbResult<QueryBuilder> {
    QueryBuilder::insert(table, data)
}

/// Create an INSERT builder that also fills `created_at` and `updated_at`.
pub fn insert_with_timestamps(table: &str, data: Fields) -> QbResult<QueryBuilder> {
    QueryBuilder::insert_with_timestamps(table, data)
}

/// Create an UPDATE builder.
///
/// # Safety
/// Empty `conditions` are rejected; whole-table updates go through [`query`].
pub fn update(table: &str, data: Fields, conditions: Fields) -> QbResult<QueryBuilder> {
    QueryBuilder::update(table, data, conditions)
}

/// Create an UPDATE builder that also sets `updated_at`.
pub fn update_with_timestamps(
    table: &str,
    data: Fields,
    conditions: Fields,
) -> QbResult<QueryBuilder> {
    QueryBuilder::update_with_timestamps(table, data, conditions)
}

/// Create a DELETE builder with an optional LIMIT.
///
/// # Safety
/// Empty `conditions` are rejected; use [`truncate`] to clear a table.
pub fn delete(table: &str, conditions: Fields, limit: Option<u64>) -> QbResult<QueryBuilder> {
    QueryBuilder::delete(table, conditions, limit)
}

/// Create a `TRUNCATE TABLE` builder.
pub fn truncate(table: &str) -> QueryBuilder {
    QueryBuilder::truncate(table)
}

/// Create a chunked multi-row INSERT builder.
///
/// # Example
/// ```ignore
/// let built = slotql::qb::insert_multi("t", ["a", "b"])
///     .rows(vec![vec![1, 2], vec![3, 4], vec![5, 6]])
///     .chunk_size(2)
///     .build()?;
/// assert_eq!(built.batch.unwrap().len(), 2);
/// ```
pub fn insert_multi<I, S>(table: &str, columns: I) -> BatchInsert
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    BatchInsert::new(table, columns)
}
