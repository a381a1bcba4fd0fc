//! # slotql
//!
//! A slot-ordered SQL statement builder for Rust, with a small Postgres executor.
//!
//! ## Features
//!
//! - **Fixed clause order**: SELECT, FROM, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT and
//!   OFFSET render in SQL order no matter which setter ran first
//! - **Named binds**: column mappings become `:column` placeholders plus a bind map;
//!   colliding placeholders are reported instead of silently overwritten
//! - **Raw fragments**: values wrapped with [`qb::raw`] are inlined and never bound
//! - **Count rewriting**: turn any select into `SELECT COUNT(..)` without its pagination
//! - **Chunked batch inserts**: multi-row INSERTs split into bounded statements
//! - **Executor**: run built statements on any [`GenericClient`] (client, pool
//!   connection or transaction) with timeouts and `tracing` logs
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use slotql::qb::{self, Fields, raw};
//! use slotql::Database;
//!
//! let db = Database::new(&client);
//!
//! // SELECT
//! let users: Vec<User> = db
//!     .find_all_as(
//!         &qb::select("*")
//!             .from("users")
//!             .filter(Fields::new().set("status", "active").cmp("age", ">", 18))?
//!             .order(["username ASC", "id DESC"])
//!             .limit(10),
//!     )
//!     .await?;
//!
//! // INSERT, returning the generated id
//! let id = db
//!     .run(&qb::insert_with_timestamps("users", Fields::new().set("username", "alice"))?)
//!     .await?
//!     .insert_id();
//!
//! // UPDATE
//! db.run(&qb::update(
//!     "users",
//!     Fields::new().set("last_seen", raw("NOW()")),
//!     Fields::new().set("id", 7),
//! )?)
//! .await?;
//!
//! // Batch INSERT in chunks of 100 rows
//! db.run_multi(&qb::insert_multi("tags", ["name"]).rows(names.iter().map(|n| [n.as_str()])))
//!     .await?;
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod exec;
pub mod qb;
pub mod row;
pub mod value;

pub use batch::{BatchInsert, BatchStatement, DEFAULT_CHUNK_SIZE, Dialect};
pub use client::GenericClient;
pub use config::DatabaseConfig;
pub use error::{QbError, QbResult};
pub use exec::{Database, RunResult, debug_dump};
pub use qb::{Built, Method, QueryBuilder};
pub use row::{FromRow, RowExt};
pub use value::Value;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_tls};
