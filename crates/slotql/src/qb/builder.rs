//! The slot-based statement builder.

use crate::batch::BatchStatement;
use crate::error::{QbError, QbResult};
use crate::qb::bind::BindMap;
use crate::qb::classify::Arg;
use crate::qb::parts::{IntoClause, Part, Parts, replace_prefix};
use crate::qb::prepare::{Fields, Key, prepare};
use crate::value::Value;
use serde::Serialize;
use std::fmt;

/// Statement kind, fixed when the builder is created.
///
/// The executor uses it to pick result semantics: `Insert` reports the
/// generated id, everything else an affected-row count or rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Select,
    Insert,
    InsertMulti,
    Update,
    Delete,
    Truncate,
    Query,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Select => "select",
            Method::Insert => "insert",
            Method::InsertMulti => "insert_multi",
            Method::Update => "update",
            Method::Delete => "delete",
            Method::Truncate => "truncate",
            Method::Query => "query",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an executor needs to run a statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Built {
    /// Final SQL text with `:name` placeholders.
    pub sql: String,
    /// Values for every placeholder in `sql`.
    pub binds: BindMap,
    pub method: Method,
    /// Chunked statements with positional `?` placeholders (batch inserts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<Vec<BatchStatement>>,
}

/// Column names stamped by the `*_with_timestamps` constructors.
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

fn stamp(mut data: Fields, columns: &[&str]) -> Fields {
    let now = Value::now();
    for column in columns {
        data.push(Key::from(*column), Arg::Value(now.clone()));
    }
    data
}

/// Fluent builder over a [`Parts`] slot set and its bind maps.
///
/// Bind values are kept per origin (INSERT/SET data, WHERE conditions, and
/// caller parameters) so that re-filtering replaces only the WHERE values and
/// collisions between origins are reported when they are introduced.
///
/// # Example
/// ```ignore
/// use slotql::qb::{self, Fields};
///
/// let built = qb::select("SELECT *")
///     .from("users")
///     .filter(Fields::new().cmp("id", ">", 3))?
///     .order(["username ASC", "id DESC"])
///     .limit(5)
///     .build();
/// assert_eq!(built.sql, "SELECT * FROM users WHERE id > :id ORDER BY username ASC, id DESC LIMIT 5");
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct QueryBuilder {
    method: Method,
    parts: Parts,
    input: BindMap,
    conditions: BindMap,
    params: BindMap,
}

impl QueryBuilder {
    fn new(method: Method, head: String) -> Self {
        let mut parts = Parts::new();
        parts.set(Part::Select, head);
        Self {
            method,
            parts,
            input: BindMap::new(),
            conditions: BindMap::new(),
            params: BindMap::new(),
        }
    }

    /// `SELECT` statement; the keyword is added when missing.
    pub fn select(sql: &str) -> Self {
        Self::new(Method::Select, replace_prefix("SELECT", sql, true))
    }

    /// Any statement, used verbatim.
    pub fn query(sql: &str) -> Self {
        Self::new(Method::Query, sql.trim().to_string())
    }

    /// `INSERT INTO table (cols) VALUES (:cols)`.
    pub fn insert(table: &str, data: Fields) -> QbResult<Self> {
        let prepared = prepare(&data)?;
        let head = if prepared.fields.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                prepared.fields.join(", "),
                prepared.values.join(", ")
            )
        };
        let mut qb = Self::new(Method::Insert, head);
        qb.input = prepared.binds;
        Ok(qb)
    }

    /// Like [`QueryBuilder::insert`], with `created_at` and `updated_at`
    /// appended and set to the same current timestamp.
    pub fn insert_with_timestamps(table: &str, data: Fields) -> QbResult<Self> {
        Self::insert(table, stamp(data, &[CREATED_AT, UPDATED_AT]))
    }

    /// `UPDATE table SET ... WHERE ...`.
    ///
    /// Both mappings must be non-empty; use [`QueryBuilder::query`] for
    /// statements touching every row.
    pub fn update(table: &str, data: Fields, conditions: Fields) -> QbResult<Self> {
        if data.is_empty() {
            return Err(QbError::validation(
                "update requires at least one column to set",
            ));
        }
        if conditions.is_empty() {
            return Err(QbError::validation(
                "update requires at least one condition; use query() to update every row",
            ));
        }
        let prepared = prepare(&data)?;
        let head = format!("UPDATE {table} SET {}", prepared.fragments.join(", "));
        let mut qb = Self::new(Method::Update, head);
        qb.input = prepared.binds;
        qb.filter(conditions)
    }

    /// Like [`QueryBuilder::update`], with `updated_at` set to the current timestamp.
    pub fn update_with_timestamps(table: &str, data: Fields, conditions: Fields) -> QbResult<Self> {
        Self::update(table, stamp(data, &[UPDATED_AT]), conditions)
    }

    /// `DELETE FROM table WHERE ... [LIMIT n]`.
    pub fn delete(table: &str, conditions: Fields, limit: Option<u64>) -> QbResult<Self> {
        if conditions.is_empty() {
            return Err(QbError::validation(
                "delete requires at least one condition; use truncate() or query() to clear a table",
            ));
        }
        let qb = Self::new(Method::Delete, format!("DELETE FROM {table}")).filter(conditions)?;
        Ok(match limit {
            Some(n) => qb.limit(n),
            None => qb,
        })
    }

    /// `TRUNCATE TABLE table`.
    pub fn truncate(table: &str) -> Self {
        Self::new(Method::Truncate, format!("TRUNCATE TABLE {table}"))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Values bound from INSERT/UPDATE data.
    pub fn input(&self) -> &BindMap {
        &self.input
    }

    /// Values bound from the WHERE mapping.
    pub fn conditions(&self) -> &BindMap {
        &self.conditions
    }

    /// Caller-supplied parameters.
    pub fn params(&self) -> &BindMap {
        &self.params
    }

    fn input_scope(&self) -> &'static str {
        match self.method {
            Method::Update => "SET",
            _ => "VALUES",
        }
    }

    /// Set the FROM clause (`users`, `FROM users` and `from users` are equivalent).
    pub fn from(mut self, table: &str) -> Self {
        self.parts.set(Part::From, replace_prefix("FROM", table, true));
        self
    }

    /// Replace the WHERE clause with `conditions` joined by `AND`.
    ///
    /// An empty mapping leaves the builder untouched.
    pub fn filter(mut self, conditions: Fields) -> QbResult<Self> {
        if conditions.is_empty() {
            return Ok(self);
        }
        let prepared = prepare(&conditions)?;
        self.input
            .ensure_disjoint(&prepared.binds, (self.input_scope(), "WHERE"))?;
        self.params.ensure_disjoint(&prepared.binds, ("params", "WHERE"))?;

        self.parts
            .set(Part::Where, format!("WHERE {}", prepared.fragments.join(" AND ")));
        self.conditions = prepared.binds;
        Ok(self)
    }

    /// Set GROUP BY from a column or a list of columns.
    pub fn group(mut self, columns: impl IntoClause) -> Self {
        self.set_keyword_clause(Part::Group, &columns.into_clause());
        self
    }

    /// Set the HAVING clause.
    pub fn having(mut self, clause: &str) -> Self {
        self.set_keyword_clause(Part::Having, clause);
        self
    }

    /// Set ORDER BY from a term or a list of terms.
    pub fn order(mut self, terms: impl IntoClause) -> Self {
        self.set_keyword_clause(Part::Order, &terms.into_clause());
        self
    }

    /// An empty body clears the slot instead of leaving a bare keyword.
    fn set_keyword_clause(&mut self, part: Part, body: &str) {
        if replace_prefix(part.keyword(), body, false).is_empty() {
            self.parts.clear(part);
        } else {
            self.parts.set(part, replace_prefix(part.keyword(), body, true));
        }
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.parts.set(Part::Limit, format!("LIMIT {n}"));
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.parts.set(Part::Offset, format!("OFFSET {n}"));
        self
    }

    /// Set a slot by name (`"GROUP"`, `"LIMIT"`, ...).
    pub fn set_part(mut self, name: &str, value: &str) -> QbResult<Self> {
        self.parts.set_named(name, value)?;
        Ok(self)
    }

    /// Render as `SELECT COUNT(*)`, dropping ORDER/LIMIT/OFFSET. Requires FROM.
    pub fn to_count(self) -> QbResult<Self> {
        self.to_count_of("*")
    }

    /// Render as `SELECT COUNT(<column>)`, dropping ORDER/LIMIT/OFFSET. Requires FROM.
    pub fn to_count_of(mut self, column: &str) -> QbResult<Self> {
        self.parts.to_count(column)?;
        Ok(self)
    }

    /// Bind a caller parameter used by hand-written SQL (`id` or `:id`).
    pub fn bind(self, name: &str, value: impl Into<Value>) -> QbResult<Self> {
        self.bind_all(BindMap::new().with(name, value))
    }

    /// Bind several caller parameters at once.
    pub fn bind_all(mut self, params: BindMap) -> QbResult<Self> {
        self.input
            .ensure_disjoint(&params, (self.input_scope(), "params"))?;
        self.conditions.ensure_disjoint(&params, ("WHERE", "params"))?;
        self.params.extend(&params);
        Ok(self)
    }

    /// Render the SQL text.
    pub fn sql(&self) -> String {
        self.parts.render()
    }

    /// All bound values of the statement.
    pub fn binds(&self) -> BindMap {
        let mut binds = self.input.clone();
        binds.extend(&self.conditions);
        binds.extend(&self.params);
        binds
    }

    /// Render SQL and binds. Repeated calls return identical output.
    pub fn build(&self) -> Built {
        Built {
            sql: self.sql(),
            binds: self.binds(),
            method: self.method,
            batch: None,
        }
    }
}
