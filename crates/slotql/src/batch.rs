//! Chunked multi-row INSERT statements.
//!
//! [`BatchInsert`] splits a long row sequence into groups of at most
//! `chunk_size` rows and renders one `INSERT ... VALUES (?, ?), (?, ?)`
//! statement per group, each with its own flattened positional value list.
//!
//! # Example
//! ```ignore
//! use slotql::qb;
//!
//! let statements = qb::insert_multi("t", ["a", "b"])
//!     .rows(vec![vec![1, 2], vec![3, 4], vec![5, 6]])
//!     .chunk_size(2)
//!     .statements()?;
//!
//! assert_eq!(statements[0].sql, "INSERT INTO t (a, b) VALUES (?, ?), (?, ?)");
//! assert_eq!(statements[1].sql, "INSERT INTO t (a, b) VALUES (?, ?)");
//! ```

use crate::error::{QbError, QbResult};
use crate::qb::{BindMap, Built, Method, replace_prefix};
use crate::value::Value;
use serde::Serialize;

/// Rows per statement unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// SQL flavor of the ignore/upsert clauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `INSERT IGNORE` and `ON DUPLICATE KEY UPDATE`.
    #[default]
    MySql,
    /// `ON CONFLICT DO NOTHING` and `ON CONFLICT <target> DO UPDATE SET`.
    Postgres,
}

/// One rendered chunk: SQL with positional `?` placeholders and its values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStatement {
    pub sql: String,
    /// Row-major flattening of the chunk's rows.
    pub values: Vec<Value>,
}

/// Builder for chunked multi-row INSERTs.
///
/// Created via [`crate::qb::insert_multi`].
#[derive(Debug, Clone)]
#[must_use]
pub struct BatchInsert {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    ignore: bool,
    upsert: Option<String>,
    conflict_target: Option<String>,
    chunk_size: usize,
    dialect: Dialect,
}

impl BatchInsert {
    pub fn new<I, S>(table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            ignore: false,
            upsert: None,
            conflict_target: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            dialect: Dialect::default(),
        }
    }

    /// Append one row; values must follow column order.
    pub fn row<V: Into<Value>>(mut self, row: impl IntoIterator<Item = V>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Append several rows.
    pub fn rows<R, V>(mut self, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for row in rows {
            self = self.row(row);
        }
        self
    }

    /// Skip rows that would violate a unique constraint.
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Upsert assignment list, e.g. `"b = VALUES(b)"` or `"b = EXCLUDED.b"`.
    pub fn on_duplicate(mut self, clause: &str) -> Self {
        self.upsert = Some(clause.trim().to_string());
        self
    }

    /// Conflict target for the Postgres dialect, e.g. `"(a)"` or `"ON CONSTRAINT t_pkey"`.
    pub fn on_conflict(mut self, target: &str) -> Self {
        self.conflict_target = Some(target.trim().to_string());
        self
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n;
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn validate(&self) -> QbResult<()> {
        if self.columns.is_empty() {
            return Err(QbError::validation("insert_multi requires at least one column"));
        }
        if self.chunk_size == 0 {
            return Err(QbError::validation("insert_multi chunk size must be at least 1"));
        }
        if let Some((i, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.columns.len())
        {
            return Err(QbError::validation(format!(
                "row {i} has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }

    fn conflict_clause(&self) -> QbResult<Option<String>> {
        match self.dialect {
            Dialect::MySql => Ok(self
                .upsert
                .as_ref()
                .map(|clause| format!("ON DUPLICATE KEY UPDATE {clause}"))),
            Dialect::Postgres => match (&self.upsert, self.ignore) {
                (Some(_), true) => Err(QbError::InvalidUpsert(
                    "ignore() and on_duplicate() cannot be combined for Postgres".to_string(),
                )),
                (Some(clause), false) => {
                    let Some(target) = self.conflict_target.as_deref() else {
                        return Err(QbError::InvalidUpsert(
                            "Postgres upsert requires on_conflict(target)".to_string(),
                        ));
                    };
                    let target = if target.starts_with('(')
                        || target.to_ascii_uppercase().starts_with("ON CONSTRAINT")
                    {
                        target.to_string()
                    } else {
                        format!("({target})")
                    };
                    Ok(Some(format!(
                        "ON CONFLICT {target} DO UPDATE {}",
                        replace_prefix("SET", clause, true)
                    )))
                }
                (None, true) => Ok(Some("ON CONFLICT DO NOTHING".to_string())),
                (None, false) => Ok(None),
            },
        }
    }

    /// Render one statement per chunk. Zero rows yield zero statements.
    pub fn statements(&self) -> QbResult<Vec<BatchStatement>> {
        self.validate()?;
        let conflict = self.conflict_clause()?;

        let head = match (self.dialect, self.ignore) {
            (Dialect::MySql, true) => "INSERT IGNORE INTO",
            _ => "INSERT INTO",
        };
        let row_placeholder = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let columns = self.columns.join(", ");

        let statements: Vec<BatchStatement> = self
            .rows
            .chunks(self.chunk_size)
            .map(|chunk| {
                let mut sql = format!(
                    "{head} {} ({columns}) VALUES {}",
                    self.table,
                    vec![row_placeholder.as_str(); chunk.len()].join(", ")
                );
                if let Some(ref clause) = conflict {
                    sql.push(' ');
                    sql.push_str(clause);
                }
                BatchStatement {
                    sql,
                    values: chunk.iter().flatten().cloned().collect(),
                }
            })
            .collect();

        tracing::trace!(
            target: "slotql.build",
            table = %self.table,
            rows = self.rows.len(),
            chunks = statements.len(),
            "rendered batch insert"
        );
        Ok(statements)
    }

    /// Render into a [`Built`] tagged [`Method::InsertMulti`].
    ///
    /// `sql` holds the chunk statements joined with `;\n` for display; the
    /// executor runs `batch` statement by statement.
    pub fn build(&self) -> QbResult<Built> {
        let statements = self.statements()?;
        let sql = statements
            .iter()
            .map(|s| s.sql.as_str())
            .collect::<Vec<_>>()
            .join(";\n");
        Ok(Built {
            sql,
            binds: BindMap::new(),
            method: Method::InsertMulti,
            batch: Some(statements),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::insert_multi;

    fn numbered(rows: usize, columns: usize) -> Vec<Vec<i64>> {
        (0..rows)
            .map(|r| (0..columns).map(|c| (r * columns + c) as i64).collect())
            .collect()
    }

    #[test]
    fn three_rows_in_chunks_of_two() {
        let statements = insert_multi("t", ["a", "b"])
            .rows(vec![vec![1, 2], vec![3, 4], vec![5, 6]])
            .chunk_size(2)
            .statements()
            .unwrap();

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].sql, "INSERT INTO t (a, b) VALUES (?, ?), (?, ?)");
        assert_eq!(
            statements[0].values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
        );
        assert_eq!(statements[1].sql, "INSERT INTO t (a, b) VALUES (?, ?)");
        assert_eq!(statements[1].values, vec![Value::Int(5), Value::Int(6)]);
    }

    #[test]
    fn statement_count_is_ceiling_of_rows_over_chunk() {
        for (rows, chunk, expected) in [(0, 3, 0), (1, 3, 1), (3, 3, 1), (4, 3, 2), (250, 100, 3)] {
            let statements = insert_multi("t", ["a", "b", "c"])
                .rows(numbered(rows, 3))
                .chunk_size(chunk)
                .statements()
                .unwrap();
            assert_eq!(statements.len(), expected, "rows={rows} chunk={chunk}");
        }
    }

    #[test]
    fn concatenated_values_reproduce_input() {
        let input = numbered(7, 2);
        let statements = insert_multi("t", ["a", "b"])
            .rows(input.clone())
            .chunk_size(3)
            .statements()
            .unwrap();

        let flattened: Vec<Value> = statements.into_iter().flat_map(|s| s.values).collect();
        let expected: Vec<Value> = input.into_iter().flatten().map(Value::from).collect();
        assert_eq!(flattened.len(), 14);
        assert_eq!(flattened, expected);
    }

    #[test]
    fn default_chunk_size_is_one_hundred() {
        let statements = insert_multi("t", ["a"])
            .rows(numbered(101, 1))
            .statements()
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].values, vec![Value::Int(100)]);
    }

    #[test]
    fn mysql_ignore_and_upsert() {
        let statements = insert_multi("t", ["a", "b"])
            .row([1, 2])
            .ignore()
            .on_duplicate("b = VALUES(b)")
            .statements()
            .unwrap();
        assert_eq!(
            statements[0].sql,
            "INSERT IGNORE INTO t (a, b) VALUES (?, ?) ON DUPLICATE KEY UPDATE b = VALUES(b)"
        );
    }

    #[test]
    fn postgres_conflict_clauses() {
        let ignore = insert_multi("t", ["a"])
            .row([1])
            .dialect(Dialect::Postgres)
            .ignore()
            .statements()
            .unwrap();
        assert_eq!(ignore[0].sql, "INSERT INTO t (a) VALUES (?) ON CONFLICT DO NOTHING");

        let upsert = insert_multi("t", ["a", "b"])
            .row([1, 2])
            .dialect(Dialect::Postgres)
            .on_conflict("a")
            .on_duplicate("b = EXCLUDED.b")
            .statements()
            .unwrap();
        assert_eq!(
            upsert[0].sql,
            "INSERT INTO t (a, b) VALUES (?, ?) ON CONFLICT (a) DO UPDATE SET b = EXCLUDED.b"
        );
    }

    #[test]
    fn postgres_upsert_needs_target() {
        let err = insert_multi("t", ["a"])
            .row([1])
            .dialect(Dialect::Postgres)
            .on_duplicate("a = EXCLUDED.a")
            .statements()
            .unwrap_err();
        assert!(matches!(err, QbError::InvalidUpsert(_)));
    }

    #[test]
    fn bad_shapes_are_rejected() {
        let arity = insert_multi("t", ["a", "b"]).row([1]).statements().unwrap_err();
        assert!(arity.to_string().contains("row 0 has 1 values, expected 2"));

        let zero = insert_multi("t", ["a"]).row([1]).chunk_size(0).statements();
        assert!(matches!(zero.unwrap_err(), QbError::Validation(_)));

        let no_columns = insert_multi("t", Vec::<String>::new()).statements();
        assert!(no_columns.is_err());
    }

    #[test]
    fn build_tags_insert_multi() {
        let built = insert_multi("t", ["a"])
            .rows(numbered(3, 1))
            .chunk_size(2)
            .build()
            .unwrap();
        assert_eq!(built.method, Method::InsertMulti);
        assert!(built.binds.is_empty());
        assert_eq!(built.batch.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            built.sql,
            "INSERT INTO t (a) VALUES (?), (?);\nINSERT INTO t (a) VALUES (?)"
        );
    }
}
