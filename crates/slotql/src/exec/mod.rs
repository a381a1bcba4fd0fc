//! Running built statements against Postgres.
//!
//! Builders emit `:name` placeholders (and `?` for batch chunks); this module
//! renumbers them to `$n`, binds the values and shapes the results.

mod database;
mod placeholders;

pub use database::{Database, RunResult};
pub use placeholders::{Positional, from_named, from_question_marks};

use crate::error::QbResult;
use crate::qb::Built;
use std::fmt::Write as _;

/// Render the positional SQL and parameters a built statement would send.
///
/// ```text
/// SQL: [33] SELECT * FROM users WHERE id = $1
/// Params: 1
/// $1 :id int = 110
/// ```
pub fn debug_dump(built: &Built) -> QbResult<String> {
    let statements = match built.batch {
        Some(ref batch) => batch
            .iter()
            .map(|s| from_question_marks(&s.sql, &s.values))
            .collect::<QbResult<Vec<_>>>()?,
        None => vec![from_named(&built.sql, &built.binds)?],
    };

    let mut out = String::new();
    for statement in &statements {
        let _ = writeln!(out, "SQL: [{}] {}", statement.sql.len(), statement.sql);
        let _ = writeln!(out, "Params: {}", statement.params.len());
        for (i, (name, value)) in statement.names.iter().zip(&statement.params).enumerate() {
            let _ = writeln!(out, "${} {name} {} = {value}", i + 1, value.kind());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::{self, Fields};

    #[test]
    fn dump_lists_numbered_params() {
        let built = qb::select("*")
            .from("users")
            .filter(Fields::new().set("id", 110).set("name", "o'neil"))
            .unwrap()
            .build();
        let dump = debug_dump(&built).unwrap();
        assert_eq!(
            dump,
            "SQL: [47] SELECT * FROM users WHERE id = $1 AND name = $2\n\
             Params: 2\n\
             $1 :id int = 110\n\
             $2 :name text = 'o''neil'\n"
        );
    }

    #[test]
    fn dump_covers_every_batch_chunk() {
        let built = qb::insert_multi("t", ["a"])
            .rows(vec![vec![1], vec![2], vec![3]])
            .chunk_size(2)
            .build()
            .unwrap();
        let dump = debug_dump(&built).unwrap();
        assert!(dump.contains("SQL: [35] INSERT INTO t (a) VALUES ($1), ($2)\nParams: 2\n"));
        assert!(dump.contains("SQL: [29] INSERT INTO t (a) VALUES ($1)\nParams: 1\n$1 ? int = 3\n"));
    }

    #[test]
    fn dump_reports_missing_binds() {
        let built = qb::query("SELECT * FROM t WHERE id = :id").build();
        assert!(debug_dump(&built).is_err());
    }
}
