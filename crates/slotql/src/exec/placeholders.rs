//! Rewriting `:name` and `?` placeholders into Postgres `$n` parameters.
//!
//! The scanner leaves string literals, quoted identifiers, dollar-quoted
//! bodies, comments and `::` casts untouched.

use crate::error::{QbError, QbResult};
use crate::qb::BindMap;
use crate::value::Value;
use std::fmt::Write as _;

/// SQL numbered for Postgres plus its ordered parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct Positional {
    pub sql: String,
    pub params: Vec<Value>,
    /// Source placeholder of each parameter (`:id`, or `?` for batch chunks).
    pub names: Vec<String>,
}

impl Positional {
    /// Parameters as `tokio-postgres` expects them.
    pub fn param_refs(&self) -> Vec<&(dyn tokio_postgres::types::ToSql + Sync)> {
        self.params
            .iter()
            .map(|v| v as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Style {
    Named,
    Question,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index just past the closing `quote`; doubled quotes are escapes, and so
/// are backslashes when `backslash_escapes` is set.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if backslash_escapes && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Whether the `'` at `i` opens an `E'...'` escape string.
fn is_escape_string(bytes: &[u8], i: usize) -> bool {
    match i.checked_sub(1).map(|p| bytes[p]) {
        Some(b'E' | b'e') => i < 2 || !is_ident_char(bytes[i - 2]),
        _ => false,
    }
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p + 1)
}

fn skip_block_comment(sql: &str, start: usize) -> usize {
    sql[start + 2..]
        .find("*/")
        .map_or(sql.len(), |p| start + 2 + p + 2)
}

/// End of a `$tag$ ... $tag$` body starting at `start`, if one opens there.
fn skip_dollar_quoted(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut j = start + 1;
    if bytes.get(j).is_some_and(|b| b.is_ascii_digit()) {
        return None;
    }
    while j < bytes.len() && is_ident_char(bytes[j]) {
        j += 1;
    }
    if bytes.get(j) != Some(&b'$') {
        return None;
    }
    let tag = &sql[start..=j];
    let body = j + 1;
    Some(
        sql[body..]
            .find(tag)
            .map_or(sql.len(), |p| body + p + tag.len()),
    )
}

/// Walk `sql`, replacing each placeholder of `style` with `$n` where `n` is
/// returned by `resolve`.
fn rewrite(
    sql: &str,
    style: Style,
    mut resolve: impl FnMut(&str) -> QbResult<usize>,
) -> QbResult<String> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        match bytes[i] {
            b'\'' => i = skip_quoted(bytes, i, b'\'', is_escape_string(bytes, i)),
            b'"' => i = skip_quoted(bytes, i, b'"', false),
            b'-' if next == Some(b'-') => i = skip_line_comment(bytes, i),
            b'/' if next == Some(b'*') => i = skip_block_comment(sql, i),
            b'$' => i = skip_dollar_quoted(sql, i).unwrap_or(i + 1),
            b':' if next == Some(b':') => i += 2,
            b':' if style == Style::Named && next.is_some_and(is_ident_start) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                out.push_str(&sql[copied..i]);
                let n = resolve(&sql[start..end])?;
                let _ = write!(out, "${n}");
                i = end;
                copied = end;
            }
            b'?' if style == Style::Question => {
                out.push_str(&sql[copied..i]);
                let n = resolve("?")?;
                let _ = write!(out, "${n}");
                i += 1;
                copied = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[copied..]);
    Ok(out)
}

/// Number `:name` placeholders from `binds`. A name used twice keeps one index.
///
/// Fails with [`QbError::MissingBind`] for names without a value and
/// [`QbError::UnusedBind`] for values no placeholder refers to.
pub fn from_named(sql: &str, binds: &BindMap) -> QbResult<Positional> {
    let mut names: Vec<String> = Vec::new();
    let mut params = Vec::new();

    let sql = rewrite(sql, Style::Named, |name| {
        let placeholder = format!(":{name}");
        if let Some(i) = names.iter().position(|n| *n == placeholder) {
            return Ok(i + 1);
        }
        let value = binds
            .get(&placeholder)
            .ok_or_else(|| QbError::MissingBind(name.to_string()))?;
        params.push(value.clone());
        names.push(placeholder);
        Ok(names.len())
    })?;

    if let Some(unused) = binds.keys().find(|k| !names.iter().any(|n| n.as_str() == *k)) {
        return Err(QbError::UnusedBind(unused.to_string()));
    }

    Ok(Positional { sql, params, names })
}

/// Number `?` placeholders in order, pairing them with `values`.
pub fn from_question_marks(sql: &str, values: &[Value]) -> QbResult<Positional> {
    let mut count = 0;
    let sql = rewrite(sql, Style::Question, |_| {
        count += 1;
        Ok(count)
    })?;

    if count != values.len() {
        return Err(QbError::validation(format!(
            "statement has {count} positional placeholders but {} values",
            values.len()
        )));
    }

    Ok(Positional {
        sql,
        params: values.to_vec(),
        names: vec!["?".to_string(); count],
    })
}
