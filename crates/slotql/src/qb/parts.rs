//! Fixed-order clause slots and their rendering.

use crate::error::{QbError, QbResult};
use std::fmt;
use std::str::FromStr;

/// A named clause slot. Declaration order is SQL token order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Part {
    Select,
    From,
    Where,
    Group,
    Having,
    Order,
    Limit,
    Offset,
}

impl Part {
    /// All slots in render order.
    pub const ALL: [Part; 8] = [
        Part::Select,
        Part::From,
        Part::Where,
        Part::Group,
        Part::Having,
        Part::Order,
        Part::Limit,
        Part::Offset,
    ];

    /// Slot name as accepted by [`Parts::set_named`].
    pub fn name(self) -> &'static str {
        match self {
            Part::Select => "SELECT",
            Part::From => "FROM",
            Part::Where => "WHERE",
            Part::Group => "GROUP",
            Part::Having => "HAVING",
            Part::Order => "ORDER",
            Part::Limit => "LIMIT",
            Part::Offset => "OFFSET",
        }
    }

    /// SQL keyword that opens the clause.
    pub fn keyword(self) -> &'static str {
        match self {
            Part::Group => "GROUP BY",
            Part::Order => "ORDER BY",
            other => other.name(),
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Slots dropped from the rendered SQL in count mode.
    fn hidden_when_counting(self) -> bool {
        matches!(self, Part::Order | Part::Limit | Part::Offset)
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Part {
    type Err = QbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Part::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QbError::UnknownPart(s.to_string()))
    }
}

/// Case-insensitive keyword check on a whole-word boundary.
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    let Some(prefix) = s.get(0..keyword.len()) else {
        return false;
    };
    if !prefix.eq_ignore_ascii_case(keyword) {
        return false;
    }
    s[keyword.len()..]
        .chars()
        .next()
        .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
}

/// Normalize a clause so it starts with exactly one upper-case `prefix`.
///
/// `"select * from t"` and `"* from t"` both become `"SELECT * from t"`.
/// With `set_if_missing = false` the prefix is only stripped.
pub fn replace_prefix(prefix: &str, s: &str, set_if_missing: bool) -> String {
    let mut s = s.trim();
    if starts_with_keyword(s, prefix) {
        s = s[prefix.len()..].trim_start();
    }
    if set_if_missing {
        format!("{} {}", prefix.to_ascii_uppercase(), s)
    } else {
        s.to_string()
    }
}

/// Anything that renders as a clause body: a single string or a list joined
/// with `", "`.
pub trait IntoClause {
    fn into_clause(self) -> String;
}

impl IntoClause for &str {
    fn into_clause(self) -> String {
        self.to_string()
    }
}

impl IntoClause for String {
    fn into_clause(self) -> String {
        self
    }
}

impl IntoClause for &[&str] {
    fn into_clause(self) -> String {
        self.join(", ")
    }
}

impl<const N: usize> IntoClause for [&str; N] {
    fn into_clause(self) -> String {
        self.join(", ")
    }
}

impl IntoClause for Vec<&str> {
    fn into_clause(self) -> String {
        self.join(", ")
    }
}

impl IntoClause for Vec<String> {
    fn into_clause(self) -> String {
        self.join(", ")
    }
}

/// The clause slot set of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parts {
    slots: [Option<String>; 8],
    count: Option<String>,
}

impl Parts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` verbatim in `part`.
    pub fn set(&mut self, part: Part, value: impl Into<String>) {
        self.slots[part.index()] = Some(value.into());
    }

    /// Store a clause under a slot name, normalizing its keyword.
    ///
    /// LIMIT and OFFSET must hold a non-negative integer.
    pub fn set_named(&mut self, name: &str, value: &str) -> QbResult<()> {
        let part: Part = name.parse()?;
        let value = match part {
            Part::Limit | Part::Offset => {
                let body = replace_prefix(part.keyword(), value, false);
                let n: u64 = body.parse().map_err(|_| QbError::InvalidLimit {
                    part: part.name(),
                    value: value.to_string(),
                })?;
                format!("{} {n}", part.keyword())
            }
            // SELECT may open an INSERT/UPDATE/DELETE statement; keep it as given.
            Part::Select => value.trim().to_string(),
            _ if replace_prefix(part.keyword(), value, false).is_empty() => {
                self.clear(part);
                return Ok(());
            }
            _ => replace_prefix(part.keyword(), value, true),
        };
        self.set(part, value);
        Ok(())
    }

    pub fn get(&self, part: Part) -> Option<&str> {
        self.slots[part.index()].as_deref()
    }

    pub fn clear(&mut self, part: Part) {
        self.slots[part.index()] = None;
    }

    /// Switch rendering to `SELECT COUNT(<column>)`. Requires FROM.
    pub fn to_count(&mut self, column: &str) -> QbResult<()> {
        if self.get(Part::From).is_none() {
            return Err(QbError::FromNotSet);
        }
        self.count = Some(column.to_string());
        Ok(())
    }

    /// Column expression of count mode, if active.
    pub fn count_column(&self) -> Option<&str> {
        self.count.as_deref()
    }

    /// Slot values as they will be rendered, count mode applied.
    pub fn rendered(&self) -> impl Iterator<Item = (Part, String)> + '_ {
        Part::ALL.into_iter().filter_map(move |part| {
            let value = match (&self.count, part) {
                (Some(column), Part::Select) => Some(format!("SELECT COUNT({column})")),
                (Some(_), p) if p.hidden_when_counting() => None,
                _ => self.get(part).map(str::to_string),
            };
            value.map(|v| (part, v))
        })
    }

    /// Join the non-empty slots with single spaces, in slot order.
    pub fn render(&self) -> String {
        let sql = self
            .rendered()
            .map(|(_, v)| v)
            .collect::<Vec<_>>()
            .join(" ");
        tracing::trace!(target: "slotql.build", counting = self.count.is_some(), sql = %sql, "rendered statement");
        sql
    }
}
