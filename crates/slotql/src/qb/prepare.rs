//! Column mappings and their normalization into clause fragments.
//!
//! The same [`prepare`] pass backs three SQL shapes:
//! - WHERE joins `fragments` with ` AND `
//! - UPDATE ... SET joins `fragments` with `, `
//! - INSERT joins `fields` and `values` with `, `

use crate::error::QbResult;
use crate::qb::bind::{BindMap, placeholder_for};
use crate::qb::classify::{Arg, Classified, classify, cmp, raw};
use crate::value::Value;
use std::fmt;

/// Key of a [`Fields`] entry.
///
/// `Index` keys carry no column name; they exist so bare raw fragments keep
/// their position among the other entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Column(String),
    Index(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Column(c) => f.write_str(c),
            Key::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Key {
    fn from(c: &str) -> Self {
        Key::Column(c.to_string())
    }
}

impl From<String> for Key {
    fn from(c: String) -> Self {
        Key::Column(c)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

/// An ordered column → value mapping.
///
/// Entry order is kept exactly as inserted and decides the order of the
/// generated fragments. Setting an existing key replaces its value in place.
///
/// # Example
/// ```ignore
/// use slotql::qb::{Fields, raw};
///
/// let fields = Fields::new()
///     .set("status", "active")
///     .cmp("age", ">", 18)
///     .set("seen_at", raw("NOW()"))
///     .fragment("deleted_at IS NULL");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Fields {
    entries: Vec<(Key, Arg)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column to a value, comparison or raw marker.
    pub fn set(mut self, column: &str, value: impl Into<Arg>) -> Self {
        self.push(Key::from(column), value.into());
        self
    }

    /// Set a column compared with an explicit operator.
    pub fn cmp(self, column: &str, op: &str, value: impl Into<Value>) -> Self {
        self.set(column, cmp(op, value))
    }

    /// Append a bare raw SQL fragment (no column, no placeholder).
    pub fn fragment(mut self, sql: &str) -> Self {
        let index = self.entries.len();
        self.push(Key::Index(index), raw(sql));
        self
    }

    /// Insert or replace an entry.
    pub fn push(&mut self, key: Key, arg: Arg) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = arg,
            None => self.entries.push((key, arg)),
        }
    }

    pub fn get(&self, key: &Key) -> Option<&Arg> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Arg)> {
        self.entries.iter().map(|(k, a)| (k, a))
    }
}

impl<K: Into<Key>, A: Into<Arg>> FromIterator<(K, A)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, A)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, a) in iter {
            fields.push(k.into(), a.into());
        }
        fields
    }
}

/// Normalized clause data produced by [`prepare`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prepared {
    /// Column names, in input order.
    pub fields: Vec<String>,
    /// Placeholder tokens (or inlined raw SQL), aligned with `fields`.
    pub values: Vec<String>,
    /// `"column op placeholder-or-raw"` fragments plus bare raw fragments.
    pub fragments: Vec<String>,
    /// Bound values of every non-raw entry.
    pub binds: BindMap,
}

/// Normalize `data` into clause fragments and a bind map.
///
/// Positional raw entries contribute only a fragment. Raw column entries are
/// inlined into both the fragment and the value list and never bound.
pub fn prepare(data: &Fields) -> QbResult<Prepared> {
    let mut out = Prepared::default();

    for (key, arg) in data.iter() {
        let column = match key {
            Key::Index(_) if matches!(arg, Arg::Raw(_)) => {
                if let Classified::Raw(sql) = classify(&key.to_string(), arg)? {
                    out.fragments.push(sql);
                }
                continue;
            }
            key => key.to_string(),
        };

        let classified = classify(&column, arg)?;
        let placeholder = placeholder_for(&column);
        let op = classified.op().to_string();
        out.fields.push(column.clone());

        match classified {
            Classified::Raw(sql) => {
                out.fragments.push(format!("{column} {op} {sql}"));
                out.values.push(sql);
            }
            Classified::Literal(value) | Classified::Comparison(_, value) => {
                out.fragments.push(format!("{column} {op} {placeholder}"));
                out.values.push(placeholder.clone());
                out.binds.bind(placeholder, &column, value)?;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QbError;

    #[test]
    fn literals_become_placeholders() {
        let data = Fields::new().set("username", "Alex").set("email", "e@x");
        let p = prepare(&data).unwrap();
        assert_eq!(p.fields, vec!["username", "email"]);
        assert_eq!(p.values, vec![":username", ":email"]);
        assert_eq!(p.fragments, vec!["username = :username", "email = :email"]);
        assert_eq!(p.binds.get(":username"), Some(&Value::from("Alex")));
        assert_eq!(p.binds.len(), 2);
    }

    #[test]
    fn comparisons_keep_operator() {
        let data = Fields::new().cmp("id", ">", 3).cmp("name", "LIKE", "a%");
        let p = prepare(&data).unwrap();
        assert_eq!(p.fragments, vec!["id > :id", "name LIKE :name"]);
        assert_eq!(p.binds.get(":id"), Some(&Value::Int(3)));
    }

    #[test]
    fn raw_column_is_inlined_and_unbound() {
        let data = Fields::new()
            .set("username", "Alex")
            .set("seen_at", raw("NOW()"));
        let p = prepare(&data).unwrap();
        assert_eq!(p.fragments, vec!["username = :username", "seen_at = NOW()"]);
        assert_eq!(p.fields, vec!["username", "seen_at"]);
        assert_eq!(p.values, vec![":username", "NOW()"]);
        assert!(!p.binds.contains_key(":seen_at"));
        assert_eq!(p.binds.len(), 1);
    }

    #[test]
    fn positional_raw_only_adds_fragment() {
        let data = Fields::new()
            .set("status", "active")
            .fragment("deleted_at IS NULL")
            .cmp("age", ">=", 18);
        let p = prepare(&data).unwrap();
        assert_eq!(
            p.fragments,
            vec!["status = :status", "deleted_at IS NULL", "age >= :age"]
        );
        assert_eq!(p.fields, vec!["status", "age"]);
        assert_eq!(p.values, vec![":status", ":age"]);
        assert_eq!(p.binds.keys().collect::<Vec<_>>(), vec![":age", ":status"]);
    }

    #[test]
    fn qualified_columns_collide() {
        let data = Fields::new().set("t.name", "a").set("t_name", "b");
        let err = prepare(&data).unwrap_err();
        assert!(matches!(err, QbError::PlaceholderCollision { ref placeholder, .. } if placeholder == ":t_name"));
    }

    #[test]
    fn qualified_column_placeholder() {
        let p = prepare(&Fields::new().set("u.id", 7)).unwrap();
        assert_eq!(p.fragments, vec!["u.id = :u_id"]);
        assert_eq!(p.binds.get(":u_id"), Some(&Value::Int(7)));
    }

    #[test]
    fn malformed_inputs_fail() {
        let bad_pair = Fields::new().set("id", vec![Value::from(">")]);
        assert!(matches!(
            prepare(&bad_pair).unwrap_err(),
            QbError::InvalidCondition { .. }
        ));

        let mut bad_raw = Fields::new();
        bad_raw.push(Key::Index(0), Arg::Raw("NOW()".into()));
        assert!(matches!(
            prepare(&bad_raw).unwrap_err(),
            QbError::MalformedRaw(_)
        ));
    }

    #[test]
    fn setting_twice_replaces_in_place() {
        let data = Fields::new().set("a", 1).set("b", 2).set("a", 3);
        let p = prepare(&data).unwrap();
        assert_eq!(p.fields, vec!["a", "b"]);
        assert_eq!(p.binds.get(":a"), Some(&Value::Int(3)));
    }

    #[test]
    fn lengths_match_for_keyed_entries() {
        let data: Fields = vec![("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        let p = prepare(&data).unwrap();
        assert_eq!(p.fields.len(), 3);
        assert_eq!(p.values.len(), 3);
        assert_eq!(p.fragments.len(), 3);
        assert_eq!(p.binds.len(), 3);
    }
}
