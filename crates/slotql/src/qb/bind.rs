//! Named bind maps (`:name -> value`).

use crate::error::{QbError, QbResult};
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// Placeholder token for a column key: `:` + key with `.` replaced by `_`.
///
/// `t.name` and `t_name` both map to `:t_name`; the bind maps detect that
/// clash instead of letting one value overwrite the other.
pub fn placeholder_for(key: &str) -> String {
    format!(":{}", key.replace('.', "_"))
}

/// Normalize a caller-supplied parameter name to its `:name` form.
fn normalize(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
struct Bound {
    #[serde(skip)]
    origin: String,
    value: Value,
}

// Two maps are equal when they bind the same values; origins only matter for
// collision reports.
impl PartialEq for Bound {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Placeholder-to-value table for one statement.
///
/// Every entry remembers the input key it was derived from so that two
/// distinct inputs normalizing to the same placeholder are reported as a
/// [`QbError::PlaceholderCollision`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BindMap {
    entries: BTreeMap<String, Bound>,
}

impl BindMap {
    /// Create an empty bind map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a caller-supplied parameter. `id` and `:id` name the same placeholder;
    /// setting it again replaces the previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let placeholder = normalize(name);
        self.entries.insert(
            placeholder.clone(),
            Bound {
                origin: placeholder,
                value: value.into(),
            },
        );
        self
    }

    /// Chainable form of [`BindMap::insert`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind `placeholder` on behalf of the input `origin`.
    pub(crate) fn bind(&mut self, placeholder: String, origin: &str, value: Value) -> QbResult<()> {
        if let Some(existing) = self.entries.get(&placeholder) {
            if existing.origin != origin {
                return Err(QbError::PlaceholderCollision {
                    placeholder,
                    first: existing.origin.clone(),
                    second: origin.to_string(),
                });
            }
        }
        self.entries.insert(
            placeholder,
            Bound {
                origin: origin.to_string(),
                value,
            },
        );
        Ok(())
    }

    /// Fail if any placeholder is present in both maps. `scopes` labels the two
    /// maps in the error (e.g. `("SET", "WHERE")`).
    pub(crate) fn ensure_disjoint(&self, other: &BindMap, scopes: (&str, &str)) -> QbResult<()> {
        for (placeholder, bound) in &other.entries {
            if let Some(existing) = self.entries.get(placeholder) {
                return Err(QbError::PlaceholderCollision {
                    placeholder: placeholder.clone(),
                    first: format!("{} {}", scopes.0, existing.origin),
                    second: format!("{} {}", scopes.1, bound.origin),
                });
            }
        }
        Ok(())
    }

    /// Add all entries of `other`; callers check disjointness first.
    pub(crate) fn extend(&mut self, other: &BindMap) {
        for (placeholder, bound) in &other.entries {
            self.entries.insert(placeholder.clone(), bound.clone());
        }
    }

    pub fn get(&self, placeholder: &str) -> Option<&Value> {
        self.entries.get(placeholder).map(|b| &b.value)
    }

    pub fn contains_key(&self, placeholder: &str) -> bool {
        self.entries.contains_key(placeholder)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Placeholders in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(placeholder, value)` pairs in sorted placeholder order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, b)| (k.as_str(), &b.value))
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for BindMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = BindMap::new();
        for (k, v) in iter {
            map.insert(k.as_ref(), v);
        }
        map
    }
}
