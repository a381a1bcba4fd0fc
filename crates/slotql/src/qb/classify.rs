//! Classification of column inputs into bound literals, comparisons and raw SQL.

use crate::error::{QbError, QbResult};
use crate::value::Value;
use chrono::NaiveDateTime;

/// Opening marker of a raw SQL fragment.
pub const RAW_OPEN: &str = "{RAW}";
/// Closing marker of a raw SQL fragment.
pub const RAW_CLOSE: &str = "{/RAW}";

/// A value supplied for a column in a WHERE, SET or INSERT mapping.
///
/// `List` is the `[operator, value]` comparison form. `Raw` holds marker-wrapped
/// SQL produced by [`raw`]; its content is inlined verbatim and never bound.
/// Plain text values are always bound, even when they look like a marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    List(Vec<Value>),
    Raw(String),
}

impl Arg {
    /// Interpret trusted template text: marker-wrapped text becomes [`Arg::Raw`],
    /// anything else a bound text value.
    pub fn from_marked(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with(RAW_OPEN) {
            Arg::Raw(text)
        } else {
            Arg::Value(Value::Text(text))
        }
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl From<Vec<Value>> for Arg {
    fn from(v: Vec<Value>) -> Self {
        Arg::List(v)
    }
}

macro_rules! impl_arg_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_arg_from_scalar!(
    i8, i16, i32, i64, u8, u16, u32, f32, f64, bool, &str, String, &String, NaiveDateTime
);

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Arg::Value(Value::from(v))
    }
}

/// Mark SQL text as raw so it is inlined instead of bound.
///
/// **Warning**: this bypasses placeholder binding. Only use with trusted SQL.
pub fn raw(sql: impl AsRef<str>) -> Arg {
    Arg::Raw(format!("{RAW_OPEN}{}{RAW_CLOSE}", sql.as_ref()))
}

/// Build an `[operator, value]` comparison, e.g. `cmp(">", 3)`.
pub fn cmp(op: &str, value: impl Into<Value>) -> Arg {
    Arg::List(vec![Value::Text(op.to_string()), value.into()])
}

/// Result of classifying an [`Arg`].
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Bound with the implicit `=` operator.
    Literal(Value),
    /// Bound with an explicit operator.
    Comparison(String, Value),
    /// Decoded raw SQL, inlined with the implicit `=` operator.
    Raw(String),
}

impl Classified {
    /// Operator placed between the column and its placeholder or raw text.
    pub fn op(&self) -> &str {
        match self {
            Classified::Comparison(op, _) => op,
            Classified::Literal(_) | Classified::Raw(_) => "=",
        }
    }
}

/// Strip the raw markers, failing when either side is missing.
pub fn decode_raw(marked: &str) -> QbResult<&str> {
    marked
        .strip_prefix(RAW_OPEN)
        .and_then(|rest| rest.strip_suffix(RAW_CLOSE))
        .ok_or_else(|| QbError::MalformedRaw(marked.to_string()))
}

/// Classify the input for `column`.
pub fn classify(column: &str, arg: &Arg) -> QbResult<Classified> {
    match arg {
        Arg::Value(v) => Ok(Classified::Literal(v.clone())),
        Arg::Raw(marked) => Ok(Classified::Raw(decode_raw(marked)?.to_string())),
        Arg::List(items) => {
            let [op, value] = items.as_slice() else {
                return Err(QbError::invalid_condition(
                    column,
                    format!("expected [operator, value], got {} elements", items.len()),
                ));
            };
            match op {
                Value::Text(op) if !op.trim().is_empty() => {
                    Ok(Classified::Comparison(op.trim().to_string(), value.clone()))
                }
                other => Err(QbError::invalid_condition(
                    column,
                    format!("operator must be non-empty text, got {}", other.kind()),
                )),
            }
        }
    }
}
