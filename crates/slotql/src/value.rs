//! Scalar values carried by bind maps and batch rows.

use bytes::BytesMut;
use chrono::{Local, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type};

/// Text layout used for timestamps handed over as strings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A bindable scalar.
///
/// Integers are kept as `i64` and narrowed to the parameter type Postgres
/// infers for the placeholder; everything else is encoded through the matching
/// `tokio-postgres` implementation. `Null` binds to a parameter of any type.
///
/// Timestamps are wall-clock values. Bound to a `TIMESTAMPTZ` parameter they
/// are read in the host's local zone; during a DST fold the earlier instant wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Current local time, truncated to whole seconds.
    pub fn now() -> Self {
        let now = chrono::Local::now().naive_local();
        Value::Timestamp(now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Short type label used in debug dumps.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Timestamp(v) => write!(f, "'{}'", v.format(TIMESTAMP_FORMAT)),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

type BoxError = Box<dyn Error + Sync + Send>;

/// Encode `value` only when its own `ToSql` impl accepts `ty`.
fn encode<T: ToSql>(value: T, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !T::accepts(ty) {
        return Err(format!(
            "cannot bind {} to a parameter of type {}",
            std::any::type_name::<T>(),
            ty
        )
        .into());
    }
    value.to_sql(ty, out)
}

fn local_to_utc(v: &NaiveDateTime) -> Result<chrono::DateTime<Utc>, BoxError> {
    Local
        .from_local_datetime(v)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| format!("{v} does not exist in the local time zone").into())
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => encode(*v, ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => encode(i16::try_from(*v)?, ty, out),
                Type::INT4 => encode(i32::try_from(*v)?, ty, out),
                Type::FLOAT8 => encode(*v as f64, ty, out),
                _ => encode(*v, ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => encode(*v as f32, ty, out),
                _ => encode(*v, ty, out),
            },
            Value::Text(v) if matches!(ty.kind(), Kind::Enum(_)) => {
                out.extend_from_slice(v.as_bytes());
                Ok(IsNull::No)
            }
            Value::Text(v) => match *ty {
                Type::TIMESTAMP | Type::TIMESTAMPTZ => {
                    let ts = NaiveDateTime::parse_from_str(v, TIMESTAMP_FORMAT)?;
                    Value::Timestamp(ts).to_sql(ty, out)
                }
                _ => encode(v.as_str(), ty, out),
            },
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMPTZ => encode(local_to_utc(v)?, ty, out),
                Type::DATE => encode(v.date(), ty, out),
                _ => encode(*v, ty, out),
            },
        }
    }

    // Mismatches are reported per variant by `encode`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}
