//! Row mapping traits and utilities

use crate::error::{QbError, QbResult};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, FromSqlOwned};

/// Trait for converting a database row into a Rust value.
///
/// Implemented for tuples of up to four columns (read by position), which is
/// what [`crate::Database::find_assoc`] uses for key/value pairs.
///
/// # Example
///
/// ```ignore
/// use slotql::{FromRow, QbResult, RowExt};
///
/// struct User {
///     id: i64,
///     username: String,
///     email: Option<String>,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &tokio_postgres::Row) -> QbResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             username: row.try_get_column("username")?,
///             email: row.try_get_column("email")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> QbResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value by name, returning QbError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> QbResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Try to get a column value by position
    fn try_get_index<T>(&self, index: usize) -> QbResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> QbResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| QbError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, index: usize) -> QbResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(index)
            .map_err(|e| QbError::decode(index.to_string(), e.to_string()))
    }
}

macro_rules! impl_from_row_tuple {
    ($($ty:ident => $idx:tt),+) => {
        impl<$($ty: FromSqlOwned),+> FromRow for ($($ty,)+) {
            fn from_row(row: &Row) -> QbResult<Self> {
                Ok(($(row.try_get_index::<$ty>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(A => 0);
impl_from_row_tuple!(A => 0, B => 1);
impl_from_row_tuple!(A => 0, B => 1, C => 2);
impl_from_row_tuple!(A => 0, B => 1, C => 2, D => 3);
