//! Error types for slotql

use thiserror::Error;

/// Result type alias for slotql operations
pub type QbResult<T> = Result<T, QbError>;

/// Errors raised while building or executing statements.
///
/// The first group are usage errors: they are raised by the builder call that
/// received the bad input and are never worth retrying. The second group comes
/// from the executor.
#[derive(Debug, Error)]
pub enum QbError {
    /// A clause slot name outside SELECT/FROM/WHERE/GROUP/HAVING/ORDER/LIMIT/OFFSET
    #[error("Part: {0} not exists")]
    UnknownPart(String),

    /// `to_count` was called before `from`
    #[error("FROM not found: call from() before to_count()")]
    FromNotSet,

    /// A comparison that is not an `[operator, value]` pair
    #[error("Invalid condition format for '{column}': {message}")]
    InvalidCondition { column: String, message: String },

    /// A raw fragment whose marker is damaged
    #[error("Malformed raw fragment: {0}")]
    MalformedRaw(String),

    /// A LIMIT/OFFSET value that is not a non-negative integer
    #[error("{part} value is incorrect: '{value}'")]
    InvalidLimit { part: &'static str, value: String },

    /// Two distinct inputs normalize to the same placeholder
    #[error("Placeholder collision on {placeholder}: bound by both {first} and {second}")]
    PlaceholderCollision {
        placeholder: String,
        first: String,
        second: String,
    },

    /// A batch upsert that cannot be rendered for the selected dialect
    #[error("Invalid upsert: {0}")]
    InvalidUpsert(String),

    /// The SQL references a named placeholder that has no bound value
    #[error("Missing bind value for placeholder :{0}")]
    MissingBind(String),

    /// A bound value whose placeholder never appears in the SQL
    #[error("Bound value {0} is not referenced by the statement")]
    UnusedBind(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// A batch chunk failed after earlier chunks were applied
    #[error("Batch chunk {failed_chunk} failed after {committed} rows were written: {source}")]
    BatchIncomplete {
        /// Rows written by the chunks that succeeded
        committed: u64,
        /// Zero-based index of the failing chunk
        failed_chunk: usize,
        #[source]
        source: Box<QbError>,
    },
}

impl QbError {
    /// Create an invalid-condition error for a column
    pub fn invalid_condition(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCondition {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error comes from malformed builder input rather than the database.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPart(_)
                | Self::FromNotSet
                | Self::InvalidCondition { .. }
                | Self::MalformedRaw(_)
                | Self::InvalidLimit { .. }
                | Self::PlaceholderCollision { .. }
                | Self::InvalidUpsert(_)
                | Self::MissingBind(_)
                | Self::UnusedBind(_)
                | Self::Validation(_)
        )
    }

    /// The error a batch chunk failed with, or `self` for any other error.
    pub fn root(&self) -> &QbError {
        match self {
            Self::BatchIncomplete { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self.root(), Self::UniqueViolation(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific QbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for QbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
