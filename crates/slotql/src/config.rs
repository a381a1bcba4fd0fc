//! Connection and executor settings.

use crate::error::{QbError, QbResult};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Settings shared by [`crate::create_pool`] and [`crate::Database`].
///
/// Deserializes from any serde format; missing fields take their defaults.
/// The timeout is given in milliseconds as `query_timeout_ms`.
///
/// ```ignore
/// let config = DatabaseConfig::new("postgres://postgres@localhost/app")
///     .with_max_pool_size(8)
///     .with_query_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection URL.
    pub url: String,
    pub max_pool_size: usize,
    /// Statement timeout. `None` means no timeout (default).
    #[serde(rename = "query_timeout_ms", deserialize_with = "millis")]
    pub query_timeout: Option<Duration>,
    /// Column returned by `INSERT ... RETURNING` to report the new row id.
    /// `None` makes inserts report an affected-row count instead.
    pub insert_id_column: Option<String>,
    /// Emit a `slotql.sql` debug event per statement.
    pub log_sql: bool,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_logged_sql_length: Option<usize>,
}

fn millis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_pool_size: 16,
            query_timeout: None,
            insert_id_column: Some("id".to_string()),
            log_sql: true,
            max_logged_sql_length: Some(200),
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Read `DATABASE_URL`, `DATABASE_POOL_SIZE` and `DATABASE_QUERY_TIMEOUT_MS`.
    pub fn from_env() -> QbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> QbResult<Self> {
        let url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| QbError::validation("DATABASE_URL is not set"))?;
        let mut config = Self::new(url);

        if let Some(size) = lookup("DATABASE_POOL_SIZE") {
            config.max_pool_size = size.trim().parse().map_err(|_| {
                QbError::validation(format!("DATABASE_POOL_SIZE is not a number: '{size}'"))
            })?;
        }
        if let Some(ms) = lookup("DATABASE_QUERY_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                QbError::validation(format!("DATABASE_QUERY_TIMEOUT_MS is not a number: '{ms}'"))
            })?;
            config.query_timeout = Some(Duration::from_millis(ms));
        }
        Ok(config)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the statement timeout.
    ///
    /// Statements exceeding it are cancelled server-side and fail with
    /// [`QbError::Timeout`].
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_insert_id_column(mut self, column: impl Into<String>) -> Self {
        self.insert_id_column = Some(column.into());
        self
    }

    /// Report affected rows for inserts instead of the generated id.
    pub fn without_insert_id(mut self) -> Self {
        self.insert_id_column = None;
        self
    }

    pub fn with_log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = Some(len);
        self
    }

    /// Log SQL without truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql_length = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_pool_size, 16);
        assert_eq!(config.insert_id_column.as_deref(), Some("id"));
        assert!(config.log_sql);
        assert_eq!(config.max_logged_sql_length, Some(200));
        assert_eq!(config.query_timeout, None);
    }

    #[test]
    fn env_overrides() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DATABASE_POOL_SIZE", "4"),
            ("DATABASE_QUERY_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.url, "postgres://localhost/app");
        assert_eq!(config.max_pool_size, 4);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn env_requires_url_and_numbers() {
        assert!(DatabaseConfig::from_lookup(lookup(&[])).is_err());

        let err = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DATABASE_POOL_SIZE", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_POOL_SIZE"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: DatabaseConfig = serde_json::from_str(
            r#"{"url": "postgres://localhost/app", "query_timeout_ms": 250, "insert_id_column": null}"#,
        )
        .unwrap();
        assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.insert_id_column, None);
        assert_eq!(config.max_pool_size, 16);
    }

    #[test]
    fn setters_chain() {
        let config = DatabaseConfig::new("postgres://x")
            .with_max_pool_size(2)
            .without_insert_id()
            .no_truncate()
            .with_log_sql(false);
        assert_eq!(config.max_pool_size, 2);
        assert_eq!(config.insert_id_column, None);
        assert_eq!(config.max_logged_sql_length, None);
        assert!(!config.log_sql);
    }
}
