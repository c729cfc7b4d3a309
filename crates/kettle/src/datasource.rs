//! Connection descriptor for a [`Database`](crate::Database).
//!
//! A [`DataSource`] names the vendor and the target database. It is built
//! in code, deserialized from an application's config file, or read from
//! environment variables.

use kettle_core::{ConfigError, Error, Result};
use kettle_pool::{DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_POOL_SIZE, PoolConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where and how to connect.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSource {
    /// Vendor tag: `postgresql`, `mysql` or `sqlite`
    pub vendor: String,
    pub host: String,
    pub port: u16,
    /// Database name; for SQLite the file path
    pub database: String,
    pub username: String,
    pub password: String,
    /// Number of pooled connections
    pub pool_size: usize,
    /// Maximum wait for a pooled connection in milliseconds
    pub acquire_timeout_ms: u64,
}

impl Default for DataSource {
    fn default() -> Self {
        Self {
            vendor: "sqlite".to_string(),
            host: "localhost".to_string(),
            port: 0,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
        }
    }
}

impl DataSource {
    /// A descriptor for `vendor` with default settings.
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            ..Default::default()
        }
    }

    /// A SQLite database stored in `path`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new("sqlite").database(path)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the pool acquire timeout.
    pub fn acquire_timeout(mut self, ms: u64) -> Self {
        self.acquire_timeout_ms = ms;
        self
    }

    /// Read a descriptor from `<PREFIX>_VENDOR`, `<PREFIX>_HOST`,
    /// `<PREFIX>_PORT`, `<PREFIX>_DATABASE`, `<PREFIX>_USERNAME`,
    /// `<PREFIX>_PASSWORD`, `<PREFIX>_POOL_SIZE` and
    /// `<PREFIX>_ACQUIRE_TIMEOUT_MS`.
    ///
    /// Only the vendor is required; unset variables keep their defaults.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{prefix}_{name}"));

        let vendor = var("VENDOR")
            .ok_or_else(|| config_error(format!("{prefix}_VENDOR is not set")))?;
        let mut source = Self::new(vendor);

        if let Some(host) = var("HOST") {
            source.host = host;
        }
        if let Some(port) = var("PORT") {
            source.port = parse_var(prefix, "PORT", &port)?;
        }
        if let Some(database) = var("DATABASE") {
            source.database = database;
        }
        if let Some(username) = var("USERNAME") {
            source.username = username;
        }
        if let Some(password) = var("PASSWORD") {
            source.password = password;
        }
        if let Some(size) = var("POOL_SIZE") {
            source.pool_size = parse_var(prefix, "POOL_SIZE", &size)?;
        }
        if let Some(ms) = var("ACQUIRE_TIMEOUT_MS") {
            source.acquire_timeout_ms = parse_var(prefix, "ACQUIRE_TIMEOUT_MS", &ms)?;
        }
        Ok(source)
    }

    /// `vendor://host:port/database`, or `sqlite://path` for SQLite.
    pub fn url(&self) -> String {
        let vendor = self.vendor.trim().to_ascii_lowercase();
        if vendor == "sqlite" {
            format!("sqlite://{}", self.database)
        } else {
            format!("{}://{}:{}/{}", vendor, self.host, self.port, self.database)
        }
    }

    /// Pool settings carried by this descriptor.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.pool_size).acquire_timeout(self.acquire_timeout_ms)
    }
}

// Password stays out of logs.
impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("url", &self.url())
            .field("username", &self.username)
            .field("password", &"***")
            .field("pool_size", &self.pool_size)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .finish()
    }
}

fn config_error(message: String) -> Error {
    ConfigError { message }.into()
}

fn parse_var<T: std::str::FromStr>(prefix: &str, name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| config_error(format!("{prefix}_{name} is not a valid number: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn url_formats() {
        let pg = DataSource::new("PostgreSQL")
            .host("db.internal")
            .port(5432)
            .database("shop");
        assert_eq!(pg.url(), "postgresql://db.internal:5432/shop");

        let lite = DataSource::sqlite("/var/lib/app/data.db");
        assert_eq!(lite.url(), "sqlite:///var/lib/app/data.db");
    }

    #[test]
    fn builder_sets_pool_config() {
        let source = DataSource::sqlite("x.db").pool_size(3).acquire_timeout(250);
        let config = source.pool_config();
        assert_eq!(config.size, 3);
        assert_eq!(config.acquire_timeout_ms, 250);
    }

    #[test]
    fn reads_prefixed_variables() {
        let source = DataSource::from_lookup(
            "APP_DB",
            lookup(&[
                ("APP_DB_VENDOR", "mysql"),
                ("APP_DB_HOST", "mysql.local"),
                ("APP_DB_PORT", "3306"),
                ("APP_DB_DATABASE", "orders"),
                ("APP_DB_USERNAME", "svc"),
                ("APP_DB_PASSWORD", "hunter2"),
                ("APP_DB_POOL_SIZE", "4"),
                ("APP_DB_ACQUIRE_TIMEOUT_MS", "1500"),
            ]),
        )
        .unwrap();

        assert_eq!(source.url(), "mysql://mysql.local:3306/orders");
        assert_eq!(source.username, "svc");
        assert_eq!(source.password, "hunter2");
        assert_eq!(source.pool_size, 4);
        assert_eq!(source.acquire_timeout_ms, 1500);
        assert_eq!(source.pool_config().acquire_timeout_ms, 1500);
    }

    #[test]
    fn unset_timeout_keeps_default() {
        let source =
            DataSource::from_lookup("DB", lookup(&[("DB_VENDOR", "sqlite")])).unwrap();
        assert_eq!(source.acquire_timeout_ms, DEFAULT_ACQUIRE_TIMEOUT_MS);

        let err = DataSource::from_lookup(
            "DB",
            lookup(&[("DB_VENDOR", "sqlite"), ("DB_ACQUIRE_TIMEOUT_MS", "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("DB_ACQUIRE_TIMEOUT_MS"));
    }

    #[test]
    fn missing_vendor_is_a_config_error() {
        let err = DataSource::from_lookup("APP_DB", lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("APP_DB_VENDOR"));
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let err = DataSource::from_lookup(
            "DB",
            lookup(&[("DB_VENDOR", "postgresql"), ("DB_PORT", "fifty")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let source: DataSource = serde_json::from_str(
            r#"{ "vendor": "postgresql", "host": "pg", "port": 5433, "database": "app" }"#,
        )
        .unwrap();
        assert_eq!(source.url(), "postgresql://pg:5433/app");
        assert_eq!(source.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(source.acquire_timeout_ms, DEFAULT_ACQUIRE_TIMEOUT_MS);
    }

    #[test]
    fn debug_hides_password() {
        let source = DataSource::new("mysql").password("secret");
        let debug = format!("{source:?}");
        assert!(!debug.contains("secret"));
    }
}
