//! Connection configuration loaded from the environment.
//!
//! Recognized variables (a `.env` file in the working directory is loaded first):
//!
//! | Variable              | Meaning                                      |
//! |-----------------------|----------------------------------------------|
//! | `DATABASE_URL`        | full connection string, overrides the below  |
//! | `DB_HOST`             | server host (default `localhost`)            |
//! | `DB_PORT`             | server port (default `5432`)                 |
//! | `DB_DATABASE`         | database name                                |
//! | `DB_USERNAME`         | role name                                    |
//! | `DB_PASSWORD`         | role password                                |
//! | `DB_TIMEZONE`         | session `TimeZone`                           |
//! | `DB_CHARSET`          | session `client_encoding`                    |
//! | `DB_POOL_SIZE`        | pool max size (default 16)                   |
//! | `DB_QUERY_TIMEOUT_MS` | per-statement timeout in milliseconds        |
//! | `PATH_LOG`            | directory for `pgfluent.log`                 |

use crate::error::{OrmError, OrmResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const LOG_FILE_NAME: &str = "pgfluent.log";

/// Database connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timezone: Option<String>,
    pub charset: Option<String>,
    pub pool_size: usize,
    pub query_timeout: Option<Duration>,
    pub log_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            database: None,
            username: None,
            password: None,
            timezone: None,
            charset: None,
            pool_size: 16,
            query_timeout: None,
            log_dir: None,
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> OrmResult<Self> {
        // A missing .env file is fine; the process environment still applies.
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Build a configuration from `(name, value)` pairs.
    pub fn from_vars<I, K, V>(vars: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let mut config = Self::default();
        config.url = vars.get("DATABASE_URL").cloned();
        if let Some(host) = vars.get("DB_HOST") {
            config.host = host.clone();
        }
        if let Some(port) = vars.get("DB_PORT") {
            config.port = port
                .parse()
                .map_err(|_| OrmError::Config(format!("DB_PORT is not a port: {port}")))?;
        }
        config.database = vars.get("DB_DATABASE").cloned();
        config.username = vars.get("DB_USERNAME").cloned();
        config.password = vars.get("DB_PASSWORD").cloned();
        config.timezone = vars.get("DB_TIMEZONE").cloned();
        config.charset = vars.get("DB_CHARSET").cloned();
        if let Some(size) = vars.get("DB_POOL_SIZE") {
            config.pool_size = size
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or_else(|| OrmError::Config(format!("DB_POOL_SIZE is invalid: {size}")))?;
        }
        if let Some(ms) = vars.get("DB_QUERY_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| OrmError::Config(format!("DB_QUERY_TIMEOUT_MS is invalid: {ms}")))?;
            config.query_timeout = Some(Duration::from_millis(ms));
        }
        config.log_dir = vars
            .get("PATH_LOG")
            .map(|dir| PathBuf::from(dir.trim_end_matches(['/', '\\'])));
        Ok(config)
    }

    /// Set the connection string.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the per-statement timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    /// Set the pool max size.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    /// Look up a setting by name; `None` when unset.
    ///
    /// Keys: `host`, `port`, `database`, `username`, `password`, `timezone`,
    /// `charset`, `pool_size`, `query_timeout_ms`, `path_log`, `url`.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "url" => self.url.clone(),
            "host" | "hostname" => Some(self.host.clone()),
            "port" => Some(self.port.to_string()),
            "database" => self.database.clone(),
            "username" => self.username.clone(),
            "password" => self.password.clone(),
            "timezone" => self.timezone.clone(),
            "charset" => self.charset.clone(),
            "pool_size" => Some(self.pool_size.to_string()),
            "query_timeout_ms" => self.query_timeout.map(|d| d.as_millis().to_string()),
            "path_log" => self.log_path().map(|p| p.display().to_string()),
            _ => None,
        }
    }

    /// Full path of the log file, when a log directory is configured.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(LOG_FILE_NAME))
    }

    /// Session options passed at connect time.
    fn session_options(&self) -> Option<String> {
        let mut opts = Vec::new();
        if let Some(tz) = &self.timezone {
            opts.push(format!("-c TimeZone={tz}"));
        }
        if let Some(charset) = &self.charset {
            opts.push(format!("-c client_encoding={charset}"));
        }
        (!opts.is_empty()).then(|| opts.join(" "))
    }

    /// Driver configuration for these settings.
    pub fn pg_config(&self) -> OrmResult<tokio_postgres::Config> {
        let mut pg = match &self.url {
            Some(url) => url
                .parse::<tokio_postgres::Config>()
                .map_err(|e| OrmError::Config(format!("invalid DATABASE_URL: {e}")))?,
            None => {
                let mut pg = tokio_postgres::Config::new();
                pg.host(&self.host).port(self.port);
                if let Some(db) = &self.database {
                    pg.dbname(db);
                }
                if let Some(user) = &self.username {
                    pg.user(user);
                }
                if let Some(password) = &self.password {
                    pg.password(password);
                }
                pg
            }
        };
        if let Some(options) = self.session_options() {
            pg.options(&options);
        }
        Ok(pg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_discrete_variables() {
        let config = DatabaseConfig::from_vars([
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_DATABASE", "shop"),
            ("DB_USERNAME", "app"),
            ("DB_PASSWORD", "secret"),
            ("DB_TIMEZONE", "UTC"),
            ("DB_QUERY_TIMEOUT_MS", "2500"),
            ("PATH_LOG", "var/logs/"),
        ])
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.get("database").as_deref(), Some("shop"));
        assert_eq!(config.query_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.log_path(), Some(PathBuf::from("var/logs/pgfluent.log")));
        assert_eq!(config.get("charset"), None);
        assert_eq!(config.get("no_such_key"), None);
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = DatabaseConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config, DatabaseConfig::default());
        assert_eq!(config.get("port").as_deref(), Some("5432"));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(DatabaseConfig::from_vars([("DB_PORT", "http")]).is_err());
        assert!(DatabaseConfig::from_vars([("DB_POOL_SIZE", "0")]).is_err());
        assert!(DatabaseConfig::from_vars([("DB_QUERY_TIMEOUT_MS", "-1")]).is_err());
    }

    #[test]
    fn session_options_include_timezone() {
        let config = DatabaseConfig::from_vars([("DB_TIMEZONE", "Europe/Lisbon")]).unwrap();
        let pg = config.pg_config().unwrap();
        assert_eq!(pg.get_options(), Some("-c TimeZone=Europe/Lisbon"));
    }

    #[test]
    fn url_overrides_discrete_settings() {
        let config = DatabaseConfig::new().url("postgres://u:p@example.com:5000/app");
        let pg = config.pg_config().unwrap();
        assert_eq!(pg.get_dbname(), Some("app"));
        assert_eq!(pg.get_ports(), &[5000]);
    }
}
