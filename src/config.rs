use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// PostgreSQL schema the registry tables live in. `None` uses the
    /// connection's default `search_path`.
    pub schema: Option<String>,
    pub max_connections: u32,
    pub pool_timeout: Duration,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            schema: None,
            max_connections: 10,
            pool_timeout: Duration::from_secs(5),
            log_dir: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Build database_url from individual fields or use DATABASE_URL if provided
        let database_url = if let Some(url) = lookup("DATABASE_URL") {
            url
        } else {
            let db_host = lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string());
            let db_port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());
            let db_name = lookup("DB_NAME").unwrap_or_else(|| "submarine".to_string());
            let db_user = lookup("DB_USER").unwrap_or_else(|| "submarine".to_string());
            let db_password = lookup("DB_PASSWORD").unwrap_or_else(|| "password".to_string());

            // URL-encode password to handle special characters
            let encoded_password = urlencoding::encode(&db_password);

            format!("postgres://{}:{}@{}:{}/{}", db_user, encoded_password, db_host, db_port, db_name)
        };

        let schema = lookup("MODEL_REGISTRY_SCHEMA").filter(|s| !s.trim().is_empty());

        let max_connections = lookup("MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        if max_connections == 0 {
            anyhow::bail!("MAX_CONNECTIONS must be at least 1");
        }

        let pool_timeout_secs: u64 = lookup("POOL_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let log_dir = lookup("LOG_DIR").map(PathBuf::from);

        Ok(Config {
            database_url,
            schema,
            max_connections,
            pool_timeout: Duration::from_secs(pool_timeout_secs),
            log_dir,
        })
    }

    /// Database URL with the password masked, for logging.
    pub fn redacted_url(&self) -> String {
        let url = &self.database_url;
        let (Some(scheme_end), Some(at)) = (url.find("://"), url.rfind('@')) else {
            return url.clone();
        };
        let credentials = &url[scheme_end + 3..at];
        match credentials.find(':') {
            Some(colon) => format!(
                "{}{}:***{}",
                &url[..scheme_end + 3],
                &credentials[..colon],
                &url[at..]
            ),
            None => url.clone(),
        }
    }
}
