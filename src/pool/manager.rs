use crate::config::Config;
use crate::error::{db_error_message, Result, StoreError};
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// Build a pool for the registry database described by `config`.
///
/// When a schema is configured every pooled connection starts with
/// `search_path` pointing at it, so unqualified table names resolve there.
pub fn create_pool(config: &Config) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(config.database_url.clone());

    if let Some(schema) = &config.schema {
        if !is_valid_identifier(schema) {
            return Err(StoreError::invalid(format!("Invalid schema name: {}", schema)));
        }
        cfg.options = Some(format!("-c search_path={}", schema));
    }

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: config.max_connections as usize,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(config.pool_timeout),
            create: Some(config.pool_timeout),
            recycle: Some(config.pool_timeout),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| StoreError::Internal(format!("Failed to create pool: {}", e)))
}

/// Create the pool and check that the database answers.
pub async fn connect(config: &Config) -> Result<Pool> {
    let pool = create_pool(config)?;
    ping(&pool, &config.redacted_url()).await?;

    info!(
        "Connected to registry database {} (schema: {})",
        config.redacted_url(),
        config.schema.as_deref().unwrap_or("default")
    );

    Ok(pool)
}

pub async fn ping(pool: &Pool, database: &str) -> Result<()> {
    let client = pool.get().await.map_err(|e| StoreError::ConnectionFailed {
        database: database.to_string(),
        cause: e.to_string(),
    })?;

    client
        .execute("SELECT 1", &[])
        .await
        .map_err(|e| StoreError::ConnectionFailed {
            database: database.to_string(),
            cause: format!("Ping failed: {}", db_error_message(&e)),
        })?;

    debug!("Ping succeeded for {}", database);
    Ok(())
}

/// Lowercase PostgreSQL identifier, safe to splice into DDL.
pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    let Some(first_char) = name.chars().next() else {
        return false;
    };
    if !first_char.is_ascii_lowercase() && first_char != '_' {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifier() {
        assert!(is_valid_identifier("model_registry"));
        assert!(is_valid_identifier("registry_test_42"));
        assert!(is_valid_identifier("_scratch"));

        assert!(!is_valid_identifier("")); // Empty
        assert!(!is_valid_identifier("public; DROP SCHEMA x")); // SQL injection attempt
        assert!(!is_valid_identifier("9lives")); // Starts with number
        assert!(!is_valid_identifier("Registry")); // Contains uppercase
        assert!(!is_valid_identifier(&"a".repeat(64))); // Too long
    }

    #[tokio::test]
    async fn test_create_pool_rejects_bad_schema() {
        let config = Config::new("postgres://u:p@localhost:5432/db").with_schema("Bad-Schema");
        let err = create_pool(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid schema name"));
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        // No connection is attempted until a client is requested.
        let config = Config::new("postgres://u:p@localhost:5432/db").with_schema("registry");
        let pool = create_pool(&config).unwrap();
        assert_eq!(pool.status().size, 0);
    }
}
