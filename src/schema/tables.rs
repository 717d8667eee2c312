//! Registry table definitions
//!
//! Four tables: registered models, their tags, model versions and their
//! tags. Foreign keys are `DEFERRABLE` and carry no `ON DELETE`/`ON UPDATE`
//! actions; the store removes and re-keys child rows itself inside the
//! owning transaction.

use crate::error::{db_error_message, Result, StoreError};
use crate::pool::is_valid_identifier;
use deadpool_postgres::Pool;
use tracing::{debug, info};

const CREATE_STAGE_TYPE: &str = r#"
DO $$
BEGIN
    CREATE TYPE model_stage AS ENUM ('NONE', 'DEVELOPING', 'PRODUCTION', 'ARCHIVED');
EXCEPTION
    WHEN duplicate_object THEN NULL;
END
$$
"#;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS registered_model (
    name VARCHAR(256) PRIMARY KEY,
    creation_time TIMESTAMPTZ NOT NULL,
    last_updated_time TIMESTAMPTZ NOT NULL,
    description VARCHAR(5000),
    latest_version INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS registered_model_tag (
    name VARCHAR(256) NOT NULL,
    tag VARCHAR(256) NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (name, tag),
    CONSTRAINT fk_registered_model_tag_model FOREIGN KEY (name)
        REFERENCES registered_model (name) DEFERRABLE INITIALLY IMMEDIATE
);

CREATE TABLE IF NOT EXISTS model_version (
    name VARCHAR(256) NOT NULL,
    version INTEGER NOT NULL,
    id VARCHAR(64) NOT NULL,
    user_id VARCHAR(64) NOT NULL,
    experiment_id VARCHAR(64) NOT NULL,
    model_type VARCHAR(64) NOT NULL,
    current_stage model_stage NOT NULL DEFAULT 'NONE',
    creation_time TIMESTAMPTZ NOT NULL,
    last_updated_time TIMESTAMPTZ NOT NULL,
    dataset VARCHAR(256),
    description VARCHAR(5000),
    PRIMARY KEY (name, version),
    CONSTRAINT fk_model_version_model FOREIGN KEY (name)
        REFERENCES registered_model (name) DEFERRABLE INITIALLY IMMEDIATE
);

CREATE TABLE IF NOT EXISTS model_version_tag (
    name VARCHAR(256) NOT NULL,
    version INTEGER NOT NULL,
    tag VARCHAR(256) NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (name, version, tag),
    CONSTRAINT fk_model_version_tag_version FOREIGN KEY (name, version)
        REFERENCES model_version (name, version) DEFERRABLE INITIALLY IMMEDIATE
);

CREATE INDEX IF NOT EXISTS idx_registered_model_tag_tag ON registered_model_tag (tag);
CREATE INDEX IF NOT EXISTS idx_model_version_tag_tag ON model_version_tag (tag);
"#;

/// Creates and removes the registry's tables.
pub struct RegistrySchema {
    schema: Option<String>,
}

impl RegistrySchema {
    pub fn new(schema: Option<&str>) -> Result<Self> {
        if let Some(name) = schema {
            if !is_valid_identifier(name) {
                return Err(StoreError::invalid(format!("Invalid schema name: {}", name)));
            }
        }

        Ok(Self {
            schema: schema.map(str::to_string),
        })
    }

    /// Create everything the store needs. Safe to run repeatedly.
    pub async fn ensure(&self, pool: &Pool) -> Result<()> {
        let client = pool.get().await?;

        if let Some(schema) = &self.schema {
            client
                .batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
                .await
                .map_err(|e| {
                    StoreError::Internal(format!(
                        "Failed to create schema {}: {}",
                        schema,
                        db_error_message(&e)
                    ))
                })?;
            debug!("Schema {} ensured", schema);
        }

        client
            .batch_execute(CREATE_STAGE_TYPE)
            .await
            .map_err(|e| {
                StoreError::Internal(format!("Failed to create model_stage type: {}", db_error_message(&e)))
            })?;

        client
            .batch_execute(CREATE_TABLES)
            .await
            .map_err(|e| {
                StoreError::Internal(format!("Failed to create registry tables: {}", db_error_message(&e)))
            })?;

        info!(
            "Registry tables ensured in schema {}",
            self.schema.as_deref().unwrap_or("(search_path)")
        );
        Ok(())
    }

    /// Drop the configured schema and everything in it.
    ///
    /// Only available when a dedicated schema is configured; the default
    /// schema is never dropped.
    pub async fn drop_schema(&self, pool: &Pool) -> Result<()> {
        let Some(schema) = &self.schema else {
            return Err(StoreError::invalid(
                "Refusing to drop registry tables without a dedicated schema",
            ));
        };

        let client = pool.get().await?;
        client
            .batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
            .await
            .map_err(|e| {
                StoreError::Internal(format!(
                    "Failed to drop schema {}: {}",
                    schema,
                    db_error_message(&e)
                ))
            })?;

        info!("Dropped schema {}", schema);
        Ok(())
    }
}
