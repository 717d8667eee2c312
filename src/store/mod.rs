//! Model Registry Store
//!
//! Tracks registered models and their numbered versions in PostgreSQL.
//! Every public operation runs in a single transaction: all of its row
//! changes (entity, cascaded children, timestamp bumps) commit together or
//! not at all.

mod model_versions;
mod registered_models;
mod tags;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::entities::{ModelVersion, RegisteredModel};
use crate::error::{Result, StoreError, REGISTRY_DATABASE};
use crate::pool;
use crate::schema::RegistrySchema;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Object, Pool, Transaction};
use std::sync::Arc;

pub struct ModelRegistryStore {
    pool: Pool,
    clock: Arc<dyn Clock>,
    schema: Option<String>,
}

impl ModelRegistryStore {
    /// Wrap an existing pool. Tables are expected on the pool's `search_path`.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
            schema: None,
        }
    }

    /// Connect to the database described by `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = pool::connect(config).await?;
        Ok(Self {
            pool,
            clock: Arc::new(SystemClock),
            schema: config.schema.clone(),
        })
    }

    /// Replace the time source used for creation and update timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        RegistrySchema::new(self.schema.as_deref())?
            .ensure(&self.pool)
            .await
    }

    pub async fn ping(&self) -> Result<()> {
        pool::ping(&self.pool, REGISTRY_DATABASE).await
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn client(&self) -> Result<Object> {
        Ok(self.pool.get().await?)
    }
}

fn validate_model_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::invalid("Registered model name must be a non-empty string"));
    }
    Ok(())
}

/// Row-lock a registered model for the rest of the transaction.
async fn lock_registered_model(tx: &Transaction<'_>, name: &str) -> Result<()> {
    tx.query_opt("SELECT 1 FROM registered_model WHERE name = $1 FOR UPDATE", &[&name])
        .await?
        .map(|_| ())
        .ok_or_else(|| StoreError::model_not_found(name))
}

async fn lock_model_version(tx: &Transaction<'_>, name: &str, version: i32) -> Result<()> {
    tx.query_opt(
        "SELECT 1 FROM model_version WHERE name = $1 AND version = $2 FOR UPDATE",
        &[&name, &version],
    )
    .await?
    .map(|_| ())
    .ok_or_else(|| StoreError::version_not_found(name, version))
}

async fn touch_registered_model(tx: &Transaction<'_>, name: &str, now: &DateTime<Utc>) -> Result<()> {
    let updated = tx
        .execute(
            "UPDATE registered_model SET last_updated_time = $2 WHERE name = $1",
            &[&name, now],
        )
        .await?;
    if updated == 0 {
        return Err(StoreError::model_not_found(name));
    }
    Ok(())
}

async fn touch_model_version(
    tx: &Transaction<'_>,
    name: &str,
    version: i32,
    now: &DateTime<Utc>,
) -> Result<()> {
    let updated = tx
        .execute(
            "UPDATE model_version SET last_updated_time = $3 WHERE name = $1 AND version = $2",
            &[&name, &version, now],
        )
        .await?;
    if updated == 0 {
        return Err(StoreError::version_not_found(name, version));
    }
    Ok(())
}

async fn fetch_registered_model(tx: &Transaction<'_>, name: &str) -> Result<RegisteredModel> {
    let sql = format!("SELECT {} FROM registered_model WHERE name = $1", RegisteredModel::COLUMNS);
    let row = tx
        .query_opt(sql.as_str(), &[&name])
        .await?
        .ok_or_else(|| StoreError::model_not_found(name))?;

    let mut tags = tags::load_model_tags(tx, &[name.to_string()]).await?;
    Ok(RegisteredModel::from_row(&row, tags.remove(name).unwrap_or_default()))
}

async fn fetch_model_version(tx: &Transaction<'_>, name: &str, version: i32) -> Result<ModelVersion> {
    let sql = format!(
        "SELECT {} FROM model_version WHERE name = $1 AND version = $2",
        ModelVersion::COLUMNS
    );
    let row = tx
        .query_opt(sql.as_str(), &[&name, &version])
        .await?
        .ok_or_else(|| StoreError::version_not_found(name, version))?;

    let mut tags = tags::load_version_tags(tx, name, &[version]).await?;
    Ok(ModelVersion::from_row(&row, tags.remove(&version).unwrap_or_default()))
}
