use super::{
    fetch_registered_model, lock_registered_model, tags, touch_registered_model,
    validate_model_name, ModelRegistryStore,
};
use crate::entities::RegisteredModel;
use crate::error::{is_unique_violation, Result, StoreError};
use tracing::{debug, info, warn};

impl ModelRegistryStore {
    /// Create a registered model. Tags keep the given order; repeats are
    /// dropped.
    pub async fn create_registered_model(
        &self,
        name: &str,
        description: Option<&str>,
        tags: &[&str],
    ) -> Result<RegisteredModel> {
        validate_model_name(name)?;
        let tags = tags::normalize_tags(tags)?;
        let now = self.now();

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let inserted = tx
            .execute(
                r#"
                INSERT INTO registered_model (name, creation_time, last_updated_time, description)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (name) DO NOTHING
                "#,
                &[&name, &now, &now, &description],
            )
            .await?;

        if inserted == 0 {
            warn!("Registered model '{}' already exists", name);
            return Err(StoreError::RegisteredModelAlreadyExists {
                name: name.to_string(),
            });
        }

        tags::insert_model_tags(&tx, name, &tags).await?;
        tx.commit().await?;

        info!("Created registered model '{}' with {} tags", name, tags.len());

        Ok(RegisteredModel {
            name: name.to_string(),
            creation_time: now,
            last_updated_time: now,
            description: description.map(str::to_string),
            tags,
        })
    }

    pub async fn get_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let model = fetch_registered_model(&tx, name).await?;
        tx.commit().await?;

        debug!("Fetched registered model '{}'", name);
        Ok(model)
    }

    pub async fn update_registered_model_description(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RegisteredModel> {
        let now = self.now();
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let updated = tx
            .execute(
                "UPDATE registered_model SET description = $2, last_updated_time = $3 WHERE name = $1",
                &[&name, &description, &now],
            )
            .await?;
        if updated == 0 {
            return Err(StoreError::model_not_found(name));
        }

        let model = fetch_registered_model(&tx, name).await?;
        tx.commit().await?;

        info!("Updated description of registered model '{}'", name);
        Ok(model)
    }

    /// Rename a registered model and re-key all of its versions and tags.
    pub async fn rename_registered_model(&self, name: &str, new_name: &str) -> Result<RegisteredModel> {
        validate_model_name(new_name)?;
        if name == new_name {
            return Err(StoreError::invalid(format!(
                "New name for registered model '{}' must differ from the current name",
                name
            )));
        }

        let now = self.now();
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        lock_registered_model(&tx, name).await?;

        let taken = tx
            .query_opt("SELECT 1 FROM registered_model WHERE name = $1", &[&new_name])
            .await?;
        if taken.is_some() {
            warn!("Cannot rename '{}': '{}' is already taken", name, new_name);
            return Err(StoreError::RegisteredModelAlreadyExists {
                name: new_name.to_string(),
            });
        }

        // Parent and children are re-keyed one table at a time; foreign keys
        // are checked at commit.
        tx.batch_execute("SET CONSTRAINTS ALL DEFERRED").await?;

        tx.execute(
            "UPDATE registered_model SET name = $2, last_updated_time = $3 WHERE name = $1",
            &[&name, &new_name, &now],
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::RegisteredModelAlreadyExists {
                    name: new_name.to_string(),
                }
            } else {
                StoreError::from(e)
            }
        })?;

        tx.execute(
            "UPDATE registered_model_tag SET name = $2 WHERE name = $1",
            &[&name, &new_name],
        )
        .await?;
        let versions = tx
            .execute("UPDATE model_version SET name = $2 WHERE name = $1", &[&name, &new_name])
            .await?;
        tx.execute(
            "UPDATE model_version_tag SET name = $2 WHERE name = $1",
            &[&name, &new_name],
        )
        .await?;

        let model = fetch_registered_model(&tx, new_name).await?;
        tx.commit().await?;

        info!(
            "Renamed registered model '{}' to '{}' ({} versions moved)",
            name, new_name, versions
        );
        Ok(model)
    }

    /// Delete a registered model together with its tags, versions and
    /// version tags.
    pub async fn delete_registered_model(&self, name: &str) -> Result<()> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        lock_registered_model(&tx, name).await?;

        tx.execute("DELETE FROM model_version_tag WHERE name = $1", &[&name])
            .await?;
        let versions = tx
            .execute("DELETE FROM model_version WHERE name = $1", &[&name])
            .await?;
        tx.execute("DELETE FROM registered_model_tag WHERE name = $1", &[&name])
            .await?;
        tx.execute("DELETE FROM registered_model WHERE name = $1", &[&name])
            .await?;

        tx.commit().await?;

        info!("Deleted registered model '{}' and {} versions", name, versions);
        Ok(())
    }

    /// List registered models whose name contains `filter_str` and whose tag
    /// set includes every tag in `filter_tags`. Result order is not part of
    /// the contract.
    pub async fn list_registered_model(
        &self,
        filter_str: Option<&str>,
        filter_tags: &[&str],
    ) -> Result<Vec<RegisteredModel>> {
        let filter_tags = tags::filter_tag_set(filter_tags);
        let required = filter_tags.len() as i64;

        let sql = format!(
            r#"
            SELECT {} FROM registered_model rm
            WHERE ($1::TEXT IS NULL OR strpos(rm.name, $1::TEXT) > 0)
              AND (
                SELECT COUNT(*) FROM registered_model_tag t
                WHERE t.name = rm.name AND t.tag = ANY($2::TEXT[])
              ) = $3
            ORDER BY rm.name
            "#,
            RegisteredModel::COLUMNS
        );

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let rows = tx
            .query(sql.as_str(), &[&filter_str, &filter_tags, &required])
            .await?;

        let names: Vec<String> = rows.iter().map(|row| row.get("name")).collect();
        let mut all_tags = tags::load_model_tags(&tx, &names).await?;
        tx.commit().await?;

        let models: Vec<RegisteredModel> = rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let tags = all_tags.remove(&name).unwrap_or_default();
                RegisteredModel::from_row(row, tags)
            })
            .collect();

        debug!(
            "Listed {} registered models (filter: {:?}, tags: {:?})",
            models.len(),
            filter_str,
            filter_tags
        );
        Ok(models)
    }

    /// Add a tag in front of the model's tags. Adding a present tag is a
    /// no-op.
    pub async fn add_registered_model_tag(&self, name: &str, tag: &str) -> Result<()> {
        tags::validate_tag(tag)?;
        let now = self.now();

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        lock_registered_model(&tx, name).await?;
        if tags::prepend_model_tag(&tx, name, tag).await? {
            touch_registered_model(&tx, name, &now).await?;
            info!("Added tag '{}' to registered model '{}'", tag, name);
        } else {
            debug!("Registered model '{}' already has tag '{}'", name, tag);
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_registered_model_tag(&self, name: &str, tag: &str) -> Result<()> {
        tags::validate_tag(tag)?;
        let now = self.now();

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        lock_registered_model(&tx, name).await?;
        if !tags::remove_model_tag(&tx, name, tag).await? {
            return Err(StoreError::TagNotFound {
                target: format!("registered model '{}'", name),
                tag: tag.to_string(),
            });
        }
        touch_registered_model(&tx, name, &now).await?;
        tx.commit().await?;

        info!("Deleted tag '{}' from registered model '{}'", tag, name);
        Ok(())
    }
}
