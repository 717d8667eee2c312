use super::{
    fetch_model_version, lock_model_version, tags, touch_model_version, touch_registered_model,
    ModelRegistryStore,
};
use crate::entities::{artifact_uri, ModelStage, ModelVersion, ModelVersionSpec};
use crate::error::{Result, StoreError};
use tracing::{debug, info, warn};

impl ModelRegistryStore {
    /// Create the next version of a registered model.
    ///
    /// Versions count up from 1 per model and are never handed out twice,
    /// even after the latest version is deleted.
    pub async fn create_model_version(&self, name: &str, spec: &ModelVersionSpec) -> Result<ModelVersion> {
        let tags = tags::normalize_tags(&spec.tags)?;
        let now = self.now();

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                r#"
                UPDATE registered_model
                SET latest_version = latest_version + 1, last_updated_time = $2
                WHERE name = $1
                RETURNING latest_version
                "#,
                &[&name, &now],
            )
            .await?
            .ok_or_else(|| StoreError::model_not_found(name))?;
        let version: i32 = row.get("latest_version");

        tx.execute(
            r#"
            INSERT INTO model_version
                (name, version, id, user_id, experiment_id, model_type,
                 current_stage, creation_time, last_updated_time, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            &[
                &name,
                &version,
                &spec.id,
                &spec.user_id,
                &spec.experiment_id,
                &spec.model_type,
                &ModelStage::None,
                &now,
                &now,
                &spec.description,
            ],
        )
        .await?;

        tags::insert_version_tags(&tx, name, version, &tags).await?;
        tx.commit().await?;

        info!("Created version {} of registered model '{}' (id: {})", version, name, spec.id);

        Ok(ModelVersion {
            name: name.to_string(),
            version,
            id: spec.id.clone(),
            user_id: spec.user_id.clone(),
            experiment_id: spec.experiment_id.clone(),
            model_type: spec.model_type.clone(),
            current_stage: ModelStage::None,
            creation_time: now,
            last_updated_time: now,
            dataset: None,
            description: spec.description.clone(),
            tags,
        })
    }

    pub async fn get_model_version(&self, name: &str, version: i32) -> Result<ModelVersion> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let model_version = fetch_model_version(&tx, name, version).await?;
        tx.commit().await?;

        debug!("Fetched version {} of registered model '{}'", version, name);
        Ok(model_version)
    }

    pub async fn update_model_version_description(
        &self,
        name: &str,
        version: i32,
        description: &str,
    ) -> Result<ModelVersion> {
        let now = self.now();
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let updated = tx
            .execute(
                r#"
                UPDATE model_version SET description = $3, last_updated_time = $4
                WHERE name = $1 AND version = $2
                "#,
                &[&name, &version, &description, &now],
            )
            .await?;
        if updated == 0 {
            return Err(StoreError::version_not_found(name, version));
        }
        touch_registered_model(&tx, name, &now).await?;

        let model_version = fetch_model_version(&tx, name, version).await?;
        tx.commit().await?;

        info!("Updated description of version {} of registered model '{}'", version, name);
        Ok(model_version)
    }

    /// Move a version to another stage. `stage` matches the stage names
    /// case-insensitively; anything else is rejected before any row is
    /// touched.
    pub async fn transition_model_version_stage(
        &self,
        name: &str,
        version: i32,
        stage: &str,
    ) -> Result<ModelVersion> {
        let stage: ModelStage = stage.parse().map_err(|e| {
            warn!("Rejected stage transition for '{}' version {}: {}", name, version, e);
            e
        })?;

        let now = self.now();
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let updated = tx
            .execute(
                r#"
                UPDATE model_version SET current_stage = $3, last_updated_time = $4
                WHERE name = $1 AND version = $2
                "#,
                &[&name, &version, &stage, &now],
            )
            .await?;
        if updated == 0 {
            return Err(StoreError::version_not_found(name, version));
        }
        touch_registered_model(&tx, name, &now).await?;

        let model_version = fetch_model_version(&tx, name, version).await?;
        tx.commit().await?;

        info!("Moved version {} of registered model '{}' to {}", version, name, stage);
        Ok(model_version)
    }

    pub async fn delete_model_version(&self, name: &str, version: i32) -> Result<()> {
        let now = self.now();
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        lock_model_version(&tx, name, version).await?;

        tx.execute(
            "DELETE FROM model_version_tag WHERE name = $1 AND version = $2",
            &[&name, &version],
        )
        .await?;
        tx.execute(
            "DELETE FROM model_version WHERE name = $1 AND version = $2",
            &[&name, &version],
        )
        .await?;
        touch_registered_model(&tx, name, &now).await?;

        tx.commit().await?;

        info!("Deleted version {} of registered model '{}'", version, name);
        Ok(())
    }

    /// Versions of `name` carrying every tag in `filter_tags`. An unknown
    /// model yields an empty list.
    pub async fn list_model_versions(&self, name: &str, filter_tags: &[&str]) -> Result<Vec<ModelVersion>> {
        let filter_tags = tags::filter_tag_set(filter_tags);
        let required = filter_tags.len() as i64;

        let sql = format!(
            r#"
            SELECT {} FROM model_version mv
            WHERE mv.name = $1
              AND (
                SELECT COUNT(*) FROM model_version_tag t
                WHERE t.name = mv.name AND t.version = mv.version AND t.tag = ANY($2::TEXT[])
              ) = $3
            ORDER BY mv.version
            "#,
            ModelVersion::COLUMNS
        );

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let rows = tx
            .query(sql.as_str(), &[&name, &filter_tags, &required])
            .await?;

        let versions: Vec<i32> = rows.iter().map(|row| row.get("version")).collect();
        let mut all_tags = tags::load_version_tags(&tx, name, &versions).await?;
        tx.commit().await?;

        let model_versions: Vec<ModelVersion> = rows
            .iter()
            .map(|row| {
                let version: i32 = row.get("version");
                let tags = all_tags.remove(&version).unwrap_or_default();
                ModelVersion::from_row(row, tags)
            })
            .collect();

        debug!(
            "Listed {} versions of registered model '{}' (tags: {:?})",
            model_versions.len(),
            name,
            filter_tags
        );
        Ok(model_versions)
    }

    /// Artifact URI of a live model version.
    pub async fn get_model_version_uri(&self, name: &str, version: i32) -> Result<String> {
        let client = self.client().await?;

        let row = client
            .query_opt(
                "SELECT id FROM model_version WHERE name = $1 AND version = $2",
                &[&name, &version],
            )
            .await?
            .ok_or_else(|| StoreError::version_not_found(name, version))?;

        let id: String = row.get("id");
        Ok(artifact_uri(&id, name, version))
    }

    /// Add a tag in front of the version's tags. Adding a present tag is a
    /// no-op.
    pub async fn add_model_version_tag(&self, name: &str, version: i32, tag: &str) -> Result<()> {
        tags::validate_tag(tag)?;
        let now = self.now();

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        lock_model_version(&tx, name, version).await?;
        if tags::prepend_version_tag(&tx, name, version, tag).await? {
            touch_model_version(&tx, name, version, &now).await?;
            touch_registered_model(&tx, name, &now).await?;
            info!("Added tag '{}' to version {} of registered model '{}'", tag, version, name);
        } else {
            debug!("Version {} of '{}' already has tag '{}'", version, name, tag);
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_model_version_tag(&self, name: &str, version: i32, tag: &str) -> Result<()> {
        tags::validate_tag(tag)?;
        let now = self.now();

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        lock_model_version(&tx, name, version).await?;
        if !tags::remove_version_tag(&tx, name, version, tag).await? {
            return Err(StoreError::TagNotFound {
                target: format!("version {} of registered model '{}'", version, name),
                tag: tag.to_string(),
            });
        }
        touch_model_version(&tx, name, version, &now).await?;
        touch_registered_model(&tx, name, &now).await?;
        tx.commit().await?;

        info!("Deleted tag '{}' from version {} of registered model '{}'", tag, version, name);
        Ok(())
    }
}
