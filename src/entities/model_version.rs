use crate::entities::ModelStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// Root of every artifact URI handed out by the registry.
pub const ARTIFACT_URI_ROOT: &str = "s3://submarine/registry";

/// One numbered snapshot of a registered model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "version")]
    pub version: i32,
    /// Externally supplied identifier, e.g. the run that produced the model.
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "experimentId")]
    pub experiment_id: String,
    #[serde(rename = "modelType")]
    pub model_type: String,
    #[serde(rename = "currentStage")]
    pub current_stage: ModelStage,
    #[serde(rename = "creationTime")]
    pub creation_time: DateTime<Utc>,
    #[serde(rename = "lastUpdatedTime")]
    pub last_updated_time: DateTime<Utc>,
    #[serde(rename = "dataset")]
    pub dataset: Option<String>,
    #[serde(rename = "description")]
    pub description: Option<String>,
    #[serde(rename = "tags")]
    pub tags: Vec<String>,
}

impl ModelVersion {
    pub(crate) const COLUMNS: &'static str = "name, version, id, user_id, experiment_id, model_type, \
         current_stage, creation_time, last_updated_time, dataset, description";

    pub(crate) fn from_row(row: &Row, tags: Vec<String>) -> Self {
        Self {
            name: row.get("name"),
            version: row.get("version"),
            id: row.get("id"),
            user_id: row.get("user_id"),
            experiment_id: row.get("experiment_id"),
            model_type: row.get("model_type"),
            current_stage: row.get("current_stage"),
            creation_time: row.get("creation_time"),
            last_updated_time: row.get("last_updated_time"),
            dataset: row.get("dataset"),
            description: row.get("description"),
            tags,
        }
    }

    /// Artifact location: `s3://submarine/registry/{id}/{name}/{version}`.
    pub fn uri(&self) -> String {
        artifact_uri(&self.id, &self.name, self.version)
    }
}

pub(crate) fn artifact_uri(id: &str, name: &str, version: i32) -> String {
    format!("{}/{}/{}/{}", ARTIFACT_URI_ROOT, id, name, version)
}

/// Caller-supplied fields for a new model version. The version number,
/// stage and timestamps are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelVersionSpec {
    pub id: String,
    pub user_id: String,
    pub experiment_id: String,
    pub model_type: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl ModelVersionSpec {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        experiment_id: impl Into<String>,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            experiment_id: experiment_id.into(),
            model_type: model_type.into(),
            description: None,
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
