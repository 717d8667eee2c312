use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// A named container for the versions of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "creationTime")]
    pub creation_time: DateTime<Utc>,
    #[serde(rename = "lastUpdatedTime")]
    pub last_updated_time: DateTime<Utc>,
    #[serde(rename = "description")]
    pub description: Option<String>,
    /// Newest additions first; creation order for tags supplied up front.
    #[serde(rename = "tags")]
    pub tags: Vec<String>,
}

impl RegisteredModel {
    /// Column list matching [`RegisteredModel::from_row`].
    pub(crate) const COLUMNS: &'static str = "name, creation_time, last_updated_time, description";

    pub(crate) fn from_row(row: &Row, tags: Vec<String>) -> Self {
        Self {
            name: row.get("name"),
            creation_time: row.get("creation_time"),
            last_updated_time: row.get("last_updated_time"),
            description: row.get("description"),
            tags,
        }
    }
}
