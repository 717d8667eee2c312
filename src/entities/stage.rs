use crate::error::StoreError;
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle stage of a model version.
///
/// Stored as the PostgreSQL enum `model_stage`. Any stage may follow any
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "model_stage")]
pub enum ModelStage {
    #[default]
    #[serde(rename = "NONE")]
    #[postgres(name = "NONE")]
    None,
    #[serde(rename = "DEVELOPING")]
    #[postgres(name = "DEVELOPING")]
    Developing,
    #[serde(rename = "PRODUCTION")]
    #[postgres(name = "PRODUCTION")]
    Production,
    #[serde(rename = "ARCHIVED")]
    #[postgres(name = "ARCHIVED")]
    Archived,
}

impl ModelStage {
    pub const ALL: [ModelStage; 4] = [
        ModelStage::None,
        ModelStage::Developing,
        ModelStage::Production,
        ModelStage::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStage::None => "NONE",
            ModelStage::Developing => "DEVELOPING",
            ModelStage::Production => "PRODUCTION",
            ModelStage::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for ModelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelStage {
    type Err = StoreError;

    /// Case-insensitive match against the canonical stage names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        ModelStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == upper)
            .ok_or_else(|| {
                StoreError::invalid(format!(
                    "Invalid model stage '{}'. Expected one of: NONE, DEVELOPING, PRODUCTION, ARCHIVED",
                    s
                ))
            })
    }
}
