//! Registry entities
//!
//! Plain data carried in and out of the store. Field names on the wire are
//! spelled out per field so they stay stable if Rust names change.

mod model_version;
mod registered_model;
mod stage;

pub(crate) use model_version::artifact_uri;
pub use model_version::{ModelVersion, ModelVersionSpec, ARTIFACT_URI_ROOT};
pub use registered_model::RegisteredModel;
pub use stage::ModelStage;
