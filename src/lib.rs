//! Model Registry
//!
//! A PostgreSQL-backed store for named, versioned machine-learning models:
//! registered models, their versions, lifecycle stages, tags and derived
//! artifact URIs.

pub mod clock;
pub mod config;
pub mod entities;
pub mod error;
pub mod pool;
pub mod schema;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use entities::{ModelStage, ModelVersion, ModelVersionSpec, RegisteredModel};
pub use error::{ErrorKind, Result, StoreError};
pub use store::ModelRegistryStore;
