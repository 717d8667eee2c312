use chrono::{DateTime, NaiveDateTime, Utc};
use model_registry::schema::RegistrySchema;
use model_registry::{Config, FixedClock, ModelRegistryStore, ModelVersionSpec};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const DATABASE_URL_VAR: &str = "MODEL_REGISTRY_TEST_DATABASE_URL";

static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A store living in its own freshly created schema.
pub struct TestRegistry {
    pub store: ModelRegistryStore,
    pub clock: Arc<FixedClock>,
    schema: String,
}

/// Returns `None` (and the test should return early) when no test database
/// is configured.
pub async fn registry() -> Option<TestRegistry> {
    let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
        eprintln!("skipping: {} is not set", DATABASE_URL_VAR);
        return None;
    };

    let schema = format!(
        "registry_e2e_{}_{}",
        std::process::id(),
        SCHEMA_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let config = Config::new(url).with_schema(schema.clone());

    let clock = Arc::new(FixedClock::new(at("2021-11-11 11:11:00.000000")));
    let store = ModelRegistryStore::connect(&config)
        .await
        .expect("test database should be reachable")
        .with_clock(clock.clone());
    store.ensure_schema().await.expect("registry tables should be created");

    Some(TestRegistry { store, clock, schema })
}

impl TestRegistry {
    pub async fn teardown(self) {
        RegistrySchema::new(Some(&self.schema))
            .expect("generated schema name is valid")
            .drop_schema(self.store.pool())
            .await
            .expect("test schema should be dropped");
    }
}

pub fn at(timestamp: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S%.f")
        .expect("valid test timestamp")
        .and_utc()
}

pub fn spec(id: &str) -> ModelVersionSpec {
    ModelVersionSpec::new(id, "test", "application_1234", "tensorflow")
}
