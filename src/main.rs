//! Model Registry administration CLI
//!
//! Usage:
//!   model-registry init
//!   model-registry models list --filter AB --tag prod
//!   model-registry versions stage mnist 3 production

use clap::{Parser, Subcommand};
use model_registry::{Config, ModelRegistryStore, ModelVersionSpec};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "model-registry")]
#[command(about = "Manage registered models and model versions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the registry tables if they do not exist
    Init,

    /// Registered model operations
    Models {
        #[command(subcommand)]
        command: ModelCommands,
    },

    /// Model version operations
    Versions {
        #[command(subcommand)]
        command: VersionCommands,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List registered models
    List {
        /// Only models whose name contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Only models carrying this tag (repeatable, all must match)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Show one registered model
    Show { name: String },

    /// Create a registered model
    Create {
        name: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Rename a registered model and all of its versions
    Rename { name: String, new_name: String },

    /// Delete a registered model with all of its versions
    Delete { name: String },
}

#[derive(Subcommand)]
enum VersionCommands {
    /// List versions of a registered model
    List {
        name: String,

        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Show one model version
    Show { name: String, version: i32 },

    /// Register a new version of a model
    Create {
        name: String,

        /// External identifier of the version, e.g. the producing run
        #[arg(long)]
        id: String,

        #[arg(long = "user")]
        user_id: String,

        #[arg(long = "experiment")]
        experiment_id: String,

        #[arg(long)]
        model_type: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Move a version to NONE, DEVELOPING, PRODUCTION or ARCHIVED
    Stage {
        name: String,
        version: i32,
        stage: String,
    },

    /// Print the artifact URI of a version
    Uri { name: String, version: i32 },

    /// Delete a model version
    Delete { name: String, version: i32 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present
    let dotenv = dotenvy::dotenv();

    let config = Config::from_env()?;
    let _guard = init_logging(config.log_dir.as_deref());

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();

    info!("Using registry database {}", config.redacted_url());
    let store = ModelRegistryStore::connect(&config).await?;

    match cli.command {
        Commands::Init => {
            store.ensure_schema().await?;
            println!("Registry schema is ready");
        }
        Commands::Models { command } => run_model_command(&store, command).await?,
        Commands::Versions { command } => run_version_command(&store, command).await?,
    }

    Ok(())
}

async fn run_model_command(store: &ModelRegistryStore, command: ModelCommands) -> anyhow::Result<()> {
    match command {
        ModelCommands::List { filter, tags } => {
            let tags = as_strs(&tags);
            print_json(&store.list_registered_model(filter.as_deref(), &tags).await?)
        }
        ModelCommands::Show { name } => print_json(&store.get_registered_model(&name).await?),
        ModelCommands::Create {
            name,
            description,
            tags,
        } => {
            let tags = as_strs(&tags);
            let model = store
                .create_registered_model(&name, description.as_deref(), &tags)
                .await?;
            print_json(&model)
        }
        ModelCommands::Rename { name, new_name } => {
            print_json(&store.rename_registered_model(&name, &new_name).await?)
        }
        ModelCommands::Delete { name } => {
            store.delete_registered_model(&name).await?;
            println!("Deleted registered model '{}'", name);
            Ok(())
        }
    }
}

async fn run_version_command(store: &ModelRegistryStore, command: VersionCommands) -> anyhow::Result<()> {
    match command {
        VersionCommands::List { name, tags } => {
            let tags = as_strs(&tags);
            print_json(&store.list_model_versions(&name, &tags).await?)
        }
        VersionCommands::Show { name, version } => {
            print_json(&store.get_model_version(&name, version).await?)
        }
        VersionCommands::Create {
            name,
            id,
            user_id,
            experiment_id,
            model_type,
            description,
            tags,
        } => {
            let mut spec = ModelVersionSpec::new(id, user_id, experiment_id, model_type).with_tags(tags);
            spec.description = description;
            print_json(&store.create_model_version(&name, &spec).await?)
        }
        VersionCommands::Stage { name, version, stage } => {
            print_json(&store.transition_model_version_stage(&name, version, &stage).await?)
        }
        VersionCommands::Uri { name, version } => {
            println!("{}", store.get_model_version_uri(&name, version).await?);
            Ok(())
        }
        VersionCommands::Delete { name, version } => {
            store.delete_model_version(&name, version).await?;
            println!("Deleted version {} of registered model '{}'", version, name);
            Ok(())
        }
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Console logs go to stderr so stdout stays machine-readable. With a log
/// directory, a daily-rotated JSON file is written as well.
fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,model_registry=debug"));
    let console = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return None;
    };

    // Create log directory if it doesn't exist
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        tracing_subscriber::registry().with(filter).with(console).init();
        warn!("Could not create log directory {:?}: {}", log_dir, e);
        return None;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "model-registry.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        // File output with JSON format for easy parsing
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {:?}", log_dir);
    Some(guard)
}
