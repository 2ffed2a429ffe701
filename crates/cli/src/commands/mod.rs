//! CLI command implementations.

pub mod items;
pub mod migrate;
pub mod recipients;

use secrecy::SecretString;
use thiserror::Error;

use gift_registry_core::NewItemError;
use gift_registry_server::db::{self, PgRegistryStore, RepositoryError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),

    /// Import file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Import file is not valid YAML.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An item failed validation.
    #[error("Invalid item #{index}: {source}")]
    InvalidItem {
        index: usize,
        #[source]
        source: NewItemError,
    },
}

/// Database URL, preferring `REGISTRY_DATABASE_URL` over `DATABASE_URL`.
fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("REGISTRY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("REGISTRY_DATABASE_URL"))
}

/// Connect to the registry database.
async fn connect() -> Result<PgRegistryStore, CliError> {
    let url = database_url()?;
    tracing::info!("Connecting to registry database...");
    let pool = db::create_pool(&url).await?;
    Ok(PgRegistryStore::new(pool))
}
