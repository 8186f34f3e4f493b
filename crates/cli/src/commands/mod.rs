//! CLI subcommands.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connect to the storefront database named by `HOI_DATABASE_URL`, falling
/// back to `DATABASE_URL`.
pub(crate) async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("HOI_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| ConnectError::MissingEnvVar("HOI_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(hoi_storefront::db::create_pool(&SecretString::from(database_url)).await?)
}

/// Errors reaching the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
