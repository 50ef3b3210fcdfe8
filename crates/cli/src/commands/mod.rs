//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;

/// Missing configuration for a command.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);

/// Storefront database URL from `STOREFRONT_DATABASE_URL`, or `DATABASE_URL`.
///
/// Loads `.env` first if present.
///
/// # Errors
///
/// Returns `MissingEnvVar` if neither variable is set.
pub fn database_url() -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar("STOREFRONT_DATABASE_URL"))
}
