//! Customer account commands.
//!
//! # Usage
//!
//! ```bash
//! myshop user create -e buyer@example.com -p 'correct horse battery'
//! myshop user set-password -e buyer@example.com -p 'another long password'
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use thiserror::Error;

use myshop_core::{Email, EmailError};
use myshop_storefront::db::{self, RepositoryError, UserRepository};
use myshop_storefront::services::{AuthError, AuthService};

use super::{MissingEnvVar, database_url};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// No account for the email.
    #[error("No user with email: {0}")]
    NotFound(String),
}

/// Create a customer account.
///
/// # Errors
///
/// Returns `UserError` if the email is invalid or taken, the password is too
/// short, or the database is unreachable.
pub async fn create(email: &str, password: &str) -> Result<(), UserError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    let user = AuthService::new(&pool)
        .register_with_password(email, password)
        .await?;

    tracing::info!(id = %user.id, email = %user.email, "User created");
    Ok(())
}

/// Replace a customer's password.
///
/// # Errors
///
/// Returns `UserError` if no such user exists, the password is too short, or
/// the database is unreachable.
pub async fn set_password(email: &str, password: &str) -> Result<(), UserError> {
    let email = Email::parse(email)?;
    let database_url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    let user = UserRepository::new(&pool)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| UserError::NotFound(email.to_string()))?;

    AuthService::new(&pool).set_password(user.id, password).await?;

    tracing::info!(id = %user.id, "Password updated");
    Ok(())
}
