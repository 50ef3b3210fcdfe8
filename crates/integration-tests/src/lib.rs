//! Integration tests for MyShop.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database, migrate and seed it
//! myshop migrate
//! myshop seed catalog crates/cli/catalog.example.yaml
//!
//! # Start the storefront with Stripe test keys, then
//! cargo test -p myshop-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - storefront under test (default `http://localhost:8000`)
//! - `STOREFRONT_DATABASE_URL` - its database, for checks behind the UI
//! - `TEST_ITEM_SLUG` - a seeded item (default `pixel-9`)
//! - `TEST_COUPON_CODE` - a seeded coupon (default `SAVE10`)

use reqwest::{Client, Response, redirect};
use uuid::Uuid;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Slug of an item the catalog seed created.
#[must_use]
pub fn item_slug() -> String {
    std::env::var("TEST_ITEM_SLUG").unwrap_or_else(|_| "pixel-9".to_string())
}

/// Code of a coupon the catalog seed created.
#[must_use]
pub fn coupon_code() -> String {
    std::env::var("TEST_COUPON_CODE").unwrap_or_else(|_| "SAVE10".to_string())
}

/// Password used for every test account.
pub const PASSWORD: &str = "integration-test-password";

/// A browser-like client: keeps cookies and does not follow redirects, so
/// tests can assert on `Location`.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` header of a redirect.
///
/// # Panics
///
/// Panics if the response has no valid `Location` header.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("Response has no Location header")
        .to_string()
}

/// A fresh, unique email address.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4().simple())
}

/// Sign up a new account and return its logged-in client and email.
///
/// # Panics
///
/// Panics if signup does not redirect.
pub async fn signed_up_client() -> (Client, String) {
    let client = client();
    let email = unique_email();

    let response = client
        .post(format!("{}/accounts/signup/", base_url()))
        .form(&[
            ("email", email.as_str()),
            ("password", PASSWORD),
            ("password_confirm", PASSWORD),
        ])
        .send()
        .await
        .expect("Failed to sign up");
    assert!(
        response.status().is_redirection(),
        "signup failed: {}",
        response.status()
    );

    (client, email)
}

/// GET a page and return its body.
///
/// # Panics
///
/// Panics if the request fails.
pub async fn page(client: &Client, path: &str) -> (reqwest::StatusCode, String) {
    let response = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Request failed");
    let status = response.status();
    (status, response.text().await.expect("Failed to read body"))
}

/// A pool on the storefront database, when `STOREFRONT_DATABASE_URL` is set.
///
/// # Panics
///
/// Panics if the variable is set but the database is unreachable.
pub async fn database() -> Option<sqlx::PgPool> {
    let database_url = std::env::var("STOREFRONT_DATABASE_URL").ok()?;
    Some(
        sqlx::PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to database"),
    )
}
