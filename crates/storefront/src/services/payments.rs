//! Stripe payment client.
//!
//! Talks to the Stripe REST API with form-encoded requests authenticated by
//! the secret key. Only the three calls checkout needs are covered: create a
//! customer, attach a card token to a customer, and create a charge.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use myshop_core::CurrencyCode;

use crate::config::StripeConfig;

/// Failure classes reported by the payment provider.
///
/// Each maps to the message shown to the customer; nothing is retried.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The card was declined. Carries the provider's explanation.
    #[error("card declined: {0}")]
    CardDeclined(String),

    /// Too many requests to the provider in too short a time.
    #[error("rate limited by payment provider")]
    RateLimited,

    /// The request had invalid parameters.
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),

    /// The secret key was rejected.
    #[error("payment provider authentication failed")]
    Authentication,

    /// The provider could not be reached.
    #[error("payment provider unreachable: {0}")]
    Connection(String),

    /// Any other provider error.
    #[error("payment provider error: {0}")]
    Provider(String),
}

impl PaymentError {
    /// Message flashed to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CardDeclined(message) => message.clone(),
            Self::RateLimited => "Rate limit error".to_string(),
            Self::InvalidRequest(_) => "Invalid parameters".to_string(),
            Self::Authentication => "Not authenticated".to_string(),
            Self::Connection(_) => "Network error".to_string(),
            Self::Provider(_) => {
                "Something went wrong. You were not charged. Please try again.".to_string()
            }
        }
    }

    /// Whether the failure points at our setup or the provider rather than
    /// the customer. Declines, rate limits and bad parameters do not.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Authentication | Self::Connection(_) | Self::Provider(_)
        )
    }
}

/// What a charge is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeSource {
    /// A single-use card token from Stripe.js.
    Token(String),
    /// The default card of a saved customer.
    Customer(String),
}

/// A successful charge.
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
    currency: CurrencyCode,
}

impl StripeClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
            currency: config.currency,
        }
    }

    /// Currency charges are made in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Create a customer for an email address.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` classified from the provider response.
    #[instrument(skip(self))]
    pub async fn create_customer(&self, email: &str) -> Result<String, PaymentError> {
        let customer: Customer = self.post("/v1/customers", &[("email", email)]).await?;
        tracing::info!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer.id)
    }

    /// Attach a card token to a customer so it can be charged later.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` classified from the provider response.
    #[instrument(skip(self, token))]
    pub async fn attach_card(&self, customer_id: &str, token: &str) -> Result<(), PaymentError> {
        let path = format!("/v1/customers/{customer_id}/sources");
        let _: serde_json::Value = self.post(&path, &[("source", token)]).await?;
        Ok(())
    }

    /// Charge `amount_minor` (cents) to a token or saved customer.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` classified from the provider response.
    #[instrument(skip(self, source))]
    pub async fn charge(
        &self,
        amount_minor: i64,
        source: &ChargeSource,
        description: &str,
    ) -> Result<Charge, PaymentError> {
        let amount = amount_minor.to_string();
        let (source_key, source_value) = match source {
            ChargeSource::Token(token) => ("source", token.as_str()),
            ChargeSource::Customer(customer) => ("customer", customer.as_str()),
        };
        let params = [
            ("amount", amount.as_str()),
            ("currency", self.currency.as_provider_str()),
            (source_key, source_value),
            ("description", description),
        ];

        let charge: Charge = self.post("/v1/charges", &params).await?;
        tracing::info!(charge_id = %charge.id, amount_minor, "Stripe charge created");
        Ok(charge)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_base))
            .basic_auth(self.secret_key.expose_secret(), Some(""))
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Connection(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Stripe API error");
            return Err(classify_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| PaymentError::Provider(format!("unexpected response: {e}")))
    }
}

/// Map a Stripe error response to a failure class.
fn classify_error(status: u16, body: &str) -> PaymentError {
    let error = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let kind = error.as_ref().and_then(|e| e.kind.as_deref());
    let message = error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));

    match (status, kind) {
        (_, Some("card_error")) | (402, None) => PaymentError::CardDeclined(message),
        (429, _) => PaymentError::RateLimited,
        (401, _) | (_, Some("authentication_error")) => PaymentError::Authentication,
        (_, Some("invalid_request_error")) | (400 | 404, None) => {
            PaymentError::InvalidRequest(message)
        }
        _ => PaymentError::Provider(message),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::{Form, Json, Router, http::StatusCode, routing::post};

    use super::*;

    #[test]
    fn test_classify_card_error_keeps_provider_message() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;
        let err = classify_error(402, body);
        assert!(matches!(err, PaymentError::CardDeclined(_)));
        assert_eq!(err.user_message(), "Your card was declined.");
    }

    #[test]
    fn test_classify_by_status_and_type() {
        assert_eq!(classify_error(429, "").user_message(), "Rate limit error");
        assert_eq!(
            classify_error(400, r#"{"error":{"type":"invalid_request_error","message":"No such token"}}"#)
                .user_message(),
            "Invalid parameters"
        );
        assert_eq!(classify_error(401, "{}").user_message(), "Not authenticated");
        assert_eq!(
            classify_error(500, r#"{"error":{"type":"api_error","message":"boom"}}"#).user_message(),
            "Something went wrong. You were not charged. Please try again."
        );
    }

    #[test]
    fn test_connection_message() {
        assert_eq!(
            PaymentError::Connection("refused".to_string()).user_message(),
            "Network error"
        );
    }

    #[test]
    fn test_server_faults_are_ours_or_the_providers() {
        assert!(PaymentError::Authentication.is_server_fault());
        assert!(PaymentError::Connection("refused".to_string()).is_server_fault());
        assert!(PaymentError::Provider("api_error".to_string()).is_server_fault());

        assert!(!PaymentError::CardDeclined("declined".to_string()).is_server_fault());
        assert!(!PaymentError::RateLimited.is_server_fault());
        assert!(!PaymentError::InvalidRequest("amount".to_string()).is_server_fault());
    }

    async fn fake_stripe() -> String {
        async fn charges(
            Form(params): Form<HashMap<String, String>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            if params.get("source").map(String::as_str) == Some("tok_chargeDeclined") {
                return (
                    StatusCode::PAYMENT_REQUIRED,
                    Json(serde_json::json!({
                        "error": {"type": "card_error", "message": "Your card was declined."}
                    })),
                );
            }
            assert_eq!(params.get("currency").map(String::as_str), Some("usd"));
            (
                StatusCode::OK,
                Json(serde_json::json!({"id": format!("ch_{}", params["amount"])})),
            )
        }

        let app = Router::new().route("/v1/charges", post(charges));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{addr}")
    }

    fn client(api_base: String) -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: SecretString::from("sk_test_unit"),
            public_key: "pk_test_unit".to_string(),
            currency: CurrencyCode::USD,
            api_base,
        })
    }

    #[tokio::test]
    async fn test_charge_posts_minor_units() {
        let stripe = client(fake_stripe().await);
        let charge = stripe
            .charge(1999, &ChargeSource::Token("tok_visa".to_string()), "order")
            .await
            .unwrap();
        assert_eq!(charge.id, "ch_1999");
    }

    #[tokio::test]
    async fn test_declined_charge() {
        let stripe = client(fake_stripe().await);
        let err = stripe
            .charge(
                500,
                &ChargeSource::Token("tok_chargeDeclined".to_string()),
                "order",
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Your card was declined.");
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let stripe = client("http://127.0.0.1:9".to_string());
        let err = stripe.create_customer("a@b.co").await.unwrap_err();
        assert!(matches!(err, PaymentError::Connection(_)));
    }
}
