//! Email service for order confirmations and refund acknowledgements.
//!
//! Messages are rendered from plain-text Askama templates and either sent
//! over SMTP via lettre or written to the log (console backend).

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{EmailBackend, EmailConfig};

/// One line of an order confirmation.
pub struct ConfirmationLine {
    pub title: String,
    pub quantity: u32,
    pub price: String,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    ref_code: &'a str,
    lines: &'a [ConfirmationLine],
    total: &'a str,
    shipping_address: Option<&'a str>,
    orders_url: &'a str,
}

/// Plain text template for the refund acknowledgement email.
#[derive(Template)]
#[template(path = "email/refund_received.txt")]
struct RefundReceivedText<'a> {
    ref_code: &'a str,
    message: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Clone)]
enum Transport {
    Console,
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    transport: Transport,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let transport = match &config.backend {
            EmailBackend::Console => Transport::Console,
            EmailBackend::Smtp {
                host,
                port,
                username,
                password,
            } => {
                let credentials =
                    Credentials::new(username.clone(), password.expose_secret().to_string());
                let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                    .port(*port)
                    .credentials(credentials)
                    .build();
                Transport::Smtp(mailer)
            }
        };

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the order confirmation after a successful payment.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        ref_code: &str,
        lines: &[ConfirmationLine],
        total: &str,
        shipping_address: Option<&str>,
        orders_url: &str,
    ) -> Result<(), EmailError> {
        let text = OrderConfirmationText {
            ref_code,
            lines,
            total,
            shipping_address,
            orders_url,
        }
        .render()?;

        self.send_text_email(to, &format!("Your order {ref_code}"), &text)
            .await
    }

    /// Acknowledge a refund request.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_refund_received(
        &self,
        to: &str,
        ref_code: &str,
        message: &str,
    ) -> Result<(), EmailError> {
        let text = RefundReceivedText { ref_code, message }.render()?;

        self.send_text_email(to, &format!("Refund request for order {ref_code}"), &text)
            .await
    }

    async fn send_text_email(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        match &self.transport {
            Transport::Console => {
                tracing::info!(to = %to, subject = %subject, body = %body, "Email (console backend)");
            }
            Transport::Smtp(mailer) => {
                mailer.send(email).await?;
                tracing::info!(to = %to, subject = %subject, "Email sent successfully");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn console() -> EmailService {
        EmailService::new(&EmailConfig {
            backend: EmailBackend::Console,
            from_address: "shop@example.com".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_order_confirmation_renders_lines() {
        let lines = [ConfirmationLine {
            title: "Pixel 9".to_string(),
            quantity: 2,
            price: "$160.00".to_string(),
        }];
        let text = OrderConfirmationText {
            ref_code: "abcdefghij0123456789",
            lines: &lines,
            total: "$160.00",
            shipping_address: Some("1 Main St, 10001 US"),
            orders_url: "http://localhost:8000/orders",
        }
        .render()
        .unwrap();

        assert!(text.contains("abcdefghij0123456789"));
        assert!(text.contains("2 x Pixel 9"));
        assert!(text.contains("Total: $160.00"));
        assert!(text.contains("1 Main St, 10001 US"));
    }

    #[tokio::test]
    async fn test_console_backend_sends() {
        let service = console();
        service
            .send_refund_received("buyer@example.com", "abcdefghij0123456789", "Broken")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let err = console()
            .send_refund_received("not an address", "abc", "Broken")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }
}
