//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Local accounts (Argon2 password hashing)
//! - `email` - Order confirmation and refund acknowledgement emails
//! - `payments` - Stripe customers and charges

pub mod auth;
pub mod email;
pub mod payments;

pub use auth::{AuthError, AuthService};
pub use email::{ConfirmationLine, EmailError, EmailService};
pub use payments::{ChargeSource, PaymentError, StripeClient};
