//! Recorded payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use myshop_core::{PaymentId, UserId};

/// A successful charge at the payment provider.
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: PaymentId,
    /// Provider charge ID (e.g. `ch_...`).
    pub stripe_charge_id: String,
    pub user_id: Option<UserId>,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}
