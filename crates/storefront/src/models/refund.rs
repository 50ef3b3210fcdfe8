//! Refund requests.

use chrono::{DateTime, Utc};

use myshop_core::{Email, OrderId, RefundId};

/// A customer's request to refund a paid order.
///
/// `accepted` stays false until staff approve the request.
#[derive(Debug, Clone)]
pub struct Refund {
    pub id: RefundId,
    pub order_id: OrderId,
    pub reason: String,
    pub email: Email,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}
