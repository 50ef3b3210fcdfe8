//! Discount coupons.

use rust_decimal::Decimal;

use myshop_core::{CouponCode, CouponId};

/// A fixed-amount discount applied to an order total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    pub id: CouponId,
    pub code: CouponCode,
    pub amount: Decimal,
}
