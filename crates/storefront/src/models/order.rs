//! Orders and order lines.
//!
//! An order that is not yet `ordered` is the user's cart. Totals are always
//! derived from the lines and coupon; nothing is cached on the order row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use myshop_core::{
    AddressId, OrderFlags, OrderId, OrderItemId, OrderStatus, PaymentId, RefCode, UserId,
};

use super::coupon::Coupon;
use super::item::Item;

/// One item in an order, with its quantity.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub item: Item,
    pub quantity: u32,
    pub ordered: bool,
}

impl OrderItem {
    /// `quantity × price`.
    #[must_use]
    pub fn total_item_price(&self) -> Decimal {
        Decimal::from(self.quantity) * self.item.price
    }

    /// `quantity × discount_price`, when the item is discounted.
    #[must_use]
    pub fn total_discount_item_price(&self) -> Option<Decimal> {
        self.item
            .discount_price
            .map(|discount| Decimal::from(self.quantity) * discount)
    }

    /// Savings from the item discount; zero without one.
    #[must_use]
    pub fn amount_saved(&self) -> Decimal {
        self.total_discount_item_price()
            .map_or(Decimal::ZERO, |discounted| {
                self.total_item_price() - discounted
            })
    }

    /// What this line contributes to the order total.
    #[must_use]
    pub fn final_price(&self) -> Decimal {
        self.total_discount_item_price()
            .unwrap_or_else(|| self.total_item_price())
    }
}

/// An order (or open cart) with its lines.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub ref_code: Option<RefCode>,
    pub start_date: DateTime<Utc>,
    pub ordered_date: Option<DateTime<Utc>>,
    pub shipping_address_id: Option<AddressId>,
    pub billing_address_id: Option<AddressId>,
    pub payment_id: Option<PaymentId>,
    pub coupon: Option<Coupon>,
    pub flags: OrderFlags,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Sum of line prices before the coupon.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(OrderItem::final_price).sum()
    }

    /// Amount the coupon actually takes off, capped at the subtotal.
    #[must_use]
    pub fn coupon_discount(&self) -> Decimal {
        self.coupon
            .as_ref()
            .map_or(Decimal::ZERO, |coupon| coupon.amount.min(self.subtotal()))
    }

    /// Grand total after the coupon, never below zero.
    #[must_use]
    pub fn total(&self) -> Decimal {
        (self.subtotal() - self.coupon_discount()).max(Decimal::ZERO)
    }

    /// Savings across all discounted lines.
    #[must_use]
    pub fn amount_saved(&self) -> Decimal {
        self.items.iter().map(OrderItem::amount_saved).sum()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        OrderStatus::from_flags(self.flags)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::item::fixtures::item;

    pub fn line(order_id: i64, item: Item, quantity: u32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(item.id.as_i64()),
            user_id: UserId::new(1),
            order_id: OrderId::new(order_id),
            item,
            quantity,
            ordered: false,
        }
    }

    /// An open order with a discounted phone ×2 (100 → 80) and a TV ×1 at 50.
    pub fn order() -> Order {
        Order {
            id: OrderId::new(1),
            user_id: UserId::new(1),
            ref_code: None,
            start_date: Utc::now(),
            ordered_date: None,
            shipping_address_id: None,
            billing_address_id: None,
            payment_id: None,
            coupon: None,
            flags: OrderFlags::default(),
            items: vec![
                line(
                    1,
                    item(1, "phone", Decimal::new(100, 0), Some(Decimal::new(80, 0))),
                    2,
                ),
                line(1, item(2, "tv", Decimal::new(50, 0), None), 1),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myshop_core::{CouponCode, CouponId};

    fn coupon(amount: i64) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: CouponCode::parse("SAVE").unwrap_or_else(|e| panic!("{e}")),
            amount: Decimal::new(amount, 0),
        }
    }

    #[test]
    fn test_line_totals() {
        let order = fixtures::order();
        let phone = &order.items[0];
        assert_eq!(phone.total_item_price(), Decimal::new(200, 0));
        assert_eq!(phone.total_discount_item_price(), Some(Decimal::new(160, 0)));
        assert_eq!(phone.amount_saved(), Decimal::new(40, 0));
        assert_eq!(phone.final_price(), Decimal::new(160, 0));

        let tv = &order.items[1];
        assert_eq!(tv.total_discount_item_price(), None);
        assert_eq!(tv.amount_saved(), Decimal::ZERO);
        assert_eq!(tv.final_price(), Decimal::new(50, 0));
    }

    #[test]
    fn test_order_total_without_coupon() {
        let order = fixtures::order();
        assert_eq!(order.total(), Decimal::new(210, 0));
        assert_eq!(order.amount_saved(), Decimal::new(40, 0));
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn test_coupon_subtracts_from_total() {
        let mut order = fixtures::order();
        order.coupon = Some(coupon(50));
        assert_eq!(order.total(), Decimal::new(160, 0));
    }

    #[test]
    fn test_total_never_negative() {
        let mut order = fixtures::order();
        order.coupon = Some(coupon(1000));
        assert_eq!(order.coupon_discount(), Decimal::new(210, 0));
        assert_eq!(order.total(), Decimal::ZERO);
    }

    #[test]
    fn test_status_follows_flags() {
        let mut order = fixtures::order();
        assert_eq!(order.status(), OrderStatus::Open);
        order.flags.ordered = true;
        order.flags.refund_requested = true;
        assert_eq!(order.status(), OrderStatus::RefundRequested);
    }
}
