//! Status and choice enums for orders, addresses and payments.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of an order, derived from its stored flags.
///
/// The progression is linear: an open order (the cart) becomes ordered when
/// paid, may then be delivered and received, and may finally have a refund
/// requested and granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Ordered,
    BeingDelivered,
    Received,
    RefundRequested,
    Refunded,
}

/// The stored boolean flags of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OrderFlags {
    pub ordered: bool,
    pub being_delivered: bool,
    pub received: bool,
    pub refund_requested: bool,
    pub refund_granted: bool,
}

impl OrderStatus {
    /// Derive the status from an order's flags. Later stages win.
    #[must_use]
    pub const fn from_flags(flags: OrderFlags) -> Self {
        if !flags.ordered {
            Self::Open
        } else if flags.refund_granted {
            Self::Refunded
        } else if flags.refund_requested {
            Self::RefundRequested
        } else if flags.received {
            Self::Received
        } else if flags.being_delivered {
            Self::BeingDelivered
        } else {
            Self::Ordered
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "In cart",
            Self::Ordered => "Ordered",
            Self::BeingDelivered => "Being delivered",
            Self::Received => "Received",
            Self::RefundRequested => "Refund requested",
            Self::Refunded => "Refunded",
        }
    }

    /// Whether a refund may still be requested for an order in this status.
    #[must_use]
    pub const fn is_refundable(self) -> bool {
        matches!(self, Self::Ordered | Self::BeingDelivered | Self::Received)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an address is used for billing or shipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    #[serde(rename = "B")]
    Billing,
    #[serde(rename = "S")]
    Shipping,
}

impl AddressType {
    /// The stored one-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Billing => "B",
            Self::Shipping => "S",
        }
    }
}

impl FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B" => Ok(Self::Billing),
            "S" => Ok(Self::Shipping),
            _ => Err(format!("invalid address type: {s}")),
        }
    }
}

/// Payment option chosen at checkout, used as the `/payment/<option>/` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOption {
    Stripe,
    PayPal,
}

impl PaymentOption {
    /// All options offered on the checkout form.
    pub const ALL: [Self; 2] = [Self::Stripe, Self::PayPal];

    /// URL path segment.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::PayPal => "paypal",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Stripe => "Stripe",
            Self::PayPal => "PayPal",
        }
    }
}

impl fmt::Display for PaymentOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PaymentOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|option| option.slug() == s)
            .ok_or_else(|| format!("invalid payment option: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_progression() {
        let mut flags = OrderFlags::default();
        assert_eq!(OrderStatus::from_flags(flags), OrderStatus::Open);

        flags.ordered = true;
        assert_eq!(OrderStatus::from_flags(flags), OrderStatus::Ordered);

        flags.being_delivered = true;
        assert_eq!(OrderStatus::from_flags(flags), OrderStatus::BeingDelivered);

        flags.received = true;
        assert_eq!(OrderStatus::from_flags(flags), OrderStatus::Received);

        flags.refund_requested = true;
        assert_eq!(OrderStatus::from_flags(flags), OrderStatus::RefundRequested);

        flags.refund_granted = true;
        assert_eq!(OrderStatus::from_flags(flags), OrderStatus::Refunded);
    }

    #[test]
    fn test_open_order_ignores_other_flags() {
        let flags = OrderFlags {
            refund_requested: true,
            ..OrderFlags::default()
        };
        assert_eq!(OrderStatus::from_flags(flags), OrderStatus::Open);
    }

    #[test]
    fn test_refundable() {
        assert!(OrderStatus::Ordered.is_refundable());
        assert!(!OrderStatus::Open.is_refundable());
        assert!(!OrderStatus::RefundRequested.is_refundable());
    }

    #[test]
    fn test_payment_option_roundtrip() {
        assert_eq!("stripe".parse::<PaymentOption>(), Ok(PaymentOption::Stripe));
        assert_eq!(PaymentOption::PayPal.to_string(), "paypal");
        assert!("bitcoin".parse::<PaymentOption>().is_err());
    }

    #[test]
    fn test_address_type_codes() {
        assert_eq!("B".parse::<AddressType>(), Ok(AddressType::Billing));
        assert_eq!(AddressType::Shipping.code(), "S");
    }
}
