//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use myshop_core::{Email, UserId};

/// A storefront user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Payment details remembered for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Customer ID at the payment provider, once a card has been saved.
    pub stripe_customer_id: Option<String>,
    /// Whether a saved card can be charged without re-entering it.
    pub one_click_purchasing: bool,
}

impl UserProfile {
    /// The saved provider customer, if one-click purchasing is enabled.
    #[must_use]
    pub fn saved_customer(&self) -> Option<&str> {
        self.stripe_customer_id
            .as_deref()
            .filter(|_| self.one_click_purchasing)
    }
}
