//! Domain models for storefront.
//!
//! Repositories in [`crate::db`] convert rows into these types; handlers and
//! templates only ever see validated values.

pub mod address;
pub mod coupon;
pub mod item;
pub mod order;
pub mod payment;
pub mod refund;
pub mod session;
pub mod user;

pub use address::{Address, NewAddress};
pub use coupon::Coupon;
pub use item::{Item, ItemError, NewItem};
pub use order::{Order, OrderItem};
pub use payment::Payment;
pub use refund::Refund;
pub use session::{CurrentUser, keys as session_keys};
pub use user::{User, UserProfile};
