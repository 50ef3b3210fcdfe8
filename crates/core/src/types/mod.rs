//! Core types for MyShop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod catalog;
pub mod country;
pub mod coupon;
pub mod email;
pub mod id;
pub mod price;
pub mod reference;
pub mod status;

pub use catalog::{CatalogError, Category, ITEM_TITLE_MAX_LENGTH, Label, Slug};
pub use country::{CountryCode, CountryCodeError};
pub use coupon::{CouponCode, CouponCodeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use reference::RefCode;
pub use status::*;
