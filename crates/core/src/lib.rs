//! MyShop Core - Domain types library.
//!
//! This crate provides the types shared by all MyShop components:
//! - `storefront` - Public-facing e-commerce site
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Validation of catalog and order invariants lives
//! here so it can be checked without a running database.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, slugs, coupon codes, emails, prices, statuses
//! - [`pagination`] - Fixed-size page slicing for list views

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pagination;
pub mod types;

pub use pagination::{PAGE_SIZE, Page, PageError, PageRequest, PageWindow};
pub use types::*;
