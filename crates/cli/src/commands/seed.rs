//! Seed the catalog from a YAML file.
//!
//! Items are matched on slug and coupons on code, so re-running a file
//! updates rows in place instead of duplicating them.
//!
//! ```yaml
//! items:
//!   - title: Pixel 9
//!     price: "799.00"
//!     discount_price: "699.00"
//!     category: PH   # PH, TV, LP or AC
//!     label: P       # P, S or D
//!     slug: pixel-9
//!     description: A phone.
//!     image: items/pixel-9.jpg
//! coupons:
//!   - code: SAVE10
//!     amount: "10.00"
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use myshop_core::{Category, CouponCode, Label, Slug};
use myshop_storefront::db::{self, CouponRepository, ItemRepository};
use myshop_storefront::models::NewItem;

use super::database_url;

/// Catalog file contents.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<ItemSeed>,
    #[serde(default)]
    pub coupons: Vec<CouponSeed>,
}

/// One item entry.
#[derive(Debug, Deserialize)]
pub struct ItemSeed {
    pub title: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub category: Category,
    pub label: Label,
    pub slug: Slug,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
}

impl From<ItemSeed> for NewItem {
    fn from(seed: ItemSeed) -> Self {
        Self {
            title: seed.title,
            price: seed.price,
            discount_price: seed.discount_price,
            category: seed.category,
            label: seed.label,
            slug: seed.slug,
            description: seed.description,
            image: seed.image,
        }
    }
}

/// One coupon entry.
#[derive(Debug, Deserialize)]
pub struct CouponSeed {
    pub code: CouponCode,
    pub amount: Decimal,
}

/// Check every entry, returning one message per problem.
#[must_use]
pub fn validate(items: &[NewItem], coupons: &[CouponSeed]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut slugs = std::collections::HashSet::new();

    for item in items {
        if let Err(e) = item.validate() {
            errors.push(format!("item {}: {e}", item.slug));
        }
        if !slugs.insert(item.slug.as_str()) {
            errors.push(format!("item {}: duplicate slug", item.slug));
        }
    }

    for coupon in coupons {
        if coupon.amount.is_sign_negative() {
            errors.push(format!("coupon {}: amount cannot be negative", coupon.code));
        }
    }

    errors
}

/// Upsert items and coupons from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalog file
/// * `clear_existing` - Delete coupons and items no order references first
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database operation fails.
pub async fn catalog(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;
    let items: Vec<NewItem> = file.items.into_iter().map(NewItem::from).collect();

    info!(items = items.len(), coupons = file.coupons.len(), "Parsed catalog");

    let errors = validate(&items, &file.coupons);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let item_repo = ItemRepository::new(&pool);
    let coupon_repo = CouponRepository::new(&pool);

    if clear_existing {
        let coupons = coupon_repo.delete_all().await?;
        let items = item_repo.delete_unreferenced().await?;
        info!(coupons, items, "Cleared existing catalog");
    }

    for item in &items {
        let saved = item_repo.upsert(item).await?;
        info!(id = %saved.id, slug = %saved.slug, "Item saved");
    }

    for coupon in &file.coupons {
        let saved = coupon_repo.upsert(&coupon.code, coupon.amount).await?;
        info!(id = %saved.id, code = %saved.code, "Coupon saved");
    }

    info!("Seeding complete!");
    info!("  Items: {}", items.len());
    info!("  Coupons: {}", file.coupons.len());

    Ok(())
}
