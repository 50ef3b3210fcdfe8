//! Catalog item repository.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use myshop_core::{Category, ItemId, Label, PageWindow, Slug};

use super::{RepositoryError, count_to_u64, to_bigint};
use crate::models::item::{Item, NewItem};

/// Columns selected for an item.
pub(crate) const ITEM_COLUMNS: &str =
    "id, title, price, discount_price, category, label, slug, description, image";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub id: i64,
    pub title: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub category: String,
    pub label: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("invalid {what} for item {}: {e}", row.id))
        };

        let category = row
            .category
            .parse::<Category>()
            .map_err(|e| corrupt("category", &e))?;
        let label = row.label.parse::<Label>().map_err(|e| corrupt("label", &e))?;
        let slug = Slug::parse(&row.slug).map_err(|e| corrupt("slug", &e))?;

        Self::new(
            ItemId::new(row.id),
            NewItem {
                title: row.title,
                price: row.price,
                discount_price: row.discount_price,
                category,
                label,
                slug,
                description: row.description,
                image: row.image,
            },
        )
        .map_err(|e| corrupt("fields", &e))
    }
}

/// Repository for catalog items.
pub struct ItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Total number of items in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storefront.item")
            .fetch_one(self.pool)
            .await?;
        count_to_u64(count)
    }

    /// Fetch one page of items in catalog order (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored item is invalid.
    pub async fn list_page(&self, window: &PageWindow) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM storefront.item ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(to_bigint(window.limit())?)
        .bind(to_bigint(window.offset())?)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get an item by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Item>, RepositoryError> {
        get_by_slug(self.pool, slug).await
    }

    /// Insert an item, or update the existing item with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, item: &NewItem) -> Result<Item, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r"
            INSERT INTO storefront.item
                (title, price, discount_price, category, label, slug, description, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (slug) DO UPDATE
            SET title = EXCLUDED.title,
                price = EXCLUDED.price,
                discount_price = EXCLUDED.discount_price,
                category = EXCLUDED.category,
                label = EXCLUDED.label,
                description = EXCLUDED.description,
                image = EXCLUDED.image
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(&item.title)
        .bind(item.price)
        .bind(item.discount_price)
        .bind(item.category.code())
        .bind(item.label.code())
        .bind(item.slug.as_str())
        .bind(&item.description)
        .bind(item.image.as_deref())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Delete items that no order references. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_unreferenced(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.item i
            WHERE NOT EXISTS (
                SELECT 1 FROM storefront.order_item oi WHERE oi.item_id = i.id
            )
            ",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Slug lookup usable inside a transaction.
pub(crate) async fn get_by_slug<'e>(
    executor: impl PgExecutor<'e>,
    slug: &Slug,
) -> Result<Option<Item>, RepositoryError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM storefront.item WHERE slug = $1"
    ))
    .bind(slug.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(TryInto::try_into).transpose()
}
