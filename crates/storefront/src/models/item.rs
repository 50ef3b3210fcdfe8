//! Catalog item domain type.

use rust_decimal::Decimal;
use thiserror::Error;

use myshop_core::{Category, ITEM_TITLE_MAX_LENGTH, ItemId, Label, Slug};

use crate::routes::paths;

/// Errors raised when an item's fields break catalog rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("discount price {discount} must be below price {price}")]
    DiscountNotBelowPrice { price: Decimal, discount: Decimal },
}

/// Item fields before an ID is assigned.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub category: Category,
    pub label: Label,
    pub slug: Slug,
    pub description: String,
    /// Path relative to the media directory.
    pub image: Option<String>,
}

impl NewItem {
    /// Check title length and the discount-below-price rule.
    ///
    /// # Errors
    ///
    /// Returns the first rule the item breaks.
    pub fn validate(&self) -> Result<(), ItemError> {
        if self.title.trim().is_empty() {
            return Err(ItemError::EmptyTitle);
        }
        if self.title.chars().count() > ITEM_TITLE_MAX_LENGTH {
            return Err(ItemError::TitleTooLong {
                max: ITEM_TITLE_MAX_LENGTH,
            });
        }
        if self.price.is_sign_negative() {
            return Err(ItemError::NegativePrice);
        }
        if let Some(discount) = self.discount_price
            && (discount >= self.price || discount.is_sign_negative())
        {
            return Err(ItemError::DiscountNotBelowPrice {
                price: self.price,
                discount,
            });
        }
        Ok(())
    }
}

/// A catalog item.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub category: Category,
    pub label: Label,
    pub slug: Slug,
    pub description: String,
    pub image: Option<String>,
}

impl Item {
    /// Build an item from stored fields, enforcing catalog rules.
    ///
    /// # Errors
    ///
    /// Returns `ItemError` if the fields break a catalog rule.
    pub fn new(id: ItemId, fields: NewItem) -> Result<Self, ItemError> {
        fields.validate()?;
        Ok(Self {
            id,
            title: fields.title,
            price: fields.price,
            discount_price: fields.discount_price,
            category: fields.category,
            label: fields.label,
            slug: fields.slug,
            description: fields.description,
            image: fields.image,
        })
    }

    /// Price a customer pays per unit.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Detail page URL.
    #[must_use]
    pub fn absolute_url(&self) -> String {
        paths::product(&self.slug)
    }

    #[must_use]
    pub fn add_to_cart_url(&self) -> String {
        paths::add_to_cart(&self.slug)
    }

    #[must_use]
    pub fn remove_from_cart_url(&self) -> String {
        paths::remove_from_cart(&self.slug)
    }

    /// Public URL of the item image, if one is set.
    #[must_use]
    pub fn image_url(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(|path| format!("/media/{}", path.trim_start_matches('/')))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// An item priced at `price` with an optional discount.
    pub fn item(id: i64, slug: &str, price: Decimal, discount: Option<Decimal>) -> Item {
        Item {
            id: ItemId::new(id),
            title: format!("Item {id}"),
            price,
            discount_price: discount,
            category: Category::Phone,
            label: Label::Primary,
            slug: Slug::parse(slug).unwrap_or_else(|e| panic!("bad fixture slug: {e}")),
            description: "A test item.".to_string(),
            image: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_item(price: i64, discount: Option<i64>) -> NewItem {
        NewItem {
            title: "Pixel 9".to_string(),
            price: Decimal::new(price, 0),
            discount_price: discount.map(|d| Decimal::new(d, 0)),
            category: Category::Phone,
            label: Label::Secondary,
            slug: Slug::parse("pixel-9").unwrap(),
            description: String::new(),
            image: Some("items/pixel.jpg".to_string()),
        }
    }

    #[test]
    fn test_discount_must_be_below_price() {
        assert!(new_item(100, Some(80)).validate().is_ok());
        assert!(new_item(100, None).validate().is_ok());
        assert_eq!(
            new_item(100, Some(100)).validate(),
            Err(ItemError::DiscountNotBelowPrice {
                price: Decimal::new(100, 0),
                discount: Decimal::new(100, 0),
            })
        );
        assert!(new_item(100, Some(120)).validate().is_err());
    }

    #[test]
    fn test_title_length_limit() {
        let mut fields = new_item(10, None);
        fields.title = "t".repeat(100);
        assert!(fields.validate().is_ok());
        fields.title = "t".repeat(101);
        assert_eq!(
            fields.validate(),
            Err(ItemError::TitleTooLong { max: 100 })
        );
    }

    #[test]
    fn test_absolute_url_uses_slug() {
        let item = fixtures::item(1, "123", Decimal::new(10, 0), None);
        assert_eq!(item.absolute_url(), "/product/123/");
        assert_eq!(item.add_to_cart_url(), "/add-to-cart/123/");
        assert_eq!(item.remove_from_cart_url(), "/remove-from-cart/123");
    }

    #[test]
    fn test_unit_price_prefers_discount() {
        let item = fixtures::item(1, "tv", Decimal::new(500, 0), Some(Decimal::new(450, 0)));
        assert_eq!(item.unit_price(), Decimal::new(450, 0));
        assert!(item.image_url().is_none());
    }

    #[test]
    fn test_image_url() {
        let item = Item::new(ItemId::new(2), new_item(10, None)).unwrap();
        assert_eq!(item.image_url().as_deref(), Some("/media/items/pixel.jpg"));
    }
}
