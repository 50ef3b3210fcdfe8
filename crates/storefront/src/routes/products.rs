//! Item detail route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tower_sessions::Session;
use tracing::instrument;

use myshop_core::CurrencyCode;

use super::{ITEM_NOT_FOUND, PageContext, money, parse_slug};
use crate::db::ItemRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Item;
use crate::state::AppState;

/// Item display data for templates.
#[derive(Clone)]
pub struct ItemView {
    pub title: String,
    pub category: &'static str,
    pub label_class: &'static str,
    pub price: String,
    pub discount_price: Option<String>,
    pub description: String,
    pub url: String,
    pub add_to_cart_url: String,
    pub remove_from_cart_url: String,
    pub image_url: Option<String>,
}

impl ItemView {
    #[must_use]
    pub fn new(item: &Item, currency: CurrencyCode) -> Self {
        Self {
            title: item.title.clone(),
            category: item.category.display_name(),
            label_class: item.label.css_class(),
            price: money(item.price, currency),
            discount_price: item.discount_price.map(|d| money(d, currency)),
            description: item.description.clone(),
            url: item.absolute_url(),
            add_to_cart_url: item.add_to_cart_url(),
            remove_from_cart_url: item.remove_from_cart_url(),
            image_url: item.image_url(),
        }
    }
}

/// Item detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub ctx: PageContext,
    pub item: ItemView,
}

/// Display one item.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn product(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<ProductTemplate> {
    let slug = parse_slug(&slug)?;
    let item = ItemRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(ITEM_NOT_FOUND.to_string()))?;

    Ok(ProductTemplate {
        ctx: PageContext::load(&state, &session, user).await,
        item: ItemView::new(&item, state.config().stripe.currency),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use super::*;
    use crate::models::item::fixtures::item;
    use crate::routes::test_support;

    #[test]
    fn test_item_view_formats_prices() {
        let item = item(1, "123", Decimal::new(100, 0), Some(Decimal::new(8050, 2)));
        let view = ItemView::new(&item, CurrencyCode::USD);
        assert_eq!(view.price, "$100.00");
        assert_eq!(view.discount_price.as_deref(), Some("$80.50"));
        assert_eq!(view.url, "/product/123/");
        assert_eq!(view.label_class, "primary");
    }

    #[tokio::test]
    async fn test_malformed_slug_is_not_found() {
        let response = test_support::app()
            .oneshot(
                Request::builder()
                    .uri("/product/not%20a%20slug/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
