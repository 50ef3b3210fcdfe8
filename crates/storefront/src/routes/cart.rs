//! Cart route handlers.
//!
//! The cart is the user's open order. Every mutation redirects: to the local
//! `next` target when one is given, otherwise to the order summary.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use myshop_core::CurrencyCode;

use super::{ITEM_NOT_FOUND, NextQuery, PageContext, money, parse_slug, paths};
use crate::db::{CartChange, OrderRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::flash::{self, Level};
use crate::forms::local_redirect_target;
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderItem};
use crate::state::AppState;

pub(crate) const NO_ACTIVE_ORDER: &str = "You do not have an active order";

/// One order line for templates.
#[derive(Clone)]
pub struct OrderLineView {
    pub position: usize,
    pub title: String,
    pub url: String,
    pub add_url: String,
    pub remove_single_url: String,
    pub remove_url: String,
    pub quantity: u32,
    pub total_item_price: String,
    pub total_discount_item_price: Option<String>,
    pub amount_saved: Option<String>,
    pub final_price: String,
}

impl OrderLineView {
    fn new(position: usize, line: &OrderItem, currency: CurrencyCode) -> Self {
        let saved = line.amount_saved();
        Self {
            position,
            title: line.item.title.clone(),
            url: line.item.absolute_url(),
            add_url: line.item.add_to_cart_url(),
            remove_single_url: paths::remove_single_item_from_cart(&line.item.slug),
            remove_url: line.item.remove_from_cart_url(),
            quantity: line.quantity,
            total_item_price: money(line.total_item_price(), currency),
            total_discount_item_price: line
                .total_discount_item_price()
                .map(|total| money(total, currency)),
            amount_saved: (!saved.is_zero()).then(|| money(saved, currency)),
            final_price: money(line.final_price(), currency),
        }
    }
}

/// An order (or the cart) for templates.
#[derive(Clone)]
pub struct OrderView {
    pub ref_code: Option<String>,
    pub ordered_date: Option<String>,
    pub status: &'static str,
    pub refundable: bool,
    pub lines: Vec<OrderLineView>,
    pub coupon_code: Option<String>,
    pub coupon_discount: String,
    pub amount_saved: Option<String>,
    pub subtotal: String,
    pub total: String,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        let saved = order.amount_saved();
        Self {
            ref_code: order.ref_code.as_ref().map(ToString::to_string),
            ordered_date: order
                .ordered_date
                .map(|date| date.format("%B %-d, %Y").to_string()),
            status: order.status().label(),
            refundable: order.status().is_refundable(),
            lines: order
                .items
                .iter()
                .enumerate()
                .map(|(i, line)| OrderLineView::new(i + 1, line, currency))
                .collect(),
            coupon_code: order.coupon.as_ref().map(|c| c.code.to_string()),
            coupon_discount: money(order.coupon_discount(), currency),
            amount_saved: (!saved.is_zero()).then(|| money(saved, currency)),
            subtotal: money(order.subtotal(), currency),
            total: money(order.total(), currency),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Order summary page template.
#[derive(Template, WebTemplate)]
#[template(path = "order_summary.html")]
pub struct OrderSummaryTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
}

/// Flash level and text announcing a cart change.
#[must_use]
pub const fn cart_message(change: CartChange) -> (Level, &'static str) {
    match change {
        CartChange::Added => (Level::Info, "This item was added to your cart."),
        CartChange::QuantityUpdated => (Level::Info, "This item quantity was updated."),
        CartChange::Removed => (Level::Info, "This item was removed from your cart."),
        CartChange::NotInCart => (Level::Warning, "This item was not in your cart"),
        CartChange::NoActiveOrder => (Level::Warning, NO_ACTIVE_ORDER),
    }
}

/// Flash the outcome of a cart mutation and redirect.
async fn finish(
    session: &Session,
    outcome: std::result::Result<CartChange, RepositoryError>,
    query: &NextQuery,
) -> Result<Redirect> {
    let change = outcome.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound(ITEM_NOT_FOUND.to_string()),
        other => AppError::Database(other),
    })?;

    let (level, text) = cart_message(change);
    flash::push(session, level, text).await;

    Ok(Redirect::to(
        local_redirect_target(query.next.as_deref()).unwrap_or(paths::ORDER_SUMMARY),
    ))
}

/// Add one unit of an item to the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Query(query): Query<NextQuery>,
) -> Result<Redirect> {
    let slug = parse_slug(&slug)?;
    add_breadcrumb("cart", "Add to cart", Some(&[("slug", slug.as_str())]));

    let outcome = OrderRepository::new(state.pool())
        .add_item(user.id, &slug)
        .await;
    finish(&session, outcome, &query).await
}

/// Take one unit of an item out of the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove_single_item_from_cart(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Query(query): Query<NextQuery>,
) -> Result<Redirect> {
    let slug = parse_slug(&slug)?;
    add_breadcrumb("cart", "Remove one unit", Some(&[("slug", slug.as_str())]));

    let outcome = OrderRepository::new(state.pool())
        .remove_single_item(user.id, &slug)
        .await;
    finish(&session, outcome, &query).await
}

/// Remove an item's line from the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Query(query): Query<NextQuery>,
) -> Result<Redirect> {
    let slug = parse_slug(&slug)?;
    add_breadcrumb("cart", "Remove line", Some(&[("slug", slug.as_str())]));

    let outcome = OrderRepository::new(state.pool())
        .remove_item(user.id, &slug)
        .await;
    finish(&session, outcome, &query).await
}

/// Show the open order with totals.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn order_summary(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let Some(order) = OrderRepository::new(state.pool()).get_open(user.id).await? else {
        flash::warning(&session, NO_ACTIVE_ORDER).await;
        return Ok(Redirect::to(paths::HOME).into_response());
    };

    let order = OrderView::new(&order, state.config().stripe.currency);
    Ok(OrderSummaryTemplate {
        ctx: PageContext::load(&state, &session, Some(user)).await,
        order,
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use myshop_core::{CouponCode, CouponId, RefCode};

    use super::*;
    use crate::models::Coupon;
    use crate::models::order::fixtures;

    #[test]
    fn test_order_view_totals() {
        let mut order = fixtures::order();
        order.coupon = Some(Coupon {
            id: CouponId::new(1),
            code: CouponCode::parse("SAVE10").unwrap(),
            amount: Decimal::new(10, 0),
        });

        let view = OrderView::new(&order, CurrencyCode::USD);
        assert_eq!(view.subtotal, "$210.00");
        assert_eq!(view.coupon_discount, "$10.00");
        assert_eq!(view.total, "$200.00");
        assert_eq!(view.amount_saved.as_deref(), Some("$40.00"));
        assert_eq!(view.coupon_code.as_deref(), Some("SAVE10"));
        assert_eq!(view.status, "In cart");
        assert!(!view.refundable);

        let phone = &view.lines[0];
        assert_eq!(phone.position, 1);
        assert_eq!(phone.total_item_price, "$200.00");
        assert_eq!(phone.total_discount_item_price.as_deref(), Some("$160.00"));
        assert_eq!(phone.final_price, "$160.00");
        assert_eq!(phone.remove_single_url, "/remove-item-from-cart/phone/");
        assert_eq!(phone.remove_url, "/remove-from-cart/phone");

        let tv = &view.lines[1];
        assert_eq!(tv.amount_saved, None);
        assert_eq!(tv.final_price, "$50.00");
    }

    #[test]
    fn test_paid_order_view() {
        let mut order = fixtures::order();
        order.flags.ordered = true;
        order.ref_code = Some(RefCode::generate());
        order.ordered_date = chrono::DateTime::parse_from_rfc3339("2024-03-05T10:00:00Z")
            .ok()
            .map(|d| d.to_utc());

        let view = OrderView::new(&order, CurrencyCode::USD);
        assert_eq!(view.status, "Ordered");
        assert!(view.refundable);
        assert_eq!(view.ref_code.unwrap().len(), 20);
        assert_eq!(view.ordered_date.as_deref(), Some("March 5, 2024"));
    }

    #[test]
    fn test_cart_messages() {
        assert_eq!(
            cart_message(CartChange::Added).1,
            "This item was added to your cart."
        );
        assert_eq!(
            cart_message(CartChange::QuantityUpdated).1,
            "This item quantity was updated."
        );
        assert_eq!(
            cart_message(CartChange::NoActiveOrder),
            (Level::Warning, "You do not have an active order")
        );
    }
}
