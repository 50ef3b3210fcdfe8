//! Order history route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use super::cart::OrderView;
use crate::db::OrderRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderView>,
}

/// List the user's paid orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<OrdersTemplate> {
    let currency = state.config().stripe.currency;
    let orders = OrderRepository::new(state.pool())
        .list_ordered(user.id)
        .await?
        .iter()
        .map(|order| OrderView::new(order, currency))
        .collect();

    Ok(OrdersTemplate {
        ctx: PageContext::load(&state, &session, Some(user)).await,
        orders,
    })
}
