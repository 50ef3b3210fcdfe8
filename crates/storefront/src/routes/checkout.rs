//! Checkout and coupon route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use myshop_core::{AddressType, CouponCode, PaymentOption};

use super::cart::{NO_ACTIVE_ORDER, OrderView};
use super::{PageContext, paths};
use crate::db::{AddressRepository, CheckoutOutcome, CouponRepository, OrderRepository};
use crate::error::Result;
use crate::filters;
use crate::flash;
use crate::forms::{CheckoutForm, FormErrors};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order};
use crate::state::AppState;

const COUPON_NOT_FOUND: &str = "This coupon does not exist";

/// Payment option for the radio buttons.
pub struct PaymentChoice {
    pub value: &'static str,
    pub name: &'static str,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
    pub form: CheckoutForm,
    pub errors: FormErrors,
    pub default_shipping: Option<String>,
    pub default_billing: Option<String>,
    pub payment_options: Vec<PaymentChoice>,
}

/// Coupon form data.
#[derive(Debug, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
}

async fn render(
    state: &AppState,
    session: &Session,
    user: CurrentUser,
    order: &Order,
    form: CheckoutForm,
    errors: FormErrors,
) -> Result<CheckoutTemplate> {
    let addresses = AddressRepository::new(state.pool());
    let default_shipping = addresses
        .get_default(user.id, AddressType::Shipping)
        .await?
        .map(|a| a.one_line());
    let default_billing = addresses
        .get_default(user.id, AddressType::Billing)
        .await?
        .map(|a| a.one_line());

    Ok(CheckoutTemplate {
        ctx: PageContext::load(state, session, Some(user)).await,
        order: OrderView::new(order, state.config().stripe.currency),
        form,
        errors,
        default_shipping,
        default_billing,
        payment_options: PaymentOption::ALL
            .into_iter()
            .map(|option| PaymentChoice {
                value: option.slug(),
                name: option.display_name(),
            })
            .collect(),
    })
}

/// Display the checkout form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let Some(order) = OrderRepository::new(state.pool()).get_open(user.id).await? else {
        flash::info(&session, NO_ACTIVE_ORDER).await;
        return Ok(Redirect::to(paths::ORDER_SUMMARY).into_response());
    };

    let form = CheckoutForm {
        payment_option: PaymentOption::Stripe.slug().to_string(),
        ..CheckoutForm::default()
    };
    Ok(render(&state, &session, user, &order, form, FormErrors::default())
        .await?
        .into_response())
}

/// Store the chosen addresses and continue to payment.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let orders = OrderRepository::new(state.pool());
    let Some(order) = orders.get_open(user.id).await? else {
        flash::info(&session, NO_ACTIVE_ORDER).await;
        return Ok(Redirect::to(paths::ORDER_SUMMARY).into_response());
    };

    let checkout = match form.validate() {
        Ok(checkout) => checkout,
        Err(errors) => {
            flash::warning(&session, "Failed checkout").await;
            let page = render(&state, &session, user, &order, form, errors).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let outcome = orders
        .attach_addresses(user.id, &checkout.shipping, &checkout.billing)
        .await?;

    let redirect = match outcome {
        CheckoutOutcome::Attached => {
            tracing::info!(option = %checkout.payment_option, "Checkout addresses attached");
            paths::payment(checkout.payment_option)
        }
        CheckoutOutcome::NoActiveOrder => {
            flash::info(&session, NO_ACTIVE_ORDER).await;
            paths::ORDER_SUMMARY.to_string()
        }
        CheckoutOutcome::MissingDefault(AddressType::Shipping) => {
            flash::info(&session, "No default shipping address available").await;
            paths::CHECKOUT.to_string()
        }
        CheckoutOutcome::MissingDefault(AddressType::Billing) => {
            flash::info(&session, "No default billing address available").await;
            paths::CHECKOUT.to_string()
        }
    };

    Ok(Redirect::to(&redirect).into_response())
}

/// Apply a coupon code to the open order.
///
/// Codes match exactly; an unknown code leaves the order's coupon unchanged.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_coupon(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CouponForm>,
) -> Result<Redirect> {
    let orders = OrderRepository::new(state.pool());
    if orders.get_open(user.id).await?.is_none() {
        flash::info(&session, NO_ACTIVE_ORDER).await;
        return Ok(Redirect::to(paths::CHECKOUT));
    }

    let coupon = match coupon_code(&form.code) {
        Ok(code) => CouponRepository::new(state.pool()).get_by_code(&code).await?,
        Err(_) => None,
    };
    let Some(coupon) = coupon else {
        flash::info(&session, COUPON_NOT_FOUND).await;
        return Ok(Redirect::to(paths::CHECKOUT));
    };

    if orders.apply_coupon(user.id, coupon.id).await? {
        tracing::info!(coupon = %coupon.code, "Coupon applied");
        flash::success(&session, "Successfully added coupon").await;
    } else {
        flash::info(&session, NO_ACTIVE_ORDER).await;
    }

    Ok(Redirect::to(paths::CHECKOUT))
}

/// A submitted code that cannot be a coupon code is reported the same way as
/// an unknown one.
fn coupon_code(raw: &str) -> std::result::Result<CouponCode, &'static str> {
    CouponCode::parse(raw).map_err(|_| COUPON_NOT_FOUND)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header::LOCATION},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support;

    #[test]
    fn test_malformed_coupon_code_reads_as_unknown() {
        assert_eq!(coupon_code("").unwrap_err(), COUPON_NOT_FOUND);
        assert_eq!(coupon_code(&"X".repeat(16)).unwrap_err(), COUPON_NOT_FOUND);
        assert_eq!(coupon_code("SAVE10").unwrap().as_str(), "SAVE10");
    }

    #[tokio::test]
    async fn test_anonymous_coupon_redirects_to_login() {
        let response = test_support::app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/add-coupon/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("code=SAVE10"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[LOCATION],
            "/accounts/login/?next=%2Fadd-coupon%2F"
        );
    }
}
