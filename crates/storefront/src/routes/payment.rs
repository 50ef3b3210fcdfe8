//! Payment route handlers.
//!
//! Only Stripe is backed by a gateway. A successful charge closes the order
//! in one transaction; a failed charge leaves everything as it was.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use myshop_core::{PaymentOption, Price};

use super::cart::{NO_ACTIVE_ORDER, OrderView};
use super::{PageContext, money, paths};
use crate::db::{AddressRepository, OrderRepository, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::flash;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order, UserProfile};
use crate::services::{ChargeSource, ConfirmationLine, PaymentError};
use crate::state::AppState;

const INVALID_OPTION: &str = "Invalid payment option selected";
const NO_BILLING_ADDRESS: &str = "You have not added a billing address";
const EMPTY_CART: &str = "Your cart is empty";
const NOTHING_TO_CHARGE: &str = "This order has nothing to pay. Remove the coupon or add items.";

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment.html")]
pub struct PaymentTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
    pub option_name: &'static str,
    pub action: String,
    pub stripe_public_key: String,
    pub saved_card: bool,
}

/// Card form data posted by Stripe.js.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentForm {
    #[serde(rename = "stripeToken")]
    pub stripe_token: Option<String>,
    pub save: Option<String>,
    pub use_default: Option<String>,
}

/// Why a payment request cannot proceed to the gateway.
enum Precondition {
    Ready(PaymentOption, Order),
    Redirect(&'static str, &'static str),
}

/// Check the option, the open order and its billing address.
async fn precondition(state: &AppState, user: &CurrentUser, option: &str) -> Result<Precondition> {
    let option = match option.parse::<PaymentOption>() {
        Ok(PaymentOption::Stripe) => PaymentOption::Stripe,
        Ok(PaymentOption::PayPal) | Err(_) => {
            return Ok(Precondition::Redirect(INVALID_OPTION, paths::CHECKOUT));
        }
    };

    let Some(order) = OrderRepository::new(state.pool()).get_open(user.id).await? else {
        return Ok(Precondition::Redirect(NO_ACTIVE_ORDER, paths::HOME));
    };
    if order.billing_address_id.is_none() {
        return Ok(Precondition::Redirect(NO_BILLING_ADDRESS, paths::CHECKOUT));
    }
    if let Err(message) = check_chargeable(&order) {
        return Ok(Precondition::Redirect(message, paths::ORDER_SUMMARY));
    }

    Ok(Precondition::Ready(option, order))
}

/// The provider rejects zero-amount charges, so an empty cart or a coupon
/// covering the whole order never reaches it.
fn check_chargeable(order: &Order) -> std::result::Result<(), &'static str> {
    if order.is_empty() {
        return Err(EMPTY_CART);
    }
    if order.total() <= Decimal::ZERO {
        return Err(NOTHING_TO_CHARGE);
    }
    Ok(())
}

/// Display the card form for the open order.
#[instrument(skip_all, fields(user_id = %user.id, option = %option))]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(option): Path<String>,
) -> Result<Response> {
    let (option, order) = match precondition(&state, &user, &option).await? {
        Precondition::Ready(option, order) => (option, order),
        Precondition::Redirect(message, to) => {
            flash::warning(&session, message).await;
            return Ok(Redirect::to(to).into_response());
        }
    };

    let profile = UserRepository::new(state.pool()).get_profile(user.id).await?;

    Ok(PaymentTemplate {
        ctx: PageContext::load(&state, &session, Some(user)).await,
        order: OrderView::new(&order, state.config().stripe.currency),
        option_name: option.display_name(),
        action: paths::payment(option),
        stripe_public_key: state.config().stripe.public_key.clone(),
        saved_card: profile.saved_customer().is_some(),
    }
    .into_response())
}

/// Charge the open order and mark it paid.
///
/// The order stays locked from computing the amount until the payment is
/// recorded, so a cart change from another tab waits instead of slipping
/// into the paid order uncharged.
#[instrument(skip_all, fields(user_id = %user.id, option = %option))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(option): Path<String>,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    if let Precondition::Redirect(message, to) = precondition(&state, &user, &option).await? {
        flash::warning(&session, message).await;
        return Ok(Redirect::to(to).into_response());
    }
    let payment_path = paths::payment(PaymentOption::Stripe);

    let users = UserRepository::new(state.pool());
    let profile = users.get_profile(user.id).await?;

    let source = match choose_source(&form, &profile) {
        Ok(source) => source,
        Err(message) => {
            flash::warning(&session, message).await;
            return Ok(Redirect::to(&payment_path).into_response());
        }
    };

    let Some(locked) = OrderRepository::new(state.pool())
        .lock_for_payment(user.id)
        .await?
    else {
        flash::info(&session, NO_ACTIVE_ORDER).await;
        return Ok(Redirect::to(paths::HOME).into_response());
    };
    if let Err(message) = check_chargeable(locked.order()) {
        flash::warning(&session, message).await;
        return Ok(Redirect::to(paths::ORDER_SUMMARY).into_response());
    }

    let stripe = state.stripe();
    let order = locked.order().clone();
    let amount_minor = Price::new(order.total(), stripe.currency())
        .to_minor_units()
        .map_err(|e| AppError::Internal(format!("order {} total: {e}", order.id)))?;

    add_breadcrumb("payment", "Charging order", None);
    let charged = async {
        let source = match source {
            SourceChoice::Ready(source) => source,
            SourceChoice::SaveCard(token) => {
                let customer = match &profile.stripe_customer_id {
                    Some(customer) => customer.clone(),
                    None => stripe.create_customer(user.email.as_str()).await?,
                };
                stripe.attach_card(&customer, &token).await?;
                if let Err(e) = users.save_stripe_customer(user.id, &customer).await {
                    tracing::error!(error = %e, "Failed to remember saved card");
                }
                ChargeSource::Customer(customer)
            }
        };
        stripe
            .charge(amount_minor, &source, &format!("Order {}", order.id))
            .await
    }
    .await;

    let charge = match charged {
        Ok(charge) => charge,
        Err(e) => {
            // Dropping the lock rolls back and leaves the order open.
            drop(locked);
            report_payment_error(&e);
            flash::error(&session, e.user_message()).await;
            return Ok(Redirect::to(paths::HOME).into_response());
        }
    };

    let (payment, ref_code) = locked.mark_paid(&charge.id).await.inspect_err(|e| {
        tracing::error!(
            error = %e,
            charge_id = %charge.id,
            order_id = %order.id,
            "Charge succeeded but order could not be marked paid"
        );
    })?;
    tracing::info!(payment_id = %payment.id, ref_code = %ref_code, "Order paid");

    send_confirmation(&state, &user, &order, ref_code.as_str()).await;

    flash::success(&session, "Your order was successful!").await;
    Ok(Redirect::to(paths::HOME).into_response())
}

enum SourceChoice {
    Ready(ChargeSource),
    /// Save this token's card on the customer, then charge the customer.
    SaveCard(String),
}

/// Pick what to charge from the submitted form.
fn choose_source(
    form: &PaymentForm,
    profile: &UserProfile,
) -> std::result::Result<SourceChoice, &'static str> {
    if form.use_default.as_deref().is_some_and(|v| !v.is_empty()) {
        return profile
            .saved_customer()
            .map(|customer| SourceChoice::Ready(ChargeSource::Customer(customer.to_string())))
            .ok_or("You do not have a saved card");
    }

    let token = form
        .stripe_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("Please enter your card details")?
        .to_string();

    if form.save.as_deref().is_some_and(|v| !v.is_empty()) {
        Ok(SourceChoice::SaveCard(token))
    } else {
        Ok(SourceChoice::Ready(ChargeSource::Token(token)))
    }
}

fn report_payment_error(err: &PaymentError) {
    if err.is_server_fault() {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "Payment failed");
    } else {
        tracing::warn!(error = %err, "Payment failed");
    }
}

/// Email the order confirmation. Failures are logged, never surfaced.
async fn send_confirmation(state: &AppState, user: &CurrentUser, order: &Order, ref_code: &str) {
    let currency = state.config().stripe.currency;
    let lines: Vec<ConfirmationLine> = order
        .items
        .iter()
        .map(|line| ConfirmationLine {
            title: line.item.title.clone(),
            quantity: line.quantity,
            price: money(line.final_price(), currency),
        })
        .collect();

    let shipping_address = match order.shipping_address_id {
        Some(id) => AddressRepository::new(state.pool())
            .get_for_user(user.id, id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load shipping address for email");
                None
            })
            .map(|address| address.one_line()),
        None => None,
    };

    let orders_url = format!(
        "{}{}",
        state.config().base_url.trim_end_matches('/'),
        paths::ORDERS
    );

    if let Err(e) = state
        .email()
        .send_order_confirmation(
            user.email.as_str(),
            ref_code,
            &lines,
            &money(order.total(), currency),
            shipping_address.as_deref(),
            &orders_url,
        )
        .await
    {
        tracing::warn!(error = %e, "Failed to send order confirmation");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use myshop_core::{CouponCode, CouponId};

    use super::*;
    use crate::models::Coupon;
    use crate::models::order::fixtures;

    fn profile(saved: bool) -> UserProfile {
        UserProfile {
            stripe_customer_id: saved.then(|| "cus_123".to_string()),
            one_click_purchasing: saved,
        }
    }

    fn form(token: Option<&str>, save: bool, use_default: bool) -> PaymentForm {
        PaymentForm {
            stripe_token: token.map(String::from),
            save: save.then(|| "on".to_string()),
            use_default: use_default.then(|| "on".to_string()),
        }
    }

    #[test]
    fn test_token_charge() {
        let choice = choose_source(&form(Some("tok_visa"), false, false), &profile(false));
        assert!(matches!(
            choice,
            Ok(SourceChoice::Ready(ChargeSource::Token(ref t))) if t == "tok_visa"
        ));
    }

    #[test]
    fn test_saved_card_charge() {
        let choice = choose_source(&form(None, false, true), &profile(true));
        assert!(matches!(
            choice,
            Ok(SourceChoice::Ready(ChargeSource::Customer(ref c))) if c == "cus_123"
        ));

        let missing = choose_source(&form(None, false, true), &profile(false));
        assert!(matches!(missing, Err("You do not have a saved card")));
    }

    #[test]
    fn test_save_card_needs_token() {
        let choice = choose_source(&form(Some("tok_visa"), true, false), &profile(false));
        assert!(matches!(choice, Ok(SourceChoice::SaveCard(ref t)) if t == "tok_visa"));

        let missing = choose_source(&form(Some("  "), true, false), &profile(false));
        assert!(matches!(missing, Err("Please enter your card details")));
    }

    #[test]
    fn test_chargeable_order() {
        assert_eq!(check_chargeable(&fixtures::order()), Ok(()));
    }

    #[test]
    fn test_empty_cart_is_not_charged() {
        let mut order = fixtures::order();
        order.items.clear();
        assert_eq!(check_chargeable(&order), Err(EMPTY_CART));
    }

    #[test]
    fn test_coupon_covering_total_is_not_charged() {
        let mut order = fixtures::order();
        order.coupon = Some(Coupon {
            id: CouponId::new(1),
            code: CouponCode::parse("ALLFREE").unwrap(),
            amount: order.subtotal(),
        });
        assert_eq!(order.total(), Decimal::ZERO);
        assert_eq!(check_chargeable(&order), Err(NOTHING_TO_CHARGE));
    }
}
