//! Integration tests for the cart, checkout, payment and refund flow.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database
//! - The storefront server running with Stripe test keys
//!
//! Run with: cargo test -p myshop-integration-tests -- --ignored

use myshop_core::RefCode;
use myshop_integration_tests::{
    base_url, coupon_code, database, item_slug, location, page, signed_up_client,
};
use reqwest::{Client, StatusCode};

async fn add_to_cart(client: &Client) -> String {
    let response = client
        .get(format!("{}/add-to-cart/{}/", base_url(), item_slug()))
        .send()
        .await
        .expect("Add to cart failed");
    location(&response)
}

fn checkout_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("shipping_address", "1 Main St"),
        ("shipping_country", "US"),
        ("shipping_zip", "10001"),
        ("same_billing_address", "on"),
        ("set_default_shipping", "on"),
        ("payment_option", "stripe"),
    ]
}

async fn submit_checkout(client: &Client, form: &[(&str, &str)]) -> reqwest::Response {
    client
        .post(format!("{}/checkout/", base_url()))
        .form(form)
        .send()
        .await
        .expect("Checkout failed")
}

/// Pull the first order reference code out of the orders page.
fn first_ref_code(body: &str) -> Option<String> {
    let start = body.find("Order ")? + "Order ".len();
    let code: String = body.get(start..)?.chars().take(RefCode::LENGTH).collect();
    RefCode::parse(&code).map(|code| code.to_string())
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_cart_quantities() {
    let (client, _) = signed_up_client().await;
    let slug = item_slug();

    assert_eq!(add_to_cart(&client).await, "/order-summary/");
    add_to_cart(&client).await;

    let (status, body) = page(&client, "/order-summary/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("This item quantity was updated."));

    let response = client
        .get(format!("{}/remove-item-from-cart/{slug}/", base_url()))
        .send()
        .await
        .expect("Remove one failed");
    assert_eq!(location(&response), "/order-summary/");

    let response = client
        .get(format!("{}/remove-from-cart/{slug}", base_url()))
        .send()
        .await
        .expect("Remove line failed");
    assert_eq!(location(&response), "/order-summary/");

    let response = client
        .get(format!("{}/remove-from-cart/{slug}", base_url()))
        .send()
        .await
        .expect("Remove line failed");
    let (_, body) = page(&client, &location(&response)).await;
    assert!(body.contains("This item was not in your cart"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_without_cart_redirects() {
    let (client, _) = signed_up_client().await;
    let response = client
        .get(format!("{}/order-summary/", base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(location(&response), "/");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_validation() {
    let (client, _) = signed_up_client().await;
    add_to_cart(&client).await;

    let response = submit_checkout(&client, &[("payment_option", "stripe")]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("This field is required."));

    let response = submit_checkout(
        &client,
        &[("use_default_shipping", "on"), ("same_billing_address", "on"), ("payment_option", "stripe")],
    )
    .await;
    assert_eq!(location(&response), "/checkout/");

    let long_street = "a".repeat(101);
    let mut form: Vec<(&str, &str)> = checkout_form();
    form.retain(|(name, _)| *name != "shipping_address");
    form.push(("shipping_address", long_street.as_str()));
    let response = submit_checkout(&client, &form).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("Ensure this value has at most 100 characters."));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_unknown_coupon_leaves_order_without_coupon() {
    let (client, email) = signed_up_client().await;
    add_to_cart(&client).await;

    let response = client
        .post(format!("{}/add-coupon/", base_url()))
        .form(&[("code", "NOSUCHCODE")])
        .send()
        .await
        .expect("Coupon failed");
    assert_eq!(location(&response), "/checkout/");

    let (status, body) = page(&client, "/checkout/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("This coupon does not exist"));

    if let Some(pool) = database().await {
        let (coupon_id,): (Option<i64>,) = sqlx::query_as(
            r"
            SELECT o.coupon_id
            FROM storefront.order o
            JOIN storefront.user u ON u.id = o.user_id
            WHERE u.email = $1 AND NOT o.ordered
            ",
        )
        .bind(&email)
        .fetch_one(&pool)
        .await
        .expect("Open order not found");
        assert_eq!(coupon_id, None);
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_paypal_is_not_available() {
    let (client, _) = signed_up_client().await;
    add_to_cart(&client).await;

    let mut form = checkout_form();
    form.retain(|(name, _)| *name != "payment_option");
    form.push(("payment_option", "paypal"));
    let response = submit_checkout(&client, &form).await;
    assert_eq!(location(&response), "/payment/paypal/");

    let response = client
        .get(format!("{}/payment/paypal/", base_url()))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(location(&response), "/checkout/");
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and Stripe test keys"]
async fn test_full_purchase_and_refund() {
    let (client, email) = signed_up_client().await;
    add_to_cart(&client).await;

    let response = submit_checkout(&client, &checkout_form()).await;
    assert_eq!(location(&response), "/payment/stripe/");

    let response = client
        .post(format!("{}/add-coupon/", base_url()))
        .form(&[("code", coupon_code().as_str())])
        .send()
        .await
        .expect("Coupon failed");
    let (_, body) = page(&client, &location(&response)).await;
    assert!(body.contains("Successfully added coupon"));

    let (status, body) = page(&client, "/payment/stripe/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("js.stripe.com"));

    let response = client
        .post(format!("{}/payment/stripe/", base_url()))
        .form(&[("stripeToken", "tok_visa")])
        .send()
        .await
        .expect("Payment failed");
    let (_, body) = page(&client, &location(&response)).await;
    assert!(body.contains("Your order was successful!"), "{body}");

    // The paid order left the cart
    let (_, body) = page(&client, "/").await;
    assert!(body.contains(r#"<span class="badge">0</span>"#));

    let (_, body) = page(&client, "/orders").await;
    let ref_code = first_ref_code(&body).expect("No reference code on orders page");

    let response = client
        .post(format!("{}/request-refund/", base_url()))
        .form(&[
            ("ref_code", ref_code.as_str()),
            ("message", "Changed my mind"),
            ("email", email.as_str()),
        ])
        .send()
        .await
        .expect("Refund failed");
    let (_, body) = page(&client, &location(&response)).await;
    assert!(body.contains("Your request was received."));

    if let Some(pool) = database().await {
        let (ordered, refund_requested): (bool, bool) = sqlx::query_as(
            "SELECT ordered, refund_requested FROM storefront.order WHERE ref_code = $1",
        )
        .bind(&ref_code)
        .fetch_one(&pool)
        .await
        .expect("Order not found");
        assert!(ordered);
        assert!(refund_requested);
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_refund_for_unknown_order() {
    let (client, email) = signed_up_client().await;
    let response = client
        .post(format!("{}/request-refund/", base_url()))
        .form(&[
            ("ref_code", "aaaaaaaaaaaaaaaaaaaa"),
            ("message", "Where is it?"),
            ("email", email.as_str()),
        ])
        .send()
        .await
        .expect("Refund failed");
    let (_, body) = page(&client, &location(&response)).await;
    assert!(body.contains("This order does not exist."));
}
