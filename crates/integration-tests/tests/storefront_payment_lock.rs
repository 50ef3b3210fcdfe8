//! Integration tests for the order lock held while a payment is charged.
//!
//! These tests talk to the repositories directly and require a migrated
//! `PostgreSQL` database in `STOREFRONT_DATABASE_URL`.
//!
//! Run with: cargo test -p myshop-integration-tests -- --ignored

use std::time::Duration;

use myshop_core::{Category, Email, Label, Slug, UserId};
use myshop_integration_tests::{database, unique_email};
use myshop_storefront::db::{CartChange, ItemRepository, OrderRepository, UserRepository};
use myshop_storefront::models::{Item, NewItem};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

async fn required_database() -> PgPool {
    database()
        .await
        .expect("STOREFRONT_DATABASE_URL must be set for this test")
}

async fn new_user(pool: &PgPool) -> UserId {
    let email = Email::parse(&unique_email()).expect("Invalid test email");
    UserRepository::new(pool)
        .create_with_password(&email, "not-a-real-hash")
        .await
        .expect("Failed to create user")
        .id
}

async fn new_item(pool: &PgPool, name: &str, price: i64) -> Item {
    let slug = format!("{name}-{}", Uuid::new_v4().simple());
    ItemRepository::new(pool)
        .upsert(&NewItem {
            title: name.to_string(),
            price: Decimal::new(price, 0),
            discount_price: None,
            category: Category::Accessory,
            label: Label::Primary,
            slug: Slug::parse(&slug).expect("Invalid test slug"),
            description: String::new(),
            image: None,
        })
        .await
        .expect("Failed to create item")
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_cart_change_waits_for_payment_and_lands_in_new_order() {
    let pool = required_database().await;
    let user_id = new_user(&pool).await;
    let phone = new_item(&pool, "phone", 100).await;
    let tv = new_item(&pool, "tv", 900).await;

    let orders = OrderRepository::new(&pool);
    orders.add_item(user_id, &phone.slug).await.expect("Add failed");

    let locked = orders
        .lock_for_payment(user_id)
        .await
        .expect("Lock failed")
        .expect("No open order");
    let charged = locked.order().total();
    assert_eq!(charged, Decimal::new(100, 0));

    // A second tab adds to the cart while the charge is in flight
    let add = tokio::spawn({
        let pool = pool.clone();
        let slug = tv.slug.clone();
        async move { OrderRepository::new(&pool).add_item(user_id, &slug).await }
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!add.is_finished(), "cart change must wait for the payment");

    let (payment, _) = locked.mark_paid("ch_test_lock").await.expect("Mark paid failed");
    assert_eq!(payment.amount, charged);

    let change = add.await.expect("Task panicked").expect("Add failed");
    assert_eq!(change, CartChange::Added);

    let paid = orders.list_ordered(user_id).await.expect("List failed");
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].items.len(), 1);
    assert_eq!(paid[0].total(), charged);

    let open = orders
        .get_open(user_id)
        .await
        .expect("Get open failed")
        .expect("The late add should open a new cart");
    assert_eq!(open.items.len(), 1);
    assert_eq!(open.items[0].item.slug, tv.slug);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_dropped_lock_leaves_order_open() {
    let pool = required_database().await;
    let user_id = new_user(&pool).await;
    let phone = new_item(&pool, "phone", 100).await;

    let orders = OrderRepository::new(&pool);
    orders.add_item(user_id, &phone.slug).await.expect("Add failed");

    let locked = orders
        .lock_for_payment(user_id)
        .await
        .expect("Lock failed")
        .expect("No open order");
    let order_id = locked.order().id;
    drop(locked);

    assert_eq!(
        orders.add_item(user_id, &phone.slug).await.expect("Add failed"),
        CartChange::QuantityUpdated
    );
    let open = orders
        .get_open(user_id)
        .await
        .expect("Get open failed")
        .expect("Order should still be open");
    assert_eq!(open.id, order_id);
    assert!(orders.list_ordered(user_id).await.expect("List failed").is_empty());
}
