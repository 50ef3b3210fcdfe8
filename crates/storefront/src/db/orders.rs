//! Order repository: the cart, checkout, payment and order history.
//!
//! Every cart mutation runs in one transaction that first locks the user's
//! open order row (`SELECT ... FOR UPDATE`), so concurrent requests from the
//! same user apply one after another. A partial unique index guarantees at
//! most one open order per user; creation uses `ON CONFLICT DO NOTHING` and
//! re-selects, so two racing first adds still share one order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use myshop_core::{
    AddressId, AddressType, CouponCode, CouponId, OrderFlags, OrderId, OrderItemId, PaymentId,
    RefCode, Slug, UserId,
};

use super::items::{self, ItemRow};
use super::{RepositoryError, addresses};
use crate::models::address::{Address, NewAddress};
use crate::models::coupon::Coupon;
use crate::models::order::{Order, OrderItem};
use crate::models::payment::Payment;

// =============================================================================
// Outcomes
// =============================================================================

/// What a cart mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was added to the cart.
    Added,
    /// An existing line's quantity went up or down.
    QuantityUpdated,
    /// A line was removed entirely.
    Removed,
    /// The cart exists but does not contain the item.
    NotInCart,
    /// The user has no open order.
    NoActiveOrder,
}

/// How checkout picks an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressChoice {
    /// Reuse the user's default address of this type.
    UseDefault(AddressType),
    /// Store a newly entered address.
    New(NewAddress),
    /// Copy the resolved shipping address as a billing address.
    SameAsShipping,
}

/// Result of attaching checkout addresses to the open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Attached,
    NoActiveOrder,
    /// A default address was requested but none is stored.
    MissingDefault(AddressType),
}

// =============================================================================
// Internal Row Types
// =============================================================================

const ORDER_SELECT: &str = r"
    SELECT o.id, o.user_id, o.ref_code, o.start_date, o.ordered_date, o.ordered,
           o.shipping_address_id, o.billing_address_id, o.payment_id,
           o.being_delivered, o.received, o.refund_requested, o.refund_granted,
           c.id AS coupon_id, c.code AS coupon_code, c.amount AS coupon_amount
    FROM storefront.order o
    LEFT JOIN storefront.coupon c ON c.id = o.coupon_id
";

#[derive(Debug, sqlx::FromRow)]
#[allow(clippy::struct_excessive_bools)]
struct OrderRow {
    id: i64,
    user_id: i64,
    ref_code: Option<String>,
    start_date: DateTime<Utc>,
    ordered_date: Option<DateTime<Utc>>,
    ordered: bool,
    shipping_address_id: Option<i64>,
    billing_address_id: Option<i64>,
    payment_id: Option<i64>,
    being_delivered: bool,
    received: bool,
    refund_requested: bool,
    refund_granted: bool,
    coupon_id: Option<i64>,
    coupon_code: Option<String>,
    coupon_amount: Option<Decimal>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let ref_code = self
            .ref_code
            .map(|code| {
                RefCode::parse(&code).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "invalid ref code for order {}: {code}",
                        self.id
                    ))
                })
            })
            .transpose()?;

        let coupon = match (self.coupon_id, self.coupon_code, self.coupon_amount) {
            (Some(id), Some(code), Some(amount)) => Some(Coupon {
                id: CouponId::new(id),
                code: CouponCode::parse(&code).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid coupon code: {e}"))
                })?,
                amount,
            }),
            _ => None,
        };

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            ref_code,
            start_date: self.start_date,
            ordered_date: self.ordered_date,
            shipping_address_id: self.shipping_address_id.map(AddressId::new),
            billing_address_id: self.billing_address_id.map(AddressId::new),
            payment_id: self.payment_id.map(PaymentId::new),
            coupon,
            flags: OrderFlags {
                ordered: self.ordered,
                being_delivered: self.being_delivered,
                received: self.received,
                refund_requested: self.refund_requested,
                refund_granted: self.refund_granted,
            },
            items,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_item_id: i64,
    order_user_id: i64,
    order_id: i64,
    quantity: i32,
    ordered: bool,
    #[sqlx(flatten)]
    item: ItemRow,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "invalid quantity for order item {}: {}",
                row.order_item_id, row.quantity
            ))
        })?;

        Ok(Self {
            id: OrderItemId::new(row.order_item_id),
            user_id: UserId::new(row.order_user_id),
            order_id: OrderId::new(row.order_id),
            item: row.item.try_into()?,
            quantity,
            ordered: row.ordered,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    stripe_charge_id: String,
    user_id: Option<i64>,
    amount: Decimal,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: PaymentId::new(row.id),
            stripe_charge_id: row.stripe_charge_id,
            user_id: row.user_id.map(UserId::new),
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders and their lines.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's open order (cart) with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_open(&self, user_id: UserId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 AND NOT o.ordered"
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(attach_items(&mut conn, rows).await?.pop())
    }

    /// Number of distinct lines in the user's cart; zero without one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cart_line_count(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(oi.id)
            FROM storefront.order o
            JOIN storefront.order_item oi ON oi.order_id = o.id
            WHERE o.user_id = $1 AND NOT o.ordered
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        super::count_to_u64(count)
    }

    /// The user's paid orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_ordered(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 AND o.ordered \
             ORDER BY o.ordered_date DESC NULLS LAST, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        attach_items(&mut conn, rows).await
    }

    /// Add one unit of an item to the user's cart, creating the cart if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no item has this slug.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add_item(&self, user_id: UserId, slug: &Slug) -> Result<CartChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let item = items::get_by_slug(&mut *tx, slug)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let order_id = ensure_open_order(&mut tx, user_id).await?;

        let (quantity,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO storefront.order_item AS oi (user_id, order_id, item_id, quantity)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (order_id, item_id)
            DO UPDATE SET quantity = oi.quantity + 1
            RETURNING quantity
            ",
        )
        .bind(user_id)
        .bind(order_id)
        .bind(item.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(if quantity > 1 {
            CartChange::QuantityUpdated
        } else {
            CartChange::Added
        })
    }

    /// Take one unit of an item out of the cart, dropping the line at zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no item has this slug.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn remove_single_item(
        &self,
        user_id: UserId,
        slug: &Slug,
    ) -> Result<CartChange, RepositoryError> {
        self.remove(user_id, slug, RemoveMode::One).await
    }

    /// Remove an item from the cart regardless of quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no item has this slug.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        slug: &Slug,
    ) -> Result<CartChange, RepositoryError> {
        self.remove(user_id, slug, RemoveMode::All).await
    }

    async fn remove(
        &self,
        user_id: UserId,
        slug: &Slug,
        mode: RemoveMode,
    ) -> Result<CartChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let item = items::get_by_slug(&mut *tx, slug)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let Some(order_id) = lock_open_order(&mut tx, user_id).await? else {
            return Ok(CartChange::NoActiveOrder);
        };

        let quantity: Option<(i32,)> = sqlx::query_as(
            r"
            SELECT quantity FROM storefront.order_item
            WHERE order_id = $1 AND item_id = $2
            ",
        )
        .bind(order_id)
        .bind(item.id)
        .fetch_optional(&mut *tx)
        .await?;

        let change = match (quantity, mode) {
            (None, _) => CartChange::NotInCart,
            (Some((quantity,)), RemoveMode::One) if quantity > 1 => {
                sqlx::query(
                    r"
                    UPDATE storefront.order_item SET quantity = quantity - 1
                    WHERE order_id = $1 AND item_id = $2
                    ",
                )
                .bind(order_id)
                .bind(item.id)
                .execute(&mut *tx)
                .await?;
                CartChange::QuantityUpdated
            }
            (Some(_), mode) => {
                sqlx::query(
                    "DELETE FROM storefront.order_item WHERE order_id = $1 AND item_id = $2",
                )
                .bind(order_id)
                .bind(item.id)
                .execute(&mut *tx)
                .await?;
                match mode {
                    RemoveMode::One => CartChange::QuantityUpdated,
                    RemoveMode::All => CartChange::Removed,
                }
            }
        };

        tx.commit().await?;
        Ok(change)
    }

    /// Attach a coupon to the user's open order.
    ///
    /// Returns `false` when the user has no open order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn apply_coupon(
        &self,
        user_id: UserId,
        coupon_id: CouponId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.order SET coupon_id = $2
            WHERE user_id = $1 AND NOT ordered
            ",
        )
        .bind(user_id)
        .bind(coupon_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Resolve the shipping and billing addresses chosen at checkout and
    /// attach them to the open order. Nothing is stored unless both resolve.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn attach_addresses(
        &self,
        user_id: UserId,
        shipping: &AddressChoice,
        billing: &AddressChoice,
    ) -> Result<CheckoutOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(order_id) = lock_open_order(&mut tx, user_id).await? else {
            return Ok(CheckoutOutcome::NoActiveOrder);
        };

        let Some(shipping) = resolve_address(&mut tx, user_id, shipping, None).await? else {
            return Ok(CheckoutOutcome::MissingDefault(AddressType::Shipping));
        };
        let Some(billing) = resolve_address(&mut tx, user_id, billing, Some(&shipping)).await?
        else {
            return Ok(CheckoutOutcome::MissingDefault(AddressType::Billing));
        };

        sqlx::query(
            r"
            UPDATE storefront.order
            SET shipping_address_id = $2, billing_address_id = $3
            WHERE id = $1
            ",
        )
        .bind(order_id)
        .bind(shipping.id)
        .bind(billing.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CheckoutOutcome::Attached)
    }

    /// Lock the user's open order for payment and load it under the lock.
    ///
    /// Returns `None` when the user has no open order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn lock_for_payment(
        &self,
        user_id: UserId,
    ) -> Result<Option<PaymentLock>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(order_id) = lock_open_order(&mut tx, user_id).await? else {
            return Ok(None);
        };
        let rows = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(order_id)
            .fetch_all(&mut *tx)
            .await?;
        let Some(order) = attach_items(&mut tx, rows).await?.pop() else {
            return Ok(None);
        };

        Ok(Some(PaymentLock { tx, order }))
    }
}

/// An open order held locked while it is being charged.
///
/// Cart mutations for the same user wait on the order row until the lock is
/// consumed by [`PaymentLock::mark_paid`] or dropped, so the lines that are
/// charged are exactly the lines that get closed. Dropping the lock rolls
/// back and leaves the order open.
pub struct PaymentLock {
    tx: Transaction<'static, Postgres>,
    order: Order,
}

impl PaymentLock {
    /// The order as loaded under the lock.
    #[must_use]
    pub const fn order(&self) -> &Order {
        &self.order
    }

    /// Record a successful charge of the locked order's total and close it.
    ///
    /// Inserts the payment, marks every line ordered, and marks the order
    /// ordered with its date, payment and a fresh ref code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a ref code collision.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn mark_paid(
        mut self,
        stripe_charge_id: &str,
    ) -> Result<(Payment, RefCode), RepositoryError> {
        let order_id = self.order.id;

        let payment = sqlx::query_as::<_, PaymentRow>(
            r"
            INSERT INTO storefront.payment (stripe_charge_id, user_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, stripe_charge_id, user_id, amount, created_at
            ",
        )
        .bind(stripe_charge_id)
        .bind(self.order.user_id)
        .bind(self.order.total())
        .fetch_one(&mut *self.tx)
        .await?;

        sqlx::query("UPDATE storefront.order_item SET ordered = TRUE WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;

        let ref_code = RefCode::generate();
        sqlx::query(
            r"
            UPDATE storefront.order
            SET ordered = TRUE, ordered_date = NOW(), payment_id = $2, ref_code = $3
            WHERE id = $1
            ",
        )
        .bind(order_id)
        .bind(payment.id)
        .bind(ref_code.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "ref code"))?;

        self.tx.commit().await?;
        Ok((payment.into(), ref_code))
    }
}

#[derive(Debug, Clone, Copy)]
enum RemoveMode {
    One,
    All,
}

/// Lock the user's open order row, if there is one.
async fn lock_open_order(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<OrderId>, RepositoryError> {
    let row: Option<(i64,)> = sqlx::query_as(
        r"
        SELECT id FROM storefront.order
        WHERE user_id = $1 AND NOT ordered
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(id,)| OrderId::new(id)))
}

/// Lock the user's open order, creating it first if needed.
async fn ensure_open_order(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<OrderId, RepositoryError> {
    // A payment can close the open order while we wait on its lock; the
    // second pass then creates a fresh one.
    for _ in 0..2 {
        sqlx::query(
            r"
            INSERT INTO storefront.order (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) WHERE NOT ordered DO NOTHING
            ",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        if let Some(order_id) = lock_open_order(conn, user_id).await? {
            return Ok(order_id);
        }
    }

    Err(RepositoryError::Conflict(
        "open order vanished during creation".to_owned(),
    ))
}

/// Turn a checkout choice into a stored address.
///
/// `None` means a default address was requested but none exists.
async fn resolve_address(
    conn: &mut PgConnection,
    user_id: UserId,
    choice: &AddressChoice,
    shipping: Option<&Address>,
) -> Result<Option<Address>, RepositoryError> {
    match choice {
        AddressChoice::UseDefault(address_type) => {
            addresses::get_default(conn, user_id, *address_type).await
        }
        AddressChoice::New(address) => addresses::insert(conn, user_id, address).await.map(Some),
        AddressChoice::SameAsShipping => match shipping {
            Some(shipping) => {
                let copy = NewAddress {
                    street_address: shipping.street_address.clone(),
                    apartment_address: shipping.apartment_address.clone(),
                    country: shipping.country.clone(),
                    zip: shipping.zip.clone(),
                    address_type: AddressType::Billing,
                    is_default: false,
                };
                addresses::insert(conn, user_id, &copy).await.map(Some)
            }
            None => Ok(None),
        },
    }
}

/// Load the lines for a set of orders and assemble domain orders.
async fn attach_items(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let item_rows = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT oi.id AS order_item_id, oi.user_id AS order_user_id, oi.order_id,
               oi.quantity, oi.ordered,
               i.id, i.title, i.price, i.discount_price, i.category, i.label,
               i.slug, i.description, i.image
        FROM storefront.order_item oi
        JOIN storefront.item i ON i.id = oi.item_id
        WHERE oi.order_id = ANY($1)
        ORDER BY oi.id
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut lines: Vec<OrderItem> = item_rows
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<_, _>>()?;

    rows.into_iter()
        .map(|row| {
            let order_id = OrderId::new(row.id);
            let (own, rest): (Vec<_>, Vec<_>) =
                lines.drain(..).partition(|line| line.order_id == order_id);
            lines = rest;
            row.into_order(own)
        })
        .collect()
}
