//! Refund request repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use myshop_core::{Email, OrderId, RefCode, RefundId, UserId};

use super::RepositoryError;
use crate::models::refund::Refund;

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: i64,
    order_id: i64,
    reason: String,
    email: String,
    accepted: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<RefundRow> for Refund {
    type Error = RepositoryError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: RefundId::new(row.id),
            order_id: OrderId::new(row.order_id),
            reason: row.reason,
            email,
            accepted: row.accepted,
            created_at: row.created_at,
        })
    }
}

/// Repository for refund requests.
pub struct RefundRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RefundRepository<'a> {
    /// Create a new refund repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Flag the user's paid order as refund-requested and record the request.
    ///
    /// Returns `None` if the user has no paid order with this ref code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn request(
        &self,
        user_id: UserId,
        ref_code: &RefCode,
        reason: &str,
        email: &Email,
    ) -> Result<Option<Refund>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE storefront.order SET refund_requested = TRUE
            WHERE ref_code = $1 AND user_id = $2 AND ordered
            RETURNING id
            ",
        )
        .bind(ref_code.as_str())
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((order_id,)) = order else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, RefundRow>(
            r"
            INSERT INTO storefront.refund (order_id, reason, email)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, reason, email, accepted, created_at
            ",
        )
        .bind(order_id)
        .bind(reason)
        .bind(email.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into().map(Some)
    }
}
