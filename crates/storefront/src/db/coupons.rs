//! Coupon repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use myshop_core::{CouponCode, CouponId};

use super::RepositoryError;
use crate::models::coupon::Coupon;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CouponRow {
    pub id: i64,
    pub code: String,
    pub amount: Decimal,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let code = CouponCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coupon code in database: {e}"))
        })?;

        Ok(Self {
            id: CouponId::new(row.id),
            code,
            amount: row.amount,
        })
    }
}

/// Repository for coupons.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a coupon by exact (case-sensitive) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            "SELECT id, code, amount FROM storefront.coupon WHERE code = $1",
        )
        .bind(code.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a coupon, or update the amount of the existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, code: &CouponCode, amount: Decimal) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            r"
            INSERT INTO storefront.coupon (code, amount)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE SET amount = EXCLUDED.amount
            RETURNING id, code, amount
            ",
        )
        .bind(code.as_str())
        .bind(amount)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Delete every coupon. Orders that used one keep no coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.coupon")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
