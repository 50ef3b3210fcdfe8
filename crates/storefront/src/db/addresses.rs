//! Address repository.

use sqlx::{PgConnection, PgPool};

use myshop_core::{AddressId, AddressType, CountryCode, UserId};

use super::RepositoryError;
use crate::models::address::{Address, NewAddress};

const ADDRESS_COLUMNS: &str =
    "id, user_id, street_address, apartment_address, country, zip, address_type, is_default";

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i64,
    user_id: i64,
    street_address: String,
    apartment_address: Option<String>,
    country: String,
    zip: String,
    address_type: String,
    is_default: bool,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let country = CountryCode::parse(&row.country).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid country for address {}: {e}", row.id))
        })?;
        let address_type = row
            .address_type
            .parse::<AddressType>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            street_address: row.street_address,
            apartment_address: row.apartment_address,
            country,
            zip: row.zip,
            address_type,
            is_default: row.is_default,
        })
    }
}

/// Repository for billing and shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's default address of the given type, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_default(
        &self,
        user_id: UserId,
        address_type: AddressType,
    ) -> Result<Option<Address>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_default(&mut conn, user_id, address_type).await
    }

    /// Get an address owned by the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.address WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

/// Default address lookup on an existing connection or transaction.
pub(crate) async fn get_default(
    conn: &mut PgConnection,
    user_id: UserId,
    address_type: AddressType,
) -> Result<Option<Address>, RepositoryError> {
    let row = sqlx::query_as::<_, AddressRow>(&format!(
        r"
        SELECT {ADDRESS_COLUMNS} FROM storefront.address
        WHERE user_id = $1 AND address_type = $2 AND is_default
        "
    ))
    .bind(user_id)
    .bind(address_type.code())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Insert an address. A new default replaces the previous default of the
/// same type.
pub(crate) async fn insert(
    conn: &mut PgConnection,
    user_id: UserId,
    address: &NewAddress,
) -> Result<Address, RepositoryError> {
    if address.is_default {
        sqlx::query(
            r"
            UPDATE storefront.address SET is_default = FALSE
            WHERE user_id = $1 AND address_type = $2 AND is_default
            ",
        )
        .bind(user_id)
        .bind(address.address_type.code())
        .execute(&mut *conn)
        .await?;
    }

    let row = sqlx::query_as::<_, AddressRow>(&format!(
        r"
        INSERT INTO storefront.address
            (user_id, street_address, apartment_address, country, zip, address_type, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {ADDRESS_COLUMNS}
        "
    ))
    .bind(user_id)
    .bind(&address.street_address)
    .bind(address.apartment_address.as_deref())
    .bind(address.country.as_str())
    .bind(&address.zip)
    .bind(address.address_type.code())
    .bind(address.is_default)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}
