//! Billing and shipping addresses.

use myshop_core::{AddressId, AddressType, CountryCode, UserId};

/// Address fields entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub street_address: String,
    pub apartment_address: Option<String>,
    pub country: CountryCode,
    pub zip: String,
    pub address_type: AddressType,
    /// Make this the user's default for its type.
    pub is_default: bool,
}

/// A stored address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub street_address: String,
    pub apartment_address: Option<String>,
    pub country: CountryCode,
    pub zip: String,
    pub address_type: AddressType,
    pub is_default: bool,
}

impl Address {
    /// Single-line rendering for summaries and emails.
    #[must_use]
    pub fn one_line(&self) -> String {
        match &self.apartment_address {
            Some(apartment) => format!(
                "{}, {}, {} {}",
                self.street_address, apartment, self.zip, self.country
            ),
            None => format!("{}, {} {}", self.street_address, self.zip, self.country),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line() {
        let mut address = Address {
            id: AddressId::new(1),
            user_id: UserId::new(1),
            street_address: "1 Main St".to_string(),
            apartment_address: None,
            country: CountryCode::parse("us").unwrap(),
            zip: "10001".to_string(),
            address_type: AddressType::Shipping,
            is_default: true,
        };
        assert_eq!(address.one_line(), "1 Main St, 10001 US");

        address.apartment_address = Some("Apt 4".to_string());
        assert_eq!(address.one_line(), "1 Main St, Apt 4, 10001 US");
    }
}
