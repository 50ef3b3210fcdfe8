//! Coupon code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CouponCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponCodeError {
    #[error("coupon code cannot be empty")]
    Empty,
    #[error("coupon code must be at most {max} characters")]
    TooLong { max: usize },
}

/// A coupon code as typed by the customer.
///
/// Matching is exact and case-sensitive; only surrounding whitespace is
/// removed.
///
/// ```
/// use myshop_core::CouponCode;
///
/// let code = CouponCode::parse(" BlackFriday ").unwrap();
/// assert_eq!(code.as_str(), "BlackFriday");
/// assert!(CouponCode::parse("THIS-CODE-IS-TOO-LONG").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    /// Maximum code length.
    pub const MAX_LENGTH: usize = 15;

    /// Parse a coupon code.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed code is empty or longer than
    /// [`Self::MAX_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, CouponCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CouponCodeError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(CouponCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_length_is_fifteen() {
        assert!(CouponCode::parse(&"A".repeat(15)).is_ok());
        assert_eq!(
            CouponCode::parse(&"A".repeat(16)),
            Err(CouponCodeError::TooLong { max: 15 })
        );
    }

    #[test]
    fn test_case_is_preserved() {
        let lower = CouponCode::parse("blackfriday");
        let mixed = CouponCode::parse("BlackFriday");
        assert_ne!(lower, mixed);
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(CouponCode::parse("  "), Err(CouponCodeError::Empty));
    }
}
