//! Form parsing and validation.
//!
//! Raw form structs deserialize whatever the browser sent; validation turns
//! them into domain values or a list of per-field errors that templates show
//! next to the inputs.

use serde::Deserialize;

use myshop_core::{AddressType, CountryCode, Email, PaymentOption, RefCode};

use crate::db::AddressChoice;
use crate::models::NewAddress;

/// A validation error attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Validation errors for a whole form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Error message for a field, if it failed validation.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

const REQUIRED: &str = "This field is required.";

/// Column widths of `storefront.address`.
const ADDRESS_MAX_LENGTH: usize = 100;
const ZIP_MAX_LENGTH: usize = 20;

fn too_long(max: usize) -> String {
    format!("Ensure this value has at most {max} characters.")
}

/// Checkout form as submitted. Checkboxes are present only when ticked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_address2: String,
    #[serde(default)]
    pub shipping_country: String,
    #[serde(default)]
    pub shipping_zip: String,
    pub use_default_shipping: Option<String>,
    pub set_default_shipping: Option<String>,
    pub same_billing_address: Option<String>,
    #[serde(default)]
    pub billing_address: String,
    #[serde(default)]
    pub billing_address2: String,
    #[serde(default)]
    pub billing_country: String,
    #[serde(default)]
    pub billing_zip: String,
    pub use_default_billing: Option<String>,
    pub set_default_billing: Option<String>,
    #[serde(default)]
    pub payment_option: String,
}

/// A checkout submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub shipping: AddressChoice,
    pub billing: AddressChoice,
    pub payment_option: PaymentOption,
}

/// Raw address fields for one address type.
struct AddressFields<'a> {
    /// Field names for street, apartment, country and zip.
    names: [&'static str; 4],
    street: &'a str,
    apartment: &'a str,
    country: &'a str,
    zip: &'a str,
    set_default: bool,
    address_type: AddressType,
}

impl AddressFields<'_> {
    fn validate(&self, errors: &mut FormErrors) -> Option<NewAddress> {
        let [street_field, apartment_field, country_field, zip_field] = self.names;

        let street = self.street.trim();
        let street_ok = check_length(errors, street_field, street, ADDRESS_MAX_LENGTH, true);

        let apartment = self.apartment.trim();
        let apartment_ok =
            check_length(errors, apartment_field, apartment, ADDRESS_MAX_LENGTH, false);

        let zip = self.zip.trim();
        let zip_ok = check_length(errors, zip_field, zip, ZIP_MAX_LENGTH, true);

        let country = if self.country.trim().is_empty() {
            errors.add(country_field, REQUIRED);
            None
        } else {
            match CountryCode::parse(self.country) {
                Ok(code) => Some(code),
                Err(e) => {
                    errors.add(country_field, e.to_string());
                    None
                }
            }
        };

        if !(street_ok && apartment_ok && zip_ok) {
            return None;
        }

        Some(NewAddress {
            street_address: street.to_owned(),
            apartment_address: (!apartment.is_empty()).then(|| apartment.to_owned()),
            country: country?,
            zip: zip.to_owned(),
            address_type: self.address_type,
            is_default: self.set_default,
        })
    }
}

/// Record a required or over-length error for `value`. Returns whether it
/// passed.
fn check_length(
    errors: &mut FormErrors,
    field: &'static str,
    value: &str,
    max: usize,
    required: bool,
) -> bool {
    if required && value.is_empty() {
        errors.add(field, REQUIRED);
        return false;
    }
    if value.chars().count() > max {
        errors.add(field, too_long(max));
        return false;
    }
    true
}

fn ticked(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

impl CheckoutForm {
    /// Validate the submission.
    ///
    /// A default address, when chosen, skips validation of the fields for
    /// that address. "Same billing address" reuses whatever shipping address
    /// is chosen.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> Result<Checkout, FormErrors> {
        let mut errors = FormErrors::default();

        let shipping = if ticked(self.use_default_shipping.as_ref()) {
            Some(AddressChoice::UseDefault(AddressType::Shipping))
        } else {
            AddressFields {
                names: [
                    "shipping_address",
                    "shipping_address2",
                    "shipping_country",
                    "shipping_zip",
                ],
                street: &self.shipping_address,
                apartment: &self.shipping_address2,
                country: &self.shipping_country,
                zip: &self.shipping_zip,
                set_default: ticked(self.set_default_shipping.as_ref()),
                address_type: AddressType::Shipping,
            }
            .validate(&mut errors)
            .map(AddressChoice::New)
        };

        let billing = if ticked(self.same_billing_address.as_ref()) {
            Some(AddressChoice::SameAsShipping)
        } else if ticked(self.use_default_billing.as_ref()) {
            Some(AddressChoice::UseDefault(AddressType::Billing))
        } else {
            AddressFields {
                names: [
                    "billing_address",
                    "billing_address2",
                    "billing_country",
                    "billing_zip",
                ],
                street: &self.billing_address,
                apartment: &self.billing_address2,
                country: &self.billing_country,
                zip: &self.billing_zip,
                set_default: ticked(self.set_default_billing.as_ref()),
                address_type: AddressType::Billing,
            }
            .validate(&mut errors)
            .map(AddressChoice::New)
        };

        let payment_option = self.payment_option.parse::<PaymentOption>().ok();
        if payment_option.is_none() {
            errors.add("payment_option", "Select a valid payment option.");
        }

        match (shipping, billing, payment_option) {
            (Some(shipping), Some(billing), Some(payment_option)) if errors.is_empty() => {
                Ok(Checkout {
                    shipping,
                    billing,
                    payment_option,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Refund request form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundForm {
    #[serde(default)]
    pub ref_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub email: String,
}

/// A refund request that passed validation.
///
/// `ref_code` is `None` when the submitted code cannot be a reference code
/// at all; such a request names no order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub ref_code: Option<RefCode>,
    pub message: String,
    pub email: Email,
}

impl RefundForm {
    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> Result<RefundRequest, FormErrors> {
        let mut errors = FormErrors::default();

        let ref_code = self.ref_code.trim();
        if ref_code.is_empty() {
            errors.add("ref_code", REQUIRED);
        }

        let message = self.message.trim();
        if message.is_empty() {
            errors.add("message", REQUIRED);
        }

        let email = if self.email.trim().is_empty() {
            errors.add("email", REQUIRED);
            None
        } else {
            Email::parse(&self.email)
                .inspect_err(|_| errors.add("email", "Enter a valid email address."))
                .ok()
        };

        match email {
            Some(email) if errors.is_empty() => Ok(RefundRequest {
                ref_code: RefCode::parse(ref_code),
                message: message.to_owned(),
                email,
            }),
            _ => Err(errors),
        }
    }
}

/// Accept a `next` redirect target only if it stays on this site.
///
/// Absolute URLs, protocol-relative `//host` paths and backslash tricks are
/// rejected.
#[must_use]
pub fn local_redirect_target(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let is_local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    is_local.then_some(next)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled() -> CheckoutForm {
        CheckoutForm {
            shipping_address: "1 Main St".to_string(),
            shipping_country: "us".to_string(),
            shipping_zip: "10001".to_string(),
            billing_address: "2 Side St".to_string(),
            billing_address2: "Apt 4".to_string(),
            billing_country: "CA".to_string(),
            billing_zip: "H0H 0H0".to_string(),
            set_default_billing: Some("on".to_string()),
            payment_option: "stripe".to_string(),
            ..CheckoutForm::default()
        }
    }

    #[test]
    fn test_new_addresses() {
        let checkout = filled().validate().unwrap();
        assert_eq!(checkout.payment_option, PaymentOption::Stripe);

        let AddressChoice::New(shipping) = checkout.shipping else {
            panic!("expected new shipping address");
        };
        assert_eq!(shipping.country.as_str(), "US");
        assert_eq!(shipping.apartment_address, None);
        assert!(!shipping.is_default);

        let AddressChoice::New(billing) = checkout.billing else {
            panic!("expected new billing address");
        };
        assert_eq!(billing.address_type, AddressType::Billing);
        assert_eq!(billing.apartment_address.as_deref(), Some("Apt 4"));
        assert!(billing.is_default);
    }

    #[test]
    fn test_defaults_skip_field_validation() {
        let form = CheckoutForm {
            use_default_shipping: Some("on".to_string()),
            use_default_billing: Some("on".to_string()),
            payment_option: "paypal".to_string(),
            ..CheckoutForm::default()
        };
        let checkout = form.validate().unwrap();
        assert_eq!(
            checkout.shipping,
            AddressChoice::UseDefault(AddressType::Shipping)
        );
        assert_eq!(
            checkout.billing,
            AddressChoice::UseDefault(AddressType::Billing)
        );
        assert_eq!(checkout.payment_option, PaymentOption::PayPal);
    }

    #[test]
    fn test_same_billing_address() {
        let form = CheckoutForm {
            same_billing_address: Some("on".to_string()),
            billing_address: String::new(),
            ..filled()
        };
        assert_eq!(
            form.validate().unwrap().billing,
            AddressChoice::SameAsShipping
        );
    }

    #[test]
    fn test_missing_fields_reported() {
        let form = CheckoutForm {
            shipping_zip: " ".to_string(),
            billing_country: "Canada".to_string(),
            payment_option: "cash".to_string(),
            ..filled()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("shipping_zip"), Some(REQUIRED));
        assert!(errors.get("billing_country").is_some());
        assert!(errors.get("payment_option").is_some());
        assert!(errors.get("shipping_address").is_none());
    }

    #[test]
    fn test_address_length_limits() {
        let at_limit = CheckoutForm {
            shipping_address: "a".repeat(ADDRESS_MAX_LENGTH),
            shipping_address2: "b".repeat(ADDRESS_MAX_LENGTH),
            shipping_zip: "1".repeat(ZIP_MAX_LENGTH),
            ..filled()
        };
        assert!(at_limit.validate().is_ok());

        let errors = CheckoutForm {
            shipping_address: "a".repeat(ADDRESS_MAX_LENGTH + 1),
            billing_address2: "b".repeat(ADDRESS_MAX_LENGTH + 1),
            billing_zip: "1".repeat(ZIP_MAX_LENGTH + 1),
            ..filled()
        }
        .validate()
        .unwrap_err();
        let address_message = too_long(ADDRESS_MAX_LENGTH);
        assert_eq!(errors.get("shipping_address"), Some(address_message.as_str()));
        assert_eq!(errors.get("billing_address2"), Some(address_message.as_str()));
        assert_eq!(
            errors.get("billing_zip"),
            Some(too_long(ZIP_MAX_LENGTH).as_str())
        );
    }

    #[test]
    fn test_length_counts_characters() {
        let form = CheckoutForm {
            shipping_address: "é".repeat(ADDRESS_MAX_LENGTH),
            ..filled()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_refund_form() {
        let form = RefundForm {
            ref_code: " abcdefghij0123456789 ".to_string(),
            message: "Arrived broken".to_string(),
            email: "me@example.com".to_string(),
        };
        let request = form.validate().unwrap();
        assert_eq!(
            request.ref_code.map(|c| c.to_string()).as_deref(),
            Some("abcdefghij0123456789")
        );
        assert_eq!(request.email.as_str(), "me@example.com");

        let unknown = RefundForm {
            ref_code: "short".to_string(),
            ..form.clone()
        };
        assert_eq!(unknown.validate().unwrap().ref_code, None);

        let errors = RefundForm {
            email: "not-an-email".to_string(),
            message: String::new(),
            ..form
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("message"), Some(REQUIRED));
        assert!(errors.get("email").is_some());
        assert!(errors.get("ref_code").is_none());
    }

    #[test]
    fn test_local_redirect_target() {
        assert_eq!(
            local_redirect_target(Some("/checkout/")),
            Some("/checkout/")
        );
        assert_eq!(local_redirect_target(Some("https://evil.example")), None);
        assert_eq!(local_redirect_target(Some("//evil.example")), None);
        assert_eq!(local_redirect_target(Some("/\\evil.example")), None);
        assert_eq!(local_redirect_target(None), None);
    }
}
