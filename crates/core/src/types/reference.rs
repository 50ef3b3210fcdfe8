//! Public order reference codes.
//!
//! A paid order receives a short random reference that customers quote when
//! requesting a refund. Internal numeric IDs are never shown.

use core::fmt;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A 20-character lowercase alphanumeric order reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefCode(String);

impl RefCode {
    /// Length of generated codes.
    pub const LENGTH: usize = 20;

    /// Generate a fresh random reference code.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..Self::LENGTH)
            .filter_map(|_| ALPHABET.choose(&mut rng).map(|&b| char::from(b)))
            .collect();
        Self(code)
    }

    /// Normalize a code typed by a customer.
    ///
    /// Returns `None` when the input cannot be a reference code, so callers
    /// can skip the database lookup.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        (s.len() == Self::LENGTH && s.bytes().all(|b| ALPHABET.contains(&b))).then_some(Self(s))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
