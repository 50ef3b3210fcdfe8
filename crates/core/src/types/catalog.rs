//! Catalog vocabulary: item slugs, categories and display labels.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum length of an item title.
pub const ITEM_TITLE_MAX_LENGTH: usize = 100;

/// Errors raised while validating catalog values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("slug cannot be empty")]
    EmptySlug,
    #[error("slug must be at most {max} characters")]
    SlugTooLong { max: usize },
    #[error("slug may only contain letters, digits, '-' and '_' (found {0:?})")]
    SlugCharacter(char),
    #[error("unknown category code: {0}")]
    UnknownCategory(String),
    #[error("unknown label code: {0}")]
    UnknownLabel(String),
}

/// A URL-safe unique identifier for an item.
///
/// ```
/// use myshop_core::Slug;
///
/// assert!(Slug::parse("iphone-14_pro").is_ok());
/// assert!(Slug::parse("123").is_ok());
/// assert!(Slug::parse("not a slug").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug is empty, too long, or contains a
    /// character outside `[A-Za-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, CatalogError> {
        if s.is_empty() {
            return Err(CatalogError::EmptySlug);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(CatalogError::SlugTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(CatalogError::SlugCharacter(bad));
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

/// Item category, stored as a two-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "PH")]
    Phone,
    #[serde(rename = "TV")]
    Television,
    #[serde(rename = "LP")]
    Laptop,
    #[serde(rename = "AC")]
    Accessory,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 4] = [Self::Phone, Self::Television, Self::Laptop, Self::Accessory];

    /// The stored code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Phone => "PH",
            Self::Television => "TV",
            Self::Laptop => "LP",
            Self::Accessory => "AC",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Phone => "Phone",
            Self::Television => "Television",
            Self::Laptop => "Laptop",
            Self::Accessory => "Accessory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_owned()))
    }
}

/// Display label (badge colour) for an item, stored as a one-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "P")]
    Primary,
    #[serde(rename = "S")]
    Secondary,
    #[serde(rename = "D")]
    Danger,
}

impl Label {
    /// The stored code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Primary => "P",
            Self::Secondary => "S",
            Self::Danger => "D",
        }
    }

    /// CSS class suffix used by templates.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Danger => "danger",
        }
    }
}

impl FromStr for Label {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P" => Ok(Self::Primary),
            "S" => Ok(Self::Secondary),
            "D" => Ok(Self::Danger),
            other => Err(CatalogError::UnknownLabel(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_accepts_numeric() {
        assert_eq!(Slug::parse("123").map(|s| s.to_string()), Ok("123".to_owned()));
    }

    #[test]
    fn test_slug_rejects_bad_input() {
        assert_eq!(Slug::parse(""), Err(CatalogError::EmptySlug));
        assert_eq!(Slug::parse("a/b"), Err(CatalogError::SlugCharacter('/')));
        assert_eq!(
            Slug::parse(&"x".repeat(51)),
            Err(CatalogError::SlugTooLong { max: 50 })
        );
    }

    #[test]
    fn test_category_codes() {
        for category in Category::ALL {
            assert_eq!(category.code().parse::<Category>(), Ok(category));
        }
        assert!("ZZ".parse::<Category>().is_err());
    }

    #[test]
    fn test_label_codes() {
        assert_eq!("P".parse::<Label>(), Ok(Label::Primary));
        assert_eq!(Label::Danger.css_class(), "danger");
        assert!("X".parse::<Label>().is_err());
    }

    #[test]
    fn test_category_serde_uses_codes() {
        let json = serde_json::to_string(&Category::Television).unwrap_or_default();
        assert_eq!(json, "\"TV\"");
    }
}
