//! Fixed-size pagination for list views.
//!
//! A list handler first counts the rows, resolves the requested page against
//! that count, then fetches exactly one window with `LIMIT`/`OFFSET`.
//!
//! ```
//! use myshop_core::{Page, PageRequest};
//!
//! let items: Vec<u32> = (0..13).collect();
//! let first = Page::from_vec(items.clone(), PageRequest::Number(1)).unwrap();
//! assert_eq!(first.items.len(), 10);
//! assert!(first.is_paginated());
//!
//! let second = Page::from_vec(items, PageRequest::Number(2)).unwrap();
//! assert_eq!(second.items.len(), 3);
//! ```

use std::str::FromStr;

/// Number of items shown per page on list views.
pub const PAGE_SIZE: u64 = 10;

/// Errors raised for pages that do not exist.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("page number is not an integer: {0}")]
    NotANumber(String),
    #[error("page {requested} is out of range (1..={num_pages})")]
    OutOfRange { requested: u64, num_pages: u64 },
}

/// A page requested via the `?page=` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageRequest {
    #[default]
    First,
    Last,
    Number(u64),
}

impl PageRequest {
    /// Parse the optional `page` query value. A missing or blank value means
    /// the first page.
    ///
    /// # Errors
    ///
    /// Returns `PageError::NotANumber` for anything other than a positive
    /// integer or the literal `last`.
    pub fn from_query(value: Option<&str>) -> Result<Self, PageError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::First),
            Some(raw) => raw.parse(),
        }
    }

    /// Resolve this request against a total row count.
    ///
    /// An empty list still has one (empty) first page.
    ///
    /// # Errors
    ///
    /// Returns `PageError::OutOfRange` if the page number is zero or past the
    /// last page.
    pub fn resolve(self, total: u64) -> Result<PageWindow, PageError> {
        let num_pages = total.div_ceil(PAGE_SIZE).max(1);
        let number = match self {
            Self::First => 1,
            Self::Last => num_pages,
            Self::Number(n) => n,
        };
        if number == 0 || number > num_pages {
            return Err(PageError::OutOfRange {
                requested: number,
                num_pages,
            });
        }
        Ok(PageWindow {
            number,
            num_pages,
            total,
        })
    }
}

impl FromStr for PageRequest {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "last" {
            return Ok(Self::Last);
        }
        s.parse::<u64>()
            .map(Self::Number)
            .map_err(|_| PageError::NotANumber(s.to_owned()))
    }
}

/// A resolved page position: which rows to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages (at least 1).
    pub num_pages: u64,
    /// Total number of rows across all pages.
    pub total: u64,
}

impl PageWindow {
    /// Row offset for `OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.number - 1) * PAGE_SIZE
    }

    /// Row count for `LIMIT`.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        PAGE_SIZE
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    /// Wrap an already-fetched window of rows.
    #[must_use]
    pub const fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }

    /// Slice a fully materialized list.
    ///
    /// # Errors
    ///
    /// Returns `PageError::OutOfRange` if the requested page does not exist.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Result<Self, PageError> {
        let window = request.resolve(all.len() as u64)?;
        let items = all
            .into_iter()
            .skip(usize::try_from(window.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(PAGE_SIZE).unwrap_or(usize::MAX))
            .collect();
        Ok(Self { items, window })
    }

    /// True when the list spans more than one page.
    #[must_use]
    pub const fn is_paginated(&self) -> bool {
        self.window.num_pages > 1
    }

    /// Previous page number, if any.
    #[must_use]
    pub const fn previous_page(&self) -> Option<u64> {
        if self.window.number > 1 {
            Some(self.window.number - 1)
        } else {
            None
        }
    }

    /// Next page number, if any.
    #[must_use]
    pub const fn next_page(&self) -> Option<u64> {
        if self.window.number < self.window.num_pages {
            Some(self.window.number + 1)
        } else {
            None
        }
    }

    /// Map the items, keeping the window.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }
}
