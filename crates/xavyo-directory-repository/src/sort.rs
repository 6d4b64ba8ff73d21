//! Sorting and paging requests
//!
//! Directory searches have no generic server-side ordering or paging, so
//! every operation taking these types rejects them with
//! [`DirectoryError::Unsupported`](xavyo_directory::error::DirectoryError).
//! They exist so callers can express the request and get a clear error.

use serde::{Deserialize, Serialize};

use xavyo_directory::error::{DirectoryError, DirectoryResult};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Ordering on one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Order {
    /// Ascending order on `property`.
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    /// Descending order on `property`.
    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

/// A sort request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl Sort {
    /// No ordering.
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Sort by `orders`, in order of precedence.
    pub fn by(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    /// Check if any ordering is requested.
    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }
}

/// A page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    /// Zero-based page number.
    pub page: u32,
    /// Page size.
    pub size: u32,
    #[serde(default)]
    pub sort: Sort,
}

impl Pageable {
    /// Request page `page` of `size` elements.
    pub fn of(page: u32, size: u32) -> DirectoryResult<Self> {
        if size == 0 {
            return Err(DirectoryError::invalid_argument(
                "page size must be greater than zero",
            ));
        }
        Ok(Self {
            page,
            size,
            sort: Sort::unsorted(),
        })
    }

    /// Same request with a sort.
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Offset of the first element of the page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}
