//! Listing types

use crate::link_type::LinkType;
use serde::{Deserialize, Serialize};

/// Offset/limit window over an ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Rows to skip
    pub offset: u64,
    /// Maximum rows to return
    pub limit: u64,
}

impl Page {
    /// Create a page window
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// First page of the given size
    pub const fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    /// The page following this one
    pub const fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

/// Result of a listing
///
/// `total_count` is the number of rows across all pages, not the length of
/// `link_types`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTypeList {
    /// Rows in listing order
    pub link_types: Vec<LinkType>,
    /// Total rows in the store
    pub total_count: u64,
}

impl LinkTypeList {
    /// Number of rows in this page
    pub fn len(&self) -> usize {
        self.link_types.len()
    }

    /// Check if this page holds no rows
    pub fn is_empty(&self) -> bool {
        self.link_types.is_empty()
    }

    /// Check whether rows remain after this page
    pub fn has_more(&self, page: &Page) -> bool {
        page.offset.saturating_add(self.link_types.len() as u64) < self.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_next() {
        let page = Page::first(10);
        assert_eq!(page.next(), Page::new(10, 10));
        assert_eq!(Page::new(u64::MAX, 5).next().offset, u64::MAX);
    }

    #[test]
    fn test_has_more() {
        let list = LinkTypeList {
            link_types: Vec::new(),
            total_count: 3,
        };
        assert!(list.has_more(&Page::first(2)));
        assert!(!list.has_more(&Page::new(3, 2)));
    }
}
