//! Paginated search results

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One page of search results plus pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage<T> {
    /// Items in server-defined order
    pub items: Vec<T>,
    pub total_count: u64,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_time_ms: Option<f64>,
    /// Sum of matching amounts (payments only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

impl<T> SearchResultPage<T> {
    /// Build a page, deriving the page count and navigation flags
    pub fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        let total_pages = total_pages(total_count, page_size);
        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
            query_time_ms: None,
            total_amount: None,
        }
    }

    /// Zero results is a valid page, not a failure
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Clamp a requested page into `[1, total_pages]`
    pub fn clamp_page(&self, requested: u32) -> u32 {
        requested.clamp(1, self.total_pages.max(1))
    }

    /// 1-based position of the first item on this page, 0 when empty
    pub fn first_item_number(&self) -> u64 {
        if self.items.is_empty() {
            0
        } else {
            u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size) + 1
        }
    }

    /// Describe every way the navigation metadata is inconsistent
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut problems = Vec::new();

        let expected_pages = total_pages(self.total_count, self.page_size);
        if self.total_pages != expected_pages {
            problems.push(format!(
                "total_pages is {} but {} results at {} per page make {}",
                self.total_pages, self.total_count, self.page_size, expected_pages
            ));
        }
        if self.has_next != (self.page < self.total_pages) {
            problems.push(format!(
                "has_next is {} on page {} of {}",
                self.has_next, self.page, self.total_pages
            ));
        }
        if self.has_previous != (self.page > 1) {
            problems.push(format!(
                "has_previous is {} on page {}",
                self.has_previous, self.page
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    /// Re-derive the navigation flags from `page` and `total_pages`
    ///
    /// `total_pages` is taken as reported by the server.
    pub fn normalized(mut self) -> Self {
        let has_next = self.page < self.total_pages;
        let has_previous = self.page > 1;
        if self.has_next != has_next || self.has_previous != has_previous {
            warn!(
                "Correcting navigation flags on page {} of {}",
                self.page, self.total_pages
            );
        }
        self.has_next = has_next;
        self.has_previous = has_previous;
        self
    }
}

/// `ceil(total_count / page_size)`, with an empty result having no pages
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_navigation() {
        let page = SearchResultPage::new(vec![1, 2, 3], 45, 2, 20);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_previous);
        assert_eq!(page.first_item_number(), 21);
        assert!(page.check_invariants().is_ok());

        let last = SearchResultPage::new(vec![1], 41, 3, 20);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn test_empty_result_is_a_valid_page() {
        let page: SearchResultPage<u8> = SearchResultPage::new(vec![], 0, 1, 20);
        assert!(page.is_empty());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_previous);
        assert_eq!(page.first_item_number(), 0);
        assert_eq!(page.clamp_page(9), 1);
        assert!(page.check_invariants().is_ok());
    }

    #[test]
    fn test_clamp_page() {
        let page: SearchResultPage<u8> = SearchResultPage::new(vec![], 100, 1, 10);
        assert_eq!(page.clamp_page(0), 1);
        assert_eq!(page.clamp_page(7), 7);
        assert_eq!(page.clamp_page(11), 10);
    }

    #[test]
    fn test_normalized_fixes_inconsistent_flags() {
        let mut page = SearchResultPage::new(vec![1], 30, 1, 10);
        page.has_next = false;
        page.has_previous = true;
        assert!(page.check_invariants().is_err());

        let page = page.normalized();
        assert!(page.has_next);
        assert!(!page.has_previous);
        assert!(page.check_invariants().is_ok());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(5, 0), 0);
    }
}
