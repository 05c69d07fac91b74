//! Account listing queries
//!
//! Filter, sort and pagination parameters for listing accounts, plus the
//! pagination metadata computed on every call. Page bounds are
//! normalized here so the stores only ever see usable values.

use serde::Serialize;

use super::Account;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Upper bound for a single page.
pub const MAX_PAGE_SIZE: u32 = 32;

/// Sort key for account listings.
///
/// An unrecognized key sorts nothing and preserves store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Unsorted,
    Name,
    Balance,
}

impl SortKey {
    /// Parse a raw query-string value, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "name" => Self::Name,
            "balance" => Self::Balance,
            _ => Self::Unsorted,
        }
    }
}

/// Parameters for listing accounts.
#[derive(Debug, Clone)]
pub struct AccountQuery {
    /// Exact-match name filter (trimmed before comparison)
    pub name: Option<String>,
    pub sort_by: SortKey,
    /// Reverse the paged window (see the ledger engine docs)
    pub desc: bool,
    /// 1-based page number
    pub page_number: u32,
    pub page_size: u32,
}

impl AccountQuery {
    pub fn new() -> Self {
        Self {
            name: None,
            sort_by: SortKey::Unsorted,
            desc: false,
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sorted_by(mut self, sort_by: SortKey) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn descending(mut self, desc: bool) -> Self {
        self.desc = desc;
        self
    }

    pub fn page(mut self, page_number: u32, page_size: u32) -> Self {
        self.page_number = page_number;
        self.page_size = page_size;
        self
    }

    /// Clamp page bounds: page number at least 1, page size in
    /// [1, MAX_PAGE_SIZE].
    pub fn normalized(mut self) -> Self {
        self.page_number = self.page_number.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Number of records to skip for the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.page_number).saturating_sub(1)
    }
}

impl Default for AccountQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Pagination metadata, recomputed on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMetadata {
    pub total_item_count: u64,
    pub page_size: u32,
    pub page_number: u32,
}

/// One page of accounts plus its pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    pub pagination: PaginationMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("name"), SortKey::Name);
        assert_eq!(SortKey::parse(" Balance "), SortKey::Balance);
        assert_eq!(SortKey::parse(""), SortKey::Unsorted);
        assert_eq!(SortKey::parse("created"), SortKey::Unsorted);
    }

    #[test]
    fn test_normalized_clamps_page_number() {
        let query = AccountQuery::new().page(0, 5).normalized();
        assert_eq!(query.page_number, 1);
    }

    #[test]
    fn test_normalized_clamps_page_size() {
        let query = AccountQuery::new().page(1, 0).normalized();
        assert_eq!(query.page_size, 1);

        let query = AccountQuery::new().page(1, 500).normalized();
        assert_eq!(query.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_offset() {
        let query = AccountQuery::new().page(3, 10).normalized();
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_default_page_size() {
        assert_eq!(AccountQuery::new().page_size, DEFAULT_PAGE_SIZE);
    }
}
