//! Shared pagination parameters for list endpoints.

use serde::Deserialize;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// `?skip=&limit=` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    /// Number of items to skip before returning results.
    #[serde(default)]
    pub skip: usize,

    /// Maximum number of items to return (default: 10, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    /// Get the effective limit, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}
