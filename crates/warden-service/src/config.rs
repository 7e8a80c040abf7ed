//! Service configuration.

use serde::Deserialize;
use warden_core::repository::{PageRequest, Pagination};

/// Configuration shared by the managers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Page size used when the caller sends none (default: 20).
    pub default_page_size: u64,
    /// Upper bound on any caller-supplied page size (default: 100).
    pub max_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl ServiceConfig {
    pub fn paginate(&self, request: PageRequest) -> Pagination {
        request.clamp(self.default_page_size, self.max_page_size)
    }
}
