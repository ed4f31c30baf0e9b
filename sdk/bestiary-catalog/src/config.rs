//! Configuration types for catalog client construction.

use std::collections::BTreeMap;

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL for the catalog API.
    pub base_url: String,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional user agent reported to the catalog.
    pub user_agent: Option<String>,
}

impl CatalogClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}
