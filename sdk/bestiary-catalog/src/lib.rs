//! Typed HTTP client for the remote creature catalog.
//!
//! This crate provides:
//! - HTTP client construction with timeouts and extra headers
//! - Typed wrappers for every catalog endpoint the SDK consumes
//! - Normalization of raw wire shapes into the SDK's domain types
//! - Common error handling for catalog API operations
//!
//! The client performs no caching of its own; memoization and request
//! de-duplication live in `bestiary-sdk`.
//!
//! ## Usage
//!
//! ```ignore
//! use bestiary_catalog::{CatalogClientConfig, CatalogHttpClient, PageCursor};
//!
//! let config = CatalogClientConfig {
//!     base_url: "https://catalog.example.com/api/v2".to_string(),
//!     extra_headers: BTreeMap::new(),
//!     user_agent: None,
//! };
//!
//! let client = CatalogHttpClient::new(config)?;
//! let page = client.list_page(PageCursor::start(20)).await?;
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::CatalogHttpClient;
pub use config::CatalogClientConfig;
pub use error::CatalogClientError;
pub use types::{
    Ability,
    BaseStat,
    CatalogPage,
    CreatureDetail,
    CreatureId,
    EvolutionNode,
    PageCursor,
    SpeciesInfo,
    SummaryRef,
    creature_id_from_url,
};
