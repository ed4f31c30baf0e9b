//! Data-orchestration SDK for browsing a paginated remote creature catalog.
//!
//! The crate reconciles an infinite paginated listing, several independent
//! filtered result sets and a secondary detail-hydration layer into one
//! consistent, sorted, de-duplicated view, while a keyed request cache keeps
//! overlapping fetches collapsed and stale-but-valid data served instantly.
//!
//! Presentation, persistence and the remote HTTP API itself are external
//! collaborators; see [`providers::catalog::ClientTrait`] for the consumed
//! API contract and [`browse::CatalogBrowser`] for the surface exposed to
//! consumers.

pub mod browse;
pub mod cache;
pub mod models;
pub mod providers;
