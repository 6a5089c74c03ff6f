//! Read-only access to the third-party board-game catalog.

mod bgg;
mod error;
mod xml;

pub use bgg::BggCatalogClient;
pub use error::{CatalogError, CatalogResult};

use futures::future::BoxFuture;

/// Raw search hit as returned by the catalog, before any ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogCandidateRecord {
    pub id: String,
    pub name: String,
    pub publication_year: Option<i32>,
}

/// Extended metadata for a single catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogDetails {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    /// Overall board-game rank; absent for unranked items.
    pub rank: Option<u32>,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
}

/// Abstraction over the catalog lookup API.
pub trait CatalogClient: Send + Sync {
    /// Free-text search, truncated to the client's configured maximum.
    fn search(&self, query: &str) -> BoxFuture<'static, CatalogResult<Vec<CatalogCandidateRecord>>>;
    /// Item details, `None` when the catalog has no item with this id.
    fn details(&self, id: &str) -> BoxFuture<'static, CatalogResult<Option<CatalogDetails>>>;
}
