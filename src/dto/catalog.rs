use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dao::catalog::CatalogDetails;

/// Query string of `GET /catalog/search`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogSearchParams {
    /// Free-text search; blank queries return no results.
    #[serde(default)]
    pub query: String,
}

/// Extended catalog metadata for one game.
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogGameResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub publication_year: Option<i32>,
}

impl From<CatalogDetails> for CatalogGameResponse {
    fn from(details: CatalogDetails) -> Self {
        Self {
            id: details.id,
            title: details.title,
            image_url: details.image_url,
            thumbnail_url: details.thumbnail_url,
            min_players: details.min_players,
            max_players: details.max_players,
            rank: details.rank,
            description: details.description,
            publication_year: details.publication_year,
        }
    }
}
