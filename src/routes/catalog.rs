use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::catalog::{CatalogGameResponse, CatalogSearchParams},
    error::AppError,
    services::{catalog_service, match_resolver::CatalogMatch},
    state::SharedState,
};

/// Read-only access to the external game catalog.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/catalog/search", get(search))
        .route("/catalog/games/{id}", get(game))
}

/// Search the catalog once and return the ranked matches.
#[utoipa::path(
    get,
    path = "/catalog/search",
    tag = "catalog",
    params(CatalogSearchParams),
    responses(
        (status = 200, description = "Ranked matches", body = [CatalogMatch]),
        (status = 502, description = "Catalog returned an error"),
        (status = 503, description = "Catalog is busy")
    )
)]
pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<CatalogSearchParams>,
) -> Result<Json<Vec<CatalogMatch>>, AppError> {
    Ok(Json(
        catalog_service::search_catalog(&state, &params.query).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/catalog/games/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Catalog identifier of the game")),
    responses(
        (status = 200, description = "Game details", body = CatalogGameResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogGameResponse>, AppError> {
    Ok(Json(catalog_service::game_details(&state, &id).await?))
}
