use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::search::{SearchOutcomeResponse, SearchQueryRequest, SearchSnapshotResponse},
    error::AppError,
    routes::auth::{CurrentUser, require_user},
    services::search_service,
    state::SharedState,
};

/// Search widgets: each one applies only the results of its latest query.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/searches", post(open_search))
        .route("/searches/{id}", get(get_search).delete(close_search))
        .route("/searches/{id}/queries", post(submit_query))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}

#[utoipa::path(
    post,
    path = "/searches",
    tag = "search",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    responses((status = 200, description = "Widget opened", body = SearchSnapshotResponse))
)]
pub async fn open_search(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> Json<SearchSnapshotResponse> {
    Json(search_service::open_search(&state, user.id).await)
}

#[utoipa::path(
    get,
    path = "/searches/{id}",
    tag = "search",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the widget")),
    responses(
        (status = 200, description = "Displayed results", body = SearchSnapshotResponse),
        (status = 404, description = "Unknown widget")
    )
)]
pub async fn get_search(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SearchSnapshotResponse>, AppError> {
    Ok(Json(search_service::get_search(&state, user.id, id).await?))
}

#[utoipa::path(
    delete,
    path = "/searches/{id}",
    tag = "search",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the widget")),
    responses((status = 204, description = "Widget closed"))
)]
pub async fn close_search(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    search_service::close_search(&state, user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a query; `applied` is false when a newer query overtook this one.
#[utoipa::path(
    post,
    path = "/searches/{id}/queries",
    tag = "search",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the widget")),
    request_body = SearchQueryRequest,
    responses(
        (status = 200, description = "Query completed", body = SearchOutcomeResponse),
        (status = 502, description = "Catalog returned an error"),
        (status = 503, description = "Catalog is busy")
    )
)]
pub async fn submit_query(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SearchQueryRequest>,
) -> Result<Json<SearchOutcomeResponse>, AppError> {
    Ok(Json(
        search_service::submit_query(&state, user.id, id, payload).await?,
    ))
}
