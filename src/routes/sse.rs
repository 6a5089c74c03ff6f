use std::convert::Infallible;

use axum::{
    Extension, Router,
    extract::State,
    middleware,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    routes::auth::{CurrentUser, require_user},
    services::sse_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/me",
    tag = "sse",
    params(
        ("X-Session-Token" = Option<String>, Header, description = "Token issued at sign-in"),
        ("token" = Option<String>, Query, description = "Token for clients that cannot set headers")
    ),
    responses(
        (status = 200, description = "Live feed of the signed-in user", content_type = "text/event-stream", body = String),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Stream session, search and auth events addressed to the caller, starting with a
/// snapshot of the sessions they play in.
pub async fn user_stream(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_feed(&state, user.id).await?;
    info!(user = %user.id, "new live feed connection");
    Ok(sse_service::to_sse_stream(subscription))
}

/// Configure the SSE endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/me", get(user_stream))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}
