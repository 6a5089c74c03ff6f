use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

pub mod auth;
pub mod catalog;
pub mod health;
pub mod search;
pub mod sessions;
pub mod sse;
pub mod users;

/// Swagger UI at `/docs`, backed by the generated OpenAPI document.
fn docs_router() -> Router<SharedState> {
    SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into()
}

/// Compose all route trees and wire in the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(auth::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(catalog::router())
        .merge(search::router(state.clone()))
        .merge(sessions::router(state.clone()))
        .merge(sse::router(state.clone()))
        .merge(docs_router())
        .with_state(state)
}
