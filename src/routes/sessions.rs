use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::session::{
        AddParticipantRequest, CreateSessionRequest, SessionListParams, SessionResponse,
        SetRolesRequest, TransferOwnershipRequest, UpdateSessionRequest,
    },
    error::AppError,
    routes::auth::{CurrentUser, require_user},
    services::session_service,
    state::SharedState,
};

/// Game session lifecycle, membership and ownership endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route(
            "/sessions/{id}",
            get(get_session)
                .patch(update_session)
                .delete(delete_session),
        )
        .route("/sessions/{id}/join", post(join_session))
        .route("/sessions/{id}/leave", post(leave_session))
        .route("/sessions/{id}/participants", post(add_participant))
        .route(
            "/sessions/{id}/participants/{user_id}/roles",
            put(set_participant_roles),
        )
        .route(
            "/sessions/{id}/participants/{user_id}",
            delete(remove_participant),
        )
        .route("/sessions/{id}/owner", put(transfer_ownership))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}

/// Sessions of the caller filtered by membership (`player` by default).
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    SessionListParams),
    responses((status = 200, description = "Sessions, most recently scheduled first", body = [SessionResponse]))
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<SessionListParams>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    Ok(Json(
        session_service::list_sessions(&state, user.id, params.role.into()).await?,
    ))
}

/// Schedule a new session; the caller becomes its owner, host and first player.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Invalid input or unknown catalog game"),
        (status = 503, description = "Storage or catalog unavailable")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(
        session_service::create_session(&state, user.id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Session", body = SessionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(session_service::get_session(&state, id).await?))
}

#[utoipa::path(
    patch,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session")),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = SessionResponse),
        (status = 403, description = "Caller is neither owner nor host"),
        (status = 409, description = "Concurrent modification")
    )
)]
pub async fn update_session(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(
        session_service::update_session(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session_service::delete_session(&state, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/join",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Joined as player", body = SessionResponse),
        (status = 409, description = "Already a participant or session full")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(session_service::join_session(&state, user.id, id).await?))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/leave",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Left the session", body = SessionResponse),
        (status = 409, description = "The owner must transfer ownership first")
    )
)]
pub async fn leave_session(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(
        session_service::leave_session(&state, user.id, id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/participants",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session")),
    request_body = AddParticipantRequest,
    responses(
        (status = 200, description = "Participant added", body = SessionResponse),
        (status = 404, description = "Unknown session or user")
    )
)]
pub async fn add_participant(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddParticipantRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(
        session_service::add_participant(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/participants/{user_id}/roles",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session"),
    ("user_id" = String, Path, description = "Participant whose roles are replaced")),
    request_body = SetRolesRequest,
    responses((status = 200, description = "Roles replaced", body = SessionResponse))
)]
pub async fn set_participant_roles(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SetRolesRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(
        session_service::set_participant_roles(&state, user.id, id, user_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}/participants/{user_id}",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session"),
    ("user_id" = String, Path, description = "Participant to remove")),
    responses(
        (status = 200, description = "Participant removed", body = SessionResponse),
        (status = 409, description = "The owner cannot be removed")
    )
)]
pub async fn remove_participant(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(
        session_service::remove_participant(&state, user.id, id, user_id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/owner",
    tag = "sessions",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the session")),
    request_body = TransferOwnershipRequest,
    responses(
        (status = 200, description = "Ownership transferred", body = SessionResponse),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn transfer_ownership(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferOwnershipRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(
        session_service::transfer_ownership(&state, user.id, id, payload.user_id).await?,
    ))
}
