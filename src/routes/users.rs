use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::user::{AddFriendRequest, PublicProfile, UpdateProfileRequest, UserProfile},
    error::AppError,
    routes::auth::{CurrentUser, require_user},
    services::user_service,
    state::SharedState,
};

/// Profile and friends endpoints of the signed-in user.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/me", get(get_profile).put(update_profile))
        .route("/me/friends", get(list_friends).post(add_friend))
        .route("/me/friends/{id}", delete(remove_friend))
        .route("/users/{id}", get(get_user))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "users",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    responses((status = 200, description = "Own profile", body = UserProfile))
)]
pub async fn get_profile(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(user_service::get_profile(&state, user.id).await?))
}

#[utoipa::path(
    put,
    path = "/me",
    tag = "users",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Invalid name")
    )
)]
pub async fn update_profile(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        user_service::update_profile(&state, user.id, payload).await?,
    ))
}

/// Friends of the caller, in the order they were added.
#[utoipa::path(
    get,
    path = "/me/friends",
    tag = "users",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    responses((status = 200, description = "Friends list", body = [UserProfile]))
)]
pub async fn list_friends(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    Ok(Json(user_service::list_friends(&state, user.id).await?))
}

/// Add a registered user to the caller's friends by email.
#[utoipa::path(
    post,
    path = "/me/friends",
    tag = "users",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    request_body = AddFriendRequest,
    responses(
        (status = 200, description = "Friend added", body = UserProfile),
        (status = 404, description = "No user with this email"),
        (status = 409, description = "Already a friend")
    )
)]
pub async fn add_friend(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<AddFriendRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(user_service::add_friend(&state, user.id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/me/friends/{id}",
    tag = "users",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the friend to remove")),
    responses((status = 204, description = "Friend removed"))
)]
pub async fn remove_friend(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user_service::remove_friend(&state, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public profile of any user.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in"),
    ("id" = String, Path, description = "Identifier of the user")),
    responses(
        (status = 200, description = "Public profile", body = PublicProfile),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicProfile>, AppError> {
    Ok(Json(user_service::get_public_profile(&state, id).await?))
}
