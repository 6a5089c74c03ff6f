use axum::{
    Extension, Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        auth::{AuthResponse, SignInRequest, SignUpRequest},
        user::UserProfile,
    },
    error::AppError,
    services::auth_service,
    state::SharedState,
};

const SESSION_TOKEN_HEADER: &str = "x-session-token";
/// Query parameter accepted where clients cannot set headers (`EventSource`).
const SESSION_TOKEN_QUERY: &str = "token";

/// Signed-in caller, inserted by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub token: String,
}

/// Account endpoints; sign-up and sign-in are public, the rest need a session token.
pub fn router(state: SharedState) -> Router<SharedState> {
    let protected = Router::new()
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_user));

    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .merge(protected)
}

/// Register a new account and return a session token.
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn sign_up(
    State(state): State<SharedState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(auth_service::sign_up(&state, payload).await?))
}

/// Exchange email and password for a session token.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn sign_in(
    State(state): State<SharedState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(auth_service::sign_in(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/auth/sign-out",
    tag = "auth",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    responses((status = 204, description = "Token revoked"))
)]
pub async fn sign_out(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode, AppError> {
    auth_service::sign_out(&state, &user.token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Profile of the signed-in user.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    params(("X-Session-Token" = String, Header, description = "Token issued at sign-in")),
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unknown session token")
    )
)]
pub async fn me(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(auth_service::current_user(&state, user.id).await?))
}

fn token_from_query(req: &Request<Body>) -> Option<String> {
    req.uri().query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == SESSION_TOKEN_QUERY && !value.is_empty()).then(|| value.to_owned())
    })
}

/// Resolve the session token of the request and expose the caller as [`CurrentUser`].
pub async fn require_user(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_owned())
        .or_else(|| token_from_query(&req))
        .ok_or_else(|| {
            AppError::Unauthorized("missing session token header `X-Session-Token`".into())
        })?;

    let id = auth_service::authenticate(&state, &token)?;
    req.extensions_mut().insert(CurrentUser { id, token });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_can_come_from_the_query_string() {
        let req = Request::builder()
            .uri("/sse/me?foo=bar&token=abc123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(token_from_query(&req).as_deref(), Some("abc123"));

        let req = Request::builder()
            .uri("/sse/me?token=")
            .body(Body::empty())
            .unwrap();
        assert_eq!(token_from_query(&req), None);
    }
}
