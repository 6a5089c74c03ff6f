use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Tabletop Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::sign_up,
        crate::routes::auth::sign_in,
        crate::routes::auth::sign_out,
        crate::routes::auth::me,
        crate::routes::users::get_profile,
        crate::routes::users::update_profile,
        crate::routes::users::list_friends,
        crate::routes::users::add_friend,
        crate::routes::users::remove_friend,
        crate::routes::users::get_user,
        crate::routes::catalog::search,
        crate::routes::catalog::game,
        crate::routes::search::open_search,
        crate::routes::search::get_search,
        crate::routes::search::close_search,
        crate::routes::search::submit_query,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::create_session,
        crate::routes::sessions::get_session,
        crate::routes::sessions::update_session,
        crate::routes::sessions::delete_session,
        crate::routes::sessions::join_session,
        crate::routes::sessions::leave_session,
        crate::routes::sessions::add_participant,
        crate::routes::sessions::set_participant_roles,
        crate::routes::sessions::remove_participant,
        crate::routes::sessions::transfer_ownership,
        crate::routes::sse::user_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::auth::SignUpRequest,
            crate::dto::auth::SignInRequest,
            crate::dto::auth::AuthResponse,
            crate::dto::user::UserProfile,
            crate::dto::user::PublicProfile,
            crate::dto::user::UpdateProfileRequest,
            crate::dto::user::AddFriendRequest,
            crate::dto::catalog::CatalogGameResponse,
            crate::services::match_resolver::CatalogMatch,
            crate::dto::search::SearchQueryRequest,
            crate::dto::search::DisplayedResultsResponse,
            crate::dto::search::SearchSnapshotResponse,
            crate::dto::search::SearchOutcomeResponse,
            crate::dto::session::RoleName,
            crate::dto::session::SessionRoleFilter,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::UpdateSessionRequest,
            crate::dto::session::AddParticipantRequest,
            crate::dto::session::SetRolesRequest,
            crate::dto::session::TransferOwnershipRequest,
            crate::dto::session::SessionResponse,
            crate::dto::sse::SessionsSnapshotEvent,
            crate::dto::sse::SessionUpdatedEvent,
            crate::dto::sse::SessionDeletedEvent,
            crate::dto::sse::SearchResultsEvent,
            crate::dto::sse::AuthStateEvent,
            crate::dto::sse::SystemStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Sign-up, sign-in and session tokens"),
        (name = "users", description = "Profiles and friends"),
        (name = "catalog", description = "External board-game catalog"),
        (name = "search", description = "Sequenced search widgets"),
        (name = "sessions", description = "Game sessions, participants and roles"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/auth/sign-up",
            "/me/friends/{id}",
            "/catalog/search",
            "/searches/{id}/queries",
            "/sessions/{id}/participants/{user_id}/roles",
            "/sse/me",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
