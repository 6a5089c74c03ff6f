/// Email/password identity and session tokens.
pub mod auth_service;
/// One-shot catalog search and game details.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Ranking of catalog candidates against a query.
pub mod match_resolver;
/// Membership rules of a game session.
pub mod roles;
/// Sequenced search widgets.
pub mod search_service;
/// Game session lifecycle and participants.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events subscription service.
pub mod sse_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;
/// Profiles and friends lists.
pub mod user_service;
