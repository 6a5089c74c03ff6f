//! Business logic behind the `/sessions` routes: lifecycle, membership and ownership.
//!
//! Every write reads the current document, applies its change in memory, re-validates and
//! stores it with a compare-and-swap on the revision. A concurrent write surfaces as a
//! conflict. Participants before and after the change are notified on their live feeds.

use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameSessionEntity, MemberRole, MembershipFilter},
    dto::{
        parse_timestamp,
        session::{
            AddParticipantRequest, CreateSessionRequest, SessionResponse, SetRolesRequest,
            UpdateSessionRequest,
        },
        validation::{MAX_PLAYERS, validate_player_range},
    },
    error::ServiceError,
    services::{roles, sse_events},
    state::SharedState,
};

fn check_player_range(min: Option<u32>, max: Option<u32>) -> Result<(), ServiceError> {
    validate_player_range(min, max).map_err(|err| ServiceError::InvalidInput(err.to_string()))
}

/// Catalog player counts outside what a session accepts are treated as unknown.
fn plausible_player_count(count: Option<u32>) -> Option<u32> {
    count.filter(|count| (1..=MAX_PLAYERS).contains(count))
}

fn parse_scheduled_time(value: Option<&str>) -> Result<Option<SystemTime>, ServiceError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse_timestamp("scheduled_time", value))
        .transpose()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("game session `{id}` not found"))
}

fn merge_audience(mut before: Vec<Uuid>, after: Vec<Uuid>) -> Vec<Uuid> {
    for user in after {
        if !before.contains(&user) {
            before.push(user);
        }
    }
    before
}

async fn load_session(state: &SharedState, id: Uuid) -> Result<GameSessionEntity, ServiceError> {
    let store = state.require_session_store().await?;
    store.find_session(id).await?.ok_or_else(|| not_found(id))
}

/// Load, mutate, store and broadcast a session.
async fn mutate_session<F>(
    state: &SharedState,
    id: Uuid,
    change: F,
) -> Result<SessionResponse, ServiceError>
where
    F: FnOnce(&mut GameSessionEntity) -> Result<(), ServiceError>,
{
    let store = state.require_session_store().await?;
    let mut session = store.find_session(id).await?.ok_or_else(|| not_found(id))?;
    let before = session.participants();

    change(&mut session)?;
    session.updated_at = SystemTime::now();

    let saved = store.save_session(session).await?;
    let audience = merge_audience(before, saved.participants());
    let response = SessionResponse::from(saved);
    sse_events::broadcast_session_updated(state, audience, &response);
    Ok(response)
}

/// Create a session owned by `actor`, filling a blank title or missing player counts from
/// the catalog.
pub async fn create_session(
    state: &SharedState,
    actor: Uuid,
    payload: CreateSessionRequest,
) -> Result<SessionResponse, ServiceError> {
    payload.validate()?;
    check_player_range(payload.min_players, payload.max_players)?;
    let scheduled_time = parse_scheduled_time(payload.scheduled_time.as_deref())?;
    let store = state.require_session_store().await?;

    let catalog_id = payload.catalog_id.trim().to_owned();
    let mut title = non_blank(payload.title);
    let mut min_players = payload.min_players;
    let mut max_players = payload.max_players;

    if title.is_none() || min_players.is_none() || max_players.is_none() {
        let details = state
            .catalog()
            .details(&catalog_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("unknown catalog game `{catalog_id}`"))
            })?;
        debug!(%catalog_id, "filled session defaults from catalog");
        title = title.or(non_blank(Some(details.title)));
        min_players = min_players.or(plausible_player_count(details.min_players));
        max_players = max_players.or(plausible_player_count(details.max_players));
        check_player_range(min_players, max_players)?;
    }

    let title = title.ok_or_else(|| ServiceError::InvalidInput("title is required".into()))?;
    let now = SystemTime::now();
    let session = GameSessionEntity {
        id: Uuid::new_v4(),
        title,
        location: non_blank(payload.location),
        scheduled_time,
        catalog_id,
        min_players,
        max_players,
        creator: actor,
        owner: actor,
        hosts: vec![actor],
        players: vec![actor],
        teachers: Vec::new(),
        created_at: now,
        updated_at: now,
        revision: 0,
    };

    let saved = store.save_session(session).await?;
    info!(session = %saved.id, owner = %actor, "game session created");
    let audience = saved.participants();
    let response = SessionResponse::from(saved);
    sse_events::broadcast_session_updated(state, audience, &response);
    Ok(response)
}

pub async fn get_session(state: &SharedState, id: Uuid) -> Result<SessionResponse, ServiceError> {
    Ok(load_session(state, id).await?.into())
}

/// Sessions of `user` matching `filter`, most recently scheduled first.
pub async fn list_sessions(
    state: &SharedState,
    user: Uuid,
    filter: MembershipFilter,
) -> Result<Vec<SessionResponse>, ServiceError> {
    let store = state.require_session_store().await?;
    let sessions = store.list_sessions_for_member(user, filter).await?;
    Ok(sessions.into_iter().map(SessionResponse::from).collect())
}

/// Patch a session; only the owner and hosts may edit.
pub async fn update_session(
    state: &SharedState,
    actor: Uuid,
    id: Uuid,
    payload: UpdateSessionRequest,
) -> Result<SessionResponse, ServiceError> {
    payload.validate()?;
    let scheduled_time = parse_scheduled_time(payload.scheduled_time.as_deref())?;

    mutate_session(state, id, |session| {
        roles::ensure_manager(session, actor)?;

        let min_players = payload.min_players.or(session.min_players);
        let max_players = payload.max_players.or(session.max_players);
        check_player_range(min_players, max_players)?;
        if let Some(max) = max_players {
            if session.players.len() > max as usize {
                return Err(ServiceError::Conflict(format!(
                    "session already has {} players, more than {max}",
                    session.players.len()
                )));
            }
        }

        if let Some(title) = payload.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ServiceError::InvalidInput("title must not be blank".into()));
            }
            session.title = title.to_owned();
        }
        if let Some(location) = payload.location {
            session.location = non_blank(Some(location));
        }
        if scheduled_time.is_some() {
            session.scheduled_time = scheduled_time;
        }
        session.min_players = min_players;
        session.max_players = max_players;
        Ok(())
    })
    .await
}

/// Delete a session; owner only.
pub async fn delete_session(state: &SharedState, actor: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    let session = store.find_session(id).await?.ok_or_else(|| not_found(id))?;
    roles::ensure_owner(&session, actor)?;

    if !store.delete_session(id).await? {
        return Err(not_found(id));
    }
    info!(session = %id, "game session deleted");
    sse_events::broadcast_session_deleted(state, session.participants(), id);
    Ok(())
}

pub async fn join_session(
    state: &SharedState,
    actor: Uuid,
    id: Uuid,
) -> Result<SessionResponse, ServiceError> {
    mutate_session(state, id, |session| Ok(roles::join(session, actor)?)).await
}

pub async fn leave_session(
    state: &SharedState,
    actor: Uuid,
    id: Uuid,
) -> Result<SessionResponse, ServiceError> {
    mutate_session(state, id, |session| Ok(roles::leave(session, actor)?)).await
}

/// Add an existing user with the given roles; owner or host only.
pub async fn add_participant(
    state: &SharedState,
    actor: Uuid,
    id: Uuid,
    payload: AddParticipantRequest,
) -> Result<SessionResponse, ServiceError> {
    payload.validate()?;
    let store = state.require_session_store().await?;
    if store.find_user(payload.user_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "user `{}` not found",
            payload.user_id
        )));
    }

    let wanted: Vec<MemberRole> = payload.roles.into_iter().map(MemberRole::from).collect();
    mutate_session(state, id, |session| {
        roles::ensure_manager(session, actor)?;
        Ok(roles::add_participant(session, payload.user_id, &wanted)?)
    })
    .await
}

pub async fn set_participant_roles(
    state: &SharedState,
    actor: Uuid,
    id: Uuid,
    user: Uuid,
    payload: SetRolesRequest,
) -> Result<SessionResponse, ServiceError> {
    payload.validate()?;
    let wanted: Vec<MemberRole> = payload.roles.into_iter().map(MemberRole::from).collect();
    mutate_session(state, id, |session| {
        roles::ensure_manager(session, actor)?;
        Ok(roles::set_roles(session, user, &wanted)?)
    })
    .await
}

pub async fn remove_participant(
    state: &SharedState,
    actor: Uuid,
    id: Uuid,
    user: Uuid,
) -> Result<SessionResponse, ServiceError> {
    mutate_session(state, id, |session| {
        roles::ensure_manager(session, actor)?;
        Ok(roles::remove_participant(session, user)?)
    })
    .await
}

/// Hand the session over to another participant; owner only.
pub async fn transfer_ownership(
    state: &SharedState,
    actor: Uuid,
    id: Uuid,
    new_owner: Uuid,
) -> Result<SessionResponse, ServiceError> {
    mutate_session(state, id, |session| {
        roles::ensure_owner(session, actor)?;
        Ok(roles::transfer_ownership(session, new_owner)?)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::{catalog::CatalogDetails, models::UserEntity},
        dto::session::RoleName,
        state::test_support::{FakeCatalog, state_with},
    };

    fn catan() -> CatalogDetails {
        CatalogDetails {
            id: "13".into(),
            title: "Catan".into(),
            min_players: Some(3),
            max_players: Some(4),
            ..CatalogDetails::default()
        }
    }

    fn create_request() -> CreateSessionRequest {
        CreateSessionRequest {
            catalog_id: "13".into(),
            title: None,
            location: Some("Game café".into()),
            scheduled_time: Some("2026-11-14T19:00:00Z".into()),
            min_players: None,
            max_players: None,
        }
    }

    async fn register(state: &SharedState, name: &str) -> Uuid {
        let store = state.require_session_store().await.unwrap();
        store
            .save_user(UserEntity::new(
                name.into(),
                format!("{}@example.com", name.to_lowercase()),
            ))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_fills_missing_fields_from_catalog() {
        let catalog = FakeCatalog::with_details(vec![catan()]);
        let state = state_with(catalog.clone()).await;
        let owner = register(&state, "Ada").await;

        let session = create_session(&state, owner, create_request()).await.unwrap();

        assert_eq!(session.title, "Catan");
        assert_eq!(session.min_players, Some(3));
        assert_eq!(session.max_players, Some(4));
        assert_eq!(session.creator, owner);
        assert_eq!(session.owner, owner);
        assert_eq!(session.hosts, vec![owner]);
        assert_eq!(session.players, vec![owner]);
        assert_eq!(session.revision, 1);
        assert_eq!(session.scheduled_time.as_deref(), Some("2026-11-14T19:00:00Z"));
        assert_eq!(catalog.call_count(), 1);
    }

    #[tokio::test]
    async fn implausible_catalog_counts_are_ignored() {
        let mut details = catan();
        details.min_players = Some(0);
        details.max_players = Some(999);
        let state = state_with(FakeCatalog::with_details(vec![details])).await;
        let owner = register(&state, "Ada").await;

        let session = create_session(&state, owner, create_request()).await.unwrap();

        assert_eq!(session.title, "Catan");
        assert_eq!(session.min_players, None);
        assert_eq!(session.max_players, None);
    }

    #[tokio::test]
    async fn complete_requests_skip_the_catalog() {
        let catalog = FakeCatalog::default();
        let state = state_with(catalog.clone()).await;
        let owner = register(&state, "Ada").await;

        let mut request = create_request();
        request.title = Some("Friday night".into());
        request.min_players = Some(2);
        request.max_players = Some(6);
        let session = create_session(&state, owner, request).await.unwrap();

        assert_eq!(session.title, "Friday night");
        assert_eq!(catalog.call_count(), 0);
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_before_writing() {
        let state = state_with(FakeCatalog::with_details(vec![catan()])).await;
        let owner = register(&state, "Ada").await;

        let mut inverted = create_request();
        inverted.min_players = Some(5);
        inverted.max_players = Some(2);
        assert!(matches!(
            create_session(&state, owner, inverted).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let mut unknown = create_request();
        unknown.catalog_id = "999".into();
        assert!(matches!(
            create_session(&state, owner, unknown).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let mut bad_time = create_request();
        bad_time.scheduled_time = Some("tomorrow".into());
        assert!(matches!(
            create_session(&state, owner, bad_time).await,
            Err(ServiceError::InvalidInput(_))
        ));

        assert!(
            list_sessions(&state, owner, MembershipFilter::Owner)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn catalog_failure_abandons_creation() {
        let catalog = FakeCatalog::with_details(vec![catan()]);
        catalog.set_busy(true);
        let state = state_with(catalog).await;
        let owner = register(&state, "Ada").await;

        assert!(matches!(
            create_session(&state, owner, create_request()).await,
            Err(ServiceError::Catalog(_))
        ));
        assert!(
            list_sessions(&state, owner, MembershipFilter::Owner)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn joining_leaving_and_capacity() {
        let state = state_with(FakeCatalog::with_details(vec![catan()])).await;
        let owner = register(&state, "Ada").await;
        let mut request = create_request();
        request.max_players = Some(3);
        let session = create_session(&state, owner, request).await.unwrap();

        let mut guests = Vec::new();
        for name in ["Bob", "Cy", "Di"] {
            let guest = register(&state, name).await;
            guests.push(guest);
        }
        join_session(&state, guests[0], session.id).await.unwrap();
        join_session(&state, guests[1], session.id).await.unwrap();
        let full = join_session(&state, guests[2], session.id).await;
        assert!(matches!(full, Err(ServiceError::Conflict(_))));
        assert!(matches!(
            join_session(&state, guests[0], session.id).await,
            Err(ServiceError::Conflict(_))
        ));

        let after_leave = leave_session(&state, guests[0], session.id).await.unwrap();
        assert_eq!(after_leave.players, vec![owner, guests[1]]);
        assert!(matches!(
            leave_session(&state, owner, session.id).await,
            Err(ServiceError::Conflict(_))
        ));

        let playing = list_sessions(&state, guests[1], MembershipFilter::Role(MemberRole::Player))
            .await
            .unwrap();
        assert_eq!(playing.len(), 1);
    }

    #[tokio::test]
    async fn only_managers_edit_and_only_owner_deletes() {
        let state = state_with(FakeCatalog::with_details(vec![catan()])).await;
        let owner = register(&state, "Ada").await;
        let host = register(&state, "Bob").await;
        let player = register(&state, "Cy").await;
        let session = create_session(&state, owner, create_request()).await.unwrap();

        add_participant(
            &state,
            owner,
            session.id,
            AddParticipantRequest {
                user_id: host,
                roles: vec![RoleName::Host],
            },
        )
        .await
        .unwrap();
        join_session(&state, player, session.id).await.unwrap();

        let patch = || UpdateSessionRequest {
            title: Some("Catan league".into()),
            ..UpdateSessionRequest::default()
        };
        assert!(matches!(
            update_session(&state, player, session.id, patch()).await,
            Err(ServiceError::Forbidden(_))
        ));
        let updated = update_session(&state, host, session.id, patch()).await.unwrap();
        assert_eq!(updated.title, "Catan league");
        assert_eq!(updated.location.as_deref(), Some("Game café"));

        assert!(matches!(
            delete_session(&state, host, session.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        delete_session(&state, owner, session.id).await.unwrap();
        assert!(matches!(
            get_session(&state, session.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_revalidates_merged_player_range() {
        let state = state_with(FakeCatalog::with_details(vec![catan()])).await;
        let owner = register(&state, "Ada").await;
        let session = create_session(&state, owner, create_request()).await.unwrap();

        let patch = UpdateSessionRequest {
            min_players: Some(5),
            ..UpdateSessionRequest::default()
        };
        assert!(matches!(
            update_session(&state, owner, session.id, patch).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(get_session(&state, session.id).await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn roles_and_ownership_transfer() {
        let state = state_with(FakeCatalog::with_details(vec![catan()])).await;
        let owner = register(&state, "Ada").await;
        let teacher = register(&state, "Bob").await;
        let session = create_session(&state, owner, create_request()).await.unwrap();

        assert!(matches!(
            add_participant(
                &state,
                owner,
                session.id,
                AddParticipantRequest {
                    user_id: Uuid::new_v4(),
                    roles: vec![RoleName::Player],
                },
            )
            .await,
            Err(ServiceError::NotFound(_))
        ));

        add_participant(
            &state,
            owner,
            session.id,
            AddParticipantRequest {
                user_id: teacher,
                roles: vec![RoleName::Teacher],
            },
        )
        .await
        .unwrap();

        let updated = set_participant_roles(
            &state,
            owner,
            session.id,
            teacher,
            SetRolesRequest {
                roles: vec![RoleName::Teacher, RoleName::Host],
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.hosts, vec![owner, teacher]);
        assert_eq!(updated.teachers, vec![teacher]);

        assert!(matches!(
            transfer_ownership(&state, teacher, session.id, teacher).await,
            Err(ServiceError::Forbidden(_))
        ));
        let transferred = transfer_ownership(&state, owner, session.id, teacher)
            .await
            .unwrap();
        assert_eq!(transferred.owner, teacher);
        assert_eq!(transferred.creator, owner);

        assert!(matches!(
            remove_participant(&state, owner, session.id, teacher).await,
            Err(ServiceError::Conflict(_))
        ));
        let removed = remove_participant(&state, teacher, session.id, owner)
            .await
            .unwrap();
        assert!(!removed.players.contains(&owner));
        assert!(!removed.hosts.contains(&owner));
    }

    #[tokio::test]
    async fn changes_reach_old_and_new_participants() {
        let state = state_with(FakeCatalog::with_details(vec![catan()])).await;
        let owner = register(&state, "Ada").await;
        let guest = register(&state, "Bob").await;
        let session = create_session(&state, owner, create_request()).await.unwrap();
        join_session(&state, guest, session.id).await.unwrap();

        let mut feed = state.feed().subscribe();
        leave_session(&state, guest, session.id).await.unwrap();

        let event = feed.recv().await.unwrap();
        assert_eq!(event.event.event.as_deref(), Some("session.updated"));
        assert!(event.audience.includes(owner));
        assert!(event.audience.includes(guest));
    }
}
