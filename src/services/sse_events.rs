use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        search::SearchSnapshotResponse,
        session::SessionResponse,
        sse::{
            AuthStateEvent, SearchResultsEvent, ServerEvent, SessionDeletedEvent,
            SessionUpdatedEvent, SessionsSnapshotEvent, SystemStatus,
        },
    },
    state::{Audience, SharedState},
};

pub const EVENT_SESSIONS_SNAPSHOT: &str = "sessions.snapshot";
const EVENT_SESSION_UPDATED: &str = "session.updated";
const EVENT_SESSION_DELETED: &str = "session.deleted";
const EVENT_SEARCH_RESULTS: &str = "search.results";
const EVENT_SIGNED_IN: &str = "auth.signed_in";
const EVENT_SIGNED_OUT: &str = "auth.signed_out";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Notify every user who was or is a participant that `session` changed.
pub fn broadcast_session_updated(
    state: &SharedState,
    audience: Vec<Uuid>,
    session: &SessionResponse,
) {
    send_event(
        state,
        Audience::Users(audience),
        EVENT_SESSION_UPDATED,
        &SessionUpdatedEvent(session.clone()),
    );
}

/// Notify former participants that a session is gone.
pub fn broadcast_session_deleted(state: &SharedState, audience: Vec<Uuid>, session_id: Uuid) {
    send_event(
        state,
        Audience::Users(audience),
        EVENT_SESSION_DELETED,
        &SessionDeletedEvent { session_id },
    );
}

/// Push freshly displayed search results to the widget owner.
pub fn broadcast_search_results(
    state: &SharedState,
    owner: Uuid,
    snapshot: SearchSnapshotResponse,
) {
    send_event(
        state,
        Audience::user(owner),
        EVENT_SEARCH_RESULTS,
        &SearchResultsEvent(snapshot),
    );
}

pub fn broadcast_auth_state(state: &SharedState, user_id: Uuid, signed_in: bool) {
    let name = if signed_in {
        EVENT_SIGNED_IN
    } else {
        EVENT_SIGNED_OUT
    };
    send_event(
        state,
        Audience::user(user_id),
        name,
        &AuthStateEvent { user_id, signed_in },
    );
}

/// Broadcast the degraded flag to every connected feed.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(
        state,
        Audience::Everyone,
        EVENT_SYSTEM_STATUS,
        &SystemStatus { degraded },
    );
}

/// Initial feed event listing the sessions where `user_id` is a player.
pub fn sessions_snapshot_event(
    user_id: Uuid,
    sessions: Vec<SessionResponse>,
) -> Option<ServerEvent> {
    build_event(
        EVENT_SESSIONS_SNAPSHOT,
        &SessionsSnapshotEvent { user_id, sessions },
    )
}

fn send_event<T>(state: &SharedState, audience: Audience, name: &str, payload: &T)
where
    T: Serialize,
{
    if let Some(event) = build_event(name, payload) {
        state.feed().broadcast(audience, event);
    }
}

fn build_event<T>(name: &str, payload: &T) -> Option<ServerEvent>
where
    T: Serialize,
{
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialise SSE payload");
            None
        }
    }
}
