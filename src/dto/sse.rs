use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{search::SearchSnapshotResponse, session::SessionResponse};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First event of a live feed: the sessions where the user is a player.
pub struct SessionsSnapshotEvent {
    pub user_id: Uuid,
    pub sessions: Vec<SessionResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast when a session the user takes part in (or took part in) changed.
pub struct SessionUpdatedEvent(pub SessionResponse);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a session the user took part in was deleted.
pub struct SessionDeletedEvent {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Pushed when one of the user's search widgets displays new results.
pub struct SearchResultsEvent(pub SearchSnapshotResponse);

#[derive(Debug, Serialize, ToSchema)]
/// Authentication state change of the feed owner.
pub struct AuthStateEvent {
    pub user_id: Uuid,
    pub signed_in: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
