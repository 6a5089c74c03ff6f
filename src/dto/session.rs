//! DTO definitions for game sessions and their participants.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{GameSessionEntity, MemberRole, MembershipFilter};

use super::format_system_time;

/// Role a participant holds inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Host,
    Player,
    Teacher,
}

impl From<RoleName> for MemberRole {
    fn from(value: RoleName) -> Self {
        match value {
            RoleName::Host => MemberRole::Host,
            RoleName::Player => MemberRole::Player,
            RoleName::Teacher => MemberRole::Teacher,
        }
    }
}

impl From<MemberRole> for RoleName {
    fn from(value: MemberRole) -> Self {
        match value {
            MemberRole::Host => RoleName::Host,
            MemberRole::Player => RoleName::Player,
            MemberRole::Teacher => RoleName::Teacher,
        }
    }
}

/// Membership used to filter `GET /sessions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionRoleFilter {
    #[default]
    Player,
    Host,
    Teacher,
    Owner,
}

impl From<SessionRoleFilter> for MembershipFilter {
    fn from(value: SessionRoleFilter) -> Self {
        match value {
            SessionRoleFilter::Player => MembershipFilter::Role(MemberRole::Player),
            SessionRoleFilter::Host => MembershipFilter::Role(MemberRole::Host),
            SessionRoleFilter::Teacher => MembershipFilter::Role(MemberRole::Teacher),
            SessionRoleFilter::Owner => MembershipFilter::Owner,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionListParams {
    /// Defaults to `player`.
    #[serde(default)]
    pub role: SessionRoleFilter,
}

/// Payload creating a session. Blank title or missing player counts are filled from the catalog.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1))]
    pub catalog_id: String,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub location: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub min_players: Option<u32>,
    #[serde(default)]
    pub max_players: Option<u32>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateSessionRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub scheduled_time: Option<String>,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddParticipantRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1))]
    pub roles: Vec<RoleName>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetRolesRequest {
    #[validate(length(min = 1))]
    pub roles: Vec<RoleName>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferOwnershipRequest {
    pub user_id: Uuid,
}

/// Session as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct SessionResponse {
    pub id: Uuid,
    pub title: String,
    pub location: Option<String>,
    pub scheduled_time: Option<String>,
    pub catalog_id: String,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub creator: Uuid,
    pub owner: Uuid,
    pub hosts: Vec<Uuid>,
    pub players: Vec<Uuid>,
    pub teachers: Vec<Uuid>,
    pub created_at: String,
    pub updated_at: String,
    pub revision: u64,
}

impl From<GameSessionEntity> for SessionResponse {
    fn from(session: GameSessionEntity) -> Self {
        Self {
            id: session.id,
            title: session.title,
            location: session.location,
            scheduled_time: session.scheduled_time.map(format_system_time),
            catalog_id: session.catalog_id,
            min_players: session.min_players,
            max_players: session.max_players,
            creator: session.creator,
            owner: session.owner,
            hosts: session.hosts,
            players: session.players,
            teachers: session.teachers,
            created_at: format_system_time(session.created_at),
            updated_at: format_system_time(session.updated_at),
            revision: session.revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_filter_defaults_to_player() {
        let params: SessionListParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.role, SessionRoleFilter::Player);
        assert_eq!(
            MembershipFilter::from(params.role),
            MembershipFilter::Role(MemberRole::Player)
        );

        let params: SessionListParams = serde_json::from_str(r#"{"role":"owner"}"#).unwrap();
        assert_eq!(MembershipFilter::from(params.role), MembershipFilter::Owner);
    }

    #[test]
    fn create_request_limits_text_lengths() {
        let request = CreateSessionRequest {
            catalog_id: "13".into(),
            title: Some("t".repeat(121)),
            location: None,
            scheduled_time: None,
            min_players: None,
            max_players: None,
        };
        assert!(request.validate().is_err());

        let request = CreateSessionRequest {
            catalog_id: String::new(),
            title: Some("Catan night".into()),
            location: None,
            scheduled_time: None,
            min_players: Some(3),
            max_players: Some(4),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn participant_roles_must_not_be_empty() {
        let request = SetRolesRequest { roles: Vec::new() };
        assert!(request.validate().is_err());
        let request = SetRolesRequest {
            roles: vec![RoleName::Teacher],
        };
        assert!(request.validate().is_ok());
    }
}
