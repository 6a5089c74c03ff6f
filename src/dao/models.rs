use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Entity kinds used when reporting conflicts and missing documents.
pub const USER_ENTITY: &str = "user";
pub const SESSION_ENTITY: &str = "game session";
pub const CREDENTIAL_ENTITY: &str = "credential";

/// Registered user profile persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Normalized (trimmed, lowercased) email address.
    pub email: String,
    /// Users this user has added as friends, in insertion order.
    pub friends: Vec<Uuid>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Optimistic concurrency counter, `0` until first stored.
    pub revision: u64,
}

impl UserEntity {
    /// Build a fresh, not yet persisted user.
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            friends: Vec::new(),
            created_at: SystemTime::now(),
            revision: 0,
        }
    }
}

/// Password credential attached to a user, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialEntity {
    pub user_id: Uuid,
    pub email: String,
    /// Hex encoded random salt.
    pub salt: String,
    /// Hex encoded SHA-256 of salt followed by the password.
    pub password_hash: String,
}

/// Role lists a user can be a member of inside a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberRole {
    Host,
    Player,
    Teacher,
}

impl MemberRole {
    /// Every role, in the order roles are reported to clients.
    pub const ALL: [MemberRole; 3] = [MemberRole::Host, MemberRole::Player, MemberRole::Teacher];

    /// Name of the document field holding the member list for this role.
    pub fn field(self) -> &'static str {
        match self {
            MemberRole::Host => "hosts",
            MemberRole::Player => "players",
            MemberRole::Teacher => "teachers",
        }
    }
}

/// Membership filter used when listing the sessions of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipFilter {
    Role(MemberRole),
    Owner,
}

/// Scheduled board-game session persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    pub title: String,
    pub location: Option<String>,
    pub scheduled_time: Option<SystemTime>,
    /// Identifier of the game in the external catalog.
    pub catalog_id: String,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    /// User who created the session; never changes.
    pub creator: Uuid,
    /// User currently owning the session.
    pub owner: Uuid,
    pub hosts: Vec<Uuid>,
    pub players: Vec<Uuid>,
    pub teachers: Vec<Uuid>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    /// Optimistic concurrency counter, `0` until first stored.
    pub revision: u64,
}

impl GameSessionEntity {
    /// Borrow the member list backing `role`.
    pub fn members(&self, role: MemberRole) -> &Vec<Uuid> {
        match role {
            MemberRole::Host => &self.hosts,
            MemberRole::Player => &self.players,
            MemberRole::Teacher => &self.teachers,
        }
    }

    /// Mutably borrow the member list backing `role`.
    pub fn members_mut(&mut self, role: MemberRole) -> &mut Vec<Uuid> {
        match role {
            MemberRole::Host => &mut self.hosts,
            MemberRole::Player => &mut self.players,
            MemberRole::Teacher => &mut self.teachers,
        }
    }

    /// All distinct participants, hosts first, then players and teachers.
    pub fn participants(&self) -> Vec<Uuid> {
        let mut seen = Vec::new();
        for id in self.hosts.iter().chain(&self.players).chain(&self.teachers) {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }

    /// Whether the session matches a membership filter for `user`.
    pub fn matches(&self, user: Uuid, filter: MembershipFilter) -> bool {
        match filter {
            MembershipFilter::Role(role) => self.members(role).contains(&user),
            MembershipFilter::Owner => self.owner == user,
        }
    }
}
