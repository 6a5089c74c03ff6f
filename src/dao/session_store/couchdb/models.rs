use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::dao::{
    models::{CredentialEntity, GameSessionEntity, UserEntity},
    session_store::couchdb::error::CouchDaoError,
};

pub const USER_PREFIX: &str = "user::";
pub const SESSION_PREFIX: &str = "session::";
pub const CREDENTIAL_PREFIX: &str = "credential::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

/// Row of an `_all_docs` response. Rows for unknown keys carry an `error` and no `doc`.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Response of the Mango `_find` endpoint.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
}

/// Minimal view of a stored document used to check revisions before a write.
#[derive(Debug, Deserialize)]
pub struct RevisionProbe {
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(default)]
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub user: UserBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBody {
    pub name: String,
    pub email: String,
    pub friends: Vec<Uuid>,
    pub created_at: SystemTime,
    pub revision: u64,
}

impl From<(UserEntity, Option<String>)> for CouchUserDocument {
    fn from((user, rev): (UserEntity, Option<String>)) -> Self {
        Self {
            id: user_doc_id(user.id),
            rev,
            user: UserBody {
                name: user.name,
                email: user.email,
                friends: user.friends,
                created_at: user.created_at,
                revision: user.revision,
            },
        }
    }
}

impl TryFrom<CouchUserDocument> for UserEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchUserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            name: doc.user.name,
            email: doc.user.email,
            friends: doc.user.friends,
            created_at: doc.user.created_at,
            revision: doc.user.revision,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub session: SessionBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBody {
    pub title: String,
    pub location: Option<String>,
    pub scheduled_time: Option<SystemTime>,
    pub catalog_id: String,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub creator: Uuid,
    pub owner: Uuid,
    pub hosts: Vec<Uuid>,
    pub players: Vec<Uuid>,
    pub teachers: Vec<Uuid>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub revision: u64,
}

impl From<(GameSessionEntity, Option<String>)> for CouchSessionDocument {
    fn from((session, rev): (GameSessionEntity, Option<String>)) -> Self {
        Self {
            id: session_doc_id(session.id),
            rev,
            session: SessionBody {
                title: session.title,
                location: session.location,
                scheduled_time: session.scheduled_time,
                catalog_id: session.catalog_id,
                min_players: session.min_players,
                max_players: session.max_players,
                creator: session.creator,
                owner: session.owner,
                hosts: session.hosts,
                players: session.players,
                teachers: session.teachers,
                created_at: session.created_at,
                updated_at: session.updated_at,
                revision: session.revision,
            },
        }
    }
}

impl TryFrom<CouchSessionDocument> for GameSessionEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchSessionDocument) -> Result<Self, Self::Error> {
        let body = doc.session;
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            title: body.title,
            location: body.location,
            scheduled_time: body.scheduled_time,
            catalog_id: body.catalog_id,
            min_players: body.min_players,
            max_players: body.max_players,
            creator: body.creator,
            owner: body.owner,
            hosts: body.hosts,
            players: body.players,
            teachers: body.teachers,
            created_at: body.created_at,
            updated_at: body.updated_at,
            revision: body.revision,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchCredentialDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub credential: CredentialEntity,
}

impl From<CredentialEntity> for CouchCredentialDocument {
    fn from(credential: CredentialEntity) -> Self {
        Self {
            id: credential_doc_id(&credential.email),
            rev: None,
            credential,
        }
    }
}

pub fn user_doc_id(id: Uuid) -> String {
    format!("{}{}", USER_PREFIX, id)
}

pub fn session_doc_id(id: Uuid) -> String {
    format!("{}{}", SESSION_PREFIX, id)
}

/// Credentials are keyed by a digest of the email so arbitrary addresses stay URL safe.
pub fn credential_doc_id(email: &str) -> String {
    format!("{}{:x}", CREDENTIAL_PREFIX, Sha256::digest(email.as_bytes()))
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}
