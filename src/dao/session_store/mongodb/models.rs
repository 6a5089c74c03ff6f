use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{CredentialEntity, GameSessionEntity, UserEntity};

use super::error::MongoDaoError;

// Identifiers are stored as canonical UUID strings so filters built with `doc!` match the
// serialized documents exactly.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    friends: Vec<String>,
    created_at: DateTime,
    revision: i64,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            email: value.email,
            friends: value.friends.iter().map(Uuid::to_string).collect(),
            created_at: DateTime::from_system_time(value.created_at),
            revision: value.revision as i64,
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoUserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            name: value.name,
            email: value.email,
            friends: parse_ids(&value.friends)?,
            created_at: value.created_at.to_system_time(),
            revision: value.revision as u64,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    location: Option<String>,
    scheduled_time: Option<DateTime>,
    catalog_id: String,
    min_players: Option<i64>,
    max_players: Option<i64>,
    creator: String,
    owner: String,
    hosts: Vec<String>,
    players: Vec<String>,
    teachers: Vec<String>,
    created_at: DateTime,
    updated_at: DateTime,
    revision: i64,
}

impl From<GameSessionEntity> for MongoSessionDocument {
    fn from(value: GameSessionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            location: value.location,
            scheduled_time: value.scheduled_time.map(DateTime::from_system_time),
            catalog_id: value.catalog_id,
            min_players: value.min_players.map(i64::from),
            max_players: value.max_players.map(i64::from),
            creator: value.creator.to_string(),
            owner: value.owner.to_string(),
            hosts: value.hosts.iter().map(Uuid::to_string).collect(),
            players: value.players.iter().map(Uuid::to_string).collect(),
            teachers: value.teachers.iter().map(Uuid::to_string).collect(),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            revision: value.revision as i64,
        }
    }
}

impl TryFrom<MongoSessionDocument> for GameSessionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSessionDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            title: value.title,
            location: value.location,
            scheduled_time: value.scheduled_time.map(DateTime::to_system_time),
            catalog_id: value.catalog_id,
            min_players: value.min_players.map(|count| count as u32),
            max_players: value.max_players.map(|count| count as u32),
            creator: parse_id(&value.creator)?,
            owner: parse_id(&value.owner)?,
            hosts: parse_ids(&value.hosts)?,
            players: parse_ids(&value.players)?,
            teachers: parse_ids(&value.teachers)?,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            revision: value.revision as u64,
        })
    }
}

/// Credentials use the normalized email as primary key, which makes duplicates impossible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCredentialDocument {
    #[serde(rename = "_id")]
    email: String,
    user_id: String,
    salt: String,
    password_hash: String,
}

impl From<CredentialEntity> for MongoCredentialDocument {
    fn from(value: CredentialEntity) -> Self {
        Self {
            email: value.email,
            user_id: value.user_id.to_string(),
            salt: value.salt,
            password_hash: value.password_hash,
        }
    }
}

impl TryFrom<MongoCredentialDocument> for CredentialEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoCredentialDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_id(&value.user_id)?,
            email: value.email,
            salt: value.salt,
            password_hash: value.password_hash,
        })
    }
}

pub fn doc_id(id: impl ToString) -> Document {
    doc! {"_id": id.to_string()}
}

fn parse_id(value: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(value).map_err(|_| MongoDaoError::InvalidId {
        value: value.to_owned(),
    })
}

fn parse_ids(values: &[String]) -> Result<Vec<Uuid>, MongoDaoError> {
    values.iter().map(|value| parse_id(value)).collect()
}
