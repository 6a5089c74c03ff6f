use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::UserEntity;

use super::format_system_time;

/// Full profile, visible to its owner and to friends lists.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl From<UserEntity> for UserProfile {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: format_system_time(user.created_at),
        }
    }
}

/// Profile as shown to any authenticated user.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
}

impl From<UserEntity> for PublicProfile {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// Add a friend by the email they registered with.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddFriendRequest {
    #[validate(email)]
    pub email: String,
}
