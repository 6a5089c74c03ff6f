//! Profiles and friends lists.

use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::UserEntity,
    dto::{
        user::{AddFriendRequest, PublicProfile, UpdateProfileRequest, UserProfile},
        validation::normalize_email,
    },
    error::ServiceError,
    state::SharedState,
};

async fn load_user(state: &SharedState, id: Uuid) -> Result<UserEntity, ServiceError> {
    let store = state.require_session_store().await?;
    store
        .find_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{id}` not found")))
}

pub async fn get_profile(state: &SharedState, user: Uuid) -> Result<UserProfile, ServiceError> {
    Ok(load_user(state, user).await?.into())
}

pub async fn get_public_profile(
    state: &SharedState,
    user: Uuid,
) -> Result<PublicProfile, ServiceError> {
    Ok(load_user(state, user).await?.into())
}

pub async fn update_profile(
    state: &SharedState,
    user: Uuid,
    payload: UpdateProfileRequest,
) -> Result<UserProfile, ServiceError> {
    payload.validate()?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("name must not be blank".into()));
    }

    let mut entity = load_user(state, user).await?;
    entity.name = name.to_owned();
    let store = state.require_session_store().await?;
    Ok(store.save_user(entity).await?.into())
}

/// Friends of `user`, in the order they were added; deleted accounts are skipped.
pub async fn list_friends(
    state: &SharedState,
    user: Uuid,
) -> Result<Vec<UserProfile>, ServiceError> {
    let entity = load_user(state, user).await?;
    let store = state.require_session_store().await?;
    let friends = store.find_users(entity.friends).await?;
    Ok(friends.into_iter().map(UserProfile::from).collect())
}

/// Add the user registered under `payload.email` to the caller's friends.
pub async fn add_friend(
    state: &SharedState,
    user: Uuid,
    payload: AddFriendRequest,
) -> Result<UserProfile, ServiceError> {
    payload.validate()?;
    let store = state.require_session_store().await?;
    let email = normalize_email(&payload.email);

    let friend = store
        .find_user_by_email(email.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no user registered as `{email}`")))?;
    if friend.id == user {
        return Err(ServiceError::InvalidInput(
            "you cannot add yourself as a friend".into(),
        ));
    }

    let mut entity = load_user(state, user).await?;
    if entity.friends.contains(&friend.id) {
        return Err(ServiceError::Conflict(format!(
            "`{email}` is already a friend"
        )));
    }
    entity.friends.push(friend.id);
    store.save_user(entity).await?;

    debug!(%user, friend = %friend.id, "friend added");
    Ok(friend.into())
}

pub async fn remove_friend(
    state: &SharedState,
    user: Uuid,
    friend: Uuid,
) -> Result<(), ServiceError> {
    let mut entity = load_user(state, user).await?;
    let before = entity.friends.len();
    entity.friends.retain(|id| *id != friend);
    if entity.friends.len() == before {
        return Err(ServiceError::NotFound(format!(
            "user `{friend}` is not a friend"
        )));
    }

    let store = state.require_session_store().await?;
    store.save_user(entity).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::memory_state;

    async fn register(state: &SharedState, name: &str, email: &str) -> UserEntity {
        let store = state.require_session_store().await.unwrap();
        store
            .save_user(UserEntity::new(name.into(), email.into()))
            .await
            .unwrap()
    }

    fn friend_request(email: &str) -> AddFriendRequest {
        AddFriendRequest {
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn friends_are_added_by_email_one_way() {
        let state = memory_state().await;
        let ada = register(&state, "Ada", "ada@example.com").await;
        let bob = register(&state, "Bob", "bob@example.com").await;

        let added = add_friend(&state, ada.id, friend_request("Bob@Example.com"))
            .await
            .unwrap();
        assert_eq!(added.id, bob.id);

        let friends = list_friends(&state, ada.id).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].name, "Bob");
        assert!(list_friends(&state, bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn friend_rules() {
        let state = memory_state().await;
        let ada = register(&state, "Ada", "ada@example.com").await;
        register(&state, "Bob", "bob@example.com").await;

        assert!(matches!(
            add_friend(&state, ada.id, friend_request("ada@example.com")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            add_friend(&state, ada.id, friend_request("nobody@example.com")).await,
            Err(ServiceError::NotFound(_))
        ));

        add_friend(&state, ada.id, friend_request("bob@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            add_friend(&state, ada.id, friend_request("bob@example.com")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn removing_friends() {
        let state = memory_state().await;
        let ada = register(&state, "Ada", "ada@example.com").await;
        let bob = register(&state, "Bob", "bob@example.com").await;
        add_friend(&state, ada.id, friend_request("bob@example.com"))
            .await
            .unwrap();

        remove_friend(&state, ada.id, bob.id).await.unwrap();
        assert!(list_friends(&state, ada.id).await.unwrap().is_empty());
        assert!(matches!(
            remove_friend(&state, ada.id, bob.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn profile_updates_are_persisted() {
        let state = memory_state().await;
        let ada = register(&state, "Ada", "ada@example.com").await;

        let updated = update_profile(
            &state,
            ada.id,
            UpdateProfileRequest {
                name: "  Ada Lovelace ".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(
            get_public_profile(&state, ada.id).await.unwrap().name,
            "Ada Lovelace"
        );
        assert!(matches!(
            get_profile(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
