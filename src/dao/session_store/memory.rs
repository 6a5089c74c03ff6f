//! Process-local store used for development runs (`STORAGE_BACKEND=memory`) and tests.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        CREDENTIAL_ENTITY, CredentialEntity, GameSessionEntity, MembershipFilter, SESSION_ENTITY,
        USER_ENTITY, UserEntity,
    },
    session_store::{SessionStore, sort_sessions},
    storage::{StorageError, StorageResult},
};

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: DashMap<Uuid, UserEntity>,
    credentials: DashMap<String, CredentialEntity>,
    sessions: DashMap<Uuid, GameSessionEntity>,
}

trait Revisioned: Clone {
    fn revision(&self) -> u64;
    fn set_revision(&mut self, revision: u64);
}

impl Revisioned for UserEntity {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
}

impl Revisioned for GameSessionEntity {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
}

fn compare_and_swap<T: Revisioned>(
    map: &DashMap<Uuid, T>,
    entity_kind: &'static str,
    id: Uuid,
    mut value: T,
) -> StorageResult<T> {
    let expected = value.revision();
    match map.entry(id) {
        Entry::Occupied(mut slot) => {
            if expected == 0 || slot.get().revision() != expected {
                return Err(StorageError::conflict(entity_kind, id));
            }
            value.set_revision(expected + 1);
            slot.insert(value.clone());
            Ok(value)
        }
        Entry::Vacant(slot) => {
            if expected != 0 {
                return Err(StorageError::missing(entity_kind, id));
            }
            value.set_revision(1);
            slot.insert(value.clone());
            Ok(value)
        }
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { compare_and_swap(&store.inner.users, USER_ENTITY, user.id, user) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.users.get(&id).map(|user| user.clone())) })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(ids
                .iter()
                .filter_map(|id| store.inner.users.get(id).map(|user| user.clone()))
                .collect())
        })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .users
                .iter()
                .find(|user| user.email == email)
                .map(|user| user.clone()))
        })
    }

    fn insert_credential(
        &self,
        credential: CredentialEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            match store.inner.credentials.entry(credential.email.clone()) {
                Entry::Occupied(_) => Err(StorageError::conflict(
                    CREDENTIAL_ENTITY,
                    credential.email,
                )),
                Entry::Vacant(slot) => {
                    slot.insert(credential);
                    Ok(())
                }
            }
        })
    }

    fn find_credential(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .credentials
                .get(&email)
                .map(|credential| credential.clone()))
        })
    }

    fn delete_credential(&self, email: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.credentials.remove(&email).is_some()) })
    }

    fn save_session(
        &self,
        session: GameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<GameSessionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            compare_and_swap(&store.inner.sessions, SESSION_ENTITY, session.id, session)
        })
    }

    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.sessions.get(&id).map(|s| s.clone())) })
    }

    fn list_sessions_for_member(
        &self,
        user: Uuid,
        filter: MembershipFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut sessions = store
                .inner
                .sessions
                .iter()
                .filter(|session| session.matches(user, filter))
                .map(|session| session.clone())
                .collect::<Vec<_>>();
            sort_sessions(&mut sessions);
            Ok(sessions)
        })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.sessions.remove(&id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::models::MemberRole;

    fn session(owner: Uuid, players: Vec<Uuid>) -> GameSessionEntity {
        let now = SystemTime::now();
        GameSessionEntity {
            id: Uuid::new_v4(),
            title: "Catan night".into(),
            location: None,
            scheduled_time: None,
            catalog_id: "13".into(),
            min_players: None,
            max_players: None,
            creator: owner,
            owner,
            hosts: vec![owner],
            players,
            teachers: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn save_bumps_revision_and_rejects_stale_writes() {
        let store = MemorySessionStore::new();
        let user = UserEntity::new("Ada".into(), "ada@example.com".into());

        let stored = store.save_user(user.clone()).await.unwrap();
        assert_eq!(stored.revision, 1);

        let mut renamed = stored.clone();
        renamed.name = "Ada L.".into();
        let renamed = store.save_user(renamed).await.unwrap();
        assert_eq!(renamed.revision, 2);

        let mut stale = stored;
        stale.name = "Stale".into();
        let err = store.save_user(stale).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));

        let current = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(current.name, "Ada L.");
    }

    #[tokio::test]
    async fn inserting_an_existing_document_conflicts() {
        let store = MemorySessionStore::new();
        let user = UserEntity::new("Ada".into(), "ada@example.com".into());
        store.save_user(user.clone()).await.unwrap();

        let err = store.save_user(user).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }

    #[tokio::test]
    async fn updating_a_deleted_session_reports_missing() {
        let store = MemorySessionStore::new();
        let owner = Uuid::new_v4();
        let stored = store.save_session(session(owner, vec![owner])).await.unwrap();
        assert!(store.delete_session(stored.id).await.unwrap());

        let err = store.save_session(stored).await.unwrap_err();
        assert!(matches!(err, StorageError::Missing { .. }));
    }

    #[tokio::test]
    async fn lists_sessions_by_membership() {
        let store = MemorySessionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut later = session(alice, vec![alice, bob]);
        later.scheduled_time = Some(SystemTime::now() + Duration::from_secs(3600));
        let later = store.save_session(later).await.unwrap();
        let hosted_by_bob = store.save_session(session(bob, vec![bob])).await.unwrap();

        let bob_playing = store
            .list_sessions_for_member(bob, MembershipFilter::Role(MemberRole::Player))
            .await
            .unwrap();
        let ids = bob_playing.iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![later.id, hosted_by_bob.id]);

        let alice_playing = store
            .list_sessions_for_member(alice, MembershipFilter::Role(MemberRole::Player))
            .await
            .unwrap();
        assert_eq!(alice_playing.len(), 1);

        let bob_owned = store
            .list_sessions_for_member(bob, MembershipFilter::Owner)
            .await
            .unwrap();
        assert_eq!(bob_owned.len(), 1);
        assert_eq!(bob_owned[0].id, hosted_by_bob.id);
    }

    #[tokio::test]
    async fn credentials_are_unique_per_email() {
        let store = MemorySessionStore::new();
        let credential = CredentialEntity {
            user_id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            salt: "00".into(),
            password_hash: "ff".into(),
        };
        store.insert_credential(credential.clone()).await.unwrap();
        let err = store.insert_credential(credential).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
        assert!(
            store
                .find_credential("ada@example.com".into())
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn deleted_credential_frees_the_email() {
        let store = MemorySessionStore::new();
        let credential = CredentialEntity {
            user_id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            salt: "00".into(),
            password_hash: "ff".into(),
        };
        store.insert_credential(credential.clone()).await.unwrap();
        assert!(store.delete_credential("ada@example.com".into()).await.unwrap());
        assert!(!store.delete_credential("ada@example.com".into()).await.unwrap());
        store.insert_credential(credential).await.unwrap();
    }
}
