#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{CredentialEntity, GameSessionEntity, MembershipFilter, UserEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the document store holding users, credentials and game sessions.
///
/// `save_*` methods are compare-and-swap writes: the entity's `revision` must match the
/// stored one (or be `0` for a document that does not exist yet). On success the stored
/// entity, with its revision bumped, is returned. A mismatch yields
/// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict) and nothing is
/// written.
pub trait SessionStore: Send + Sync {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>>;
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Fetch several users at once; unknown ids are skipped.
    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Insert a credential; fails with a conflict when the email is already registered.
    fn insert_credential(
        &self,
        credential: CredentialEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_credential(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>>;
    /// Remove the credential registered for `email`; returns whether one existed.
    fn delete_credential(&self, email: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn save_session(
        &self,
        session: GameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<GameSessionEntity>>;
    fn find_session(&self, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    /// Sessions where `user` satisfies `filter`, most recently scheduled first.
    fn list_sessions_for_member(
        &self,
        user: Uuid,
        filter: MembershipFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSessionEntity>>>;
    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Order sessions the way every backend reports them: scheduled ones first, most recent
/// schedule first, then by creation time.
pub fn sort_sessions(sessions: &mut [GameSessionEntity]) {
    sessions.sort_by(|a, b| {
        b.scheduled_time
            .cmp(&a.scheduled_time)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
