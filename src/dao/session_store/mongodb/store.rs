use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoCredentialDocument, MongoSessionDocument, MongoUserDocument, doc_id},
};
use crate::dao::{
    models::{
        CREDENTIAL_ENTITY, CredentialEntity, GameSessionEntity, MemberRole, MembershipFilter,
        SESSION_ENTITY, USER_ENTITY, UserEntity,
    },
    session_store::{SessionStore, sort_sessions},
    storage::StorageResult,
};

const USER_COLLECTION_NAME: &str = "users";
const CREDENTIAL_COLLECTION_NAME: &str = "credentials";
const SESSION_COLLECTION_NAME: &str = "sessions";

#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let users = self.users().await;
        let email_index = IndexModel::builder()
            .keys(doc! {"email": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("user_email_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        users
            .create_index(email_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: USER_COLLECTION_NAME,
                index: "email",
                source,
            })?;

        // Membership lookups ("sessions where players contains me") hit multikey indexes.
        let sessions = self.sessions().await;
        for field in MemberRole::ALL
            .iter()
            .map(|role| role.field())
            .chain(std::iter::once("owner"))
        {
            let mut keys = Document::new();
            keys.insert(field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("session_{field}_idx")))
                        .build(),
                )
                .build();
            sessions
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: SESSION_COLLECTION_NAME,
                    index: field,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn users(&self) -> Collection<MongoUserDocument> {
        self.database().await.collection(USER_COLLECTION_NAME)
    }

    async fn credentials(&self) -> Collection<MongoCredentialDocument> {
        self.database().await.collection(CREDENTIAL_COLLECTION_NAME)
    }

    async fn sessions(&self) -> Collection<MongoSessionDocument> {
        self.database().await.collection(SESSION_COLLECTION_NAME)
    }

    /// Insert (revision `0`) or replace the document whose stored revision is `expected`.
    async fn compare_and_replace<T>(
        collection: Collection<T>,
        entity: &'static str,
        id: Uuid,
        expected: u64,
        document: T,
    ) -> MongoResult<()>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let save_error = |source| MongoDaoError::Save {
            entity,
            id: id.to_string(),
            source,
        };

        if expected == 0 {
            return match collection.insert_one(&document).await {
                Ok(_) => Ok(()),
                Err(err) if is_duplicate_key(&err) => Err(MongoDaoError::RevisionConflict {
                    entity,
                    id: id.to_string(),
                }),
                Err(err) => Err(save_error(err)),
            };
        }

        let mut filter = doc_id(id);
        filter.insert("revision", expected as i64);
        let result = collection
            .replace_one(filter, &document)
            .await
            .map_err(save_error)?;
        if result.matched_count > 0 {
            return Ok(());
        }

        let exists = collection
            .count_documents(doc_id(id))
            .await
            .map_err(save_error)?
            > 0;
        if exists {
            Err(MongoDaoError::RevisionConflict {
                entity,
                id: id.to_string(),
            })
        } else {
            Err(MongoDaoError::MissingDocument {
                entity,
                id: id.to_string(),
            })
        }
    }

    async fn save_user(&self, user: UserEntity) -> MongoResult<UserEntity> {
        let expected = user.revision;
        let mut stored = user;
        stored.revision = expected + 1;
        let document = MongoUserDocument::from(stored.clone());
        // A duplicate email trips the unique index and surfaces as a conflict too.
        Self::compare_and_replace(self.users().await, USER_ENTITY, stored.id, expected, document)
            .await?;
        Ok(stored)
    }

    async fn find_user(&self, id: Uuid) -> MongoResult<Option<UserEntity>> {
        let document = self
            .users()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: USER_ENTITY,
                id: id.to_string(),
                source,
            })?;
        document.map(UserEntity::try_from).transpose()
    }

    async fn find_users(&self, ids: Vec<Uuid>) -> MongoResult<Vec<UserEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys = ids.iter().map(Uuid::to_string).collect::<Vec<_>>();
        let documents: Vec<MongoUserDocument> = self
            .users()
            .await
            .find(doc! {"_id": {"$in": keys}})
            .await
            .map_err(|source| MongoDaoError::List {
                entity: USER_ENTITY,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                entity: USER_ENTITY,
                source,
            })?;

        let mut users = documents
            .into_iter()
            .map(UserEntity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // Keep the caller's ordering.
        users.sort_by_key(|user| ids.iter().position(|id| *id == user.id));
        Ok(users)
    }

    async fn find_user_by_email(&self, email: String) -> MongoResult<Option<UserEntity>> {
        let document = self
            .users()
            .await
            .find_one(doc! {"email": email.as_str()})
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: USER_ENTITY,
                id: email,
                source,
            })?;
        document.map(UserEntity::try_from).transpose()
    }

    async fn insert_credential(&self, credential: CredentialEntity) -> MongoResult<()> {
        let email = credential.email.clone();
        let document = MongoCredentialDocument::from(credential);
        match self.credentials().await.insert_one(&document).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(MongoDaoError::RevisionConflict {
                entity: CREDENTIAL_ENTITY,
                id: email,
            }),
            Err(source) => Err(MongoDaoError::Save {
                entity: CREDENTIAL_ENTITY,
                id: email,
                source,
            }),
        }
    }

    async fn find_credential(&self, email: String) -> MongoResult<Option<CredentialEntity>> {
        let document = self
            .credentials()
            .await
            .find_one(doc_id(&email))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: CREDENTIAL_ENTITY,
                id: email,
                source,
            })?;
        document.map(CredentialEntity::try_from).transpose()
    }

    async fn delete_credential(&self, email: String) -> MongoResult<bool> {
        let result = self
            .credentials()
            .await
            .delete_one(doc_id(&email))
            .await
            .map_err(|source| MongoDaoError::Delete {
                entity: CREDENTIAL_ENTITY,
                id: email,
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn save_session(&self, session: GameSessionEntity) -> MongoResult<GameSessionEntity> {
        let expected = session.revision;
        let mut stored = session;
        stored.revision = expected + 1;
        let document = MongoSessionDocument::from(stored.clone());
        Self::compare_and_replace(
            self.sessions().await,
            SESSION_ENTITY,
            stored.id,
            expected,
            document,
        )
        .await?;
        Ok(stored)
    }

    async fn find_session(&self, id: Uuid) -> MongoResult<Option<GameSessionEntity>> {
        let document = self
            .sessions()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: SESSION_ENTITY,
                id: id.to_string(),
                source,
            })?;
        document.map(GameSessionEntity::try_from).transpose()
    }

    async fn list_sessions(
        &self,
        user: Uuid,
        filter: MembershipFilter,
    ) -> MongoResult<Vec<GameSessionEntity>> {
        let field = match filter {
            MembershipFilter::Role(role) => role.field(),
            MembershipFilter::Owner => "owner",
        };
        let mut query = Document::new();
        query.insert(field, user.to_string());

        let documents: Vec<MongoSessionDocument> = self
            .sessions()
            .await
            .find(query)
            .await
            .map_err(|source| MongoDaoError::List {
                entity: SESSION_ENTITY,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                entity: SESSION_ENTITY,
                source,
            })?;

        let mut sessions = documents
            .into_iter()
            .map(GameSessionEntity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    async fn delete_session(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .sessions()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Delete {
                entity: SESSION_ENTITY,
                id: id.to_string(),
                source,
            })?;
        Ok(result.deleted_count > 0)
    }
}

impl SessionStore for MongoSessionStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_users(ids).await.map_err(Into::into) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user_by_email(email).await.map_err(Into::into) })
    }

    fn insert_credential(
        &self,
        credential: CredentialEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_credential(credential).await.map_err(Into::into) })
    }

    fn find_credential(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_credential(email).await.map_err(Into::into) })
    }

    fn delete_credential(&self, email: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_credential(email).await.map_err(Into::into) })
    }

    fn save_session(
        &self,
        session: GameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<GameSessionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_session(session).await.map_err(Into::into) })
    }

    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_session(id).await.map_err(Into::into) })
    }

    fn list_sessions_for_member(
        &self,
        user: Uuid,
        filter: MembershipFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sessions(user, filter).await.map_err(Into::into) })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
