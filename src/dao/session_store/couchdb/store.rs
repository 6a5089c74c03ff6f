use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, json};
use uuid::Uuid;

use crate::dao::{
    models::{
        CREDENTIAL_ENTITY, CredentialEntity, GameSessionEntity, MembershipFilter, SESSION_ENTITY,
        USER_ENTITY, UserEntity,
    },
    session_store::{SessionStore, sort_sessions},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchCredentialDocument, CouchSessionDocument, CouchUserDocument,
        END_SUFFIX, FindResponse, RevisionProbe, SESSION_PREFIX, USER_PREFIX, credential_doc_id,
        session_doc_id, user_doc_id,
    },
};

const ALL_DOCS: &str = "_all_docs";
const FIND: &str = "_find";
/// Upper bound on documents returned by a single Mango query.
const FIND_LIMIT: u32 = 500;

#[derive(Clone)]
pub struct CouchSessionStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchSessionStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, entity: &'static str, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::RevisionConflict {
                entity,
                id: doc_id.to_string(),
            }),
            status if status.is_success() => Ok(()),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }

    /// Write a document only if its stored `revision` equals `expected`.
    ///
    /// The CouchDB `_rev` read during the check is sent along with the write, so a
    /// concurrent writer slipping in between is rejected by CouchDB itself.
    async fn compare_and_put<D, F>(
        &self,
        entity: &'static str,
        doc_id: &str,
        expected: u64,
        build: F,
    ) -> CouchResult<()>
    where
        D: Serialize,
        F: FnOnce(Option<String>) -> D,
    {
        let existing = self.get_document::<RevisionProbe>(doc_id).await?;
        let rev = match existing {
            None if expected == 0 => None,
            None => {
                return Err(CouchDaoError::MissingDocument {
                    entity,
                    id: doc_id.to_string(),
                });
            }
            Some(probe) if expected != 0 && probe.revision == expected => Some(probe.rev),
            Some(_) => {
                return Err(CouchDaoError::RevisionConflict {
                    entity,
                    id: doc_id.to_string(),
                });
            }
        };

        self.put_document(entity, doc_id, &build(rev)).await
    }

    async fn post_json<T>(&self, path: &str, query: &[(&str, &str)], body: &Value) -> CouchResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    /// Run a Mango query restricted to documents whose id starts with `prefix`.
    async fn find_documents<T>(&self, prefix: &str, mut selector: Value, limit: u32) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        selector["_id"] = json!({
            "$gt": prefix,
            "$lt": format!("{}{}", prefix, END_SUFFIX),
        });
        let body = json!({ "selector": selector, "limit": limit });
        let payload = self.post_json::<FindResponse>(FIND, &[], &body).await?;

        payload
            .docs
            .into_iter()
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: FIND.to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn find_users(&self, ids: Vec<Uuid>) -> CouchResult<Vec<UserEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys = ids.into_iter().map(user_doc_id).collect::<Vec<_>>();
        let payload = self
            .post_json::<AllDocsResponse>(
                ALL_DOCS,
                &[("include_docs", "true")],
                &json!({ "keys": keys }),
            )
            .await?;

        let mut users = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let doc: CouchUserDocument =
                    from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                        path: ALL_DOCS.to_string(),
                        source,
                    })?;
                users.push(doc.try_into()?);
            }
        }
        Ok(users)
    }

    async fn list_sessions(
        &self,
        user: Uuid,
        filter: MembershipFilter,
    ) -> CouchResult<Vec<GameSessionEntity>> {
        let mut selector = json!({});
        match filter {
            MembershipFilter::Role(role) => {
                selector[role.field()] = json!({ "$elemMatch": { "$eq": user } });
            }
            MembershipFilter::Owner => selector["owner"] = json!(user),
        }
        let docs = self
            .find_documents::<CouchSessionDocument>(SESSION_PREFIX, selector, FIND_LIMIT)
            .await?;
        let mut sessions = docs
            .into_iter()
            .map(GameSessionEntity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    async fn health_check(&self) -> CouchResult<()> {
        let url = format!("{}/{}", self.base_url, self.database);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(probe) = self.get_document::<RevisionProbe>(doc_id).await? else {
            return Ok(false);
        };
        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", probe.rev.as_str())])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }
}

impl SessionStore for CouchSessionStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = user_doc_id(user.id);
            let expected = user.revision;
            let mut stored = user;
            stored.revision = expected + 1;
            let body = stored.clone();
            store
                .compare_and_put(USER_ENTITY, &doc_id, expected, |rev| {
                    CouchUserDocument::from((body, rev))
                })
                .await?;
            Ok(stored)
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchUserDocument>(&user_doc_id(id))
                .await?;
            Ok(doc.map(UserEntity::try_from).transpose()?)
        })
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
        Box::pin(async move {
            let docs = store
                .find_documents::<CouchUserDocument>(USER_PREFIX, json!({ "email": email }), 1)
                .await?;
            Ok(docs
                .into_iter()
                .next()
                .map(UserEntity::try_from)
                .transpose()?)
        })
    }

    fn insert_credential(
        &self,
        credential: CredentialEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchCredentialDocument::from(credential);
            // A PUT without `_rev` on an existing id is rejected with 409.
            store
                .put_document(CREDENTIAL_ENTITY, &doc.id, &doc)
                .await
                .map_err(Into::into)
        })
    }

    fn find_credential(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchCredentialDocument>(&credential_doc_id(&email))
                .await?;
            Ok(doc.map(|doc| doc.credential))
        })
    }

    fn delete_credential(&self, email: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&credential_doc_id(&email))
                .await
                .map_err(Into::into)
        })
    }

    fn save_session(
        &self,
        session: GameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<GameSessionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = session_doc_id(session.id);
            let expected = session.revision;
            let mut stored = session;
            stored.revision = expected + 1;
            let body = stored.clone();
            store
                .compare_and_put(SESSION_ENTITY, &doc_id, expected, |rev| {
                    CouchSessionDocument::from((body, rev))
                })
                .await?;
            Ok(stored)
        })
    }

    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchSessionDocument>(&session_doc_id(id))
                .await?;
            Ok(doc.map(GameSessionEntity::try_from).transpose()?)
        })
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
        Box::pin(async move {
            store
                .delete_document(&session_doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.health_check().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
