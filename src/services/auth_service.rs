//! Email/password identity: sign-up, sign-in, sign-out and token resolution.

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{CredentialEntity, UserEntity},
    dto::{
        auth::{AuthResponse, SignInRequest, SignUpRequest},
        user::UserProfile,
        validation::normalize_email,
    },
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

const SALT_LEN: usize = 16;
/// Same message for unknown email and wrong password.
const INVALID_CREDENTIALS: &str = "invalid email or password";

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_credential(user_id: Uuid, email: &str, password: &str) -> CredentialEntity {
    let salt = hex::encode(rand::random::<[u8; SALT_LEN]>());
    CredentialEntity {
        user_id,
        email: email.to_owned(),
        password_hash: hash_password(&salt, password),
        salt,
    }
}

fn verify_password(credential: &CredentialEntity, password: &str) -> bool {
    hash_password(&credential.salt, password) == credential.password_hash
}

/// Register a new user and sign them in.
pub async fn sign_up(
    state: &SharedState,
    payload: SignUpRequest,
) -> Result<AuthResponse, ServiceError> {
    payload.validate()?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("name must not be blank".into()));
    }
    let store = state.require_session_store().await?;
    let email = normalize_email(&payload.email);

    if store.find_credential(email.clone()).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "email `{email}` is already registered"
        )));
    }

    let user = UserEntity::new(name.to_owned(), email.clone());
    // Credential first: its uniqueness per email arbitrates concurrent sign-ups.
    store
        .insert_credential(new_credential(user.id, &email, &payload.password))
        .await?;
    let user = match store.save_user(user).await {
        Ok(user) => user,
        Err(err) => {
            // Without its user the credential would lock the email forever.
            if let Err(cleanup) = store.delete_credential(email.clone()).await {
                warn!(%email, error = %cleanup, "failed to remove credential of aborted sign-up");
            }
            return Err(err.into());
        }
    };

    info!(user = %user.id, "user signed up");
    Ok(issue_token(state, user))
}

/// Verify credentials and issue a new token.
pub async fn sign_in(
    state: &SharedState,
    payload: SignInRequest,
) -> Result<AuthResponse, ServiceError> {
    payload.validate()?;
    let store = state.require_session_store().await?;
    let email = normalize_email(&payload.email);

    let credential = store
        .find_credential(email)
        .await?
        .filter(|credential| verify_password(credential, &payload.password))
        .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    let user = store
        .find_user(credential.user_id)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    debug!(user = %user.id, "user signed in");
    Ok(issue_token(state, user))
}

fn issue_token(state: &SharedState, user: UserEntity) -> AuthResponse {
    let token = state.identity().issue(user.id);
    sse_events::broadcast_auth_state(state, user.id, true);
    AuthResponse {
        token,
        user: user.into(),
    }
}

/// Revoke `token`; the last sign-out of a user also closes their search widgets.
pub fn sign_out(state: &SharedState, token: &str) -> Result<(), ServiceError> {
    let user = state
        .identity()
        .revoke(token)
        .ok_or_else(|| ServiceError::Unauthorized("unknown session token".into()))?;

    if !state.identity().is_signed_in(user) {
        let closed = state.searches().close_owned_by(user);
        debug!(%user, closed, "closed search widgets after last sign-out");
    }
    sse_events::broadcast_auth_state(state, user, false);
    Ok(())
}

/// Resolve a session token to the user it was issued to.
pub fn authenticate(state: &SharedState, token: &str) -> Result<Uuid, ServiceError> {
    state
        .identity()
        .resolve(token)
        .ok_or_else(|| ServiceError::Unauthorized("unknown session token".into()))
}

pub async fn current_user(state: &SharedState, user: Uuid) -> Result<UserProfile, ServiceError> {
    let store = state.require_session_store().await?;
    store
        .find_user(user)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user}` not found")))
}
