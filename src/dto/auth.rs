//! Request and response bodies of the `/auth` routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::user::UserProfile;

/// Registration payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Issued session token together with the authenticated profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Value to send back in the `X-Session-Token` header.
    pub token: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(name: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn accepts_well_formed_sign_up() {
        assert!(sign_up("Ada", "ada@example.com", "correct horse").validate().is_ok());
    }

    #[test]
    fn rejects_bad_sign_up_fields() {
        assert!(sign_up("", "ada@example.com", "correct horse").validate().is_err());
        assert!(sign_up(&"a".repeat(81), "ada@example.com", "correct horse").validate().is_err());
        assert!(sign_up("Ada", "not-an-email", "correct horse").validate().is_err());
        assert!(sign_up("Ada", "ada@example.com", "short").validate().is_err());
    }
}
