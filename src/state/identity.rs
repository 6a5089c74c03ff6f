use dashmap::DashMap;
use uuid::Uuid;

/// In-process registry of issued session tokens.
#[derive(Default)]
pub struct IdentityRegistry {
    tokens: DashMap<String, Uuid>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh opaque token for `user`.
    pub fn issue(&self, user: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user);
        token
    }

    /// User the token was issued to, if it is still valid.
    pub fn resolve(&self, token: &str) -> Option<Uuid> {
        self.tokens.get(token).map(|entry| *entry.value())
    }

    /// Revoke a token, returning the user it belonged to.
    pub fn revoke(&self, token: &str) -> Option<Uuid> {
        self.tokens.remove(token).map(|(_, user)| user)
    }

    /// Whether `user` still holds at least one valid token.
    pub fn is_signed_in(&self, user: Uuid) -> bool {
        self.tokens.iter().any(|entry| *entry.value() == user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_resolve_until_revoked() {
        let registry = IdentityRegistry::new();
        let user = Uuid::new_v4();

        let first = registry.issue(user);
        let second = registry.issue(user);
        assert_ne!(first, second);
        assert_eq!(registry.resolve(&first), Some(user));

        assert_eq!(registry.revoke(&first), Some(user));
        assert_eq!(registry.resolve(&first), None);
        assert!(registry.is_signed_in(user));

        registry.revoke(&second);
        assert!(!registry.is_signed_in(user));
        assert_eq!(registry.revoke(&second), None);
    }
}
