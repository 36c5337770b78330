//! Current-user identity.
//!
//! The engine only needs an opaque user id (history ownership) and a bearer
//! token (authenticated actions). Behind a trait so tests can substitute a
//! fixed identity and the CLI can run signed-out.

/// Identity collaborator.
pub trait Identity: Send + Sync {
    /// Opaque id of the current user, or `None` when signed out.
    fn current_user_id(&self) -> Option<String>;

    /// Bearer token for authenticated calls, or `None` when signed out.
    fn auth_token(&self) -> Option<String>;
}

/// Identity fixed at construction time, typically from config.
pub struct StaticIdentity {
    user_id: Option<String>,
    token: Option<String>,
}

impl StaticIdentity {
    pub fn new(user_id: Option<String>, token: Option<String>) -> Self {
        Self { user_id, token }
    }

    /// A signed-out identity.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            token: None,
        }
    }
}

impl Identity for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn auth_token(&self) -> Option<String> {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_has_no_identity() {
        let id = StaticIdentity::anonymous();
        assert!(id.current_user_id().is_none());
        assert!(id.auth_token().is_none());
    }

    #[test]
    fn test_static_identity_returns_configured_values() {
        let id = StaticIdentity::new(Some("user-1".into()), Some("token".into()));
        assert_eq!(id.current_user_id().as_deref(), Some("user-1"));
        assert_eq!(id.auth_token().as_deref(), Some("token"));
    }
}
